
use std::sync::{Arc, OnceLock};

use crate::cache::Cache;
use crate::error::Result;
use crate::message::name::canonicalize;
use crate::message::{DnsType, Header, Message, Question, Record, DNSCLASS_INET, OPCODE_QUERY};
use crate::query::{self, Query, QueryMap, QueryOpts, QueryState};
use crate::socket::{MulticastConn, SocketFamily, Transport, MAX_PACKET_SIZE};
use crate::zone::Zone;

/// An mDNS engine: one multicast transport, the authoritative zone, the
/// record cache and the registry of outstanding queries, plus the receive
/// loop that ties them together.
///
/// `Responder` is cheap to clone; clones share the same engine. Most
/// callers use the process-wide default through the crate-level functions
/// and never construct one.
#[derive(Clone)]
pub struct Responder {
    inner: Arc<Inner>,
}

struct Inner {
    transport: Arc<dyn Transport>,
    zone: Zone,
    cache: Cache,
    queries: QueryMap,
}

impl Responder {
    /// Creates an engine on the IPv4 mDNS group and starts its receive
    /// loop.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new() -> Result<Responder> {
        Ok(Self::with_transport(Arc::new(MulticastConn::new(
            SocketFamily::V4,
        )?)))
    }

    /// Creates an engine over an arbitrary transport. The transport is
    /// normally a [`MulticastConn`]; tests substitute in-memory ones.
    pub fn with_transport(transport: Arc<dyn Transport>) -> Responder {
        let responder = Responder {
            inner: Arc::new(Inner {
                transport,
                zone: Zone::new(),
                cache: Cache::new(),
                queries: QueryMap::new(),
            }),
        };
        tokio::spawn(responder.clone().listen());
        responder
    }

    /// Hands a record to the authoritative zone.
    ///
    /// # Panics
    ///
    /// Panics if the owner name does not end in `.local.`.
    pub fn publish_record(&self, rr: Record) {
        self.inner.zone.publish(rr);
    }

    /// Parses a zone-file-style line (`foo.local. 3600 A 10.10.10.10`) and
    /// publishes it. A malformed line is logged and skipped.
    pub fn publish_from_text(&self, line: &str) {
        match line.parse::<Record>() {
            Ok(rr) => self.publish_record(rr),
            Err(e) => log::warn!("failure parsing record line: {e}"),
        }
    }

    /// Starts a continuous, unbounded query for every record under `name`.
    /// The stream ends when the handle is dropped or [`Query::done`] is
    /// called.
    pub fn query(&self, name: &str) -> Query {
        self.query_with(
            name,
            DnsType::Any,
            QueryOpts {
                continuous: true,
                retries: -1,
                ..Default::default()
            },
        )
    }

    /// Starts a query for `name` records of type `qtype` with explicit
    /// options.
    pub fn query_with(&self, name: &str, qtype: DnsType, opts: QueryOpts) -> Query {
        let question = Question {
            name: canonicalize(name),
            qtype,
            qclass: DNSCLASS_INET,
        };
        query::spawn(self.clone(), question, opts)
    }

    // start_attempt begins one attempt of a query: register it, prime it
    // from the cache, and multicast the question. A cached answer makes the
    // question redundant for a non-continuous query, so it is suppressed.
    pub(crate) async fn start_attempt(&self, q: &Arc<QueryState>) {
        self.inner.queries.add(q.clone());

        let cached = self.inner.cache.get(q.name(), q.qtype());
        let had_cached = !cached.is_empty();
        for rr in cached {
            q.offer(rr).await;
        }
        if had_cached && !q.continuous() {
            return;
        }

        // One question per message (RFC 6762 section 6).
        let msg = Message {
            questions: vec![q.question().clone()],
            ..Default::default()
        };
        if let Err(e) = self.send(&msg).await {
            log::warn!("error sending query: {e}");
        }
    }

    pub(crate) fn end_attempt(&self, q: &Arc<QueryState>) {
        self.inner.queries.remove(q);
    }

    async fn send(&self, msg: &Message) -> Result<()> {
        let buf = msg.pack()?;
        self.inner.transport.send_multicast(&buf).await
    }

    // The receive loop: one task per engine, reading packets forever.
    // Decode failures are logged and skipped; a receive failure ends the
    // loop.
    async fn listen(self) {
        let mut buf = vec![0u8; MAX_PACKET_SIZE];
        loop {
            let n = match self.inner.transport.recv(&mut buf).await {
                Ok((n, _peer)) => n,
                Err(e) => {
                    log::error!("error reading mDNS packet: {e}");
                    return;
                }
            };

            let msg = match Message::unpack(&buf[..n]) {
                Ok(msg) => msg,
                Err(e) => {
                    log::warn!("error unpacking DNS packet: {e}");
                    continue;
                }
            };

            if msg.header.response {
                self.handle_response(msg).await;
            } else if let Some(resp) = self.handle_question(&msg) {
                // Response jitter, unicast replies and coalescing are
                // deliberate omissions; see the crate docs.
                if let Err(e) = self.send(&resp).await {
                    log::warn!("unable to send response: {e}");
                }
            }
        }
    }

    // A peer's response: remember every record, then fan answers out to
    // matching queries. Nothing is sent back.
    async fn handle_response(&self, msg: Message) {
        for rr in msg.answers.iter().chain(msg.additionals.iter()) {
            self.inner.cache.add(rr);
        }
        for rr in &msg.answers {
            self.inner.queries.deliver(rr).await;
        }
    }

    // A peer's question: answer authoritatively from the local zone. The
    // response carries no questions (RFC 6762 section 6) and is only sent
    // when something matched.
    fn handle_question(&self, msg: &Message) -> Option<Message> {
        if msg.header.op_code != OPCODE_QUERY {
            log::debug!("non-query opcode not supported: {}", msg.header.op_code);
            return None;
        }

        let mut resp = Message {
            header: Header {
                id: msg.header.id,
                response: true,
                authoritative: true,
                op_code: OPCODE_QUERY,
                ..Default::default()
            },
            ..Default::default()
        };

        for q in &msg.questions {
            resp.answers.extend(self.inner.zone.query(q));
        }

        if resp.answers.is_empty() {
            return None;
        }
        Some(resp)
    }

    #[cfg(test)]
    pub(crate) fn outstanding_queries(&self, name: &str) -> usize {
        self.inner.queries.outstanding(name)
    }
}

// The process-wide engine, created on first use. mDNS is one port and one
// group per host, so a single shared engine is the norm; consumers needing
// isolation construct their own Responder.
static DEFAULT: OnceLock<Responder> = OnceLock::new();
static DEFAULT_INIT: std::sync::Mutex<()> = std::sync::Mutex::new(());

pub(crate) fn default_responder() -> Result<Responder> {
    if let Some(r) = DEFAULT.get() {
        return Ok(r.clone());
    }
    // The mutex keeps a failed bind from leaving two racing engines behind.
    let _guard = DEFAULT_INIT.lock().unwrap();
    if let Some(r) = DEFAULT.get() {
        return Ok(r.clone());
    }
    let r = Responder::new()?;
    let _ = DEFAULT.set(r.clone());
    Ok(r)
}
