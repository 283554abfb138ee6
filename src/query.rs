
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::message::{DnsType, Question, Record};
use crate::responder::Responder;

/// Options controlling a query's retry and delivery behavior.
#[derive(Clone, Copy, Debug)]
pub struct QueryOpts {
    /// Keep the delivery channel open after the first answer. The caller
    /// ends the stream by calling [`Query::done`] (or dropping the handle).
    pub continuous: bool,

    /// Retry count, with an irregular but long-standing convention:
    /// `0` means a single attempt, a positive value `n` means `n + 1`
    /// attempts, and any negative value retries without bound.
    pub retries: i32,

    /// Time between attempts.
    pub retry_interval: Duration,
}

impl Default for QueryOpts {
    fn default() -> Self {
        Self {
            continuous: false,
            retries: 0,
            retry_interval: Duration::from_secs(1),
        }
    }
}

/// A handle to an outstanding query.
///
/// Records stream in via [`recv`](Query::recv); the channel yields `None`
/// once the query is cancelled or its retries are exhausted. Dropping the
/// handle cancels the query.
pub struct Query {
    rx: mpsc::Receiver<Record>,
    cancel: CancellationToken,
}

impl Query {
    /// The next answer, or `None` when the query has ended.
    pub async fn recv(&mut self) -> Option<Record> {
        self.rx.recv().await
    }

    /// Waits for a single answer, then cancels the query.
    pub async fn one_shot(mut self) -> Option<Record> {
        let rr = self.recv().await;
        self.done();
        rr
    }

    /// Cancels the query. Idempotent; safe to call from any task.
    pub fn done(&self) {
        self.cancel.cancel();
    }
}

impl Drop for Query {
    fn drop(&mut self) {
        // Nobody can receive anymore, so stop asking.
        self.cancel.cancel();
    }
}

// The registry's (and delivery fan-out's) view of a query: its question,
// its answer inbox and its cancellation signal. The public handle and the
// spawned tasks share one of these.
pub(crate) struct QueryState {
    question: Question,
    opts: QueryOpts,
    ans_tx: mpsc::Sender<Record>,
    cancel: CancellationToken,
}

impl QueryState {
    pub(crate) fn name(&self) -> &str {
        &self.question.name
    }

    pub(crate) fn qtype(&self) -> DnsType {
        self.question.qtype
    }

    pub(crate) fn question(&self) -> &Question {
        &self.question
    }

    pub(crate) fn continuous(&self) -> bool {
        self.opts.continuous
    }

    fn matches(&self, rr: &Record) -> bool {
        self.question.qtype == DnsType::Any || self.question.qtype == rr.rtype()
    }

    // offer hands rr to the query's inbox, giving up if the query is
    // cancelled first. It never blocks indefinitely on a dead consumer.
    pub(crate) async fn offer(&self, rr: Record) {
        tokio::select! {
            _ = self.cancel.cancelled() => {}
            _ = self.ans_tx.send(rr) => {}
        }
    }
}

// Registry of outstanding queries, keyed by question name.
pub(crate) struct QueryMap {
    queries: Mutex<HashMap<String, Vec<Arc<QueryState>>>>,
}

impl QueryMap {
    pub(crate) fn new() -> Self {
        Self {
            queries: Mutex::new(HashMap::new()),
        }
    }

    pub(crate) fn add(&self, q: Arc<QueryState>) {
        let mut queries = self.queries.lock().unwrap();
        queries.entry(q.name().to_owned()).or_default().push(q);
    }

    pub(crate) fn remove(&self, q: &Arc<QueryState>) {
        let mut queries = self.queries.lock().unwrap();
        let Some(bucket) = queries.get_mut(q.name()) else {
            return;
        };
        if let Some(i) = bucket.iter().position(|other| Arc::ptr_eq(other, q)) {
            bucket.swap_remove(i);
        }
        if bucket.is_empty() {
            queries.remove(q.name());
        }
    }

    // deliver hands rr to every matching query. Handles are collected under
    // the lock but offered outside it: offer can block on a consumer that
    // itself calls back into the registry.
    pub(crate) async fn deliver(&self, rr: &Record) {
        let matched: Vec<Arc<QueryState>> = {
            let queries = self.queries.lock().unwrap();
            match queries.get(&rr.name) {
                Some(bucket) => bucket.iter().filter(|q| q.matches(rr)).cloned().collect(),
                None => Vec::new(),
            }
        };

        for q in matched {
            q.offer(rr.clone()).await;
        }
    }

    #[cfg(test)]
    pub(crate) fn outstanding(&self, name: &str) -> usize {
        let queries = self.queries.lock().unwrap();
        queries.get(name).map_or(0, |b| b.len())
    }
}

// spawn starts the producer and delivery tasks for a new query and returns
// the caller's handle.
pub(crate) fn spawn(engine: Responder, question: Question, opts: QueryOpts) -> Query {
    let (ch_tx, ch_rx) = mpsc::channel(1);
    let (ans_tx, ans_rx) = mpsc::channel(1);
    let cancel = CancellationToken::new();

    let state = Arc::new(QueryState {
        question,
        opts,
        ans_tx,
        cancel: cancel.clone(),
    });

    tokio::spawn(run_delivery(
        cancel.clone(),
        ans_rx,
        ch_tx,
        opts.continuous,
    ));
    tokio::spawn(run_producer(engine, state));

    Query { rx: ch_rx, cancel }
}

// The retry loop. Each attempt registers the query (which also primes it
// from the cache and emits the question), then waits out the retry interval
// racing cancellation. After the final attempt the query is cancelled,
// which tears down the delivery task.
async fn run_producer(engine: Responder, q: Arc<QueryState>) {
    let tries = match q.opts.retries {
        r if r > 0 => Some(r as u64 + 1),
        0 => Some(1),
        _ => None,
    };

    let mut attempt = 0u64;
    loop {
        if let Some(tries) = tries {
            if attempt >= tries {
                break;
            }
        }
        attempt += 1;

        engine.start_attempt(&q).await;

        let cancelled = if tries == Some(1) {
            // Single attempt: no retry timer, wait for cancellation.
            q.cancel.cancelled().await;
            true
        } else {
            tokio::select! {
                _ = q.cancel.cancelled() => true,
                _ = tokio::time::sleep(q.opts.retry_interval) => false,
            }
        };

        engine.end_attempt(&q);
        if cancelled {
            break;
        }
    }

    q.cancel.cancel();
}

// Forwards answers from the inbox to the caller, racing every hop against
// cancellation so a caller that stops consuming cannot wedge the producer.
// Dropping ch_tx on exit is what closes the caller's channel.
async fn run_delivery(
    cancel: CancellationToken,
    mut ans_rx: mpsc::Receiver<Record>,
    ch_tx: mpsc::Sender<Record>,
    continuous: bool,
) {
    loop {
        let rr = tokio::select! {
            _ = cancel.cancelled() => return,
            rr = ans_rx.recv() => match rr {
                Some(rr) => rr,
                None => return,
            },
        };

        tokio::select! {
            _ = cancel.cancelled() => return,
            res = ch_tx.send(rr) => {
                if res.is_err() {
                    return;
                }
            }
        }

        if !continuous {
            // First answer completes a one-off query.
            cancel.cancel();
            return;
        }
    }
}
