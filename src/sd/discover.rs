#[cfg(test)]
mod discover_test;

use std::collections::HashSet;
use std::net::IpAddr;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::message::name::canonicalize;
use crate::message::{DnsType, RData, Record};
use crate::query::QueryOpts;
use crate::responder::{default_responder, Responder};
use crate::sd::Service;

const DEFAULT_SCAN_INTERVAL: Duration = Duration::from_secs(60);

// Instance and address resolution race real responders on the link, so be
// aggressive: quick retries, but give up after a handful.
const RESOLVE_RETRIES: i32 = 5;
const RESOLVE_INTERVAL: Duration = Duration::from_secs(1);

/// Options for [`discover`].
#[derive(Clone, Copy, Debug)]
pub struct DiscoverOpts {
    /// Drop a service that was already reported with the same name,
    /// address and port.
    pub dedup: bool,

    /// How often the service name is re-browsed. Zero means the default
    /// (60 seconds).
    pub scan_interval: Duration,
}

impl Default for DiscoverOpts {
    fn default() -> Self {
        Self {
            dedup: false,
            scan_interval: DEFAULT_SCAN_INTERVAL,
        }
    }
}

/// A handle to an ongoing service discovery.
///
/// Resolved services stream in via [`recv`](Discovery::recv) until the
/// handle is dropped or [`done`](Discovery::done) is called.
pub struct Discovery {
    rx: mpsc::Receiver<Service>,
    cancel: CancellationToken,
}

impl Discovery {
    /// The next resolved service, or `None` when discovery has ended.
    pub async fn recv(&mut self) -> Option<Service> {
        self.rx.recv().await
    }

    /// Stops the discovery and every resolution it spawned. Idempotent.
    pub fn done(&self) {
        self.cancel.cancel();
    }
}

impl Drop for Discovery {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl Responder {
    /// Browses for instances of `service` (e.g. `_http._tcp.local.`) and
    /// resolves each to a [`Service`].
    pub fn discover(&self, service: &str, opts: DiscoverOpts) -> Discovery {
        let service = canonicalize(service);
        let cancel = CancellationToken::new();
        let (ch_tx, ch_rx) = mpsc::channel(1);
        let (ans_tx, ans_rx) = mpsc::channel(1);

        tokio::spawn(run_browse(
            self.clone(),
            service,
            opts,
            cancel.clone(),
            ans_tx,
        ));
        tokio::spawn(run_dedup(opts, cancel.clone(), ans_rx, ch_tx));

        Discovery { rx: ch_rx, cancel }
    }
}

/// Browses for `service` on the process-wide engine; see
/// [`Responder::discover`].
pub fn discover(service: &str, opts: DiscoverOpts) -> Result<Discovery> {
    Ok(default_responder()?.discover(service, opts))
}

// Forwards resolved services to the caller, optionally dropping ones seen
// before.
async fn run_dedup(
    opts: DiscoverOpts,
    cancel: CancellationToken,
    mut ans_rx: mpsc::Receiver<Service>,
    ch_tx: mpsc::Sender<Service>,
) {
    let mut seen = HashSet::new();

    loop {
        let service = tokio::select! {
            _ = cancel.cancelled() => return,
            s = ans_rx.recv() => match s {
                Some(s) => s,
                None => return,
            },
        };

        if opts.dedup && !seen.insert(service.clone()) {
            continue;
        }

        tokio::select! {
            _ = cancel.cancelled() => return,
            res = ch_tx.send(service) => {
                if res.is_err() {
                    return;
                }
            }
        }
    }
}

// The browse stage: a continuous PTR query over the service name, spawning
// one resolver per discovered instance.
async fn run_browse(
    engine: Responder,
    service: String,
    opts: DiscoverOpts,
    cancel: CancellationToken,
    ans_tx: mpsc::Sender<Service>,
) {
    let scan_interval = if opts.scan_interval.is_zero() {
        DEFAULT_SCAN_INTERVAL
    } else {
        opts.scan_interval
    };

    let mut ptr_q = engine.query_with(
        &service,
        DnsType::Ptr,
        QueryOpts {
            continuous: true,
            retries: -1,
            retry_interval: scan_interval,
        },
    );

    loop {
        let rr = tokio::select! {
            _ = cancel.cancelled() => return,
            rr = ptr_q.recv() => match rr {
                Some(rr) => rr,
                None => return,
            },
        };

        let RData::Ptr(instance) = rr.rdata else {
            log::warn!("unexpected record in PTR query: {rr}");
            continue;
        };
        tokio::spawn(resolve_instance(
            engine.clone(),
            instance,
            cancel.clone(),
            ans_tx.clone(),
        ));
    }
}

// The per-instance stages: collect SRV and TXT from an ANY query, then race
// A against AAAA for the SRV target and emit the service with whichever
// address came first.
async fn resolve_instance(
    engine: Responder,
    name: String,
    cancel: CancellationToken,
    ans_tx: mpsc::Sender<Service>,
) {
    // Only a single advertisement is expected per instance name. Ask for
    // everything under it; only SRV and TXT matter for now.
    let mut rr_q = engine.query_with(
        &name,
        DnsType::Any,
        QueryOpts {
            continuous: true,
            retries: RESOLVE_RETRIES,
            retry_interval: RESOLVE_INTERVAL,
        },
    );

    let mut srv = None;
    let mut txt_seen = false;
    while srv.is_none() || !txt_seen {
        let rr = tokio::select! {
            _ = cancel.cancelled() => return,
            rr = rr_q.recv() => match rr {
                Some(rr) => rr,
                // Retries exhausted without a full advertisement.
                None => return,
            },
        };

        match rr.rdata {
            RData::Srv { port, target, .. } => srv = Some((port, target)),
            RData::Txt(_) => txt_seen = true,
            _ => {}
        }
    }
    rr_q.done();
    let Some((port, target)) = srv else { return };

    let Some(ip) = resolve_address(&engine, &target, &cancel).await else {
        if !cancel.is_cancelled() {
            log::warn!("no A or AAAA record after retries: {target}");
        }
        return;
    };

    let service = Service { name, ip, port };
    tokio::select! {
        _ = cancel.cancelled() => {}
        _ = ans_tx.send(service) => {}
    }
}

// Runs A and AAAA queries side by side and takes the first address either
// produces. Both handles stay owned here so the loser of the race, and both
// queries on external cancellation, are cancelled as soon as the race ends.
async fn resolve_address(
    engine: &Responder,
    target: &str,
    cancel: &CancellationToken,
) -> Option<IpAddr> {
    let opts = QueryOpts {
        continuous: false,
        retries: RESOLVE_RETRIES,
        retry_interval: RESOLVE_INTERVAL,
    };
    let mut a_q = engine.query_with(target, DnsType::A, opts);
    let mut aaaa_q = engine.query_with(target, DnsType::Aaaa, opts);

    // Each query yields at most one record; read each at most once.
    let mut a_done = false;
    let mut aaaa_done = false;
    let mut ip = None;
    while ip.is_none() && !(a_done && aaaa_done) {
        tokio::select! {
            _ = cancel.cancelled() => break,
            rr = a_q.recv(), if !a_done => {
                a_done = true;
                if let Some(Record {
                    rdata: RData::A(v4),
                    ..
                }) = rr
                {
                    ip = Some(IpAddr::V4(v4));
                }
            }
            rr = aaaa_q.recv(), if !aaaa_done => {
                aaaa_done = true;
                if let Some(Record {
                    rdata: RData::Aaaa(v6),
                    ..
                }) = rr
                {
                    ip = Some(IpAddr::V6(v6));
                }
            }
        }
    }

    a_q.done();
    aaaa_q.done();
    ip
}
