//! # dnssd
//!
//! A multicast DNS (mDNS, RFC 6762) responder and client with a DNS
//! Service Discovery (DNS-SD, RFC 6763) layer on top.
//!
//! The crate lets a host publish resource records under the `.local.`
//! pseudo-TLD, answer multicast questions from peers on the link, and run
//! one-shot, retrying or continuous queries for records and for named
//! services.
//!
//! ## Publishing and querying records
//!
//! ```rust,no_run
//! use dnssd::{DnsType, QueryOpts};
//!
//! #[tokio::main]
//! async fn main() -> dnssd::Result<()> {
//!     // Answer A questions for foo.local. from now on.
//!     dnssd::publish_from_text("foo.local. 3600 A 10.10.10.10")?;
//!
//!     // Resolve a peer's record, retrying twice at one second apart.
//!     let q = dnssd::query_with(
//!         "printer.local.",
//!         DnsType::A,
//!         QueryOpts { retries: 2, ..Default::default() },
//!     )?;
//!     if let Some(rr) = q.one_shot().await {
//!         println!("{rr}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Service discovery
//!
//! ```rust,no_run
//! use dnssd::sd;
//!
//! #[tokio::main]
//! async fn main() -> dnssd::Result<()> {
//!     let mut browse = sd::discover("_http._tcp.local.", Default::default())?;
//!     while let Some(service) = browse.recv().await {
//!         println!("{} at {}:{}", service.name, service.ip, service.port);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Scope
//!
//! Queries multicast to 224.0.0.251:5353 with one question per message and
//! responses are authoritative answers from the local zone, per RFC 6762.
//! Probing and conflict resolution for unique names, known-answer
//! suppression, the 0-500 ms response jitter, truncation handling and
//! unicast (QU) responses are not implemented.

#![warn(rust_2018_idioms)]
#![allow(dead_code)]

pub mod error;
pub mod message;
pub(crate) mod cache;
pub(crate) mod query;
pub(crate) mod responder;
pub mod sd;
pub mod socket;
pub(crate) mod zone;

#[cfg(test)]
pub(crate) mod testutil;

pub use error::{Error, Result};
pub use message::{DnsClass, DnsType, Message, Question, RData, Record, DNSCLASS_INET};
pub use query::{Query, QueryOpts};
pub use responder::Responder;
pub use socket::{MulticastConn, MulticastSocket, SocketFamily, Transport};

use responder::default_responder;

/// Hands a record to the process-wide engine's authoritative zone.
///
/// # Panics
///
/// Panics if the owner name does not end in `.local.`.
pub fn publish_record(rr: Record) -> Result<()> {
    default_responder()?.publish_record(rr);
    Ok(())
}

/// Parses a zone-file-style line (`foo.local. 3600 A 10.10.10.10`) and
/// publishes it on the process-wide engine. A malformed line is logged and
/// skipped.
pub fn publish_from_text(line: &str) -> Result<()> {
    default_responder()?.publish_from_text(line);
    Ok(())
}

/// Starts a continuous, unbounded query for every record under `name` on
/// the process-wide engine.
pub fn query(name: &str) -> Result<Query> {
    Ok(default_responder()?.query(name))
}

/// Starts a query on the process-wide engine with explicit type and
/// options.
pub fn query_with(name: &str, qtype: DnsType, opts: QueryOpts) -> Result<Query> {
    Ok(default_responder()?.query_with(name, qtype, opts))
}
