//! DNS-SD (RFC 6763) on top of the mDNS engine: advertise a service
//! instance as an A/AAAA + SRV + PTR + TXT record set, and browse a service
//! name into resolved [`Service`]s.

mod discover;
mod publish;

use std::net::IpAddr;

pub use discover::{discover, DiscoverOpts, Discovery};
pub use publish::publish;

/// A resolved service instance.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Service {
    /// The full instance name, e.g. `web._http._tcp.local.`.
    pub name: String,
    pub ip: IpAddr,
    pub port: u16,
}
