//! Multicast UDP plumbing for mDNS.
//!
//! [`MulticastSocket`] builds a properly configured `std::net::UdpSocket`
//! (reuse-addr, reuse-port, non-blocking, multicast TTL 255, one group join
//! per discovered interface). [`MulticastConn`] wraps it in a tokio socket
//! and implements [`Transport`], the seam between the engine and the
//! network.

use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket};

use async_trait::async_trait;
use socket2::{Domain, Protocol, Socket, Type};

use crate::error::Result;

/// The mDNS UDP port (RFC 6762 section 2).
pub const MDNS_PORT: u16 = 5353;

/// The IPv4 mDNS multicast group.
pub const MDNS_GROUP_V4: Ipv4Addr = Ipv4Addr::new(224, 0, 0, 251);

/// The IPv6 mDNS multicast group.
pub const MDNS_GROUP_V6: Ipv6Addr = Ipv6Addr::new(0xFF02, 0, 0, 0, 0, 0, 0, 0xFB);

/// Incoming datagrams are read into buffers of this size; mDNS packets are
/// required to fit the link MTU (RFC 6762 section 17).
pub const MAX_PACKET_SIZE: usize = 1500;

/// Address family a transport operates on.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SocketFamily {
    V4,
    V6,
}

impl SocketFamily {
    /// The multicast destination `<group>:5353` for this family.
    pub fn group_addr(self) -> SocketAddr {
        match self {
            SocketFamily::V4 => SocketAddr::new(IpAddr::V4(MDNS_GROUP_V4), MDNS_PORT),
            SocketFamily::V6 => SocketAddr::new(IpAddr::V6(MDNS_GROUP_V6), MDNS_PORT),
        }
    }

    fn wildcard(self) -> IpAddr {
        match self {
            SocketFamily::V4 => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            SocketFamily::V6 => IpAddr::V6(Ipv6Addr::UNSPECIFIED),
        }
    }
}

/// A builder for mDNS multicast sockets.
///
/// The resulting socket is bound to the wildcard address on port 5353 with
/// `SO_REUSEADDR` (and `SO_REUSEPORT` where available) so it can coexist
/// with other mDNS responders on the host, and is joined to the mDNS group
/// on every interface the host advertises an address on. Per-interface join
/// failures are logged and skipped.
#[derive(Debug, Clone)]
pub struct MulticastSocket {
    family: SocketFamily,
    port: u16,
}

impl MulticastSocket {
    pub fn new(family: SocketFamily) -> Self {
        Self {
            family,
            port: MDNS_PORT,
        }
    }

    /// Overrides the bind port (useful for tests; mDNS proper is 5353).
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Builds the configured `std::net::UdpSocket`.
    pub fn into_std(self) -> io::Result<UdpSocket> {
        let domain = match self.family {
            SocketFamily::V4 => Domain::IPV4,
            SocketFamily::V6 => Domain::IPV6,
        };
        let socket = Socket::new(domain, Type::DGRAM, Some(Protocol::UDP))?;

        socket.set_reuse_address(true)?;
        #[cfg(all(unix, not(target_os = "solaris"), not(target_os = "illumos")))]
        socket.set_reuse_port(true)?;

        // Non-blocking for tokio.
        socket.set_nonblocking(true)?;

        match self.family {
            SocketFamily::V4 => {
                // Outgoing TTL 255 per RFC 6762 section 11.
                socket.set_multicast_ttl_v4(255)?;
                socket.set_multicast_loop_v4(true)?;
            }
            SocketFamily::V6 => {
                socket.set_only_v6(true)?;
                socket.set_multicast_hops_v6(255)?;
                socket.set_multicast_loop_v6(true)?;
            }
        }

        let bind_addr = SocketAddr::new(self.family.wildcard(), self.port);
        socket.bind(&bind_addr.into())?;

        self.join_groups(&socket);

        Ok(socket.into())
    }

    // Joins the mDNS group on every enumerable interface, falling back to
    // the unspecified interface when none joined.
    fn join_groups(&self, socket: &Socket) {
        let ifaces = match if_addrs::get_if_addrs() {
            Ok(ifaces) => ifaces,
            Err(e) => {
                log::warn!("unable to enumerate interfaces: {e}");
                Vec::new()
            }
        };

        let mut joined = 0;
        for iface in &ifaces {
            let res = match (self.family, iface.ip()) {
                (SocketFamily::V4, IpAddr::V4(ip)) => {
                    socket.join_multicast_v4(&MDNS_GROUP_V4, &ip)
                }
                (SocketFamily::V6, IpAddr::V6(_)) => {
                    socket.join_multicast_v6(&MDNS_GROUP_V6, iface.index.unwrap_or(0))
                }
                _ => continue,
            };
            match res {
                Ok(()) => joined += 1,
                Err(e) => {
                    log::warn!("unable to join mDNS group on {}: {e}", iface.name);
                }
            }
        }

        if joined == 0 {
            let res = match self.family {
                SocketFamily::V4 => {
                    socket.join_multicast_v4(&MDNS_GROUP_V4, &Ipv4Addr::UNSPECIFIED)
                }
                SocketFamily::V6 => socket.join_multicast_v6(&MDNS_GROUP_V6, 0),
            };
            if let Err(e) = res {
                log::warn!("unable to join mDNS group on default interface: {e}");
            }
        }
    }
}

/// The engine's view of the network: a shared send path and a single
/// receive path. [`MulticastConn`] is the real implementation; tests drive
/// the engine through an in-memory one.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Receives one datagram into buf.
    async fn recv(&self, buf: &mut [u8]) -> Result<(usize, SocketAddr)>;

    /// Sends a datagram to a specific peer.
    async fn send_to(&self, buf: &[u8], peer: SocketAddr) -> Result<()>;

    /// Sends a datagram to the mDNS group.
    async fn send_multicast(&self, buf: &[u8]) -> Result<()>;
}

/// A bound, group-joined mDNS socket.
pub struct MulticastConn {
    io: tokio::net::UdpSocket,
    group: SocketAddr,
}

impl MulticastConn {
    /// Binds port 5353 for the given family and joins the mDNS group.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(family: SocketFamily) -> Result<Self> {
        let std_socket = MulticastSocket::new(family).into_std()?;
        Ok(Self {
            io: tokio::net::UdpSocket::from_std(std_socket)?,
            group: family.group_addr(),
        })
    }
}

#[async_trait]
impl Transport for MulticastConn {
    async fn recv(&self, buf: &mut [u8]) -> Result<(usize, SocketAddr)> {
        let (n, peer) = self.io.recv_from(buf).await?;
        Ok((n, peer))
    }

    async fn send_to(&self, buf: &[u8], peer: SocketAddr) -> Result<()> {
        self.io.send_to(buf, peer).await?;
        Ok(())
    }

    async fn send_multicast(&self, buf: &[u8]) -> Result<()> {
        self.io.send_to(buf, self.group).await?;
        Ok(())
    }
}
