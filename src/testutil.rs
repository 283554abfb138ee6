// In-memory stand-in for the multicast link: every member's multicast send
// is delivered to every member, including the sender (multicast loopback is
// enabled on the real socket too).

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::{Error, Result};
use crate::message::Message;
use crate::socket::Transport;

type Datagram = (Vec<u8>, SocketAddr);

pub(crate) struct Hub {
    members: Mutex<Vec<mpsc::UnboundedSender<Datagram>>>,
}

impl Hub {
    pub(crate) fn new() -> Arc<Hub> {
        Arc::new(Hub {
            members: Mutex::new(Vec::new()),
        })
    }

    // transport joins the hub as a new member with the given source
    // address.
    pub(crate) fn transport(self: &Arc<Self>, addr: &str) -> Arc<HubTransport> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.members.lock().unwrap().push(tx);
        Arc::new(HubTransport {
            hub: self.clone(),
            addr: addr.parse().expect("test address"),
            rx: tokio::sync::Mutex::new(rx),
            sent: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn broadcast(&self, buf: &[u8], from: SocketAddr) {
        for member in self.members.lock().unwrap().iter() {
            let _ = member.send((buf.to_vec(), from));
        }
    }
}

pub(crate) struct HubTransport {
    hub: Arc<Hub>,
    addr: SocketAddr,
    rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<Datagram>>,
    // Every multicast datagram this member sent, in order.
    pub(crate) sent: Mutex<Vec<Vec<u8>>>,
}

impl HubTransport {
    pub(crate) fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    // inject puts a datagram on the link as if this member had sent it,
    // without recording it as sent.
    pub(crate) fn inject(&self, buf: &[u8]) {
        self.hub.broadcast(buf, self.addr);
    }
}

// next_from waits up to five (paused-clock) seconds for the next multicast
// message a specific member put on the link, as seen by peer.
pub(crate) async fn next_from(peer: &HubTransport, from: &str) -> Option<Message> {
    let from: SocketAddr = from.parse().expect("test address");
    let mut buf = vec![0u8; 1500];
    let fut = async {
        loop {
            let (n, src) = peer.recv(&mut buf).await.ok()?;
            if src == from {
                return Message::unpack(&buf[..n]).ok();
            }
        }
    };
    tokio::time::timeout(Duration::from_secs(5), fut)
        .await
        .ok()
        .flatten()
}

#[async_trait]
impl Transport for HubTransport {
    async fn recv(&self, buf: &mut [u8]) -> Result<(usize, SocketAddr)> {
        let mut rx = self.rx.lock().await;
        let (data, from) = rx.recv().await.ok_or(Error::ErrTransportClosed)?;
        let n = data.len().min(buf.len());
        buf[..n].copy_from_slice(&data[..n]);
        Ok((n, from))
    }

    async fn send_to(&self, buf: &[u8], _peer: SocketAddr) -> Result<()> {
        self.hub.broadcast(buf, self.addr);
        Ok(())
    }

    async fn send_multicast(&self, buf: &[u8]) -> Result<()> {
        self.sent.lock().unwrap().push(buf.to_vec());
        self.hub.broadcast(buf, self.addr);
        Ok(())
    }
}
