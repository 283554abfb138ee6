use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use super::*;
use crate::message::{Header, Message};
use crate::testutil::Hub;

const BROWSER_ADDR: &str = "192.0.2.1:5353";
const PUBLISHER_ADDR: &str = "192.0.2.7:5353";

const SERVICE: &str = "_http._tcp.local.";
const INSTANCE: &str = "x._http._tcp.local.";

fn response(answers: Vec<Record>) -> Vec<u8> {
    Message {
        header: Header {
            response: true,
            authoritative: true,
            ..Default::default()
        },
        answers,
        ..Default::default()
    }
    .pack()
    .unwrap()
}

fn instance_records() -> Vec<Record> {
    vec![
        Record::new(SERVICE, 120, RData::Ptr(INSTANCE.to_owned())),
        Record::new(
            INSTANCE,
            120,
            RData::Srv {
                priority: 0,
                weight: 0,
                port: 8080,
                target: INSTANCE.to_owned(),
            },
        ),
        Record::new(INSTANCE, 120, RData::Txt(vec![b"path=/".to_vec()])),
        Record::new(INSTANCE, 120, RData::A(Ipv4Addr::new(192, 0, 2, 7))),
    ]
}

async fn recv_timeout(d: &mut Discovery, secs: u64) -> Option<Service> {
    tokio::time::timeout(Duration::from_secs(secs), d.recv())
        .await
        .ok()
        .flatten()
}

#[tokio::test(start_paused = true)]
async fn test_publish_then_discover_end_to_end() {
    let hub = Hub::new();
    let browser = Responder::with_transport(hub.transport(BROWSER_ADDR));
    let publisher = Responder::with_transport(hub.transport(PUBLISHER_ADDR));

    let mut txt = HashMap::new();
    txt.insert("path".to_owned(), b"/".to_vec());
    publisher.publish_service(
        "x",
        SERVICE,
        IpAddr::V4(Ipv4Addr::new(192, 0, 2, 7)),
        8080,
        &txt,
    );

    let mut d = browser.discover(SERVICE, DiscoverOpts::default());

    let service = recv_timeout(&mut d, 30).await.expect("a resolved service");
    assert_eq!(
        service,
        Service {
            name: INSTANCE.to_owned(),
            ip: IpAddr::V4(Ipv4Addr::new(192, 0, 2, 7)),
            port: 8080,
        }
    );
}

#[tokio::test(start_paused = true)]
async fn test_discover_from_unsolicited_announcement() {
    let hub = Hub::new();
    let browser = Responder::with_transport(hub.transport(BROWSER_ADDR));
    let peer = hub.transport(PUBLISHER_ADDR);

    // A full announcement primes the cache before anyone asks.
    peer.inject(&response(instance_records()));
    tokio::time::sleep(Duration::from_millis(10)).await;

    let mut d = browser.discover(SERVICE, DiscoverOpts::default());
    let service = recv_timeout(&mut d, 30).await.expect("a resolved service");
    assert_eq!(service.name, INSTANCE);
    assert_eq!(service.port, 8080);
}

#[tokio::test(start_paused = true)]
async fn test_retransmission_without_dedup_reports_twice() {
    let hub = Hub::new();
    let browser = Responder::with_transport(hub.transport(BROWSER_ADDR));
    let peer = hub.transport(PUBLISHER_ADDR);

    peer.inject(&response(instance_records()));
    tokio::time::sleep(Duration::from_millis(10)).await;

    let mut d = browser.discover(SERVICE, DiscoverOpts::default());
    let first = recv_timeout(&mut d, 30).await.expect("first report");

    // The peer retransmits its announcement.
    peer.inject(&response(instance_records()));
    let second = recv_timeout(&mut d, 30).await.expect("second report");
    assert_eq!(first, second);
}

#[tokio::test(start_paused = true)]
async fn test_retransmission_with_dedup_reports_once() {
    let hub = Hub::new();
    let browser = Responder::with_transport(hub.transport(BROWSER_ADDR));
    let peer = hub.transport(PUBLISHER_ADDR);

    peer.inject(&response(instance_records()));
    tokio::time::sleep(Duration::from_millis(10)).await;

    let mut d = browser.discover(
        SERVICE,
        DiscoverOpts {
            dedup: true,
            ..Default::default()
        },
    );
    recv_timeout(&mut d, 30).await.expect("first report");

    peer.inject(&response(instance_records()));
    assert_eq!(recv_timeout(&mut d, 30).await, None);
}

#[tokio::test(start_paused = true)]
async fn test_instance_without_address_is_dropped() {
    let hub = Hub::new();
    let browser = Responder::with_transport(hub.transport(BROWSER_ADDR));
    let peer = hub.transport(PUBLISHER_ADDR);

    // PTR, SRV and TXT but no address record anywhere.
    let mut records = instance_records();
    records.retain(|rr| rr.rtype() != DnsType::A);
    peer.inject(&response(records));
    tokio::time::sleep(Duration::from_millis(10)).await;

    let mut d = browser.discover(SERVICE, DiscoverOpts::default());
    // The address queries run out of retries and nothing is reported.
    assert_eq!(recv_timeout(&mut d, 60).await, None);
}

#[tokio::test(start_paused = true)]
async fn test_incomplete_advertisement_is_dropped() {
    let hub = Hub::new();
    let browser = Responder::with_transport(hub.transport(BROWSER_ADDR));
    let peer = hub.transport(PUBLISHER_ADDR);

    // SRV but never a TXT: instance resolution must give up quietly.
    let mut records = instance_records();
    records.retain(|rr| rr.rtype() != DnsType::Txt);
    peer.inject(&response(records));
    tokio::time::sleep(Duration::from_millis(10)).await;

    let mut d = browser.discover(SERVICE, DiscoverOpts::default());
    assert_eq!(recv_timeout(&mut d, 60).await, None);
}

#[tokio::test(start_paused = true)]
async fn test_done_cancels_inflight_address_resolution() {
    let hub = Hub::new();
    let transport = hub.transport(BROWSER_ADDR);
    let browser = Responder::with_transport(transport.clone());
    let peer = hub.transport(PUBLISHER_ADDR);

    // PTR, SRV and TXT but no address record: resolution parks in the
    // address stage, retrying its A and AAAA queries.
    let mut records = instance_records();
    records.retain(|rr| rr.rtype() != DnsType::A);
    peer.inject(&response(records));
    tokio::time::sleep(Duration::from_millis(10)).await;

    let d = browser.discover(SERVICE, DiscoverOpts::default());

    // Mid-way through the first retry interval both address queries are
    // outstanding under the SRV target.
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(browser.outstanding_queries(INSTANCE), 2);

    d.done();
    tokio::time::sleep(Duration::from_millis(10)).await;

    // Both queries deregister promptly instead of running out their
    // retries, and the wire goes quiet.
    assert_eq!(browser.outstanding_queries(INSTANCE), 0);
    let sent = transport.sent_count();
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(transport.sent_count(), sent);
}

#[tokio::test(start_paused = true)]
async fn test_done_ends_stream() {
    let hub = Hub::new();
    let browser = Responder::with_transport(hub.transport(BROWSER_ADDR));

    let mut d = browser.discover(SERVICE, DiscoverOpts::default());
    d.done();
    assert_eq!(d.recv().await, None);
}

#[tokio::test(start_paused = true)]
async fn test_non_ptr_record_ignored_by_browse() {
    let hub = Hub::new();
    let browser = Responder::with_transport(hub.transport(BROWSER_ADDR));
    let peer = hub.transport(PUBLISHER_ADDR);

    let mut d = browser.discover(SERVICE, DiscoverOpts::default());
    tokio::time::sleep(Duration::from_millis(10)).await;

    // A stray TXT under the service name must not spawn a resolver.
    peer.inject(&response(vec![Record::new(
        SERVICE,
        120,
        RData::Txt(vec![b"junk".to_vec()]),
    )]));
    assert_eq!(recv_timeout(&mut d, 10).await, None);
}
