
use std::collections::HashMap;
use std::net::IpAddr;

use crate::error::Result;
use crate::message::name::canonicalize;
use crate::message::{RData, Record};
use crate::responder::{default_responder, Responder};

// DNS-SD record sets are long-lived; an hour matches common responders.
const SERVICE_TTL: u32 = 3600;

// RFC 6763 section 6.4 recommends, but does not require, short keys.
const RECOMMENDED_KEY_LEN: usize = 9;

impl Responder {
    /// Advertises a service instance: an address record, an SRV record
    /// pointing at it, a PTR record under the service name, and a TXT
    /// record with the given attributes (`k` for empty values, `k=v`
    /// otherwise).
    ///
    /// # Panics
    ///
    /// The arguments describe this host's own service, so violations are
    /// caller bugs: panics when `name` or `service` is empty, when
    /// `service` is outside `.local.`, when a TXT key is empty, contains
    /// `=` or non-printable-ASCII bytes, or when a serialized `k=v` item
    /// exceeds 255 bytes. Keys longer than 9 bytes are merely warned
    /// about.
    pub fn publish_service(
        &self,
        name: &str,
        service: &str,
        ip: IpAddr,
        port: u16,
        txt: &HashMap<String, Vec<u8>>,
    ) {
        assert!(
            !name.is_empty() && !service.is_empty(),
            "name and service must be non-empty"
        );
        let service = canonicalize(service);
        assert!(
            service.ends_with(".local."),
            "service must be in the local. domain: {service}"
        );

        let instance_name = format!("{name}.{service}");

        let addr_rr = match ip {
            IpAddr::V4(ip) => Record::new(instance_name.clone(), SERVICE_TTL, RData::A(ip)),
            IpAddr::V6(ip) => Record::new(instance_name.clone(), SERVICE_TTL, RData::Aaaa(ip)),
        };

        let srv_rr = Record::new(
            instance_name.clone(),
            SERVICE_TTL,
            RData::Srv {
                priority: 0,
                weight: 0,
                port,
                target: instance_name.clone(),
            },
        );

        let ptr_rr = Record::new(
            service,
            SERVICE_TTL,
            RData::Ptr(instance_name.clone()),
        );

        let txt_rr = Record::new(instance_name, SERVICE_TTL, RData::Txt(txt_strings(txt)));

        self.publish_record(addr_rr);
        self.publish_record(srv_rr);
        self.publish_record(ptr_rr);
        self.publish_record(txt_rr);
    }
}

// Validates and serializes the TXT attribute map per RFC 6763 section 6.
// Keys are sorted so the record contents are deterministic.
fn txt_strings(txt: &HashMap<String, Vec<u8>>) -> Vec<Vec<u8>> {
    let mut keys: Vec<&String> = txt.keys().collect();
    keys.sort();

    let mut strs = Vec::with_capacity(keys.len());
    for k in keys {
        let v = &txt[k];

        // MUST be at least one character.
        assert!(!k.is_empty(), "empty key not allowed in TXT record");
        // MUST be printable US-ASCII (0x20-0x7E), excluding '=' (0x3D).
        for b in k.bytes() {
            assert!(
                b != b'=' && (0x20..=0x7E).contains(&b),
                "invalid character {b:#04x} in TXT record key {k}"
            );
        }
        // SHOULD be no more than 9 characters.
        if k.len() > RECOMMENDED_KEY_LEN {
            log::warn!("TXT key longer than recommended ({RECOMMENDED_KEY_LEN}): {k}");
        }

        // '=' can be omitted when the value is empty; either way the item
        // MUST fit a character-string.
        let mut item = k.clone().into_bytes();
        if !v.is_empty() {
            item.push(b'=');
            item.extend_from_slice(v);
        }
        assert!(
            item.len() <= 255,
            "key ({k}) + value length > 255 bytes"
        );
        strs.push(item);
    }

    strs
}

/// Advertises a service instance on the process-wide engine. See
/// [`Responder::publish_service`] for the record set and panic conditions;
/// the only error here is failing to bring the engine up.
pub fn publish(
    name: &str,
    service: &str,
    ip: IpAddr,
    port: u16,
    txt: &HashMap<String, Vec<u8>>,
) -> Result<()> {
    default_responder()?.publish_service(name, service, ip, port, txt);
    Ok(())
}
