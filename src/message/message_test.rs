use std::net::{Ipv4Addr, Ipv6Addr};

use super::name::{pack_name, skip_name, unpack_name};
use super::*;
use crate::error::Error;

fn sample_message() -> Message {
    Message {
        header: Header {
            id: 0x1234,
            response: true,
            authoritative: true,
            ..Default::default()
        },
        questions: vec![],
        answers: vec![
            Record::new("foo.local.", 3600, RData::A(Ipv4Addr::new(10, 10, 10, 10))),
            Record::new(
                "foo.local.",
                3600,
                RData::Aaaa("2001:db8::1".parse::<Ipv6Addr>().unwrap()),
            ),
            Record::new(
                "_http._tcp.local.",
                3600,
                RData::Ptr("web._http._tcp.local.".to_owned()),
            ),
            Record::new(
                "web._http._tcp.local.",
                3600,
                RData::Srv {
                    priority: 0,
                    weight: 0,
                    port: 8080,
                    target: "web._http._tcp.local.".to_owned(),
                },
            ),
            Record::new(
                "web._http._tcp.local.",
                3600,
                RData::Txt(vec![b"vers=1".to_vec(), b"path=/".to_vec()]),
            ),
        ],
        authorities: vec![],
        additionals: vec![],
    }
}

#[test]
fn test_message_round_trip() {
    let m = sample_message();
    let packed = m.pack().unwrap();
    let got = Message::unpack(&packed).unwrap();
    assert_eq!(got, m);
}

#[test]
fn test_question_round_trip() {
    let m = Message {
        header: Header::default(),
        questions: vec![Question {
            name: "foo.local.".to_owned(),
            qtype: DnsType::Any,
            qclass: DNSCLASS_INET,
        }],
        ..Default::default()
    };
    let packed = m.pack().unwrap();
    let got = Message::unpack(&packed).unwrap();
    assert_eq!(got.questions, m.questions);
    assert!(!got.header.response);
}

#[test]
fn test_header_flags_round_trip() {
    let m = Message {
        header: Header {
            id: 7,
            response: true,
            op_code: 2,
            authoritative: true,
            truncated: true,
            recursion_desired: true,
            recursion_available: true,
            rcode: 3,
        },
        ..Default::default()
    };
    let got = Message::unpack(&m.pack().unwrap()).unwrap();
    assert_eq!(got.header, m.header);
}

#[test]
fn test_compression_shrinks_repeated_names() {
    let mut m = Message::default();
    for _ in 0..4 {
        m.answers.push(Record::new(
            "a-rather-long-name.example.local.",
            120,
            RData::A(Ipv4Addr::new(192, 0, 2, 1)),
        ));
    }
    let packed = m.pack().unwrap();
    // Three of the four owner names collapse to 2-byte pointers.
    let uncompressed = 12 + 4 * (34 + 10 + 4);
    assert!(packed.len() < uncompressed);
    let got = Message::unpack(&packed).unwrap();
    assert_eq!(got.answers.len(), 4);
    assert_eq!(got.answers[3].name, "a-rather-long-name.example.local.");
}

#[test]
fn test_unpack_truncated_fails() {
    let packed = sample_message().pack().unwrap();
    for n in [1usize, 11, packed.len() - 1] {
        assert!(Message::unpack(&packed[..n]).is_err());
    }
}

#[test]
fn test_unpack_empty() {
    assert_eq!(Message::unpack(&[]).unwrap_err(), Error::ErrShortBuffer);
}

#[test]
fn test_name_round_trip() {
    let msg = pack_name(Vec::new(), "foo.local.", &mut None, 0).unwrap();
    let (name, off) = unpack_name(&msg, 0).unwrap();
    assert_eq!(name, "foo.local.");
    assert_eq!(off, msg.len());
    assert_eq!(skip_name(&msg, 0).unwrap(), msg.len());
}

#[test]
fn test_name_root() {
    let msg = pack_name(Vec::new(), ".", &mut None, 0).unwrap();
    assert_eq!(msg, vec![0]);
    let (name, _) = unpack_name(&msg, 0).unwrap();
    assert_eq!(name, ".");
}

#[test]
fn test_name_not_fully_qualified() {
    assert_eq!(
        pack_name(Vec::new(), "foo.local", &mut None, 0).unwrap_err(),
        Error::ErrNonCanonicalName
    );
}

#[test]
fn test_name_label_too_long() {
    let name = format!("{}.local.", "x".repeat(64));
    assert_eq!(
        pack_name(Vec::new(), &name, &mut None, 0).unwrap_err(),
        Error::ErrLabelTooLong
    );
}

#[test]
fn test_name_too_long() {
    let name = format!("{}.", "abcdefg.".repeat(40));
    assert_eq!(
        pack_name(Vec::new(), &name, &mut None, 0).unwrap_err(),
        Error::ErrNameTooLong
    );
}

#[test]
fn test_name_pointer_unpack() {
    // "local." at offset 0, then "foo." + pointer to it at offset 7.
    let mut msg = pack_name(Vec::new(), "local.", &mut None, 0).unwrap();
    let ptr_off = msg.len();
    msg.push(3);
    msg.extend_from_slice(b"foo");
    msg.extend_from_slice(&[0xC0, 0x00]);

    let (name, off) = unpack_name(&msg, ptr_off).unwrap();
    assert_eq!(name, "foo.local.");
    assert_eq!(off, msg.len());
}

#[test]
fn test_name_forward_pointer_rejected() {
    // A pointer at offset 0 targeting itself must not loop.
    let msg = [0xC0u8, 0x00];
    assert_eq!(
        unpack_name(&msg, 0).unwrap_err(),
        Error::ErrForwardPointer
    );
}

#[test]
fn test_name_reserved_bits_rejected() {
    let msg = [0x80u8, 0x00];
    assert_eq!(
        unpack_name(&msg, 0).unwrap_err(),
        Error::ErrReservedLabelBits
    );
}

#[test]
fn test_srv_target_not_compressed() {
    // Owner and SRV target are identical; the target must still be packed
    // in full rather than as a pointer to the owner.
    let m = Message {
        answers: vec![Record::new(
            "web._http._tcp.local.",
            3600,
            RData::Srv {
                priority: 0,
                weight: 0,
                port: 80,
                target: "web._http._tcp.local.".to_owned(),
            },
        )],
        ..Default::default()
    };
    let packed = m.pack().unwrap();
    // rdata = 3 u16s + full 22-byte name, not a 2-byte pointer.
    let rd_len = u16::from_be_bytes([packed[packed.len() - 30], packed[packed.len() - 29]]);
    assert_eq!(rd_len, 6 + 22);
    let got = Message::unpack(&packed).unwrap();
    assert_eq!(got, m);
}

#[test]
fn test_txt_multiple_strings_round_trip() {
    let rr = Record::new(
        "t.local.",
        10,
        RData::Txt(vec![b"a".to_vec(), vec![], b"bb".to_vec()]),
    );
    let m = Message {
        answers: vec![rr.clone()],
        ..Default::default()
    };
    let got = Message::unpack(&m.pack().unwrap()).unwrap();
    assert_eq!(got.answers[0], rr);
}

#[test]
fn test_txt_string_too_long() {
    let m = Message {
        answers: vec![Record::new("t.local.", 10, RData::Txt(vec![vec![b'x'; 256]]))],
        ..Default::default()
    };
    assert_eq!(m.pack().unwrap_err(), Error::ErrStringTooLong);
}

#[test]
fn test_unknown_type_round_trips_as_other() {
    let rr = Record {
        name: "x.local.".to_owned(),
        class: DNSCLASS_INET,
        ttl: 5,
        rdata: RData::Other {
            rtype: 99,
            data: vec![1, 2, 3, 4],
        },
    };
    let m = Message {
        answers: vec![rr.clone()],
        ..Default::default()
    };
    let got = Message::unpack(&m.pack().unwrap()).unwrap();
    assert_eq!(got.answers[0], rr);
    assert_eq!(got.answers[0].rtype(), DnsType::Unsupported);
}
