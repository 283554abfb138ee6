//! DNS message wire format, restricted to the subset used by mDNS (RFC
//! 6762) and DNS-SD (RFC 6763): A, AAAA, PTR, SRV and TXT records over
//! RFC 1035 framing with name compression. Anything else round-trips as an
//! opaque [`RData::Other`].

#[cfg(test)]
mod message_test;

pub(crate) mod name;
mod packer;
pub(crate) mod question;
pub(crate) mod resource;
pub(crate) mod zonefile;

use std::collections::HashMap;
use std::fmt;

use packer::*;

use crate::error::{Error, Result};

pub use question::Question;
pub use resource::{RData, Record};

// A DnsType is a type of DNS request and response.
#[derive(Default, Copy, Clone, Debug, PartialEq, Eq)]
pub enum DnsType {
    A = 1,
    Ns = 2,
    Cname = 5,
    Soa = 6,
    Ptr = 12,
    Mx = 15,
    Txt = 16,
    Aaaa = 28,
    Srv = 33,
    Opt = 41,
    Any = 255,

    #[default]
    Unsupported = 0,
}

impl From<u16> for DnsType {
    fn from(v: u16) -> Self {
        match v {
            1 => DnsType::A,
            2 => DnsType::Ns,
            5 => DnsType::Cname,
            6 => DnsType::Soa,
            12 => DnsType::Ptr,
            15 => DnsType::Mx,
            16 => DnsType::Txt,
            28 => DnsType::Aaaa,
            33 => DnsType::Srv,
            41 => DnsType::Opt,
            255 => DnsType::Any,
            _ => DnsType::Unsupported,
        }
    }
}

impl fmt::Display for DnsType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            DnsType::A => "A",
            DnsType::Ns => "NS",
            DnsType::Cname => "CNAME",
            DnsType::Soa => "SOA",
            DnsType::Ptr => "PTR",
            DnsType::Mx => "MX",
            DnsType::Txt => "TXT",
            DnsType::Aaaa => "AAAA",
            DnsType::Srv => "SRV",
            DnsType::Opt => "OPT",
            DnsType::Any => "ANY",
            DnsType::Unsupported => "Unsupported",
        };
        write!(f, "{s}")
    }
}

impl DnsType {
    // pack appends the wire format of the type to msg.
    pub(crate) fn pack(&self, msg: Vec<u8>) -> Vec<u8> {
        pack_uint16(msg, *self as u16)
    }

    pub(crate) fn unpack(msg: &[u8], off: usize) -> Result<(DnsType, usize)> {
        let (t, o) = unpack_uint16(msg, off)?;
        Ok((DnsType::from(t), o))
    }
}

/// DNS class of a question or resource record. In this crate it is always
/// [`DNSCLASS_INET`]; other values are carried through untouched.
#[derive(Default, Copy, Clone, Debug, PartialEq, Eq)]
pub struct DnsClass(pub u16);

/// Internet class (IN).
pub const DNSCLASS_INET: DnsClass = DnsClass(1);

/// Any class (*) - only valid in questions.
pub const DNSCLASS_ANY: DnsClass = DnsClass(255);

impl fmt::Display for DnsClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let other = format!("CLASS{}", self.0);
        let s = match *self {
            DNSCLASS_INET => "IN",
            DNSCLASS_ANY => "ANY",
            _ => other.as_str(),
        };
        write!(f, "{s}")
    }
}

impl DnsClass {
    // pack appends the wire format of the class to msg.
    pub(crate) fn pack(&self, msg: Vec<u8>) -> Vec<u8> {
        pack_uint16(msg, self.0)
    }

    pub(crate) fn unpack(msg: &[u8], off: usize) -> Result<(DnsClass, usize)> {
        let (c, o) = unpack_uint16(msg, off)?;
        Ok((DnsClass(c), o))
    }
}

/// The QUERY opcode; all other opcodes are dropped by the responder.
pub const OPCODE_QUERY: u8 = 0;

const HEADER_BIT_QR: u16 = 1 << 15; // query/response (response=1)
const HEADER_BIT_AA: u16 = 1 << 10; // authoritative
const HEADER_BIT_TC: u16 = 1 << 9; // truncated
const HEADER_BIT_RD: u16 = 1 << 8; // recursion desired
const HEADER_BIT_RA: u16 = 1 << 7; // recursion available

/// Parsed DNS message header.
#[derive(Clone, Default, Debug, PartialEq, Eq)]
pub struct Header {
    pub id: u16,
    pub response: bool,
    pub op_code: u8,
    pub authoritative: bool,
    pub truncated: bool,
    pub recursion_desired: bool,
    pub recursion_available: bool,
    pub rcode: u8,
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "id={} qr={} opcode={} aa={} rcode={}",
            self.id, self.response, self.op_code, self.authoritative, self.rcode
        )
    }
}

impl Header {
    fn bits(&self) -> u16 {
        let mut bits = (((self.op_code as u16) & 0xF) << 11) | ((self.rcode as u16) & 0xF);
        if self.response {
            bits |= HEADER_BIT_QR;
        }
        if self.authoritative {
            bits |= HEADER_BIT_AA;
        }
        if self.truncated {
            bits |= HEADER_BIT_TC;
        }
        if self.recursion_desired {
            bits |= HEADER_BIT_RD;
        }
        if self.recursion_available {
            bits |= HEADER_BIT_RA;
        }
        bits
    }

    fn from_bits(id: u16, bits: u16) -> Header {
        Header {
            id,
            response: bits & HEADER_BIT_QR != 0,
            op_code: ((bits >> 11) & 0xF) as u8,
            authoritative: bits & HEADER_BIT_AA != 0,
            truncated: bits & HEADER_BIT_TC != 0,
            recursion_desired: bits & HEADER_BIT_RD != 0,
            recursion_available: bits & HEADER_BIT_RA != 0,
            rcode: (bits & 0xF) as u8,
        }
    }
}

// Most mDNS messages fit well under the 1500 byte transport limit; the
// starting capacity just avoids the first few reallocations.
const PACK_STARTING_CAP: usize = 512;

/// A DNS message.
#[derive(Clone, Default, Debug, PartialEq, Eq)]
pub struct Message {
    pub header: Header,
    pub questions: Vec<Question>,
    pub answers: Vec<Record>,
    pub authorities: Vec<Record>,
    pub additionals: Vec<Record>,
}

impl Message {
    /// Parses a full message from its wire format.
    pub fn unpack(msg: &[u8]) -> Result<Message> {
        let (id, off) = unpack_uint16(msg, 0)?;
        let (bits, off) = unpack_uint16(msg, off)?;
        let (qd_count, off) = unpack_uint16(msg, off)?;
        let (an_count, off) = unpack_uint16(msg, off)?;
        let (ns_count, off) = unpack_uint16(msg, off)?;
        let (ar_count, mut off) = unpack_uint16(msg, off)?;

        let mut m = Message {
            header: Header::from_bits(id, bits),
            ..Default::default()
        };

        for _ in 0..qd_count {
            let (q, o) = Question::unpack(msg, off)?;
            m.questions.push(q);
            off = o;
        }
        for _ in 0..an_count {
            let (rr, o) = Record::unpack(msg, off)?;
            m.answers.push(rr);
            off = o;
        }
        for _ in 0..ns_count {
            let (rr, o) = Record::unpack(msg, off)?;
            m.authorities.push(rr);
            off = o;
        }
        for _ in 0..ar_count {
            let (rr, o) = Record::unpack(msg, off)?;
            m.additionals.push(rr);
            off = o;
        }

        Ok(m)
    }

    /// Packs the full message into its wire format.
    pub fn pack(&self) -> Result<Vec<u8>> {
        if self.questions.len() > u16::MAX as usize {
            return Err(Error::ErrTooManyQuestions);
        }
        if self.answers.len() > u16::MAX as usize {
            return Err(Error::ErrTooManyAnswers);
        }
        if self.authorities.len() > u16::MAX as usize {
            return Err(Error::ErrTooManyAuthorities);
        }
        if self.additionals.len() > u16::MAX as usize {
            return Err(Error::ErrTooManyAdditionals);
        }

        let mut msg = Vec::with_capacity(PACK_STARTING_CAP);
        msg = pack_uint16(msg, self.header.id);
        msg = pack_uint16(msg, self.header.bits());
        msg = pack_uint16(msg, self.questions.len() as u16);
        msg = pack_uint16(msg, self.answers.len() as u16);
        msg = pack_uint16(msg, self.authorities.len() as u16);
        msg = pack_uint16(msg, self.additionals.len() as u16);

        // RFC 1035 allows compression for packing; unpacking implementations
        // are required to support it, so it is unconditionally enabled.
        let mut compression = Some(HashMap::new());

        for question in &self.questions {
            msg = question.pack(msg, &mut compression, 0)?;
        }
        for answer in &self.answers {
            msg = answer.pack(msg, &mut compression, 0)?;
        }
        for authority in &self.authorities {
            msg = authority.pack(msg, &mut compression, 0)?;
        }
        for additional in &self.additionals {
            msg = additional.pack(msg, &mut compression, 0)?;
        }

        Ok(msg)
    }
}
