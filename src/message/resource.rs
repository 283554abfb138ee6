use std::collections::HashMap;
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};

use crate::error::{Error, Result};
use crate::message::name::*;
use crate::message::packer::*;
use crate::message::{DnsClass, DnsType, DNSCLASS_INET};

/// A DNS resource record.
///
/// The record type is carried by the [`RData`] payload; [`Record::rtype`]
/// reports it. TTL is in seconds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Record {
    /// Fully-qualified owner name, e.g. `foo.local.`.
    pub name: String,
    pub class: DnsClass,
    pub ttl: u32,
    pub rdata: RData,
}

/// Type-specific payload of a resource record.
///
/// Types outside the mDNS/DNS-SD working set round-trip as [`RData::Other`]
/// with their raw rdata bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RData {
    A(Ipv4Addr),
    Aaaa(Ipv6Addr),
    Ptr(String),
    Srv {
        priority: u16,
        weight: u16,
        port: u16,
        target: String,
    },
    Txt(Vec<Vec<u8>>),
    Other { rtype: u16, data: Vec<u8> },
}

impl RData {
    /// The 16-bit record type code of this payload.
    pub fn type_code(&self) -> u16 {
        match self {
            RData::A(_) => DnsType::A as u16,
            RData::Aaaa(_) => DnsType::Aaaa as u16,
            RData::Ptr(_) => DnsType::Ptr as u16,
            RData::Srv { .. } => DnsType::Srv as u16,
            RData::Txt(_) => DnsType::Txt as u16,
            RData::Other { rtype, .. } => *rtype,
        }
    }
}

impl Record {
    /// Convenience constructor for an IN-class record.
    pub fn new(name: impl Into<String>, ttl: u32, rdata: RData) -> Self {
        Record {
            name: canonicalize(&name.into()),
            class: DNSCLASS_INET,
            ttl,
            rdata,
        }
    }

    /// The record type, as far as it is known to this crate.
    pub fn rtype(&self) -> DnsType {
        DnsType::from(self.rdata.type_code())
    }

    pub(crate) fn type_code(&self) -> u16 {
        self.rdata.type_code()
    }

    // pack appends the wire format of the record to msg.
    pub(crate) fn pack(
        &self,
        msg: Vec<u8>,
        compression: &mut Option<HashMap<String, usize>>,
        compression_off: usize,
    ) -> Result<Vec<u8>> {
        let mut msg = pack_name(msg, &self.name, compression, compression_off)?;
        msg = pack_uint16(msg, self.type_code());
        msg = self.class.pack(msg);
        msg = pack_uint32(msg, self.ttl);

        // Placeholder length, patched once the rdata is in place.
        let len_off = msg.len();
        msg = pack_uint16(msg, 0);
        let pre_len = msg.len();

        msg = match &self.rdata {
            RData::A(ip) => pack_bytes(msg, &ip.octets()),
            RData::Aaaa(ip) => pack_bytes(msg, &ip.octets()),
            // PTR targets may be compressed (RFC 1035 section 3.3.12).
            RData::Ptr(target) => pack_name(msg, target, compression, compression_off)?,
            RData::Srv {
                priority,
                weight,
                port,
                target,
            } => {
                // The SRV target must not be compressed (RFC 2782).
                let mut msg = pack_uint16(msg, *priority);
                msg = pack_uint16(msg, *weight);
                msg = pack_uint16(msg, *port);
                pack_name(msg, target, &mut None, compression_off)?
            }
            RData::Txt(strs) => {
                let mut msg = msg;
                for s in strs {
                    msg = pack_str(msg, s)?;
                }
                msg
            }
            RData::Other { data, .. } => pack_bytes(msg, data),
        };

        let rd_len = msg.len() - pre_len;
        if rd_len > u16::MAX as usize {
            return Err(Error::ErrResourceLen);
        }
        msg[len_off] = (rd_len >> 8) as u8;
        msg[len_off + 1] = (rd_len & 0xFF) as u8;
        Ok(msg)
    }

    pub(crate) fn unpack(msg: &[u8], off: usize) -> Result<(Record, usize)> {
        let (name, off) = unpack_name(msg, off)?;
        let (rtype, off) = unpack_uint16(msg, off)?;
        let (class, off) = DnsClass::unpack(msg, off)?;
        let (ttl, off) = unpack_uint32(msg, off)?;
        let (rd_len, off) = unpack_uint16(msg, off)?;
        let rd_len = rd_len as usize;
        let rd_end = off
            .checked_add(rd_len)
            .filter(|&e| e <= msg.len())
            .ok_or(Error::ErrResourceLen)?;

        let rdata = match DnsType::from(rtype) {
            DnsType::A => {
                if rd_len != 4 {
                    return Err(Error::ErrResourceLen);
                }
                let (b, _) = unpack_bytes(msg, off, 4)?;
                RData::A(Ipv4Addr::new(b[0], b[1], b[2], b[3]))
            }
            DnsType::Aaaa => {
                if rd_len != 16 {
                    return Err(Error::ErrResourceLen);
                }
                let (b, _) = unpack_bytes(msg, off, 16)?;
                let mut o = [0u8; 16];
                o.copy_from_slice(&b);
                RData::Aaaa(Ipv6Addr::from(o))
            }
            DnsType::Ptr => {
                // Names inside rdata may point back into the whole message.
                let (target, _) = unpack_name(msg, off)?;
                RData::Ptr(target)
            }
            DnsType::Srv => {
                let (priority, o) = unpack_uint16(msg, off)?;
                let (weight, o) = unpack_uint16(msg, o)?;
                let (port, o) = unpack_uint16(msg, o)?;
                let (target, _) = unpack_name(msg, o)?;
                RData::Srv {
                    priority,
                    weight,
                    port,
                    target,
                }
            }
            DnsType::Txt => {
                let mut strs = Vec::new();
                let mut o = off;
                while o < rd_end {
                    let (s, next) = unpack_str(msg, o)?;
                    if next > rd_end {
                        return Err(Error::ErrResourceLen);
                    }
                    strs.push(s);
                    o = next;
                }
                RData::Txt(strs)
            }
            _ => {
                let (data, _) = unpack_bytes(msg, off, rd_len)?;
                RData::Other { rtype, data }
            }
        };

        let record = Record {
            name,
            class,
            ttl,
            rdata,
        };
        Ok((record, rd_end))
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\t{}\t{}\t", self.name, self.ttl, self.rtype())?;
        match &self.rdata {
            RData::A(ip) => write!(f, "{ip}"),
            RData::Aaaa(ip) => write!(f, "{ip}"),
            RData::Ptr(target) => write!(f, "{target}"),
            RData::Srv {
                priority,
                weight,
                port,
                target,
            } => write!(f, "{priority} {weight} {port} {target}"),
            RData::Txt(strs) => {
                let mut first = true;
                for s in strs {
                    if !first {
                        write!(f, " ")?;
                    }
                    first = false;
                    write!(f, "\"{}\"", String::from_utf8_lossy(s))?;
                }
                Ok(())
            }
            RData::Other { data, .. } => write!(f, "\\# {}", data.len()),
        }
    }
}
