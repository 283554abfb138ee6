use std::collections::HashMap;
use std::fmt;

use crate::error::Result;
use crate::message::name::*;
use crate::message::{DnsClass, DnsType};

/// A DNS question.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Question {
    pub name: String,
    pub qtype: DnsType,
    pub qclass: DnsClass,
}

impl fmt::Display for Question {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.name, self.qclass, self.qtype)
    }
}

impl Question {
    // pack appends the wire format of the question to msg.
    pub(crate) fn pack(
        &self,
        msg: Vec<u8>,
        compression: &mut Option<HashMap<String, usize>>,
        compression_off: usize,
    ) -> Result<Vec<u8>> {
        let mut msg = pack_name(msg, &self.name, compression, compression_off)?;
        msg = self.qtype.pack(msg);
        Ok(self.qclass.pack(msg))
    }

    pub(crate) fn unpack(msg: &[u8], off: usize) -> Result<(Question, usize)> {
        let (name, off) = unpack_name(msg, off)?;
        let (qtype, off) = DnsType::unpack(msg, off)?;
        let (qclass, off) = DnsClass::unpack(msg, off)?;
        Ok((
            Question {
                name,
                qtype,
                qclass,
            },
            off,
        ))
    }
}
