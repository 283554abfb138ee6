//! Master-file-style record lines, the textual form accepted by
//! [`publish_from_text`](crate::publish_from_text):
//!
//! ```text
//! <name> <ttl> [IN] <TYPE> <rdata...>
//! ```
//!
//! e.g. `foo.local. 3600 A 10.10.10.10`. Only the record types this crate
//! understands (A, AAAA, PTR, SRV, TXT) can be written this way.

use std::str::FromStr;

use crate::error::{Error, Result};
use crate::message::name::canonicalize;
use crate::message::resource::{RData, Record};
use crate::message::DNSCLASS_INET;

impl FromStr for Record {
    type Err = Error;

    fn from_str(s: &str) -> Result<Record> {
        let mut fields = split_fields(s)?.into_iter();

        let name = fields
            .next()
            .ok_or(Error::ErrZoneLineMissingField("name"))?;
        let ttl: u32 = fields
            .next()
            .ok_or(Error::ErrZoneLineMissingField("ttl"))?
            .parse()?;

        let mut rtype = fields
            .next()
            .ok_or(Error::ErrZoneLineMissingField("type"))?;
        // The class token is optional and only IN is meaningful here.
        if rtype.eq_ignore_ascii_case("IN") {
            rtype = fields
                .next()
                .ok_or(Error::ErrZoneLineMissingField("type"))?;
        }

        let rdata = match rtype.to_ascii_uppercase().as_str() {
            "A" => RData::A(
                fields
                    .next()
                    .ok_or(Error::ErrZoneLineMissingField("address"))?
                    .parse()?,
            ),
            "AAAA" => RData::Aaaa(
                fields
                    .next()
                    .ok_or(Error::ErrZoneLineMissingField("address"))?
                    .parse()?,
            ),
            "PTR" => RData::Ptr(canonicalize(
                &fields
                    .next()
                    .ok_or(Error::ErrZoneLineMissingField("target"))?,
            )),
            "SRV" => {
                let priority: u16 = fields
                    .next()
                    .ok_or(Error::ErrZoneLineMissingField("priority"))?
                    .parse()?;
                let weight: u16 = fields
                    .next()
                    .ok_or(Error::ErrZoneLineMissingField("weight"))?
                    .parse()?;
                let port: u16 = fields
                    .next()
                    .ok_or(Error::ErrZoneLineMissingField("port"))?
                    .parse()?;
                let target = canonicalize(
                    &fields
                        .next()
                        .ok_or(Error::ErrZoneLineMissingField("target"))?,
                );
                RData::Srv {
                    priority,
                    weight,
                    port,
                    target,
                }
            }
            "TXT" => {
                let strs: Vec<Vec<u8>> = fields.map(|f| f.into_bytes()).collect();
                if strs.is_empty() {
                    return Err(Error::ErrZoneLineMissingField("text"));
                }
                RData::Txt(strs)
            }
            _ => return Err(Error::ErrUnsupportedRecordType(rtype)),
        };

        Ok(Record {
            name: canonicalize(&name),
            class: DNSCLASS_INET,
            ttl,
            rdata,
        })
    }
}

// Splits on whitespace, honoring double-quoted fields ("a b" is one field,
// quotes stripped), as master files quote TXT strings containing spaces.
fn split_fields(s: &str) -> Result<Vec<String>> {
    let mut fields = Vec::new();
    let mut chars = s.chars().peekable();

    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }
        let mut field = String::new();
        if c == '"' {
            chars.next();
            loop {
                match chars.next() {
                    Some('"') => break,
                    Some(c) => field.push(c),
                    None => return Err(Error::ErrUnterminatedQuote),
                }
            }
        } else {
            while let Some(&c) = chars.peek() {
                if c.is_whitespace() {
                    break;
                }
                field.push(c);
                chars.next();
            }
        }
        fields.push(field);
    }

    Ok(fields)
}
