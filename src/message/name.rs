use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::message::packer::*;

// Domain names on the wire are sequences of length-prefixed labels
// terminated by a zero octet, with optional compression pointers (RFC 1035
// section 4.1.4). In memory a name is a fully-qualified ASCII string with a
// trailing dot, e.g. "foo.local.".

// A name must fit in 255 octets including the length prefixes and the
// terminating zero. Since every label costs its length plus one, the text
// form (labels plus dots) has the same limit.
const MAX_NAME_LEN: usize = 255;
const MAX_LABEL_LEN: usize = 63;

// Upper bound on compression pointers followed while unpacking one name.
// Pointers must point backward, but a backward chain can still revisit
// earlier labels; the cap makes crafted packets terminate.
const MAX_POINTERS: usize = 16;

// pack_name appends the wire format of name to msg.
//
// When a compression map is supplied, suffixes already present in the map
// are replaced by pointers and new suffixes are recorded at their offset
// relative to compression_off (the start of the message).
pub(crate) fn pack_name(
    mut msg: Vec<u8>,
    name: &str,
    compression: &mut Option<HashMap<String, usize>>,
    compression_off: usize,
) -> Result<Vec<u8>> {
    if name == "." {
        msg.push(0);
        return Ok(msg);
    }
    if !name.is_ascii() {
        return Err(Error::ErrNonAsciiName);
    }
    if name.len() > MAX_NAME_LEN {
        return Err(Error::ErrNameTooLong);
    }
    if !name.ends_with('.') {
        return Err(Error::ErrNonCanonicalName);
    }

    let bytes = name.as_bytes();
    let mut begin = 0;
    while begin < bytes.len() {
        let end = match name[begin..].find('.') {
            Some(p) => begin + p,
            None => return Err(Error::ErrNonCanonicalName),
        };
        if end == begin {
            return Err(Error::ErrEmptyLabel);
        }
        if end - begin > MAX_LABEL_LEN {
            return Err(Error::ErrLabelTooLong);
        }

        if let Some(map) = compression.as_mut() {
            if let Some(&ptr) = map.get(&name[begin..]) {
                return Ok(pack_uint16(msg, 0xC000 | ptr as u16));
            }
            let off = msg.len() - compression_off;
            // Only offsets representable in a 14-bit pointer are recorded.
            if off < 0x4000 {
                map.insert(name[begin..].to_owned(), off);
            }
        }

        msg.push((end - begin) as u8);
        msg.extend_from_slice(&bytes[begin..end]);
        begin = end + 1;
    }

    msg.push(0);
    Ok(msg)
}

// unpack_name reads a possibly-compressed name starting at off. It returns
// the name and the offset just past it in the original (uncompressed)
// stream, i.e. past the first pointer if one was followed.
pub(crate) fn unpack_name(msg: &[u8], off: usize) -> Result<(String, usize)> {
    let mut name = String::new();
    let mut curr = off;
    let mut new_off = 0;
    let mut ptr_seen = false;
    let mut ptrs = 0;

    loop {
        let len = *msg.get(curr).ok_or(Error::ErrShortBuffer)? as usize;
        match len & 0xC0 {
            0x00 => {
                curr += 1;
                if len == 0 {
                    if !ptr_seen {
                        new_off = curr;
                    }
                    if name.is_empty() {
                        name.push('.');
                    }
                    return Ok((name, new_off));
                }
                let label = msg.get(curr..curr + len).ok_or(Error::ErrShortBuffer)?;
                if !label.is_ascii() {
                    return Err(Error::ErrNonAsciiName);
                }
                for &b in label {
                    name.push(b as char);
                }
                name.push('.');
                if name.len() > MAX_NAME_LEN {
                    return Err(Error::ErrNameTooLong);
                }
                curr += len;
            }
            0xC0 => {
                let (ptr, after) = unpack_uint16(msg, curr)?;
                let target = (ptr & 0x3FFF) as usize;
                if target >= curr {
                    return Err(Error::ErrForwardPointer);
                }
                ptrs += 1;
                if ptrs > MAX_POINTERS {
                    return Err(Error::ErrTooManyPointers);
                }
                if !ptr_seen {
                    new_off = after;
                    ptr_seen = true;
                }
                curr = target;
            }
            _ => return Err(Error::ErrReservedLabelBits),
        }
    }
}

pub(crate) fn skip_name(msg: &[u8], off: usize) -> Result<usize> {
    let mut curr = off;
    loop {
        let len = *msg.get(curr).ok_or(Error::ErrShortBuffer)? as usize;
        match len & 0xC0 {
            0x00 => {
                curr += 1;
                if len == 0 {
                    return Ok(curr);
                }
                curr += len;
                if curr > msg.len() {
                    return Err(Error::ErrShortBuffer);
                }
            }
            // A pointer ends the name.
            0xC0 => return skip_uint16(msg, curr),
            _ => return Err(Error::ErrReservedLabelBits),
        }
    }
}

// canonicalize appends the root dot when missing; query and publish paths
// accept both "foo.local" and "foo.local.".
pub(crate) fn canonicalize(name: &str) -> String {
    if name.ends_with('.') {
        name.to_owned()
    } else {
        format!("{name}.")
    }
}
