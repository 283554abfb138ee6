use crate::error::{Error, Result};

// Fixed-width field helpers shared by the packing and unpacking paths. All
// pack_* functions append to msg and return the extended buffer; all
// unpack_* functions return the value and the offset just past it.

pub(crate) fn pack_uint16(mut msg: Vec<u8>, v: u16) -> Vec<u8> {
    msg.extend_from_slice(&v.to_be_bytes());
    msg
}

pub(crate) fn unpack_uint16(msg: &[u8], off: usize) -> Result<(u16, usize)> {
    let b = msg.get(off..off + 2).ok_or(Error::ErrShortBuffer)?;
    Ok((u16::from_be_bytes([b[0], b[1]]), off + 2))
}

pub(crate) fn skip_uint16(msg: &[u8], off: usize) -> Result<usize> {
    if off + 2 > msg.len() {
        return Err(Error::ErrShortBuffer);
    }
    Ok(off + 2)
}

pub(crate) fn pack_uint32(mut msg: Vec<u8>, v: u32) -> Vec<u8> {
    msg.extend_from_slice(&v.to_be_bytes());
    msg
}

pub(crate) fn unpack_uint32(msg: &[u8], off: usize) -> Result<(u32, usize)> {
    let b = msg.get(off..off + 4).ok_or(Error::ErrShortBuffer)?;
    Ok((u32::from_be_bytes([b[0], b[1], b[2], b[3]]), off + 4))
}

pub(crate) fn pack_bytes(mut msg: Vec<u8>, b: &[u8]) -> Vec<u8> {
    msg.extend_from_slice(b);
    msg
}

pub(crate) fn unpack_bytes(msg: &[u8], off: usize, n: usize) -> Result<(Vec<u8>, usize)> {
    let b = msg.get(off..off + n).ok_or(Error::ErrShortBuffer)?;
    Ok((b.to_vec(), off + n))
}

// A character-string is a length octet followed by up to 255 bytes (RFC 1035
// section 3.3), used by TXT rdata.

pub(crate) fn pack_str(msg: Vec<u8>, s: &[u8]) -> Result<Vec<u8>> {
    if s.len() > 255 {
        return Err(Error::ErrStringTooLong);
    }
    let mut msg = pack_bytes(msg, &[s.len() as u8]);
    msg = pack_bytes(msg, s);
    Ok(msg)
}

pub(crate) fn unpack_str(msg: &[u8], off: usize) -> Result<(Vec<u8>, usize)> {
    let n = *msg.get(off).ok_or(Error::ErrShortBuffer)? as usize;
    unpack_bytes(msg, off + 1, n)
}
