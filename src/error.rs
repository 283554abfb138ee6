use std::io;
use std::net;
use std::num::ParseIntError;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, PartialEq)]
#[non_exhaustive]
pub enum Error {
    // Wire codec errors.
    #[error("message: insufficient data")]
    ErrShortBuffer,
    #[error("message: name exceeds 255 octets")]
    ErrNameTooLong,
    #[error("message: label exceeds 63 octets")]
    ErrLabelTooLong,
    #[error("message: empty label")]
    ErrEmptyLabel,
    #[error("message: name is not fully qualified")]
    ErrNonCanonicalName,
    #[error("message: name contains non-ASCII characters")]
    ErrNonAsciiName,
    #[error("message: compression pointer does not point backward")]
    ErrForwardPointer,
    #[error("message: too many compression pointers")]
    ErrTooManyPointers,
    #[error("message: reserved label prefix bits")]
    ErrReservedLabelBits,
    #[error("message: character string exceeds 255 octets")]
    ErrStringTooLong,
    #[error("message: resource length out of range")]
    ErrResourceLen,
    #[error("message: too many questions")]
    ErrTooManyQuestions,
    #[error("message: too many answers")]
    ErrTooManyAnswers,
    #[error("message: too many authorities")]
    ErrTooManyAuthorities,
    #[error("message: too many additionals")]
    ErrTooManyAdditionals,

    // Zone-file line errors.
    #[error("zonefile: missing field: {0}")]
    ErrZoneLineMissingField(&'static str),
    #[error("zonefile: unsupported record type: {0}")]
    ErrUnsupportedRecordType(String),
    #[error("zonefile: unterminated quoted string")]
    ErrUnterminatedQuote,

    // Transport errors.
    #[error("transport: closed")]
    ErrTransportClosed,

    #[error("failed to parse IP address")]
    ParseIp(#[from] net::AddrParseError),
    #[error("failed to parse integer")]
    ParseInt(#[from] ParseIntError),
    #[error("io error: {0}")]
    Io(#[source] IoError),
    #[error("{0}")]
    Other(String),
}

#[derive(Debug, Error)]
#[error("io error: {0}")]
pub struct IoError(#[from] pub io::Error);

// Workaround for wanting PartialEq for io::Error.
impl PartialEq for IoError {
    fn eq(&self, other: &Self) -> bool {
        self.0.kind() == other.0.kind()
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(IoError(e))
    }
}
