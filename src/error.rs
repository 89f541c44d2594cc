use std::io;

/// Crate-wide error type.
///
/// `Io` wraps any filesystem or read/write failure. `Format` covers a bad
/// version byte, disagreeing `maxDataLen` across records, or a file whose
/// length isn't a multiple of the node record size. `Shape` covers a point
/// with the wrong dimensionality, or a payload longer than `maxDataLen`.
/// `Usage` covers programmer error: asking for a median estimate on an
/// empty reservoir, which callers are required to never do.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("format error: {0}")]
    Format(String),
    #[error("shape error: {0}")]
    Shape(String),
    #[error("usage error: {0}")]
    Usage(String),
}

pub type Result<T> = std::result::Result<T, Error>;
