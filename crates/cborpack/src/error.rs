use cborpack_buffers::BufferError;
use thiserror::Error;

/// Errors raised while encoding or decoding CBOR.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CborError {
    /// The input violates the format and cannot become valid with more bytes.
    #[error("malformed cbor: {0}")]
    MalformedFormat(String),
    /// A declared length or count needs bytes that have not arrived yet.
    #[error("end of input")]
    EndOfInput,
    /// A tag or simple code outside its representable range.
    #[error("out of range: {0}")]
    Range(String),
    /// A value of the wrong kind where a specific kind is required.
    #[error("type error: {0}")]
    Type(String),
    /// Invalid configuration.
    #[error("argument error: {0}")]
    Argument(String),
    /// The value has no built-in kind and no serialization capability.
    #[error("unsupported type for cbor encoding: {0}")]
    Unsupported(&'static str),
    /// A configured decoder limit was exceeded.
    #[error("{what} limit of {limit} exceeded")]
    LimitExceeded { what: &'static str, limit: u64 },
    /// The sink or source failed.
    #[error("i/o error: {0:?}")]
    Io(std::io::ErrorKind),
}

impl CborError {
    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        CborError::MalformedFormat(msg.into())
    }

    /// True when feeding more bytes and retrying may succeed.
    pub fn is_end_of_input(&self) -> bool {
        matches!(self, CborError::EndOfInput)
    }
}

impl From<BufferError> for CborError {
    fn from(e: BufferError) -> Self {
        match e {
            BufferError::EndOfBuffer => CborError::EndOfInput,
            BufferError::InvalidUtf8 => CborError::malformed("invalid utf-8 in text string"),
        }
    }
}

impl From<std::io::Error> for CborError {
    fn from(e: std::io::Error) -> Self {
        CborError::Io(e.kind())
    }
}

pub type Result<T> = std::result::Result<T, CborError>;
