//! Byte storage shared by the cborpack encoder and decoder.
//!
//! A [`Buffer`] is written at its end and read from an independent cursor,
//! so the encoder can flush what it produced and the decoder can keep
//! partially received input around between feeds.

mod buffer;

pub use buffer::Buffer;

use thiserror::Error;

/// Errors produced by the bounds-checked read methods of [`Buffer`].
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum BufferError {
    /// Fewer bytes are readable than the read requires.
    #[error("end of buffer")]
    EndOfBuffer,
    /// A string read hit bytes that are not UTF-8.
    #[error("invalid utf-8")]
    InvalidUtf8,
}
