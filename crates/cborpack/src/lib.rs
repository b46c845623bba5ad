//! Canonical CBOR encoding and resumable streaming decoding.
//!
//! ```
//! use cborpack::{decode, encode, Value};
//!
//! let value = Value::Map(vec![(Value::from(1u8), Value::from(1u8))]);
//! let bytes = encode(&value).unwrap();
//! assert_eq!(bytes, [0xa1, 0x01, 0x01]);
//! assert_eq!(decode(&bytes).unwrap(), value);
//! ```
//!
//! Incremental input goes through a [`Decoder`]:
//!
//! ```
//! use cborpack::{Decoder, Value};
//!
//! let mut decoder = Decoder::new();
//! let mut out = Vec::new();
//! decoder.feed_each(&[0x9f, 0x01], |v| out.push(v)).unwrap();
//! assert!(out.is_empty());
//! decoder.feed_each(&[0xff, 0x02], |v| out.push(v)).unwrap();
//! assert_eq!(out, [Value::from(vec![Value::from(1u8)]), Value::from(2u8)]);
//! ```

pub mod cli;
pub mod convert;
pub mod decoder;
pub mod encoder;
mod error;
pub mod format;
mod integer;
mod options;
mod value;

pub use cborpack_buffers::Buffer;
pub use decoder::{decode, decode_from, decode_with, Decoder, TagMaterializer};
pub use encoder::{encode, encode_to, Encoder, SinkEncoder, ToCbor};
pub use error::{CborError, Result};
pub use integer::Integer;
pub use options::{DecodeOptions, DEFAULT_MAX_DEPTH};
pub use value::{Epoch, Simple, Tagged, Value};
