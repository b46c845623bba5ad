//! Logic behind the `cbor-pack` and `cbor-unpack` binaries.
//!
//! - `cbor-pack`   reads one JSON document and writes its CBOR encoding.
//! - `cbor-unpack` reads a CBOR sequence and writes one JSON document per
//!   decoded value, one per line.

use thiserror::Error;

use crate::convert::{from_json, to_json};
use crate::decoder::Decoder;
use crate::encoder::encode;
use crate::error::CborError;
use crate::options::DecodeOptions;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("{0}")]
    Json(#[from] serde_json::Error),
    #[error("{0}")]
    Cbor(#[from] CborError),
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("bad argument: {0}")]
    Argument(String),
}

/// Flags accepted by `cbor-unpack`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnpackArgs {
    pub options: DecodeOptions,
    pub pretty: bool,
}

impl UnpackArgs {
    /// Parses `--max-depth N`, `--max-length N`, `--symbolize-keys` and
    /// `--pretty`. The program name must already be stripped.
    pub fn parse<I, S>(args: I) -> Result<Self, CliError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut parsed = UnpackArgs::default();
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_ref() {
                "--pretty" => parsed.pretty = true,
                "--symbolize-keys" => parsed.options.symbolize_keys = true,
                "--max-depth" => {
                    parsed.options.max_depth = number_arg("--max-depth", args.next())?;
                }
                "--max-length" => {
                    parsed.options.max_length = Some(number_arg("--max-length", args.next())?);
                }
                other => return Err(CliError::Argument(format!("unknown flag {other}"))),
            }
        }
        Ok(parsed)
    }
}

fn number_arg<S, N>(flag: &str, value: Option<S>) -> Result<N, CliError>
where
    S: AsRef<str>,
    N: std::str::FromStr,
{
    let value = value.ok_or_else(|| CliError::Argument(format!("{flag} needs a value")))?;
    value
        .as_ref()
        .parse()
        .map_err(|_| CliError::Argument(format!("{flag}: not a number: {}", value.as_ref())))
}

/// Encodes a JSON document as CBOR.
pub fn pack(json: &str) -> Result<Vec<u8>, CliError> {
    let json: serde_json::Value = serde_json::from_str(json)?;
    Ok(encode(&from_json(&json))?)
}

/// Decodes a CBOR sequence into newline-separated JSON documents.
///
/// Input that ends inside a value fails with [`CborError::EndOfInput`].
pub fn unpack(bytes: &[u8], args: &UnpackArgs) -> Result<String, CliError> {
    let mut decoder = Decoder::with_options(args.options.clone());
    let mut docs = Vec::new();
    decoder.feed_each(bytes, |value| docs.push(to_json(&value)))?;
    if decoder.buffered() > 0 || decoder.depth() > 0 {
        return Err(CborError::EndOfInput.into());
    }

    let mut out = String::new();
    for doc in &docs {
        let text = if args.pretty {
            serde_json::to_string_pretty(doc)?
        } else {
            serde_json::to_string(doc)?
        };
        out.push_str(&text);
        out.push('\n');
    }
    Ok(out)
}
