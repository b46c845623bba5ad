use serde::Deserialize;

use crate::error::{CborError, Result};

pub const DEFAULT_MAX_DEPTH: usize = 512;

/// Decoder configuration.
///
/// Deserializes from any serde source; unknown keys are rejected.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DecodeOptions {
    /// Decode text map keys as [`Value::Symbol`](crate::Value::Symbol).
    #[serde(alias = "keys_as_symbols")]
    pub symbolize_keys: bool,
    /// Maximum number of nested containers and tags.
    ///
    /// Decoding and encoding do not recurse, but dropping, cloning,
    /// comparing and formatting a [`Value`](crate::Value) do. Raising the
    /// limit far above the default requires a matching thread stack.
    pub max_depth: usize,
    /// Upper bound on string lengths and array/map element counts. Applies
    /// to declared lengths and to totals accumulated from indefinite-length
    /// items.
    pub max_length: Option<u64>,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            symbolize_keys: false,
            max_depth: DEFAULT_MAX_DEPTH,
            max_length: None,
        }
    }
}

impl DecodeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses flag-style option names. `symbolize_keys` and its alias
    /// `keys_as_symbols` are recognized; anything else is an argument error.
    pub fn from_tokens<'a, I>(tokens: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut options = Self::default();
        for token in tokens {
            match token {
                "symbolize_keys" | "keys_as_symbols" => options.symbolize_keys = true,
                other => {
                    return Err(CborError::Argument(format!(
                        "unknown decode option: {other}"
                    )))
                }
            }
        }
        Ok(options)
    }

    pub fn symbolize_keys(mut self, on: bool) -> Self {
        self.symbolize_keys = on;
        self
    }

    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn max_length(mut self, length: u64) -> Self {
        self.max_length = Some(length);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let o = DecodeOptions::default();
        assert!(!o.symbolize_keys);
        assert_eq!(o.max_depth, DEFAULT_MAX_DEPTH);
        assert_eq!(o.max_length, None);
    }

    #[test]
    fn tokens_accept_both_spellings() {
        assert!(DecodeOptions::from_tokens(["symbolize_keys"]).unwrap().symbolize_keys);
        assert!(DecodeOptions::from_tokens(["keys_as_symbols"]).unwrap().symbolize_keys);
        assert!(!DecodeOptions::from_tokens(std::iter::empty()).unwrap().symbolize_keys);
    }

    #[test]
    fn unknown_token_is_argument_error() {
        let err = DecodeOptions::from_tokens(["symbolize_keys", "foo"]).unwrap_err();
        assert_eq!(err, CborError::Argument("unknown decode option: foo".into()));
    }

    #[test]
    fn deserialize_from_json() {
        let o: DecodeOptions =
            serde_json::from_str(r#"{"keys_as_symbols": true, "max_depth": 8}"#).unwrap();
        assert_eq!(o, DecodeOptions::new().symbolize_keys(true).max_depth(8));

        let o: DecodeOptions = serde_json::from_str(r#"{"max_length": 1024}"#).unwrap();
        assert_eq!(o.max_length, Some(1024));

        assert!(serde_json::from_str::<DecodeOptions>(r#"{"foo": true}"#).is_err());
    }
}
