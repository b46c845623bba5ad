//! [`Value`], the closed set of kinds the wire can carry.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::error::{CborError, Result};
use crate::integer::Integer;

/// Any CBOR data item.
///
/// Decoded maps keep wire order and may hold duplicate keys.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    /// Signed integer of any width. Bignum tags decode into this variant.
    Integer(Integer),
    /// Double-precision float. Encoding picks the narrowest exact width.
    Float(f64),
    /// Byte string
    Bytes(Vec<u8>),
    /// Text string
    Text(String),
    /// Map key produced by the `symbolize_keys` decode option. Encodes as text.
    Symbol(String),
    Array(Vec<Value>),
    /// Ordered key-value pairs
    Map(Vec<(Value, Value)>),
    /// Tag not interpreted by the codec itself
    Tagged(Box<Tagged>),
    Simple(Simple),
    /// Tag 1 epoch time
    Timestamp(Epoch),
}

/// A tag number together with the item it wraps.
#[derive(Debug, Clone, PartialEq)]
pub struct Tagged {
    pub tag: u64,
    pub value: Value,
}

impl Tagged {
    pub fn new(tag: u64, value: impl Into<Value>) -> Self {
        Self {
            tag,
            value: value.into(),
        }
    }
}

/// A major type 7 simple value that is not false, true, null or a float.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Simple(u8);

impl Simple {
    /// Simple value 23.
    pub const UNDEFINED: Simple = Simple(23);

    /// Fails with [`CborError::Range`] for codes 20..=22 (false, true, null)
    /// and 24..=31 (two-byte marker, float widths, reserved, break).
    pub fn new(code: u8) -> Result<Self> {
        match code {
            20..=22 | 24..=31 => Err(CborError::Range(format!(
                "simple value {code} is reserved"
            ))),
            _ => Ok(Simple(code)),
        }
    }

    pub fn code(self) -> u8 {
        self.0
    }
}

impl TryFrom<u64> for Simple {
    type Error = CborError;

    fn try_from(code: u64) -> Result<Self> {
        let code = u8::try_from(code)
            .map_err(|_| CborError::Range(format!("simple value {code} exceeds 255")))?;
        Simple::new(code)
    }
}

/// Seconds relative to 1970-01-01T00:00Z, kept exactly as carried on the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum Epoch {
    Integer(Integer),
    Float(f64),
}

impl Epoch {
    pub fn to_system_time(&self) -> Result<SystemTime> {
        let out_of_range = || CborError::Range(format!("epoch {self:?} is not a valid time"));
        match self {
            Epoch::Integer(i) => {
                let secs = i64::try_from(i)?;
                let offset = Duration::from_secs(secs.unsigned_abs());
                if secs >= 0 {
                    UNIX_EPOCH.checked_add(offset)
                } else {
                    UNIX_EPOCH.checked_sub(offset)
                }
                .ok_or_else(out_of_range)
            }
            Epoch::Float(f) => {
                let offset =
                    Duration::try_from_secs_f64(f.abs()).map_err(|_| out_of_range())?;
                if *f >= 0.0 {
                    UNIX_EPOCH.checked_add(offset)
                } else {
                    UNIX_EPOCH.checked_sub(offset)
                }
                .ok_or_else(out_of_range)
            }
        }
    }
}

impl From<SystemTime> for Epoch {
    /// Whole seconds become an integer epoch, anything else a float.
    fn from(time: SystemTime) -> Self {
        let (negative, offset) = match time.duration_since(UNIX_EPOCH) {
            Ok(d) => (false, d),
            Err(e) => (true, e.duration()),
        };
        if offset.subsec_nanos() == 0 {
            let secs = i128::from(offset.as_secs());
            Epoch::Integer(Integer::from(if negative { -secs } else { secs }))
        } else {
            let secs = offset.as_secs_f64();
            Epoch::Float(if negative { -secs } else { secs })
        }
    }
}

impl Value {
    pub fn tagged(tag: u64, value: impl Into<Value>) -> Value {
        Value::Tagged(Box::new(Tagged::new(tag, value)))
    }

    /// Builds a tagged value from a dynamically typed tag number.
    ///
    /// A tag that is not an integer is a [`CborError::Type`]; one below zero
    /// or above `u64::MAX` is a [`CborError::Range`].
    pub fn try_tagged(tag: Value, value: impl Into<Value>) -> Result<Value> {
        match tag {
            Value::Integer(i) => {
                let tag = u64::try_from(&i)
                    .map_err(|_| CborError::Range(format!("tag {i} is outside 0..2^64")))?;
                Ok(Value::tagged(tag, value))
            }
            other => Err(CborError::Type(format!(
                "tag must be an integer, got {}",
                other.kind_name()
            ))),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_integer(&self) -> Option<&Integer> {
        match self {
            Value::Integer(i) => Some(i),
            _ => None,
        }
    }

    /// Text of a text string or a symbol.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) | Value::Symbol(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&[(Value, Value)]> {
        match self {
            Value::Map(entries) => Some(entries),
            _ => None,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::Bytes(_) => "bytes",
            Value::Text(_) => "text",
            Value::Symbol(_) => "symbol",
            Value::Array(_) => "array",
            Value::Map(_) => "map",
            Value::Tagged(_) => "tagged",
            Value::Simple(_) => "simple",
            Value::Timestamp(_) => "timestamp",
        }
    }
}

macro_rules! value_from_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(v: $t) -> Self {
                    Value::Integer(Integer::from(v))
                }
            }
        )*
    };
}

value_from_int!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(f64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Value::Bytes(v.to_vec())
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::Array(v)
    }
}

impl From<Integer> for Value {
    fn from(v: Integer) -> Self {
        Value::Integer(v)
    }
}

impl From<Tagged> for Value {
    fn from(v: Tagged) -> Self {
        Value::Tagged(Box::new(v))
    }
}

impl From<Simple> for Value {
    fn from(v: Simple) -> Self {
        Value::Simple(v)
    }
}

impl From<Epoch> for Value {
    fn from(v: Epoch) -> Self {
        Value::Timestamp(v)
    }
}
