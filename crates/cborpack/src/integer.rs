//! Arbitrary-precision integers in sign/magnitude form.
//!
//! The representation follows the wire: a sign flag plus an unsigned
//! magnitude, where a negative value `v` carries the magnitude `-1 - v`.
//! Major types 0/1 and bignum tags 2/3 map onto it without arithmetic.

use std::fmt;

use crate::error::CborError;

/// A signed integer of any width.
///
/// Magnitudes that fit in 64 bits are stored inline. Wider ones are kept as
/// big-endian bytes without leading zeros, so two equal integers always
/// compare equal structurally.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Integer {
    negative: bool,
    magnitude: Magnitude,
}

#[derive(Clone, PartialEq, Eq, Hash)]
enum Magnitude {
    Word(u64),
    Wide(Box<[u8]>),
}

impl Integer {
    /// Builds an integer from a sign and a big-endian magnitude of any length.
    ///
    /// Leading zero bytes are ignored. The value is `magnitude` when
    /// `negative` is false and `-1 - magnitude` otherwise.
    pub fn from_magnitude(negative: bool, be_bytes: &[u8]) -> Self {
        let first = be_bytes.iter().position(|b| *b != 0).unwrap_or(be_bytes.len());
        let digits = &be_bytes[first..];
        let magnitude = if digits.len() <= 8 {
            let mut word = [0u8; 8];
            word[8 - digits.len()..].copy_from_slice(digits);
            Magnitude::Word(u64::from_be_bytes(word))
        } else {
            Magnitude::Wide(digits.into())
        };
        Self { negative, magnitude }
    }

    fn word(negative: bool, magnitude: u64) -> Self {
        Self {
            negative,
            magnitude: Magnitude::Word(magnitude),
        }
    }

    fn from_u128_magnitude(negative: bool, magnitude: u128) -> Self {
        match u64::try_from(magnitude) {
            Ok(word) => Self::word(negative, word),
            Err(_) => Self::from_magnitude(negative, &magnitude.to_be_bytes()),
        }
    }

    pub fn is_negative(&self) -> bool {
        self.negative
    }

    /// The wire magnitude when it fits in 64 bits.
    pub fn magnitude_u64(&self) -> Option<u64> {
        match self.magnitude {
            Magnitude::Word(m) => Some(m),
            Magnitude::Wide(_) => None,
        }
    }

    /// The wire magnitude as minimal big-endian bytes. Zero is empty.
    pub fn magnitude_bytes(&self) -> Vec<u8> {
        match &self.magnitude {
            Magnitude::Word(m) => {
                let bytes = m.to_be_bytes();
                let first = bytes.iter().position(|b| *b != 0).unwrap_or(8);
                bytes[first..].to_vec()
            }
            Magnitude::Wide(bytes) => bytes.to_vec(),
        }
    }

    fn magnitude_u128(&self) -> Option<u128> {
        match &self.magnitude {
            Magnitude::Word(m) => Some(u128::from(*m)),
            Magnitude::Wide(bytes) if bytes.len() <= 16 => {
                let mut word = [0u8; 16];
                word[16 - bytes.len()..].copy_from_slice(bytes);
                Some(u128::from_be_bytes(word))
            }
            Magnitude::Wide(_) => None,
        }
    }

    fn out_of_range(&self, target: &str) -> CborError {
        CborError::Range(format!("integer {self} does not fit in {target}"))
    }
}

impl From<u64> for Integer {
    fn from(v: u64) -> Self {
        Self::word(false, v)
    }
}

impl From<i64> for Integer {
    fn from(v: i64) -> Self {
        if v >= 0 {
            Self::word(false, v as u64)
        } else {
            Self::word(true, !(v as u64))
        }
    }
}

impl From<u128> for Integer {
    fn from(v: u128) -> Self {
        Self::from_u128_magnitude(false, v)
    }
}

impl From<i128> for Integer {
    fn from(v: i128) -> Self {
        if v >= 0 {
            Self::from_u128_magnitude(false, v as u128)
        } else {
            Self::from_u128_magnitude(true, !(v as u128))
        }
    }
}

macro_rules! integer_from_narrow {
    ($wide:ty => $($t:ty),*) => {
        $(
            impl From<$t> for Integer {
                fn from(v: $t) -> Self {
                    Integer::from(v as $wide)
                }
            }
        )*
    };
}

integer_from_narrow!(u64 => u8, u16, u32, usize);
integer_from_narrow!(i64 => i8, i16, i32, isize);

impl TryFrom<&Integer> for u64 {
    type Error = CborError;

    fn try_from(v: &Integer) -> Result<Self, Self::Error> {
        match (v.negative, &v.magnitude) {
            (false, Magnitude::Word(m)) => Ok(*m),
            _ => Err(v.out_of_range("u64")),
        }
    }
}

impl TryFrom<&Integer> for i64 {
    type Error = CborError;

    fn try_from(v: &Integer) -> Result<Self, Self::Error> {
        match v.magnitude {
            Magnitude::Word(m) if m <= i64::MAX as u64 => {
                Ok(if v.negative { !(m as i64) } else { m as i64 })
            }
            _ => Err(v.out_of_range("i64")),
        }
    }
}

impl TryFrom<&Integer> for u128 {
    type Error = CborError;

    fn try_from(v: &Integer) -> Result<Self, Self::Error> {
        match v.magnitude_u128() {
            Some(m) if !v.negative => Ok(m),
            _ => Err(v.out_of_range("u128")),
        }
    }
}

impl TryFrom<&Integer> for i128 {
    type Error = CborError;

    fn try_from(v: &Integer) -> Result<Self, Self::Error> {
        match v.magnitude_u128() {
            Some(m) if m <= i128::MAX as u128 => {
                Ok(if v.negative { !(m as i128) } else { m as i128 })
            }
            _ => Err(v.out_of_range("i128")),
        }
    }
}

/// Decimal digits of a big-endian unsigned magnitude.
fn decimal(mut digits: Vec<u8>) -> String {
    let mut out = Vec::new();
    while digits.iter().any(|d| *d != 0) {
        let mut rem = 0u32;
        for d in digits.iter_mut() {
            let cur = (rem << 8) | u32::from(*d);
            *d = (cur / 10) as u8;
            rem = cur % 10;
        }
        out.push(b'0' + rem as u8);
    }
    if out.is_empty() {
        out.push(b'0');
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

/// Adds one to a big-endian unsigned magnitude, growing it on carry.
fn increment(mut digits: Vec<u8>) -> Vec<u8> {
    for d in digits.iter_mut().rev() {
        let (next, carry) = d.overflowing_add(1);
        *d = next;
        if !carry {
            return digits;
        }
    }
    digits.insert(0, 1);
    digits
}

impl fmt::Display for Integer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.magnitude, self.negative) {
            (Magnitude::Word(m), false) => write!(f, "{m}"),
            (Magnitude::Word(m), true) => write!(f, "-{}", u128::from(*m) + 1),
            (Magnitude::Wide(bytes), false) => f.write_str(&decimal(bytes.to_vec())),
            (Magnitude::Wide(bytes), true) => {
                write!(f, "-{}", decimal(increment(bytes.to_vec())))
            }
        }
    }
}

impl fmt::Debug for Integer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Integer({self})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_values_store_complement_magnitude() {
        let minus_one = Integer::from(-1i64);
        assert!(minus_one.is_negative());
        assert_eq!(minus_one.magnitude_u64(), Some(0));
        assert_eq!(Integer::from(-25i32).magnitude_u64(), Some(24));
        assert_eq!(Integer::from(i64::MIN).magnitude_u64(), Some(i64::MAX as u64));
    }

    #[test]
    fn from_magnitude_strips_leading_zeros() {
        let a = Integer::from_magnitude(false, &[0, 0, 0x61]);
        assert_eq!(a, Integer::from(97u8));
        assert_eq!(Integer::from_magnitude(false, &[]), Integer::from(0u8));
        assert_eq!(Integer::from_magnitude(true, &[0]), Integer::from(-1i8));
    }

    #[test]
    fn nine_byte_magnitude_with_leading_zero_collapses_to_word() {
        let bytes = [0, b'a', b'a', b'a', b'a', b'a', b'a', b'a', b'a'];
        let v = Integer::from_magnitude(false, &bytes);
        assert_eq!(v.magnitude_u64(), Some(0x6161_6161_6161_6161));
    }

    #[test]
    fn wide_magnitudes_stay_wide() {
        let v = Integer::from_magnitude(false, &[1, 0, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(v.magnitude_u64(), None);
        assert_eq!(v.magnitude_bytes(), vec![1, 0, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(v, Integer::from(1u128 << 64));
    }

    #[test]
    fn magnitude_bytes_are_minimal() {
        assert_eq!(Integer::from(0u8).magnitude_bytes(), Vec::<u8>::new());
        assert_eq!(Integer::from(256u16).magnitude_bytes(), vec![1, 0]);
        assert_eq!(Integer::from(-257i32).magnitude_bytes(), vec![1, 0]);
    }

    #[test]
    fn narrowing_conversions() {
        assert_eq!(i64::try_from(&Integer::from(-5i8)), Ok(-5));
        assert_eq!(u64::try_from(&Integer::from(u64::MAX)), Ok(u64::MAX));
        assert!(u64::try_from(&Integer::from(-1i8)).is_err());
        assert!(i64::try_from(&Integer::from(u64::MAX)).is_err());
        assert_eq!(i64::try_from(&Integer::from(i64::MIN)), Ok(i64::MIN));
        assert_eq!(i128::try_from(&Integer::from(-(1i128 << 64))), Ok(-(1i128 << 64)));
        assert_eq!(u128::try_from(&Integer::from(u128::MAX)), Ok(u128::MAX));
        assert!(matches!(
            i128::try_from(&Integer::from(u128::MAX)),
            Err(CborError::Range(_))
        ));
    }

    #[test]
    fn display_any_width() {
        assert_eq!(Integer::from(0u8).to_string(), "0");
        assert_eq!(Integer::from(-1i8).to_string(), "-1");
        assert_eq!(Integer::from(u64::MAX).to_string(), "18446744073709551615");
        assert_eq!(
            Integer::from_magnitude(true, &u64::MAX.to_be_bytes()).to_string(),
            "-18446744073709551616"
        );
        assert_eq!(
            Integer::from(1u128 << 64).to_string(),
            "18446744073709551616"
        );
        assert_eq!(
            Integer::from(-(1i128 << 64) - 1).to_string(),
            "-18446744073709551617"
        );
        let max = Integer::from_magnitude(true, &[0xff; 16]);
        assert_eq!(max.to_string(), "-340282366920938463463374607431768211456");
    }
}
