//! Wire constants and the minimal-width rules shared by encoder and decoder.

use cborpack_buffers::Buffer;
use half::f16;

pub const MAJOR_UNSIGNED: u8 = 0;
pub const MAJOR_NEGATIVE: u8 = 1;
pub const MAJOR_BYTES: u8 = 2;
pub const MAJOR_TEXT: u8 = 3;
pub const MAJOR_ARRAY: u8 = 4;
pub const MAJOR_MAP: u8 = 5;
pub const MAJOR_TAG: u8 = 6;
pub const MAJOR_SIMPLE: u8 = 7;

/// Additional-info values selecting the width of the argument that follows.
pub const AI_1: u8 = 24;
pub const AI_2: u8 = 25;
pub const AI_4: u8 = 26;
pub const AI_8: u8 = 27;
pub const AI_INDEF: u8 = 31;

pub const FALSE: u8 = 0xf4;
pub const TRUE: u8 = 0xf5;
pub const NULL: u8 = 0xf6;
pub const UNDEFINED: u8 = 0xf7;
pub const SIMPLE_1: u8 = 0xf8;
pub const FLOAT_16: u8 = 0xf9;
pub const FLOAT_32: u8 = 0xfa;
pub const FLOAT_64: u8 = 0xfb;
pub const BREAK: u8 = 0xff;

pub const TAG_EPOCH: u64 = 1;
pub const TAG_BIGNUM: u64 = 2;
pub const TAG_NEG_BIGNUM: u64 = 3;
pub const TAG_URI: u64 = 32;

/// Canonical half-precision NaN.
pub const HALF_NAN: u16 = 0x7e00;

/// Bytes taken by a head carrying the argument `n`.
pub fn head_len(n: u64) -> usize {
    if n < u64::from(AI_1) {
        1
    } else if n <= 0xff {
        2
    } else if n <= 0xffff {
        3
    } else if n <= 0xffff_ffff {
        5
    } else {
        9
    }
}

/// Writes the shortest head for major type `major` with argument `n`.
pub fn write_head(buffer: &mut Buffer, major: u8, n: u64) {
    let overlay = major << 5;
    if n < u64::from(AI_1) {
        buffer.u8(overlay | n as u8);
    } else if n <= 0xff {
        buffer.u8(overlay | AI_1);
        buffer.u8(n as u8);
    } else if n <= 0xffff {
        buffer.u8u16(overlay | AI_2, n as u16);
    } else if n <= 0xffff_ffff {
        buffer.u8u32(overlay | AI_4, n as u32);
    } else {
        buffer.u8u64(overlay | AI_8, n);
    }
}

/// The narrowest IEEE-754 width that reproduces a double exactly.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FloatRepr {
    Half(u16),
    Single(f32),
    Double(f64),
}

impl FloatRepr {
    /// Encoded size including the head byte.
    pub fn encoded_len(&self) -> usize {
        match self {
            FloatRepr::Half(_) => 3,
            FloatRepr::Single(_) => 5,
            FloatRepr::Double(_) => 9,
        }
    }
}

/// Picks half, then single, then double: the first width whose value
/// converts back to `d` with identical bits. Every NaN maps to the
/// canonical half NaN.
pub fn float_repr(d: f64) -> FloatRepr {
    if d.is_nan() {
        return FloatRepr::Half(HALF_NAN);
    }
    let half = f16::from_f64(d);
    if half.to_f64().to_bits() == d.to_bits() {
        return FloatRepr::Half(half.to_bits());
    }
    let single = d as f32;
    if f64::from(single).to_bits() == d.to_bits() {
        return FloatRepr::Single(single);
    }
    FloatRepr::Double(d)
}

pub fn decode_half(bits: u16) -> f64 {
    f16::from_bits(bits).to_f64()
}
