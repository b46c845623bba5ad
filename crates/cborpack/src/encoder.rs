//! [`Encoder`]: writes values as canonical CBOR into a [`Buffer`].

use std::io::Write;
use std::ops::{Deref, DerefMut};
use std::time::SystemTime;

use cborpack_buffers::Buffer;

use crate::error::{CborError, Result};
use crate::format::*;
use crate::integer::Integer;
use crate::value::{Epoch, Simple, Tagged, Value};

/// A type that can be written as CBOR.
///
/// Implementors either write themselves through the encoder's low-level
/// methods ([`serialize_into`](ToCbor::serialize_into)) or hand back an
/// equivalent [`Value`] ([`substitute`](ToCbor::substitute)). Implementing
/// neither makes encoding fail with [`CborError::Unsupported`].
pub trait ToCbor {
    fn serialize_into(&self, encoder: &mut Encoder) -> Result<()> {
        match self.substitute() {
            Some(value) => {
                encoder.write_value(&value);
                Ok(())
            }
            None => Err(CborError::Unsupported(std::any::type_name::<Self>())),
        }
    }

    fn substitute(&self) -> Option<Value> {
        None
    }
}

/// Canonical CBOR encoder.
///
/// Integers, lengths, counts and tags use the shortest head; floats use the
/// narrowest exact width; arrays and maps are always definite-length.
#[derive(Debug, Default)]
pub struct Encoder {
    buffer: Buffer,
}

impl Encoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_buffer(buffer: Buffer) -> Self {
        Self { buffer }
    }

    pub fn buffer(&self) -> &Buffer {
        &self.buffer
    }

    pub fn buffer_mut(&mut self) -> &mut Buffer {
        &mut self.buffer
    }

    pub fn into_buffer(self) -> Buffer {
        self.buffer
    }

    /// Returns everything written so far and empties the encoder.
    pub fn flush(&mut self) -> Vec<u8> {
        self.buffer.flush()
    }

    /// Bytes written and not yet flushed.
    pub fn len(&self) -> usize {
        self.buffer.size()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Discards pending bytes, encodes `value` and returns its bytes.
    pub fn encode<T: ToCbor + ?Sized>(&mut self, value: &T) -> Result<Vec<u8>> {
        self.buffer.reset();
        self.write(value)?;
        Ok(self.buffer.flush())
    }

    /// Appends `value`. On failure nothing from this call stays in the buffer.
    pub fn write<T: ToCbor + ?Sized>(&mut self, value: &T) -> Result<()> {
        let mark = self.buffer.len();
        let result = value.serialize_into(self);
        if result.is_err() {
            self.buffer.uint8.truncate(mark);
        }
        result
    }

    /// Writes `value` depth-first with an explicit work list, so nesting
    /// depth is bounded by memory rather than the call stack.
    pub fn write_value(&mut self, value: &Value) {
        let mut pending = vec![value];
        while let Some(value) = pending.pop() {
            match value {
                Value::Null => self.write_nil(),
                Value::Bool(b) => self.write_bool(*b),
                Value::Integer(i) => self.write_integer(i),
                Value::Float(f) => self.write_float(*f),
                Value::Bytes(b) => self.write_bytes(b),
                Value::Text(s) | Value::Symbol(s) => self.write_text(s),
                Value::Array(items) => {
                    self.write_array_header(items.len() as u64);
                    pending.extend(items.iter().rev());
                }
                Value::Map(entries) => {
                    self.write_map_header(entries.len() as u64);
                    for (key, value) in entries.iter().rev() {
                        pending.push(value);
                        pending.push(key);
                    }
                }
                Value::Tagged(tagged) => {
                    self.write_tag_header(tagged.tag);
                    pending.push(&tagged.value);
                }
                Value::Simple(simple) => self.write_simple(*simple),
                Value::Timestamp(epoch) => self.write_epoch(epoch),
            }
        }
    }

    pub fn write_nil(&mut self) {
        self.buffer.u8(NULL);
    }

    pub fn write_bool(&mut self, b: bool) {
        self.buffer.u8(if b { TRUE } else { FALSE });
    }

    /// Major type 0/1 when the magnitude fits 64 bits, otherwise a bignum
    /// tag around the minimal big-endian magnitude.
    pub fn write_integer(&mut self, int: &Integer) {
        match int.magnitude_u64() {
            Some(m) => {
                let major = if int.is_negative() {
                    MAJOR_NEGATIVE
                } else {
                    MAJOR_UNSIGNED
                };
                write_head(&mut self.buffer, major, m);
            }
            None => {
                let tag = if int.is_negative() {
                    TAG_NEG_BIGNUM
                } else {
                    TAG_BIGNUM
                };
                self.write_tag_header(tag);
                self.write_bytes(&int.magnitude_bytes());
            }
        }
    }

    pub fn write_i64(&mut self, int: i64) {
        if int >= 0 {
            write_head(&mut self.buffer, MAJOR_UNSIGNED, int as u64);
        } else {
            write_head(&mut self.buffer, MAJOR_NEGATIVE, !(int as u64));
        }
    }

    pub fn write_u64(&mut self, uint: u64) {
        write_head(&mut self.buffer, MAJOR_UNSIGNED, uint);
    }

    pub fn write_float(&mut self, float: f64) {
        match float_repr(float) {
            FloatRepr::Half(bits) => self.buffer.u8u16(FLOAT_16, bits),
            FloatRepr::Single(f) => {
                self.buffer.u8(FLOAT_32);
                self.buffer.f32(f);
            }
            FloatRepr::Double(f) => {
                self.buffer.u8(FLOAT_64);
                self.buffer.f64(f);
            }
        }
    }

    pub fn write_bytes(&mut self, buf: &[u8]) {
        write_head(&mut self.buffer, MAJOR_BYTES, buf.len() as u64);
        self.buffer.buf(buf);
    }

    pub fn write_text(&mut self, s: &str) {
        write_head(&mut self.buffer, MAJOR_TEXT, s.len() as u64);
        self.buffer.utf8(s);
    }

    pub fn write_array_header(&mut self, len: u64) {
        write_head(&mut self.buffer, MAJOR_ARRAY, len);
    }

    /// `len` counts key-value pairs.
    pub fn write_map_header(&mut self, len: u64) {
        write_head(&mut self.buffer, MAJOR_MAP, len);
    }

    pub fn write_tag_header(&mut self, tag: u64) {
        write_head(&mut self.buffer, MAJOR_TAG, tag);
    }

    pub fn write_simple(&mut self, simple: Simple) {
        let code = simple.code();
        if code < AI_1 {
            self.buffer.u8((MAJOR_SIMPLE << 5) | code);
        } else {
            self.buffer.u8(SIMPLE_1);
            self.buffer.u8(code);
        }
    }

    fn write_epoch(&mut self, epoch: &Epoch) {
        self.write_tag_header(TAG_EPOCH);
        match epoch {
            Epoch::Integer(i) => self.write_integer(i),
            Epoch::Float(f) => self.write_float(*f),
        }
    }

    // Streaming helpers. Each opened item must be closed with `write_break`.

    pub fn write_indefinite_bytes(&mut self) {
        self.buffer.u8((MAJOR_BYTES << 5) | AI_INDEF);
    }

    pub fn write_indefinite_text(&mut self) {
        self.buffer.u8((MAJOR_TEXT << 5) | AI_INDEF);
    }

    pub fn write_indefinite_array(&mut self) {
        self.buffer.u8((MAJOR_ARRAY << 5) | AI_INDEF);
    }

    pub fn write_indefinite_map(&mut self) {
        self.buffer.u8((MAJOR_MAP << 5) | AI_INDEF);
    }

    pub fn write_break(&mut self) {
        self.buffer.u8(BREAK);
    }
}

/// An [`Encoder`] bound to an output sink.
///
/// Writes go to the in-memory buffer; [`flush`](SinkEncoder::flush) moves
/// them into the sink. Bytes still pending when the encoder is dropped are
/// discarded.
#[derive(Debug)]
pub struct SinkEncoder<W: Write> {
    encoder: Encoder,
    sink: W,
}

impl<W: Write> SinkEncoder<W> {
    pub fn new(sink: W) -> Self {
        Self {
            encoder: Encoder::new(),
            sink,
        }
    }

    pub fn get_ref(&self) -> &W {
        &self.sink
    }

    pub fn get_mut(&mut self) -> &mut W {
        &mut self.sink
    }

    /// Writes the pending bytes to the sink and flushes it. On failure the
    /// bytes stay pending.
    pub fn flush(&mut self) -> Result<()> {
        self.sink.write_all(self.encoder.buffer.as_slice())?;
        self.encoder.buffer.reset();
        self.sink.flush()?;
        Ok(())
    }

    /// Flushes and returns the sink.
    pub fn into_inner(mut self) -> Result<W> {
        self.flush()?;
        Ok(self.sink)
    }
}

impl<W: Write> Deref for SinkEncoder<W> {
    type Target = Encoder;

    fn deref(&self) -> &Encoder {
        &self.encoder
    }
}

impl<W: Write> DerefMut for SinkEncoder<W> {
    fn deref_mut(&mut self) -> &mut Encoder {
        &mut self.encoder
    }
}

/// Encodes `value` into a fresh byte vector.
pub fn encode<T: ToCbor + ?Sized>(value: &T) -> Result<Vec<u8>> {
    Encoder::new().encode(value)
}

/// Encodes `value` and appends it to `sink`, handing the sink back.
pub fn encode_to<T, W>(value: &T, sink: W) -> Result<W>
where
    T: ToCbor + ?Sized,
    W: Write,
{
    let mut encoder = SinkEncoder::new(sink);
    encoder.write(value)?;
    encoder.into_inner()
}

impl ToCbor for Value {
    fn serialize_into(&self, encoder: &mut Encoder) -> Result<()> {
        encoder.write_value(self);
        Ok(())
    }
}

impl ToCbor for Integer {
    fn serialize_into(&self, encoder: &mut Encoder) -> Result<()> {
        encoder.write_integer(self);
        Ok(())
    }
}

impl ToCbor for Tagged {
    fn serialize_into(&self, encoder: &mut Encoder) -> Result<()> {
        encoder.write_tag_header(self.tag);
        encoder.write_value(&self.value);
        Ok(())
    }
}

impl ToCbor for Simple {
    fn serialize_into(&self, encoder: &mut Encoder) -> Result<()> {
        encoder.write_simple(*self);
        Ok(())
    }
}

impl ToCbor for bool {
    fn serialize_into(&self, encoder: &mut Encoder) -> Result<()> {
        encoder.write_bool(*self);
        Ok(())
    }
}

macro_rules! to_cbor_signed {
    ($($t:ty),*) => {
        $(
            impl ToCbor for $t {
                fn serialize_into(&self, encoder: &mut Encoder) -> Result<()> {
                    encoder.write_i64(*self as i64);
                    Ok(())
                }
            }
        )*
    };
}

macro_rules! to_cbor_unsigned {
    ($($t:ty),*) => {
        $(
            impl ToCbor for $t {
                fn serialize_into(&self, encoder: &mut Encoder) -> Result<()> {
                    encoder.write_u64(*self as u64);
                    Ok(())
                }
            }
        )*
    };
}

to_cbor_signed!(i8, i16, i32, i64, isize);
to_cbor_unsigned!(u8, u16, u32, u64, usize);

impl ToCbor for i128 {
    fn serialize_into(&self, encoder: &mut Encoder) -> Result<()> {
        encoder.write_integer(&Integer::from(*self));
        Ok(())
    }
}

impl ToCbor for u128 {
    fn serialize_into(&self, encoder: &mut Encoder) -> Result<()> {
        encoder.write_integer(&Integer::from(*self));
        Ok(())
    }
}

impl ToCbor for f32 {
    fn serialize_into(&self, encoder: &mut Encoder) -> Result<()> {
        encoder.write_float(f64::from(*self));
        Ok(())
    }
}

impl ToCbor for f64 {
    fn serialize_into(&self, encoder: &mut Encoder) -> Result<()> {
        encoder.write_float(*self);
        Ok(())
    }
}

impl ToCbor for str {
    fn serialize_into(&self, encoder: &mut Encoder) -> Result<()> {
        encoder.write_text(self);
        Ok(())
    }
}

impl ToCbor for String {
    fn serialize_into(&self, encoder: &mut Encoder) -> Result<()> {
        encoder.write_text(self);
        Ok(())
    }
}

impl ToCbor for SystemTime {
    fn substitute(&self) -> Option<Value> {
        Some(Value::Timestamp(Epoch::from(*self)))
    }
}

impl<T: ToCbor> ToCbor for Option<T> {
    fn serialize_into(&self, encoder: &mut Encoder) -> Result<()> {
        match self {
            Some(value) => value.serialize_into(encoder),
            None => {
                encoder.write_nil();
                Ok(())
            }
        }
    }
}

impl<T: ToCbor> ToCbor for [T] {
    fn serialize_into(&self, encoder: &mut Encoder) -> Result<()> {
        encoder.write_array_header(self.len() as u64);
        for item in self {
            item.serialize_into(encoder)?;
        }
        Ok(())
    }
}

impl<T: ToCbor> ToCbor for Vec<T> {
    fn serialize_into(&self, encoder: &mut Encoder) -> Result<()> {
        self.as_slice().serialize_into(encoder)
    }
}

impl<T: ToCbor + ?Sized> ToCbor for &T {
    fn serialize_into(&self, encoder: &mut Encoder) -> Result<()> {
        (**self).serialize_into(encoder)
    }
}

impl<T: ToCbor + ?Sized> ToCbor for Box<T> {
    fn serialize_into(&self, encoder: &mut Encoder) -> Result<()> {
        (**self).serialize_into(encoder)
    }
}
