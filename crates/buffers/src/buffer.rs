//! Growable byte arena with a read cursor.

use std::str;

use crate::BufferError;

/// A growable byte buffer with independent read and write cursors.
///
/// Writes always append at the end. Reads start at the read cursor `x` and
/// only advance it when they succeed, so a caller can save [`position`],
/// attempt a multi-step read and [`seek`] back if the input turned out to
/// be incomplete.
///
/// # Example
///
/// ```
/// use cborpack_buffers::Buffer;
///
/// let mut buffer = Buffer::new();
/// buffer.u8(0x01);
/// buffer.u16(0x0203);
/// assert_eq!(buffer.try_u8(), Ok(0x01));
/// assert_eq!(buffer.try_u16(), Ok(0x0203));
/// assert_eq!(buffer.size(), 0);
/// ```
///
/// [`position`]: Buffer::position
/// [`seek`]: Buffer::seek
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Buffer {
    /// Backing storage. Bytes before `x` are consumed.
    pub uint8: Vec<u8>,
    /// Read cursor.
    pub x: usize,
}

impl From<Vec<u8>> for Buffer {
    fn from(uint8: Vec<u8>) -> Self {
        Self { uint8, x: 0 }
    }
}

impl Buffer {
    /// Creates an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty buffer that can hold `capacity` bytes before growing.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            uint8: Vec::with_capacity(capacity),
            x: 0,
        }
    }

    /// Ensures at least `capacity` more bytes can be written without growing.
    pub fn ensure_capacity(&mut self, capacity: usize) {
        self.uint8.reserve(capacity);
    }

    /// Current read cursor.
    pub fn position(&self) -> usize {
        self.x
    }

    /// Moves the read cursor to a position previously returned by
    /// [`position`](Buffer::position). Positions past the write end are
    /// clamped to it.
    pub fn seek(&mut self, position: usize) {
        self.x = position.min(self.uint8.len());
    }

    /// Number of bytes readable from the cursor.
    pub fn size(&self) -> usize {
        self.uint8.len() - self.x
    }

    /// Total bytes held, consumed or not.
    pub fn len(&self) -> usize {
        self.uint8.len()
    }

    /// True when nothing is left to read.
    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// The readable bytes, without consuming them.
    pub fn as_slice(&self) -> &[u8] {
        &self.uint8[self.x..]
    }

    /// Returns the readable bytes and leaves the buffer empty.
    pub fn flush(&mut self) -> Vec<u8> {
        let result = self.uint8[self.x..].to_vec();
        self.reset();
        result
    }

    /// Moves the readable bytes out without copying when nothing was consumed.
    pub fn take(&mut self) -> Vec<u8> {
        self.compact();
        std::mem::take(&mut self.uint8)
    }

    /// Drops everything, keeping the allocation.
    pub fn reset(&mut self) {
        self.uint8.clear();
        self.x = 0;
    }

    /// Discards the consumed prefix. Saved positions become invalid.
    pub fn compact(&mut self) {
        if self.x > 0 {
            self.uint8.drain(..self.x);
            self.x = 0;
        }
    }

    // -----------------------------------------------------------------------
    // Write side
    // -----------------------------------------------------------------------

    /// Writes an unsigned 8-bit integer.
    #[inline]
    pub fn u8(&mut self, val: u8) {
        self.uint8.push(val);
    }

    /// Writes an unsigned 16-bit integer (big-endian).
    #[inline]
    pub fn u16(&mut self, val: u16) {
        self.uint8.extend_from_slice(&val.to_be_bytes());
    }

    /// Writes an unsigned 32-bit integer (big-endian).
    #[inline]
    pub fn u32(&mut self, val: u32) {
        self.uint8.extend_from_slice(&val.to_be_bytes());
    }

    /// Writes an unsigned 64-bit integer (big-endian).
    #[inline]
    pub fn u64(&mut self, val: u64) {
        self.uint8.extend_from_slice(&val.to_be_bytes());
    }

    /// Writes a 32-bit floating point number (big-endian).
    #[inline]
    pub fn f32(&mut self, val: f32) {
        self.uint8.extend_from_slice(&val.to_be_bytes());
    }

    /// Writes a 64-bit floating point number (big-endian).
    #[inline]
    pub fn f64(&mut self, val: f64) {
        self.uint8.extend_from_slice(&val.to_be_bytes());
    }

    /// Writes a u8 followed by a u16 (big-endian).
    pub fn u8u16(&mut self, u8_val: u8, u16_val: u16) {
        self.ensure_capacity(3);
        self.uint8.push(u8_val);
        self.uint8.extend_from_slice(&u16_val.to_be_bytes());
    }

    /// Writes a u8 followed by a u32 (big-endian).
    pub fn u8u32(&mut self, u8_val: u8, u32_val: u32) {
        self.ensure_capacity(5);
        self.uint8.push(u8_val);
        self.uint8.extend_from_slice(&u32_val.to_be_bytes());
    }

    /// Writes a u8 followed by a u64 (big-endian).
    pub fn u8u64(&mut self, u8_val: u8, u64_val: u64) {
        self.ensure_capacity(9);
        self.uint8.push(u8_val);
        self.uint8.extend_from_slice(&u64_val.to_be_bytes());
    }

    /// Writes a byte slice.
    pub fn buf(&mut self, buf: &[u8]) {
        self.uint8.extend_from_slice(buf);
    }

    /// Writes a UTF-8 string. Returns the number of bytes written.
    pub fn utf8(&mut self, s: &str) -> usize {
        self.uint8.extend_from_slice(s.as_bytes());
        s.len()
    }

    // -----------------------------------------------------------------------
    // Read side. Every method leaves the cursor alone when it fails.
    // -----------------------------------------------------------------------

    #[inline]
    fn check(&self, n: usize) -> Result<(), BufferError> {
        if n > self.size() {
            Err(BufferError::EndOfBuffer)
        } else {
            Ok(())
        }
    }

    /// Peeks at the byte under the cursor.
    pub fn try_peek(&self) -> Result<u8, BufferError> {
        self.check(1)?;
        Ok(self.uint8[self.x])
    }

    /// Reads an unsigned 8-bit integer.
    #[inline]
    pub fn try_u8(&mut self) -> Result<u8, BufferError> {
        self.check(1)?;
        let val = self.uint8[self.x];
        self.x += 1;
        Ok(val)
    }

    /// Reads an unsigned 16-bit big-endian integer.
    #[inline]
    pub fn try_u16(&mut self) -> Result<u16, BufferError> {
        self.check(2)?;
        let x = self.x;
        let val = u16::from_be_bytes([self.uint8[x], self.uint8[x + 1]]);
        self.x += 2;
        Ok(val)
    }

    /// Reads an unsigned 32-bit big-endian integer.
    #[inline]
    pub fn try_u32(&mut self) -> Result<u32, BufferError> {
        self.check(4)?;
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(&self.uint8[self.x..self.x + 4]);
        self.x += 4;
        Ok(u32::from_be_bytes(bytes))
    }

    /// Reads an unsigned 64-bit big-endian integer.
    #[inline]
    pub fn try_u64(&mut self) -> Result<u64, BufferError> {
        self.check(8)?;
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&self.uint8[self.x..self.x + 8]);
        self.x += 8;
        Ok(u64::from_be_bytes(bytes))
    }

    /// Reads `size` raw bytes.
    pub fn try_buf(&mut self, size: usize) -> Result<&[u8], BufferError> {
        self.check(size)?;
        let x = self.x;
        self.x += size;
        Ok(&self.uint8[x..x + size])
    }

    /// Reads a UTF-8 string of `size` bytes.
    pub fn try_utf8(&mut self, size: usize) -> Result<&str, BufferError> {
        self.check(size)?;
        let Self { uint8, x } = self;
        let start = *x;
        let s = str::from_utf8(&uint8[start..start + size]).map_err(|_| BufferError::InvalidUtf8)?;
        *x += size;
        Ok(s)
    }
}
