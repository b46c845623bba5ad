//! [`Decoder`]: incremental, resumable CBOR parser.
//!
//! Input is appended with [`Decoder::feed`]. Each call to [`Decoder::read`]
//! consumes items until one top-level value is complete. Containers that are
//! still open when the input runs out stay on an explicit frame stack, so the
//! next `feed` + `read` continues where the previous one stopped.

use std::collections::HashMap;
use std::fmt;
use std::io::Read;

use cborpack_buffers::Buffer;
use tracing::{debug, trace};

use crate::error::{CborError, Result};
use crate::format::*;
use crate::integer::Integer;
use crate::options::DecodeOptions;
use crate::value::{Epoch, Simple, Value};

/// Turns the inner value of a tag into a domain value.
pub type TagMaterializer = Box<dyn Fn(Value) -> Result<Value> + Send + Sync>;

/// An open container waiting for more items.
#[derive(Debug)]
enum Frame {
    /// `remaining` is `None` for indefinite-length arrays.
    Array {
        items: Vec<Value>,
        remaining: Option<u64>,
    },
    /// `remaining` counts pairs; `key` holds a key whose value has not arrived.
    Map {
        entries: Vec<(Value, Value)>,
        remaining: Option<u64>,
        key: Option<Value>,
    },
    /// Indefinite-length byte string
    Bytes(Vec<u8>),
    /// Indefinite-length text string
    Text(String),
    Tag(u64),
}

/// Result of reading one head (plus payload, for strings).
enum Item {
    Value(Value),
    Open(Frame),
    Break,
}

pub struct Decoder {
    buffer: Buffer,
    stack: Vec<Frame>,
    options: DecodeOptions,
    materializers: HashMap<u64, TagMaterializer>,
    /// Set while the value on the stack is being skipped rather than built.
    skipping: bool,
}

impl fmt::Debug for Decoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Decoder")
            .field("buffered", &self.buffer.size())
            .field("depth", &self.stack.len())
            .field("skipping", &self.skipping)
            .field("options", &self.options)
            .field("tags", &self.materializers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder {
    pub fn new() -> Self {
        Self::with_options(DecodeOptions::default())
    }

    pub fn with_options(options: DecodeOptions) -> Self {
        Self {
            buffer: Buffer::new(),
            stack: Vec::new(),
            options,
            materializers: HashMap::new(),
            skipping: false,
        }
    }

    pub fn options(&self) -> &DecodeOptions {
        &self.options
    }

    /// Registers a materializer for `tag`. It receives the decoded inner value
    /// and its result replaces the tagged item. Bignum tags 2 and 3 are
    /// always decoded as integers and never reach a materializer.
    pub fn register_tag<F>(&mut self, tag: u64, materializer: F) -> &mut Self
    where
        F: Fn(Value) -> Result<Value> + Send + Sync + 'static,
    {
        self.materializers.insert(tag, Box::new(materializer));
        self
    }

    /// Appends bytes to the input without parsing them.
    pub fn feed(&mut self, data: &[u8]) -> &mut Self {
        trace!(bytes = data.len(), buffered = self.buffer.size(), "feed");
        self.buffer.compact();
        self.buffer.buf(data);
        self
    }

    /// Feeds `data`, then hands every value that is now complete to `f`.
    /// Bytes of an incomplete trailing value stay buffered.
    pub fn feed_each<F: FnMut(Value)>(&mut self, data: &[u8], f: F) -> Result<()> {
        self.feed(data);
        self.each(f)
    }

    /// Hands every complete buffered value to `f`.
    pub fn each<F: FnMut(Value)>(&mut self, mut f: F) -> Result<()> {
        loop {
            match self.read() {
                Ok(value) => f(value),
                Err(CborError::EndOfInput) => return Ok(()),
                Err(e) => return Err(e),
            }
        }
    }

    /// Bytes received but not yet consumed.
    pub fn buffered(&self) -> usize {
        self.buffer.size()
    }

    /// Number of containers currently open.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Read cursor within the buffered input.
    pub fn position(&self) -> usize {
        self.buffer.position()
    }

    /// Drops buffered input and any partially decoded value.
    pub fn reset(&mut self) {
        self.buffer.reset();
        self.stack.clear();
        self.skipping = false;
    }

    /// Decodes the next top-level value.
    ///
    /// [`CborError::EndOfInput`] means more bytes are needed; the decoder
    /// state is intact and the call can be retried after another `feed`.
    pub fn read(&mut self) -> Result<Value> {
        let result = self.read_value();
        match &result {
            Ok(value) => trace!(kind = value.kind_name(), "value complete"),
            Err(e) => self.log_failure(e),
        }
        result
    }

    /// Consumes the next top-level value without building it, or the rest of
    /// a value an earlier `read` left open. Tags are not materialized and
    /// string payloads are neither copied nor validated.
    ///
    /// After [`CborError::EndOfInput`] the skip stays pending: the next
    /// `skip` or `read` finishes it first.
    pub fn skip(&mut self) -> Result<()> {
        self.skipping = true;
        let result = self.finish_value().map(drop);
        if result.is_ok() || self.stack.is_empty() {
            self.skipping = false;
        }
        match &result {
            Ok(()) => trace!("value skipped"),
            Err(e) => self.log_failure(e),
        }
        result
    }

    /// Consumes the next item if it is `null` and reports whether it did.
    pub fn skip_nil(&mut self) -> Result<bool> {
        self.check_idle("skip_nil")?;
        if self.buffer.try_peek()? != NULL {
            return Ok(false);
        }
        self.buffer.try_u8()?;
        Ok(true)
    }

    /// Reads the head of a definite-length array and returns its element
    /// count. The elements follow as separate values for [`read`](Self::read).
    /// Any other head, indefinite arrays included, is a [`CborError::Type`]
    /// and leaves the cursor in place.
    pub fn read_array_header(&mut self) -> Result<u64> {
        self.check_idle("read_array_header")?;
        self.read_container_header(MAJOR_ARRAY, "array")
    }

    /// Like [`read_array_header`](Self::read_array_header) for maps. The
    /// count is in key-value pairs.
    pub fn read_map_header(&mut self) -> Result<u64> {
        self.check_idle("read_map_header")?;
        self.read_container_header(MAJOR_MAP, "map")
    }

    fn read_container_header(&mut self, expected: u8, name: &str) -> Result<u64> {
        self.rewind_on_error(|decoder| {
            let ib = decoder.buffer.try_u8()?;
            let (major, ai) = (ib >> 5, ib & 0x1f);
            if major != expected || ai > AI_8 {
                return Err(CborError::Type(format!(
                    "expected definite-length {name} head, got 0x{ib:02x}"
                )));
            }
            let len = decoder.read_arg(major, ai)?;
            check_length(decoder.options.max_length, len)?;
            Ok(len)
        })
    }

    fn check_idle(&self, operation: &str) -> Result<()> {
        match self.stack.len() {
            0 => Ok(()),
            _ => Err(CborError::Argument(format!(
                "{operation} called while a value is partially decoded"
            ))),
        }
    }

    fn log_failure(&self, e: &CborError) {
        if !e.is_end_of_input() {
            debug!(error = %e, position = self.buffer.position(), "decode failed");
        }
    }

    fn read_value(&mut self) -> Result<Value> {
        if self.skipping {
            self.finish_value()?;
            self.skipping = false;
        }
        self.finish_value()
    }

    /// Reads items until the outermost open value is complete.
    fn finish_value(&mut self) -> Result<Value> {
        loop {
            let value = match self.read_item()? {
                Item::Value(value) => value,
                Item::Open(frame) => {
                    self.stack.push(frame);
                    continue;
                }
                Item::Break => self.close_indefinite()?,
            };
            if let Some(value) = self.complete(value)? {
                return Ok(value);
            }
        }
    }

    /// Folds a finished item into the open frames. Returns the top-level
    /// value once the outermost frame closes.
    fn complete(&mut self, mut value: Value) -> Result<Option<Value>> {
        loop {
            let symbolize = self.options.symbolize_keys;
            let max_length = self.options.max_length;
            let skipping = self.skipping;
            let Some(top) = self.stack.last_mut() else {
                return Ok(Some(value));
            };
            match top {
                Frame::Array { items, remaining } => {
                    if !skipping {
                        if remaining.is_none() {
                            check_length(max_length, items.len() as u64 + 1)?;
                        }
                        items.push(value);
                    }
                    if !count_down(remaining) {
                        return Ok(None);
                    }
                    value = match skipping {
                        true => Value::Null,
                        false => Value::Array(std::mem::take(items)),
                    };
                }
                Frame::Map {
                    entries,
                    remaining,
                    key,
                } => match key.take() {
                    None => {
                        *key = Some(match value {
                            _ if skipping => Value::Null,
                            Value::Text(s) if symbolize => Value::Symbol(s),
                            other => other,
                        });
                        return Ok(None);
                    }
                    Some(k) => {
                        if !skipping {
                            if remaining.is_none() {
                                check_length(max_length, entries.len() as u64 + 1)?;
                            }
                            entries.push((k, value));
                        }
                        if !count_down(remaining) {
                            return Ok(None);
                        }
                        value = match skipping {
                            true => Value::Null,
                            false => Value::Map(std::mem::take(entries)),
                        };
                    }
                },
                Frame::Bytes(_) | Frame::Text(_) if skipping => return Ok(None),
                Frame::Bytes(data) => {
                    let Value::Bytes(chunk) = value else {
                        return Err(CborError::malformed("byte string chunk expected"));
                    };
                    check_length(max_length, (data.len() + chunk.len()) as u64)?;
                    data.extend_from_slice(&chunk);
                    return Ok(None);
                }
                Frame::Text(data) => {
                    let Value::Text(chunk) = value else {
                        return Err(CborError::malformed("text string chunk expected"));
                    };
                    check_length(max_length, (data.len() + chunk.len()) as u64)?;
                    data.push_str(&chunk);
                    return Ok(None);
                }
                Frame::Tag(tag) => {
                    let tag = *tag;
                    if !skipping {
                        value = self.apply_tag(tag, value)?;
                    }
                }
            }
            self.stack.pop();
        }
    }

    /// Pops the indefinite frame a validated break closes.
    fn close_indefinite(&mut self) -> Result<Value> {
        match self.stack.pop() {
            Some(Frame::Array { items, .. }) => Ok(Value::Array(items)),
            Some(Frame::Map { entries, .. }) => Ok(Value::Map(entries)),
            Some(Frame::Bytes(data)) => Ok(Value::Bytes(data)),
            Some(Frame::Text(data)) => Ok(Value::Text(data)),
            Some(Frame::Tag(_)) | None => Err(CborError::malformed("unexpected break")),
        }
    }

    fn apply_tag(&self, tag: u64, inner: Value) -> Result<Value> {
        let bignum = tag == TAG_BIGNUM || tag == TAG_NEG_BIGNUM;
        if let Some(materialize) = self.materializers.get(&tag).filter(|_| !bignum) {
            return materialize(inner);
        }
        match tag {
            TAG_BIGNUM | TAG_NEG_BIGNUM => match inner {
                Value::Bytes(magnitude) => Ok(Value::Integer(Integer::from_magnitude(
                    tag == TAG_NEG_BIGNUM,
                    &magnitude,
                ))),
                other => Err(CborError::malformed(format!(
                    "bignum tag {tag} must wrap a byte string, got {}",
                    other.kind_name()
                ))),
            },
            TAG_EPOCH => match inner {
                Value::Integer(i) => Ok(Value::Timestamp(Epoch::Integer(i))),
                Value::Float(f) => Ok(Value::Timestamp(Epoch::Float(f))),
                other => Err(CborError::malformed(format!(
                    "epoch timestamp must be a number, got {}",
                    other.kind_name()
                ))),
            },
            _ => Ok(Value::tagged(tag, inner)),
        }
    }

    /// Reads one head and, for definite strings, its payload. On any error
    /// the cursor returns to where the item started.
    fn read_item(&mut self) -> Result<Item> {
        self.rewind_on_error(Self::read_item_at)
    }

    fn rewind_on_error<T>(&mut self, read: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let start = self.buffer.position();
        let result = read(self);
        if result.is_err() {
            self.buffer.seek(start);
        }
        result
    }

    fn read_item_at(&mut self) -> Result<Item> {
        let ib = self.buffer.try_u8()?;
        let major = ib >> 5;
        let ai = ib & 0x1f;

        if let Some(chunk_major) = self.open_chunks() {
            if ib != BREAK && (major != chunk_major || ai == AI_INDEF) {
                return Err(CborError::malformed(format!(
                    "invalid chunk 0x{ib:02x} in indefinite-length string"
                )));
            }
        }

        match major {
            MAJOR_UNSIGNED => {
                let n = self.read_arg(major, ai)?;
                Ok(Item::Value(Value::Integer(Integer::from(n))))
            }
            MAJOR_NEGATIVE => {
                let n = self.read_arg(major, ai)?;
                Ok(Item::Value(Value::Integer(Integer::from_magnitude(
                    true,
                    &n.to_be_bytes(),
                ))))
            }
            MAJOR_BYTES | MAJOR_TEXT => {
                if ai == AI_INDEF {
                    self.check_depth()?;
                    return Ok(Item::Open(if major == MAJOR_TEXT {
                        Frame::Text(String::new())
                    } else {
                        Frame::Bytes(Vec::new())
                    }));
                }
                let len = self.read_arg(major, ai)?;
                check_length(self.options.max_length, len)?;
                let len = usize::try_from(len).map_err(|_| CborError::EndOfInput)?;
                let value = if self.skipping {
                    self.buffer.try_buf(len)?;
                    Value::Null
                } else if major == MAJOR_TEXT {
                    Value::Text(self.buffer.try_utf8(len)?.to_owned())
                } else {
                    Value::Bytes(self.buffer.try_buf(len)?.to_vec())
                };
                Ok(Item::Value(value))
            }
            MAJOR_ARRAY | MAJOR_MAP => {
                let remaining = if ai == AI_INDEF {
                    None
                } else {
                    let n = self.read_arg(major, ai)?;
                    check_length(self.options.max_length, n)?;
                    if n == 0 {
                        return Ok(Item::Value(if major == MAJOR_ARRAY {
                            Value::Array(Vec::new())
                        } else {
                            Value::Map(Vec::new())
                        }));
                    }
                    Some(n)
                };
                self.check_depth()?;
                // Every item takes at least one byte, so buffered input bounds
                // the preallocation regardless of the declared count.
                let available = self.buffer.size() as u64;
                let capacity = match self.skipping {
                    true => 0,
                    false => remaining.unwrap_or(0).min(available) as usize,
                };
                Ok(Item::Open(if major == MAJOR_ARRAY {
                    Frame::Array {
                        items: Vec::with_capacity(capacity),
                        remaining,
                    }
                } else {
                    Frame::Map {
                        entries: Vec::with_capacity(capacity / 2),
                        remaining,
                        key: None,
                    }
                }))
            }
            MAJOR_TAG => {
                let tag = self.read_arg(major, ai)?;
                self.check_depth()?;
                Ok(Item::Open(Frame::Tag(tag)))
            }
            _ => self.read_simple(ai),
        }
    }

    fn read_simple(&mut self, ai: u8) -> Result<Item> {
        let value = match ai {
            20 => Value::Bool(false),
            21 => Value::Bool(true),
            22 => Value::Null,
            0..=19 | 23 => Value::Simple(Simple::new(ai)?),
            AI_1 => {
                let code = self.buffer.try_u8()?;
                if code < 32 {
                    return Err(CborError::malformed(format!(
                        "two-byte simple value {code} must be at least 32"
                    )));
                }
                Value::Simple(Simple::new(code)?)
            }
            AI_2 => Value::Float(decode_half(self.buffer.try_u16()?)),
            AI_4 => Value::Float(f64::from(f32::from_bits(self.buffer.try_u32()?))),
            AI_8 => Value::Float(f64::from_bits(self.buffer.try_u64()?)),
            AI_INDEF => {
                self.check_break()?;
                return Ok(Item::Break);
            }
            _ => {
                return Err(CborError::malformed(format!(
                    "reserved additional info {ai} in major type 7"
                )))
            }
        };
        Ok(Item::Value(value))
    }

    fn read_arg(&mut self, major: u8, ai: u8) -> Result<u64> {
        match ai {
            0..=23 => Ok(u64::from(ai)),
            AI_1 => Ok(u64::from(self.buffer.try_u8()?)),
            AI_2 => Ok(u64::from(self.buffer.try_u16()?)),
            AI_4 => Ok(u64::from(self.buffer.try_u32()?)),
            AI_8 => Ok(self.buffer.try_u64()?),
            _ => Err(CborError::malformed(format!(
                "additional info {ai} is not valid for major type {major}"
            ))),
        }
    }

    /// A break may only close an indefinite item where a new element starts.
    fn check_break(&self) -> Result<()> {
        match self.stack.last() {
            Some(Frame::Array {
                remaining: None, ..
            })
            | Some(Frame::Bytes(_))
            | Some(Frame::Text(_)) => Ok(()),
            Some(Frame::Map {
                remaining: None,
                key,
                ..
            }) => match key {
                None => Ok(()),
                Some(_) => Err(CborError::malformed("break between map key and value")),
            },
            Some(Frame::Tag(tag)) => Err(CborError::malformed(format!(
                "break in place of tag {tag} content"
            ))),
            Some(_) => Err(CborError::malformed("break inside definite-length container")),
            None => Err(CborError::malformed("break outside indefinite-length item")),
        }
    }

    fn open_chunks(&self) -> Option<u8> {
        match self.stack.last() {
            Some(Frame::Bytes(_)) => Some(MAJOR_BYTES),
            Some(Frame::Text(_)) => Some(MAJOR_TEXT),
            _ => None,
        }
    }

    fn check_depth(&self) -> Result<()> {
        let limit = self.options.max_depth;
        if self.stack.len() >= limit {
            return Err(CborError::LimitExceeded {
                what: "depth",
                limit: limit as u64,
            });
        }
        Ok(())
    }
}

/// Counts one element off a definite container. True when it is full.
fn count_down(remaining: &mut Option<u64>) -> bool {
    match remaining {
        Some(n) => {
            *n -= 1;
            *n == 0
        }
        None => false,
    }
}

fn check_length(max_length: Option<u64>, len: u64) -> Result<()> {
    match max_length {
        Some(limit) if len > limit => Err(CborError::LimitExceeded {
            what: "length",
            limit,
        }),
        _ => Ok(()),
    }
}

/// Decodes exactly one value from `data`.
pub fn decode(data: &[u8]) -> Result<Value> {
    decode_with(data, DecodeOptions::default())
}

/// Decodes exactly one value from `data`. Bytes after it are malformed.
pub fn decode_with(data: &[u8], options: DecodeOptions) -> Result<Value> {
    let mut decoder = Decoder::with_options(options);
    decoder.feed(data);
    let value = decoder.read()?;
    match decoder.buffered() {
        0 => Ok(value),
        extra => Err(CborError::malformed(format!(
            "{extra} extra bytes after the decoded value"
        ))),
    }
}

/// Reads `reader` to the end and decodes exactly one value from it.
pub fn decode_from<R: Read>(mut reader: R, options: DecodeOptions) -> Result<Value> {
    let mut data = Vec::new();
    reader.read_to_end(&mut data)?;
    decode_with(&data, options)
}
