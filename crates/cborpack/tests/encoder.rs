use std::io::{self, Write};
use std::time::{Duration, UNIX_EPOCH};

use cborpack::{
    decode, decode_with, encode, encode_to, CborError, DecodeOptions, Encoder, Result, SinkEncoder,
    ToCbor, Value,
};

#[test]
fn write_then_flush() {
    let mut encoder = Encoder::new();
    encoder.write(&Value::Array(vec![])).unwrap();
    assert_eq!(encoder.flush(), [0x80]);
    assert!(encoder.is_empty());
}

#[test]
fn low_level_writers() {
    let mut encoder = Encoder::new();
    encoder.write_nil();
    assert_eq!(encoder.flush(), [0xf6]);

    for (len, expected) in [(0u64, 0x80u8), (1, 0x81)] {
        encoder.write_array_header(len);
        assert_eq!(encoder.flush(), [expected]);
    }
    for (len, expected) in [(0u64, 0xa0u8), (1, 0xa1)] {
        encoder.write_map_header(len);
        assert_eq!(encoder.flush(), [expected]);
    }

    encoder.write_i64(-1);
    encoder.write_i64(i64::MIN);
    encoder.write_u64(u64::MAX);
    encoder.write_bool(true);
    encoder.write_tag_header(2);
    assert_eq!(
        encoder.flush(),
        [
            0x20, 0x3b, 0x7f, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x1b, 0xff, 0xff, 0xff,
            0xff, 0xff, 0xff, 0xff, 0xff, 0xf5, 0xc2
        ]
    );
}

#[test]
fn pending_bytes_accumulate_until_flush() {
    let mut encoder = Encoder::new();
    encoder.write(&1u8).unwrap();
    encoder.write("a").unwrap();
    assert_eq!(encoder.len(), 3);
    assert_eq!(encoder.buffer().as_slice(), [0x01, 0x61, 0x61]);
    assert_eq!(encoder.flush(), [0x01, 0x61, 0x61]);
    assert_eq!(encoder.flush(), Vec::<u8>::new());
}

#[test]
fn encode_discards_pending_bytes() {
    let mut encoder = Encoder::new();
    encoder.write_nil();
    assert_eq!(encoder.encode(&true).unwrap(), [0xf5]);
}

#[test]
fn buffer_is_shared_with_caller() {
    let mut encoder = Encoder::new();
    encoder.buffer_mut().buf(b"frsyuki");
    assert_eq!(encoder.buffer().as_slice(), b"frsyuki");
    encoder.write_nil();
    let buffer = encoder.into_buffer();
    assert_eq!(buffer.as_slice(), b"frsyuki\xf6");
}

/// Writes itself through the low-level API.
struct WritesDirectly;

impl ToCbor for WritesDirectly {
    fn serialize_into(&self, encoder: &mut Encoder) -> Result<()> {
        encoder.write_array_header(2);
        encoder.write(&1u8)?;
        encoder.write(&2u8)
    }
}

/// Hands back an equivalent value.
struct Substitutes;

impl ToCbor for Substitutes {
    fn substitute(&self) -> Option<Value> {
        Some(Value::from(vec![Value::from(1u8), Value::from(2u8)]))
    }
}

/// Has no encoding.
struct Opaque;

impl ToCbor for Opaque {}

#[test]
fn custom_serialization() {
    let expected = encode(&vec![1u8, 2]).unwrap();
    assert_eq!(expected, [0x82, 0x01, 0x02]);
    assert_eq!(encode(&WritesDirectly).unwrap(), expected);
    assert_eq!(encode(&Substitutes).unwrap(), expected);
    assert_eq!(encode(&vec![WritesDirectly]).unwrap(), [0x81, 0x82, 0x01, 0x02]);
}

#[test]
fn custom_serialization_into_sink() {
    let expected = encode(&vec![1u8, 2]).unwrap();
    assert_eq!(encode_to(&WritesDirectly, Vec::new()).unwrap(), expected);
    assert_eq!(encode_to(&Substitutes, Vec::new()).unwrap(), expected);

    let mut sink = vec![0xaa];
    sink = encode_to(&Substitutes, sink).unwrap();
    assert_eq!(sink, [0xaa, 0x82, 0x01, 0x02]);
}

#[test]
fn unsupported_type_fails_without_partial_output() {
    match encode(&Opaque) {
        Err(CborError::Unsupported(name)) => assert!(name.ends_with("Opaque"), "{name}"),
        other => panic!("expected unsupported, got {other:?}"),
    }

    let mut encoder = Encoder::new();
    encoder.write_nil();
    let err = encoder.write(&vec![Some(1u8), None]).and_then(|_| encoder.write(&vec![Opaque]));
    assert!(matches!(err, Err(CborError::Unsupported(_))));
    assert_eq!(encoder.flush(), [0xf6, 0x82, 0x01, 0xf6]);
}

struct FailingSink;

impl Write for FailingSink {
    fn write(&mut self, _: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn sink_failure_is_io_error() {
    let err = encode_to(&Value::Null, FailingSink).map(|_| ()).unwrap_err();
    assert_eq!(err, CborError::Io(io::ErrorKind::BrokenPipe));
}

#[test]
fn sink_encoder_writes_through_on_flush() {
    let mut encoder = SinkEncoder::new(Vec::new());
    encoder.write_nil();
    assert!(encoder.get_ref().is_empty());
    assert_eq!(encoder.len(), 1);
    encoder.flush().unwrap();
    assert!(encoder.is_empty());
    assert_eq!(encoder.get_ref(), &[0xf6]);

    encoder.write(&vec![1u8]).unwrap();
    assert_eq!(encoder.into_inner().unwrap(), [0xf6, 0x81, 0x01]);
}

#[test]
fn sink_encoder_keeps_bytes_when_sink_fails() {
    let mut encoder = SinkEncoder::new(FailingSink);
    encoder.write_nil();
    assert_eq!(encoder.flush(), Err(CborError::Io(io::ErrorKind::BrokenPipe)));
    assert_eq!(encoder.buffer().as_slice(), [0xf6]);
}

#[test]
fn deep_nesting_encodes_on_a_small_stack() {
    const DEPTH: usize = 10_000;
    let mut bytes = vec![0x81; DEPTH];
    bytes.push(0x00);
    let value = decode_with(&bytes, DecodeOptions::new().max_depth(DEPTH)).unwrap();

    let encoded = std::thread::scope(|s| {
        std::thread::Builder::new()
            .stack_size(128 * 1024)
            .spawn_scoped(s, || encode(&value))
            .unwrap()
            .join()
            .unwrap()
    });
    assert_eq!(encoded.unwrap(), bytes);

    // Dropping a value recurses, so take it apart level by level.
    let mut value = value;
    while let Value::Array(mut items) = value {
        value = items.pop().unwrap_or(Value::Null);
    }
    assert_eq!(value, Value::from(0u8));
}

#[test]
fn std_types() {
    assert_eq!(encode(&None::<u8>).unwrap(), [0xf6]);
    assert_eq!(encode(&Some(-1i32)).unwrap(), [0x20]);
    assert_eq!(encode("abc").unwrap(), [0x63, b'a', b'b', b'c']);
    assert_eq!(encode(&String::from("")).unwrap(), [0x60]);
    assert_eq!(encode(&1.5f32).unwrap(), [0xf9, 0x3e, 0x00]);
    assert_eq!(encode(&(1u128 << 64)).unwrap(), [0xc2, 0x49, 1, 0, 0, 0, 0, 0, 0, 0, 0]);
    assert_eq!(encode(&(-(1i128 << 64) - 1)).unwrap(), [0xc3, 0x49, 1, 0, 0, 0, 0, 0, 0, 0, 0]);
    assert_eq!(
        encode(&(UNIX_EPOCH + Duration::from_secs(4711))).unwrap(),
        [0xc1, 0x19, 0x12, 0x67]
    );
    assert_eq!(encode(&Box::new(7u8)).unwrap(), [0x07]);
}

#[test]
fn indefinite_helpers() {
    let mut encoder = Encoder::new();
    encoder.write_indefinite_array();
    encoder.write(&1u8).unwrap();
    encoder.write_indefinite_text();
    encoder.write("ab").unwrap();
    encoder.write("c").unwrap();
    encoder.write_break();
    encoder.write_indefinite_bytes();
    encoder.write_bytes(b"x");
    encoder.write_break();
    encoder.write_indefinite_map();
    encoder.write_break();
    encoder.write_break();
    let bytes = encoder.flush();
    assert_eq!(
        decode(&bytes).unwrap(),
        Value::from(vec![
            Value::from(1u8),
            Value::from("abc"),
            Value::from(&b"x"[..]),
            Value::Map(vec![]),
        ])
    );
}

#[test]
fn maps_keep_order_and_duplicates() {
    let map = Value::Map(vec![
        (Value::from("b"), Value::from(1u8)),
        (Value::from("a"), Value::from(2u8)),
        (Value::from("b"), Value::from(3u8)),
    ]);
    let bytes = encode(&map).unwrap();
    assert_eq!(
        bytes,
        [0xa3, 0x61, b'b', 0x01, 0x61, b'a', 0x02, 0x61, b'b', 0x03]
    );
    assert_eq!(decode(&bytes).unwrap(), map);
}
