use cborpack::format::{float_repr, head_len};
use cborpack::{decode, encode, Decoder, Epoch, Integer, Simple, Value};
use proptest::prelude::*;

fn simple_code() -> impl Strategy<Value = u8> {
    prop_oneof![0u8..=19, Just(23u8), 32u8..=255]
}

fn finite_or_infinite() -> impl Strategy<Value = f64> {
    any::<f64>().prop_filter("NaN never compares equal", |f| !f.is_nan())
}

fn arb_value() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::from),
        any::<i64>().prop_map(Value::from),
        any::<u64>().prop_map(Value::from),
        any::<i128>().prop_map(Value::from),
        finite_or_infinite().prop_map(Value::from),
        any::<f32>()
            .prop_filter("NaN never compares equal", |f| !f.is_nan())
            .prop_map(Value::from),
        proptest::collection::vec(any::<u8>(), 0..48).prop_map(Value::from),
        ".{0,24}".prop_map(Value::from),
        simple_code().prop_map(|c| Value::Simple(Simple::new(c).unwrap())),
        any::<i64>().prop_map(|s| Value::Timestamp(Epoch::Integer(Integer::from(s)))),
        finite_or_infinite().prop_map(|s| Value::Timestamp(Epoch::Float(s))),
    ];
    leaf.prop_recursive(4, 64, 8, |inner| {
        prop_oneof![
            proptest::collection::vec(inner.clone(), 0..8).prop_map(Value::Array),
            proptest::collection::vec((inner.clone(), inner.clone()), 0..8).prop_map(Value::Map),
            // Tags 1..=3 have built-in meanings.
            (prop_oneof![Just(0u64), 4u64..], inner).prop_map(|(tag, v)| Value::tagged(tag, v)),
        ]
    })
}

proptest! {
    #[test]
    fn round_trip(value in arb_value()) {
        let bytes = encode(&value).unwrap();
        prop_assert_eq!(decode(&bytes).unwrap(), value);
    }

    #[test]
    fn chunking_does_not_change_output(
        values in proptest::collection::vec(arb_value(), 1..6),
        step in 1usize..17,
    ) {
        let mut data = Vec::new();
        for v in &values {
            data.extend(encode(v).unwrap());
        }
        let mut decoder = Decoder::new();
        let mut out = Vec::new();
        for piece in data.chunks(step) {
            decoder.feed_each(piece, |v| out.push(v)).unwrap();
        }
        prop_assert_eq!(out, values);
        prop_assert_eq!(decoder.buffered(), 0);
    }

    #[test]
    fn unsigned_heads_are_minimal(n in any::<u64>()) {
        prop_assert_eq!(encode(&n).unwrap().len(), head_len(n));
    }

    #[test]
    fn negative_heads_are_minimal(n in i64::MIN..0) {
        prop_assert_eq!(encode(&n).unwrap().len(), head_len(!(n as u64)));
    }

    #[test]
    fn floats_round_trip_bit_exact(f in any::<f64>()) {
        let bytes = encode(&f).unwrap();
        prop_assert_eq!(bytes.len(), float_repr(f).encoded_len());
        match decode(&bytes).unwrap() {
            Value::Float(back) if f.is_nan() => prop_assert!(back.is_nan()),
            Value::Float(back) => prop_assert_eq!(back.to_bits(), f.to_bits()),
            other => prop_assert!(false, "decoded {:?}", other),
        }
    }

    #[test]
    fn truncation_is_end_of_input(value in arb_value(), cut in any::<prop::sample::Index>()) {
        let bytes = encode(&value).unwrap();
        let at = cut.index(bytes.len());
        prop_assert_eq!(decode(&bytes[..at]), Err(cborpack::CborError::EndOfInput));
    }
}
