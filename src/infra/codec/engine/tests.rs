//! Raw ↔ uncalibrated ↔ engineering conversions for each encoding.
use super::*;
use crate::test_support::{parameter, schema, CODEC_SCHEMA};

#[test]
/// Two's complement fields are sign-extended from their own width.
fn test_twos_complement_round_trip() {
    let schema = schema(CODEC_SCHEMA);
    let typed = parameter(&schema, "/Codec/s12");
    let raw = RawBits::from_u64(0xFFE, 12);
    assert_eq!(decode_raw(&typed, &raw).unwrap(), Uncalibrated::Signed(-2));
    assert_eq!(encode_raw(&typed, &Uncalibrated::Signed(-2), 12).unwrap(), raw);
    assert!(matches!(
        encode_raw(&typed, &Uncalibrated::Signed(2048), 12),
        Err(ValueError::OutOfRange { bits: 12, .. })
    ));
}

#[test]
/// Sign-magnitude and ones' complement keep a separate sign bit.
fn test_sign_magnitude_and_ones_complement() {
    let schema = schema(CODEC_SCHEMA);
    let sm = parameter(&schema, "/Codec/sm8");
    let oc = parameter(&schema, "/Codec/oc8");
    assert_eq!(
        decode_raw(&sm, &RawBits::from_u64(0x85, 8)).unwrap(),
        Uncalibrated::Signed(-5)
    );
    assert_eq!(
        encode_raw(&sm, &Uncalibrated::Signed(-5), 8).unwrap(),
        RawBits::from_u64(0x85, 8)
    );
    assert_eq!(
        decode_raw(&oc, &RawBits::from_u64(0xFA, 8)).unwrap(),
        Uncalibrated::Signed(-5)
    );
    assert_eq!(
        encode_raw(&oc, &Uncalibrated::Signed(-5), 8).unwrap(),
        RawBits::from_u64(0xFA, 8)
    );
}

#[test]
/// BCD digits map one per nibble; non-decimal nibbles are rejected.
fn test_bcd() {
    let schema = schema(CODEC_SCHEMA);
    let typed = parameter(&schema, "/Codec/bcd");
    assert_eq!(
        decode_raw(&typed, &RawBits::from_u64(0x1234, 16)).unwrap(),
        Uncalibrated::Unsigned(1234)
    );
    assert_eq!(
        encode_raw(&typed, &Uncalibrated::Unsigned(907), 16).unwrap(),
        RawBits::from_u64(0x0907, 16)
    );
    assert!(decode_raw(&typed, &RawBits::from_u64(0x12A4, 16)).is_err());
    assert!(encode_raw(&typed, &Uncalibrated::Unsigned(12345), 16).is_err());
}

#[test]
/// Single precision floats read back with their short decimal form.
fn test_ieee754_single() {
    let schema = schema(CODEC_SCHEMA);
    let typed = parameter(&schema, "/Codec/f32");
    let raw = encode_raw(&typed, &Uncalibrated::Float(0.1), 32).unwrap();
    assert_eq!(raw.to_u64(), Some(0.1f32.to_bits() as u64));
    assert_eq!(decode_raw(&typed, &raw).unwrap(), Uncalibrated::Float(0.1));
}

#[test]
/// Strings are NUL padded on encode and trimmed on decode.
fn test_utf8_padding() {
    let schema = schema(CODEC_SCHEMA);
    let typed = parameter(&schema, "/Codec/text");
    let raw = encode_raw(&typed, &Uncalibrated::Text("ok".into()), 32).unwrap();
    assert_eq!(raw.as_bytes(), b"ok\0\0");
    assert_eq!(
        decode_raw(&typed, &raw).unwrap(),
        Uncalibrated::Text("ok".into())
    );
    assert!(encode_raw(&typed, &Uncalibrated::Text("toolong".into()), 32).is_err());
}

#[test]
/// Binary fields accept hex text and keep their width.
fn test_binary_hex() {
    let schema = schema(CODEC_SCHEMA);
    let typed = parameter(&schema, "/Codec/blob");
    let value = parse_uncalibrated(&typed, "0x0ab").unwrap();
    let raw = encode_raw(&typed, &value, 12).unwrap();
    assert_eq!(raw.len(), 12);
    assert_eq!(raw.to_u64(), Some(0xAB));
    assert_eq!(to_engineering(&typed, &decode_raw(&typed, &raw).unwrap(), None).unwrap(), "0x0ab");
}

#[test]
/// Polynomial calibration both ways.
fn test_calibrated_temperature() {
    let schema = schema(CODEC_SCHEMA);
    let typed = parameter(&schema, "/Codec/temp");
    let calibrator = typed.default_calibrator();
    let uncal = from_engineering(&typed, "10", calibrator).unwrap();
    assert_eq!(uncal, Uncalibrated::Unsigned(100));
    assert_eq!(to_engineering(&typed, &uncal, calibrator).unwrap(), "10");
    assert_eq!(typed.units(), Some("degC"));
}

#[test]
/// Enumeration labels, including ranged ones.
fn test_enumerated_labels() {
    let schema = schema(CODEC_SCHEMA);
    let typed = parameter(&schema, "/Codec/mode");
    assert_eq!(
        to_engineering(&typed, &Uncalibrated::Unsigned(1), None).unwrap(),
        "ON"
    );
    assert_eq!(
        to_engineering(&typed, &Uncalibrated::Unsigned(5), None).unwrap(),
        "SPECIAL"
    );
    assert_eq!(
        from_engineering(&typed, "OFF", None).unwrap(),
        Uncalibrated::Unsigned(0)
    );
    assert_eq!(
        from_engineering(&typed, "2", None).unwrap(),
        Uncalibrated::Unsigned(2)
    );
    assert!(from_engineering(&typed, "MAYBE", None).is_err());
}

#[test]
/// Boolean strings default to True/False and compare case-insensitively.
fn test_boolean_strings() {
    let schema = schema(CODEC_SCHEMA);
    let typed = parameter(&schema, "/Codec/flag");
    assert_eq!(
        to_engineering(&typed, &Uncalibrated::Unsigned(1), None).unwrap(),
        "True"
    );
    assert_eq!(
        from_engineering(&typed, "false", None).unwrap(),
        Uncalibrated::Unsigned(0)
    );
}

#[test]
/// Time values are shown as offset + scale * raw.
fn test_relative_time() {
    let schema = schema(CODEC_SCHEMA);
    let typed = parameter(&schema, "/Codec/ticks");
    assert_eq!(
        to_engineering(&typed, &Uncalibrated::Unsigned(8), None).unwrap(),
        "12"
    );
    assert_eq!(
        from_engineering(&typed, "12", None).unwrap(),
        Uncalibrated::Unsigned(8)
    );
}

#[test]
/// Unsigned fields refuse negative and oversized values.
fn test_unsigned_range() {
    let schema = schema(CODEC_SCHEMA);
    let typed = parameter(&schema, "/Codec/u8");
    assert_eq!(
        encode_raw(&typed, &Uncalibrated::Unsigned(255), 8).unwrap(),
        RawBits::from_u64(0xFF, 8)
    );
    assert!(encode_raw(&typed, &Uncalibrated::Unsigned(256), 8).is_err());
    assert!(parse_uncalibrated(&typed, "-1").is_err());
    assert_eq!(
        parse_uncalibrated(&typed, "0x2A").unwrap(),
        Uncalibrated::Unsigned(42)
    );
}

#[test]
fn test_sign_extend() {
    assert_eq!(sign_extend(0b1111, 4), -1);
    assert_eq!(sign_extend(0b0111, 4), 7);
    assert_eq!(sign_extend(u64::MAX, 64), -1);
}
