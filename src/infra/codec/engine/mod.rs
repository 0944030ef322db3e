//! Scalar value codec driven by the item's type: turns the raw bits of a single
//! field into its uncalibrated value and engineering text, and back.
//! The layout engine decides *where* a field lives; this module only decides
//! what its bits mean.
use alloc::borrow::ToOwned;
use alloc::format;
use alloc::string::{String, ToString};
use core::fmt;

use super::calibration::{calibrate, uncalibrate};
use crate::core::RawBits;
use crate::error::ValueError;
use crate::schema::{Calibrator, DataEncoding, EncodingKind, EngineeringType, TypedObject};

//==================================================================================UNCALIBRATED
/// Value of a field once its encoding is undone but before calibration.
#[derive(Debug, Clone, PartialEq)]
pub enum Uncalibrated {
    Unsigned(u64),
    Signed(i64),
    Float(f64),
    Text(String),
    Bytes(RawBits),
}

impl Uncalibrated {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Uncalibrated::Unsigned(v) => Some(*v as f64),
            Uncalibrated::Signed(v) => Some(*v as f64),
            Uncalibrated::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Uncalibrated::Unsigned(v) => i64::try_from(*v).ok(),
            Uncalibrated::Signed(v) => Some(*v),
            Uncalibrated::Float(v) => integral(*v),
            _ => None,
        }
    }

    fn as_u64(&self) -> Option<u64> {
        match self {
            Uncalibrated::Unsigned(v) => Some(*v),
            Uncalibrated::Signed(v) => u64::try_from(*v).ok(),
            Uncalibrated::Float(v) => integral(*v).and_then(|v| u64::try_from(v).ok()),
            _ => None,
        }
    }
}

impl fmt::Display for Uncalibrated {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Uncalibrated::Unsigned(v) => write!(f, "{v}"),
            Uncalibrated::Signed(v) => write!(f, "{v}"),
            Uncalibrated::Float(v) => write!(f, "{v}"),
            Uncalibrated::Text(v) => f.write_str(v),
            Uncalibrated::Bytes(v) => write!(f, "{v}"),
        }
    }
}

//==================================================================================DECODE
/// Undo the data encoding of `raw`.
pub fn decode_raw(typed: &TypedObject<'_>, raw: &RawBits) -> Result<Uncalibrated, ValueError> {
    let encoding = encoding_of(typed)?;
    match encoding.kind {
        EncodingKind::Binary => Ok(Uncalibrated::Bytes(raw.clone())),
        EncodingKind::Utf8 => decode_text(typed, raw),
        kind => {
            let bits = raw.len();
            if bits == 0 {
                return Err(unsupported(typed, "zero-width numeric field"));
            }
            let word = raw
                .to_u64()
                .ok_or_else(|| unsupported(typed, "numeric field wider than 64 bits"))?;
            decode_number(typed, kind, word, bits, raw)
        }
    }
}

fn decode_number(
    typed: &TypedObject<'_>,
    kind: EncodingKind,
    word: u64,
    bits: usize,
    raw: &RawBits,
) -> Result<Uncalibrated, ValueError> {
    let negative = (word >> (bits - 1)) & 1 == 1;
    let value = match kind {
        EncodingKind::Unsigned => Uncalibrated::Unsigned(word),
        EncodingKind::TwosComplement => Uncalibrated::Signed(sign_extend(word, bits)),
        EncodingKind::SignMagnitude => {
            let magnitude = (word & mask(bits - 1)) as i64;
            Uncalibrated::Signed(if negative { -magnitude } else { magnitude })
        }
        EncodingKind::OnesComplement => {
            if negative {
                Uncalibrated::Signed(-((!word & mask(bits)) as i64))
            } else {
                Uncalibrated::Signed(word as i64)
            }
        }
        EncodingKind::Bcd => {
            if bits % 4 != 0 {
                return Err(unsupported(typed, "BCD size must be a multiple of 4 bits"));
            }
            let mut value = 0u64;
            for digit in (0..bits / 4).rev() {
                let nibble = (word >> (digit * 4)) & 0xF;
                if nibble > 9 {
                    return Err(ValueError::InvalidText {
                        item: typed.path().to_owned(),
                        text: raw.to_string(),
                    });
                }
                value = value * 10 + nibble;
            }
            Uncalibrated::Unsigned(value)
        }
        EncodingKind::Ieee754 => match bits {
            32 => {
                let single = f32::from_bits(word as u32);
                // Widen through the shortest text form so 0.1f32 reads as 0.1.
                let widened = format!("{single}").parse::<f64>().unwrap_or(single as f64);
                Uncalibrated::Float(widened)
            }
            64 => Uncalibrated::Float(f64::from_bits(word)),
            _ => return Err(unsupported(typed, "IEEE 754 fields must be 32 or 64 bits")),
        },
        EncodingKind::Utf8 | EncodingKind::Binary => {
            return Err(unsupported(typed, "not a numeric encoding"))
        }
    };
    Ok(value)
}

fn decode_text(typed: &TypedObject<'_>, raw: &RawBits) -> Result<Uncalibrated, ValueError> {
    if raw.len() % 8 != 0 {
        return Err(unsupported(typed, "UTF-8 fields must be whole bytes"));
    }
    let bytes = raw.as_bytes();
    let end = bytes.iter().rposition(|b| *b != 0).map_or(0, |i| i + 1);
    core::str::from_utf8(&bytes[..end])
        .map(|text| Uncalibrated::Text(text.to_owned()))
        .map_err(|_| ValueError::InvalidText {
            item: typed.path().to_owned(),
            text: raw.to_string(),
        })
}

//==================================================================================ENCODE
/// Apply the data encoding to `value`, producing exactly `bits` bits.
pub fn encode_raw(
    typed: &TypedObject<'_>,
    value: &Uncalibrated,
    bits: usize,
) -> Result<RawBits, ValueError> {
    let encoding = encoding_of(typed)?;
    let out_of_range = || ValueError::OutOfRange {
        item: typed.path().to_owned(),
        value: value.to_string(),
        bits,
    };
    let invalid = || ValueError::InvalidText {
        item: typed.path().to_owned(),
        text: value.to_string(),
    };

    match encoding.kind {
        EncodingKind::Binary => {
            let field = match value {
                Uncalibrated::Bytes(bytes) => bytes.clone(),
                Uncalibrated::Text(text) => RawBits::from_hex(text).ok_or_else(invalid)?,
                _ => return Err(invalid()),
            };
            // Only leading zeros may be dropped.
            let excess = field.len().saturating_sub(bits);
            if (0..excess).any(|i| field.bit(i)) {
                return Err(out_of_range());
            }
            Ok(field.fitted(bits))
        }
        EncodingKind::Utf8 => {
            if bits % 8 != 0 {
                return Err(unsupported(typed, "UTF-8 fields must be whole bytes"));
            }
            let text = value.to_string();
            if text.len() * 8 > bits {
                return Err(out_of_range());
            }
            let mut bytes = text.into_bytes();
            bytes.resize(bits / 8, 0);
            Ok(RawBits::from_bytes(&bytes))
        }
        EncodingKind::Unsigned => {
            let v = value.as_u64().ok_or_else(invalid)?;
            if bits == 0 || v > mask(bits) {
                return Err(out_of_range());
            }
            Ok(RawBits::from_u64(v, bits))
        }
        EncodingKind::TwosComplement => {
            let v = value.as_i64().ok_or_else(invalid)?;
            if bits == 0 || !fits_signed(v, bits) {
                return Err(out_of_range());
            }
            Ok(RawBits::from_u64(v as u64 & mask(bits), bits))
        }
        EncodingKind::SignMagnitude | EncodingKind::OnesComplement => {
            let v = value.as_i64().ok_or_else(invalid)?;
            let magnitude = v.unsigned_abs();
            if bits < 2 || magnitude > mask(bits - 1) {
                return Err(out_of_range());
            }
            let word = match (encoding.kind, v < 0) {
                (EncodingKind::SignMagnitude, true) => magnitude | (1 << (bits - 1)),
                (EncodingKind::OnesComplement, true) => !magnitude & mask(bits),
                _ => magnitude,
            };
            Ok(RawBits::from_u64(word, bits))
        }
        EncodingKind::Bcd => {
            let mut v = value.as_u64().ok_or_else(invalid)?;
            if bits % 4 != 0 {
                return Err(unsupported(typed, "BCD size must be a multiple of 4 bits"));
            }
            let mut word = 0u64;
            for digit in 0..bits / 4 {
                if digit < 16 {
                    word |= (v % 10) << (digit * 4);
                }
                v /= 10;
            }
            if v != 0 {
                return Err(out_of_range());
            }
            Ok(RawBits::from_u64(word, bits))
        }
        EncodingKind::Ieee754 => {
            let v = value.as_f64().ok_or_else(invalid)?;
            match bits {
                32 => Ok(RawBits::from_u64((v as f32).to_bits() as u64, 32)),
                64 => Ok(RawBits::from_u64(v.to_bits(), 64)),
                _ => Err(unsupported(typed, "IEEE 754 fields must be 32 or 64 bits")),
            }
        }
    }
}

//==================================================================================ENGINEERING
/// Engineering text of an uncalibrated value, after the optional calibrator.
pub fn to_engineering(
    typed: &TypedObject<'_>,
    value: &Uncalibrated,
    calibrator: Option<&Calibrator>,
) -> Result<String, ValueError> {
    let calibrated = match (calibrator, value.as_f64()) {
        (Some(calibrator), Some(x)) => Some(calibrate(calibrator, x).map_err(|source| {
            ValueError::Calibration {
                item: typed.path().to_owned(),
                source,
            }
        })?),
        _ => None,
    };
    let number = || {
        calibrated
            .or_else(|| value.as_f64())
            .ok_or_else(|| ValueError::InvalidText {
                item: typed.path().to_owned(),
                text: value.to_string(),
            })
    };

    match typed.engineering_type() {
        EngineeringType::Aggregate { .. } | EngineeringType::Array { .. } => {
            Err(ValueError::NotScalar {
                item: typed.path().to_owned(),
            })
        }
        EngineeringType::Enumerated { enumerations } => {
            let key = match calibrated {
                Some(y) => Some(round_to_i64(y)),
                None => value.as_i64(),
            };
            let label = key.and_then(|key| {
                enumerations
                    .iter()
                    .find(|e| e.value == key || e.max_value.is_some_and(|max| e.value <= key && key <= max))
            });
            match (label, key) {
                (Some(enumeration), _) => Ok(enumeration.label.clone()),
                (None, Some(key)) => Ok(format!("{key}")),
                (None, None) => Ok(value.to_string()),
            }
        }
        EngineeringType::Boolean {
            one_string_value,
            zero_string_value,
        } => {
            if number()? == 0.0 {
                Ok(zero_string_value.clone())
            } else {
                Ok(one_string_value.clone())
            }
        }
        EngineeringType::AbsoluteTime { scale, offset }
        | EngineeringType::RelativeTime { scale, offset } => {
            Ok(format!("{}", offset + scale * number()?))
        }
        EngineeringType::Integer { .. } => match calibrated {
            Some(y) => Ok(format!("{}", round_to_i64(y))),
            None => Ok(value.to_string()),
        },
        EngineeringType::Float => match calibrated {
            Some(y) => Ok(format!("{y}")),
            None => Ok(value.to_string()),
        },
        EngineeringType::String | EngineeringType::Binary => Ok(value.to_string()),
    }
}

/// Uncalibrated value for an engineering text, inverting the calibrator.
pub fn from_engineering(
    typed: &TypedObject<'_>,
    text: &str,
    calibrator: Option<&Calibrator>,
) -> Result<Uncalibrated, ValueError> {
    let trimmed = text.trim();
    let invalid = || ValueError::InvalidText {
        item: typed.path().to_owned(),
        text: text.to_owned(),
    };
    let number = match typed.engineering_type() {
        EngineeringType::Aggregate { .. } | EngineeringType::Array { .. } => {
            return Err(ValueError::NotScalar {
                item: typed.path().to_owned(),
            })
        }
        EngineeringType::String | EngineeringType::Binary => {
            return parse_uncalibrated(typed, text)
        }
        EngineeringType::Integer { .. } | EngineeringType::Float if calibrator.is_none() => {
            return parse_uncalibrated(typed, text)
        }
        EngineeringType::Enumerated { enumerations } => {
            match enumerations.iter().find(|e| e.label == trimmed) {
                Some(enumeration) => enumeration.value as f64,
                None => parse_f64(trimmed).ok_or_else(invalid)?,
            }
        }
        EngineeringType::Boolean {
            one_string_value,
            zero_string_value,
        } => {
            if trimmed.eq_ignore_ascii_case(one_string_value) {
                1.0
            } else if trimmed.eq_ignore_ascii_case(zero_string_value) {
                0.0
            } else {
                parse_f64(trimmed).ok_or_else(invalid)?
            }
        }
        EngineeringType::AbsoluteTime { scale, offset }
        | EngineeringType::RelativeTime { scale, offset } => {
            if *scale == 0.0 {
                return Err(invalid());
            }
            (parse_f64(trimmed).ok_or_else(invalid)? - offset) / scale
        }
        EngineeringType::Integer { .. } | EngineeringType::Float => {
            parse_f64(trimmed).ok_or_else(invalid)?
        }
    };

    let number = match calibrator {
        Some(calibrator) => {
            uncalibrate(calibrator, number).map_err(|source| ValueError::Calibration {
                item: typed.path().to_owned(),
                source,
            })?
        }
        None => number,
    };
    numeric_for_encoding(typed, number)
}

/// Parse `text` directly in the encoding's value space.
pub fn parse_uncalibrated(typed: &TypedObject<'_>, text: &str) -> Result<Uncalibrated, ValueError> {
    let encoding = encoding_of(typed)?;
    let trimmed = text.trim();
    let invalid = || ValueError::InvalidText {
        item: typed.path().to_owned(),
        text: text.to_owned(),
    };
    match encoding.kind {
        EncodingKind::Unsigned | EncodingKind::Bcd => parse_u64(trimmed)
            .map(Uncalibrated::Unsigned)
            .ok_or_else(invalid),
        EncodingKind::TwosComplement | EncodingKind::SignMagnitude | EncodingKind::OnesComplement => {
            parse_i64(trimmed)
                .map(Uncalibrated::Signed)
                .ok_or_else(invalid)
        }
        EncodingKind::Ieee754 => parse_f64(trimmed)
            .map(Uncalibrated::Float)
            .ok_or_else(invalid),
        EncodingKind::Utf8 => Ok(Uncalibrated::Text(text.to_owned())),
        EncodingKind::Binary => RawBits::from_hex(trimmed)
            .map(Uncalibrated::Bytes)
            .ok_or_else(invalid),
    }
}

fn numeric_for_encoding(typed: &TypedObject<'_>, x: f64) -> Result<Uncalibrated, ValueError> {
    let encoding = encoding_of(typed)?;
    match encoding.kind {
        EncodingKind::Ieee754 => Ok(Uncalibrated::Float(x)),
        EncodingKind::Unsigned | EncodingKind::Bcd => {
            let rounded = round_to_i64(x);
            u64::try_from(rounded)
                .map(Uncalibrated::Unsigned)
                .map_err(|_| ValueError::OutOfRange {
                    item: typed.path().to_owned(),
                    value: format!("{x}"),
                    bits: 0,
                })
        }
        EncodingKind::TwosComplement | EncodingKind::SignMagnitude | EncodingKind::OnesComplement => {
            Ok(Uncalibrated::Signed(round_to_i64(x)))
        }
        EncodingKind::Utf8 => Ok(Uncalibrated::Text(format!("{x}"))),
        EncodingKind::Binary => Err(ValueError::InvalidText {
            item: typed.path().to_owned(),
            text: format!("{x}"),
        }),
    }
}

//==================================================================================HELPERS
fn encoding_of<'s>(typed: &TypedObject<'s>) -> Result<&'s DataEncoding, ValueError> {
    if typed.is_aggregate() || typed.is_array() {
        return Err(ValueError::NotScalar {
            item: typed.path().to_owned(),
        });
    }
    typed.encoding().ok_or_else(|| ValueError::MissingEncoding {
        item: typed.path().to_owned(),
    })
}

fn unsupported(typed: &TypedObject<'_>, detail: &'static str) -> ValueError {
    ValueError::UnsupportedEncoding {
        item: typed.path().to_owned(),
        detail,
    }
}

fn mask(bits: usize) -> u64 {
    if bits >= 64 {
        u64::MAX
    } else {
        (1u64 << bits) - 1
    }
}

fn fits_signed(value: i64, bits: usize) -> bool {
    if bits >= 64 {
        return true;
    }
    let limit = 1i64 << (bits - 1);
    (-limit..limit).contains(&value)
}

/// Sign-extend a `bits`-wide two's-complement value held in a `u64`.
pub(crate) fn sign_extend(value: u64, bits: usize) -> i64 {
    // The full 64 bits already carry the sign.
    if bits >= 64 || bits == 0 {
        return value as i64;
    }
    let sign_bit_mask = 1u64 << (bits - 1);
    if (value & sign_bit_mask) != 0 {
        (value | (u64::MAX << bits)) as i64
    } else {
        value as i64
    }
}

fn integral(x: f64) -> Option<i64> {
    let truncated = x as i64;
    (truncated as f64 == x).then_some(truncated)
}

pub(crate) fn round_to_i64(x: f64) -> i64 {
    if x >= 0.0 {
        (x + 0.5) as i64
    } else {
        (x - 0.5) as i64
    }
}

pub(crate) fn parse_f64(text: &str) -> Option<f64> {
    match parse_i64(text) {
        Some(v) => Some(v as f64),
        None => text.parse::<f64>().ok(),
    }
}

fn parse_u64(text: &str) -> Option<u64> {
    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        return u64::from_str_radix(hex, 16).ok();
    }
    text.parse::<u64>()
        .ok()
        .or_else(|| text.parse::<f64>().ok().and_then(integral).and_then(|v| u64::try_from(v).ok()))
}

fn parse_i64(text: &str) -> Option<i64> {
    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        return i64::from_str_radix(hex, 16).ok();
    }
    text.parse::<i64>()
        .ok()
        .or_else(|| text.parse::<f64>().ok().and_then(integral))
}

//==================================================================================TESTS
#[cfg(test)]
#[path = "tests.rs"]
mod tests;
