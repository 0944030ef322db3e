//! Values attached to layout entries: decoded or supplied scalars, and the
//! comparisons that conditions and restrictions express.
use alloc::borrow::ToOwned;
use alloc::string::{String, ToString};
use core::cmp::Ordering;
use core::fmt;

use crate::conf::NUMERIC_EQUALITY_TOLERANCE;
use crate::core::RawBits;
use crate::error::ValueError;
use crate::infra::codec::calibration::abs;
use crate::infra::codec::engine::{
    decode_raw, encode_raw, from_engineering, parse_f64, parse_uncalibrated, round_to_i64,
    to_engineering,
};
use crate::schema::{Calibrator, Comparison, ComparisonOperator, TypedObject};

//==================================================================================ITEM_VALUE
/// Value supplied by the caller for one item, in engineering or uncalibrated
/// form. A path without `/` is a bare name and matches any entry whose full
/// path ends with `/name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemValue {
    pub item_path: String,
    pub value: String,
    pub use_calibrated: bool,
}

impl ItemValue {
    pub fn calibrated(item_path: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            item_path: item_path.into(),
            value: value.into(),
            use_calibrated: true,
        }
    }

    pub fn uncalibrated(item_path: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            item_path: item_path.into(),
            value: value.into(),
            use_calibrated: false,
        }
    }

    /// Whether this value targets the entry named `entry_path`.
    pub fn matches(&self, entry_path: &str) -> bool {
        if self.item_path.contains('/') {
            return self.item_path == entry_path;
        }
        entry_path
            .strip_suffix(self.item_path.as_str())
            .is_some_and(|head| head.ends_with('/'))
    }
}

//==================================================================================ENTRY_VALUE
/// Where an entry value comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ValueSource {
    /// Read from the input buffer.
    Decoded,
    /// Supplied by the caller.
    User,
    /// Asserted by a derived container's restriction.
    Restriction,
    /// Fixed by a derived command's argument assignment.
    Assignment,
    /// Literal bits of a fixed-value entry.
    Literal,
    /// Initial value of the item or its type.
    Initial,
    /// Operand of an include condition or a non-`==` restriction.
    Condition,
}

/// Scalar value of an entry, or a comparison against one.
///
/// Only `==` values carry raw bits that can be decoded or encoded; the other
/// operators only serve checks.
#[derive(Debug, Clone, PartialEq)]
pub struct EntryValue {
    item_path: String,
    raw: Option<RawBits>,
    uncalibrated: Option<String>,
    calibrated: Option<String>,
    operator: ComparisonOperator,
    compare_calibrated: bool,
    source: ValueSource,
}

impl EntryValue {
    /// Value read from the input buffer.
    pub fn from_raw(
        typed: &TypedObject<'_>,
        raw: RawBits,
        calibrator: Option<&Calibrator>,
    ) -> Result<Self, ValueError> {
        let uncalibrated = decode_raw(typed, &raw)?;
        let calibrated = to_engineering(typed, &uncalibrated, calibrator)?;
        Ok(Self {
            item_path: typed.path().to_owned(),
            raw: Some(raw),
            uncalibrated: Some(uncalibrated.to_string()),
            calibrated: Some(calibrated),
            operator: ComparisonOperator::Equal,
            compare_calibrated: true,
            source: ValueSource::Decoded,
        })
    }

    /// Value given as text. Raw bits are produced when `size` is known.
    pub fn from_text(
        typed: &TypedObject<'_>,
        text: &str,
        use_calibrated: bool,
        calibrator: Option<&Calibrator>,
        size: Option<u64>,
        source: ValueSource,
    ) -> Result<Self, ValueError> {
        let uncalibrated = if use_calibrated {
            from_engineering(typed, text, calibrator)?
        } else {
            parse_uncalibrated(typed, text)?
        };
        let calibrated = to_engineering(typed, &uncalibrated, calibrator)?;
        let raw = match size {
            Some(bits) => Some(encode_raw(typed, &uncalibrated, bits as usize)?),
            None => None,
        };
        Ok(Self {
            item_path: typed.path().to_owned(),
            raw,
            uncalibrated: Some(uncalibrated.to_string()),
            calibrated: Some(calibrated),
            operator: ComparisonOperator::Equal,
            compare_calibrated: use_calibrated,
            source,
        })
    }

    /// Comparison operand from an include condition or restriction.
    pub fn comparison(item_path: impl Into<String>, comparison: &Comparison) -> Self {
        let text = Some(comparison.value.trim().to_owned());
        let (uncalibrated, calibrated) = if comparison.use_calibrated_value {
            (None, text)
        } else {
            (text, None)
        };
        Self {
            item_path: item_path.into(),
            raw: None,
            uncalibrated,
            calibrated,
            operator: comparison.operator,
            compare_calibrated: comparison.use_calibrated_value,
            source: ValueSource::Condition,
        }
    }

    /// Literal bits of a fixed-value entry.
    pub fn literal(item_path: impl Into<String>, raw: RawBits) -> Self {
        let text = raw.to_string();
        Self {
            item_path: item_path.into(),
            raw: Some(raw),
            uncalibrated: Some(text.clone()),
            calibrated: Some(text),
            operator: ComparisonOperator::Equal,
            compare_calibrated: false,
            source: ValueSource::Literal,
        }
    }

    pub fn item_path(&self) -> &str {
        &self.item_path
    }

    pub fn raw(&self) -> Option<&RawBits> {
        self.raw.as_ref()
    }

    pub fn uncalibrated(&self) -> Option<&str> {
        self.uncalibrated.as_deref()
    }

    pub fn calibrated(&self) -> Option<&str> {
        self.calibrated.as_deref()
    }

    pub fn operator(&self) -> ComparisonOperator {
        self.operator
    }

    pub fn source(&self) -> ValueSource {
        self.source
    }

    /// Whether this value is a literal expectation on the raw bits, as
    /// opposed to something read from or chosen for a given packet.
    pub fn is_expectation(&self) -> bool {
        self.operator == ComparisonOperator::Equal
            && matches!(
                self.source,
                ValueSource::Restriction | ValueSource::Assignment | ValueSource::Literal
            )
    }

    pub(crate) fn with_source(mut self, source: ValueSource) -> Self {
        self.source = source;
        self
    }

    fn side(&self, calibrated: bool) -> Option<&str> {
        if calibrated {
            self.calibrated.as_deref()
        } else {
            self.uncalibrated.as_deref()
        }
    }

    /// Check this comparison against the `actual` value of the item.
    pub fn satisfied_by(&self, actual: &EntryValue) -> bool {
        match (
            actual.side(self.compare_calibrated),
            self.side(self.compare_calibrated),
        ) {
            (Some(actual), Some(expected)) => compare(self.operator, actual, expected),
            _ => false,
        }
    }

    /// Whether two values assigned to the same entry agree.
    pub fn is_compatible(&self, other: &EntryValue) -> bool {
        if let (Some(a), Some(b)) = (&self.raw, &other.raw) {
            return a == b;
        }
        let calibrated = self.calibrated.is_some() && other.calibrated.is_some();
        match (self.side(calibrated), other.side(calibrated)) {
            (Some(a), Some(b)) => compare(ComparisonOperator::Equal, a, b),
            _ => true,
        }
    }

    /// Integer reading of the value, used for counts and sizes.
    pub fn as_i64(&self, calibrated: bool) -> Option<i64> {
        let x = self.as_f64(calibrated)?;
        let rounded = round_to_i64(x);
        nearly_equal(rounded as f64, x).then_some(rounded)
    }

    pub fn as_f64(&self, calibrated: bool) -> Option<f64> {
        self.side(calibrated).and_then(|text| parse_f64(text.trim()))
    }
}

impl fmt::Display for EntryValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = self
            .side(self.compare_calibrated)
            .or(self.calibrated.as_deref())
            .or(self.uncalibrated.as_deref())
            .unwrap_or("");
        write!(f, "{}{}{}", self.item_path, self.operator, text)
    }
}

//==================================================================================COMPARE
fn nearly_equal(a: f64, b: f64) -> bool {
    let scale = [1.0, abs(a), abs(b)]
        .into_iter()
        .fold(0.0f64, |m, x| if x > m { x } else { m });
    abs(a - b) <= NUMERIC_EQUALITY_TOLERANCE * scale
}

/// Numeric comparison when both sides parse as numbers, text comparison
/// otherwise.
fn compare(operator: ComparisonOperator, actual: &str, expected: &str) -> bool {
    let ordering = match (parse_f64(actual.trim()), parse_f64(expected.trim())) {
        (Some(a), Some(b)) if nearly_equal(a, b) => Ordering::Equal,
        (Some(a), Some(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
        _ => actual.trim().cmp(expected.trim()),
    };
    match operator {
        ComparisonOperator::Equal => ordering == Ordering::Equal,
        ComparisonOperator::NotEqual => ordering != Ordering::Equal,
        ComparisonOperator::Less => ordering == Ordering::Less,
        ComparisonOperator::LessOrEqual => ordering != Ordering::Greater,
        ComparisonOperator::Greater => ordering == Ordering::Greater,
        ComparisonOperator::GreaterOrEqual => ordering != Ordering::Less,
    }
}
