//! Canonical points in time and normalization of raw field values.
//!
//! Boundary fields arrive in several shapes: timestamps with or without an
//! offset, POSIX epoch numbers, and ISO 8601 text. [`normalize`] turns each of
//! them into a [`TimePoint`], applying a fallback offset to values that carry
//! none.
//!
//! # Awareness
//!
//! A [`TimePoint`] is either timezone-aware or naive. Two aware points compare
//! by instant, two naive points by wall clock. An aware and a naive point have
//! no order: [`PartialOrd`] returns `None` and [`TimePoint::try_cmp`] fails
//! with [`TimelineError::MixedAwareness`].

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::{
    DateTime, FixedOffset, Local, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc,
};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Result, TimelineError};

/// Naive layouts accepted after RFC 3339 fails, most specific first.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Offset-carrying layouts RFC 3339 parsing does not cover.
const AWARE_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%dT%H:%M%:z"];

/// A canonical instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimePoint {
    /// Carries its own UTC offset.
    Aware(DateTime<FixedOffset>),
    /// Wall-clock time without an offset.
    Naive(NaiveDateTime),
}

impl TimePoint {
    pub const fn is_aware(&self) -> bool {
        matches!(self, Self::Aware(_))
    }

    /// The UTC offset, if the point is aware.
    pub fn offset(&self) -> Option<FixedOffset> {
        match self {
            Self::Aware(dt) => Some(*dt.offset()),
            Self::Naive(_) => None,
        }
    }

    /// Whether the two points can be ordered against each other.
    pub const fn comparable_with(&self, other: &Self) -> bool {
        self.is_aware() == other.is_aware()
    }

    /// Orders two points, refusing to mix aware and naive ones.
    pub fn try_cmp(&self, other: &Self) -> Result<Ordering> {
        self.partial_cmp(other).ok_or(TimelineError::MixedAwareness)
    }

    /// Attaches `fallback` to a naive point. Aware points are returned as-is.
    #[must_use]
    pub fn with_fallback(self, fallback: Option<FixedOffset>) -> Self {
        match (self, fallback) {
            (Self::Naive(naive), Some(offset)) => offset
                .from_local_datetime(&naive)
                .single()
                .map_or(self, Self::Aware),
            _ => self,
        }
    }

    /// The point as an aware timestamp, if it is one.
    pub const fn as_aware(&self) -> Option<DateTime<FixedOffset>> {
        match self {
            Self::Aware(dt) => Some(*dt),
            Self::Naive(_) => None,
        }
    }

    /// The point as a naive timestamp, if it is one.
    pub const fn as_naive(&self) -> Option<NaiveDateTime> {
        match self {
            Self::Aware(_) => None,
            Self::Naive(naive) => Some(*naive),
        }
    }
}

impl PartialOrd for TimePoint {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Aware(a), Self::Aware(b)) => Some(a.cmp(b)),
            (Self::Naive(a), Self::Naive(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl fmt::Display for TimePoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Aware(dt) => write!(f, "{}", dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            Self::Naive(naive) => write!(f, "{}", naive.format("%Y-%m-%dT%H:%M:%S%.f")),
        }
    }
}

impl FromStr for TimePoint {
    type Err = TimelineError;

    fn from_str(s: &str) -> Result<Self> {
        parse_iso8601(s)
    }
}

impl From<DateTime<FixedOffset>> for TimePoint {
    fn from(dt: DateTime<FixedOffset>) -> Self {
        Self::Aware(dt)
    }
}

impl From<DateTime<Utc>> for TimePoint {
    fn from(dt: DateTime<Utc>) -> Self {
        Self::Aware(dt.fixed_offset())
    }
}

impl From<NaiveDateTime> for TimePoint {
    fn from(naive: NaiveDateTime) -> Self {
        Self::Naive(naive)
    }
}

impl Serialize for TimePoint {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TimePoint {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_iso8601(&s).map_err(serde::de::Error::custom)
    }
}

/// A boundary value as read from an event, before normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Aware(DateTime<FixedOffset>),
    Naive(NaiveDateTime),
    /// POSIX epoch seconds.
    Int(i64),
    /// POSIX epoch seconds with a fractional part.
    Float(f64),
    /// ISO 8601 text.
    Text(String),
    /// Anything else; names the kind of value for diagnostics.
    Unsupported(&'static str),
}

impl From<TimePoint> for RawValue {
    fn from(point: TimePoint) -> Self {
        match point {
            TimePoint::Aware(dt) => Self::Aware(dt),
            TimePoint::Naive(naive) => Self::Naive(naive),
        }
    }
}

impl From<DateTime<FixedOffset>> for RawValue {
    fn from(dt: DateTime<FixedOffset>) -> Self {
        Self::Aware(dt)
    }
}

impl From<DateTime<Utc>> for RawValue {
    fn from(dt: DateTime<Utc>) -> Self {
        Self::Aware(dt.fixed_offset())
    }
}

impl From<DateTime<Local>> for RawValue {
    fn from(dt: DateTime<Local>) -> Self {
        Self::Aware(dt.fixed_offset())
    }
}

impl From<NaiveDateTime> for RawValue {
    fn from(naive: NaiveDateTime) -> Self {
        Self::Naive(naive)
    }
}

impl From<i64> for RawValue {
    fn from(secs: i64) -> Self {
        Self::Int(secs)
    }
}

impl From<i32> for RawValue {
    fn from(secs: i32) -> Self {
        Self::Int(i64::from(secs))
    }
}

impl From<u32> for RawValue {
    fn from(secs: u32) -> Self {
        Self::Int(i64::from(secs))
    }
}

impl From<f64> for RawValue {
    fn from(secs: f64) -> Self {
        Self::Float(secs)
    }
}

impl From<String> for RawValue {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for RawValue {
    fn from(text: &str) -> Self {
        Self::Text(text.to_owned())
    }
}

/// Converts a raw boundary value into a [`TimePoint`].
///
/// - Timestamps keep their own offset; naive ones get `fallback` if given.
/// - Numbers are POSIX epoch seconds, placed in `fallback` when given and in
///   the system-local zone (as a naive wall-clock time) otherwise.
/// - Text is parsed as ISO 8601 and then treated like a timestamp.
///
/// # Errors
///
/// [`TimelineError::TypeMismatch`] for unparseable text, non-finite or
/// out-of-range numbers, and unsupported values.
///
/// # Examples
///
/// ```
/// use chrono::FixedOffset;
/// use tlo_core::{RawValue, normalize};
///
/// let cet = FixedOffset::east_opt(3600).unwrap();
/// let point = normalize(RawValue::from("2024-01-01T10:00:00"), Some(cet)).unwrap();
/// assert_eq!(point.to_string(), "2024-01-01T10:00:00+01:00");
/// ```
pub fn normalize(raw: RawValue, fallback: Option<FixedOffset>) -> Result<TimePoint> {
    match raw {
        RawValue::Aware(dt) => Ok(TimePoint::Aware(dt)),
        RawValue::Naive(naive) => Ok(TimePoint::Naive(naive).with_fallback(fallback)),
        RawValue::Int(secs) => from_epoch(DateTime::from_timestamp(secs, 0), fallback)
            .ok_or_else(|| TimelineError::TypeMismatch {
                found: format!("out-of-range epoch {secs}"),
            }),
        RawValue::Float(secs) => from_epoch(epoch_from_float(secs), fallback).ok_or_else(|| {
            TimelineError::TypeMismatch {
                found: format!("unrepresentable epoch {secs}"),
            }
        }),
        RawValue::Text(text) => parse_iso8601(&text).map(|point| point.with_fallback(fallback)),
        RawValue::Unsupported(kind) => Err(TimelineError::TypeMismatch {
            found: kind.to_owned(),
        }),
    }
}

fn from_epoch(utc: Option<DateTime<Utc>>, fallback: Option<FixedOffset>) -> Option<TimePoint> {
    let utc = utc?;
    Some(match fallback {
        Some(offset) => TimePoint::Aware(utc.with_timezone(&offset)),
        None => TimePoint::Naive(utc.with_timezone(&Local).naive_local()),
    })
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn epoch_from_float(secs: f64) -> Option<DateTime<Utc>> {
    if !secs.is_finite() || secs < i64::MIN as f64 || secs >= i64::MAX as f64 {
        return None;
    }
    let whole = secs.floor();
    let nanos = ((secs - whole) * 1e9).round() as u32;
    let whole = whole as i64;
    if nanos >= 1_000_000_000 {
        DateTime::from_timestamp(whole.checked_add(1)?, 0)
    } else {
        DateTime::from_timestamp(whole, nanos)
    }
}

/// Parses ISO 8601 text into an aware or naive point.
///
/// Accepts RFC 3339, date-times separated by `T` or a space (with optional
/// fractional seconds and offset), and bare dates, which mean midnight.
pub fn parse_iso8601(text: &str) -> Result<TimePoint> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Ok(TimePoint::Aware(dt));
    }
    for format in AWARE_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(text, format) {
            return Ok(TimePoint::Aware(dt));
        }
    }
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Ok(TimePoint::Naive(naive));
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(TimePoint::Naive)
        .ok_or_else(|| TimelineError::TypeMismatch {
            found: format!("text {text:?}"),
        })
}
