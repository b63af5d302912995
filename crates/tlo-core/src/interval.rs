//! Validated intervals and their extraction from events.

use std::cmp::Ordering;
use std::fmt;

use chrono::FixedOffset;
use serde::{Deserialize, Serialize};

use crate::access::Extractor;
use crate::error::{Result, TimelineError};
use crate::time::{TimePoint, normalize};

/// A half-open span `[start, stop)` with `stop > start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Bounds")]
pub struct Interval {
    start: TimePoint,
    stop: TimePoint,
}

/// Unvalidated wire form of an [`Interval`].
#[derive(Deserialize)]
struct Bounds {
    start: TimePoint,
    stop: TimePoint,
}

impl TryFrom<Bounds> for Interval {
    type Error = TimelineError;

    fn try_from(bounds: Bounds) -> Result<Self> {
        Self::new(bounds.start, bounds.stop)
    }
}

impl Interval {
    /// Creates an interval, rejecting mixed awareness and non-positive spans.
    pub fn new(start: TimePoint, stop: TimePoint) -> Result<Self> {
        if start.try_cmp(&stop)? != Ordering::Less {
            return Err(TimelineError::InvalidInterval { start, stop });
        }
        Ok(Self { start, stop })
    }

    /// Caller guarantees `start < stop` and matching awareness.
    pub(crate) const fn from_ordered(start: TimePoint, stop: TimePoint) -> Self {
        Self { start, stop }
    }

    pub const fn start(&self) -> TimePoint {
        self.start
    }

    pub const fn stop(&self) -> TimePoint {
        self.stop
    }

    pub const fn is_aware(&self) -> bool {
        self.start.is_aware()
    }

    /// Length of the interval.
    pub fn duration(&self) -> chrono::TimeDelta {
        match (self.start, self.stop) {
            (TimePoint::Aware(start), TimePoint::Aware(stop)) => stop - start,
            (TimePoint::Naive(start), TimePoint::Naive(stop)) => stop - start,
            _ => chrono::TimeDelta::zero(),
        }
    }

    /// Fails with [`TimelineError::MixedAwareness`] unless both intervals
    /// are aware or both are naive.
    pub fn ensure_comparable(&self, other: &Self) -> Result<()> {
        if self.start.comparable_with(&other.start) {
            Ok(())
        } else {
            Err(TimelineError::MixedAwareness)
        }
    }

    /// Orders by `(start, stop)`.
    pub fn try_cmp(&self, other: &Self) -> Result<Ordering> {
        Ok(self
            .start
            .try_cmp(&other.start)?
            .then(self.stop.try_cmp(&other.stop)?))
    }

    /// Whether the two intervals share any instant. Touching ends do not.
    pub fn overlaps(&self, other: &Self) -> Result<bool> {
        self.ensure_comparable(other)?;
        Ok(self.start < other.stop && other.start < self.stop)
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.stop)
    }
}

/// A piece of a candidate interval that was clipped away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Occlusion {
    pub start: TimePoint,
    pub stop: TimePoint,
}

impl From<Interval> for Occlusion {
    fn from(interval: Interval) -> Self {
        Self {
            start: interval.start,
            stop: interval.stop,
        }
    }
}

/// Outcome of reading a reference event.
#[derive(Debug)]
pub enum Extraction {
    Valid(Interval),
    /// The event cannot be used; the reason is kept for logging.
    Skipped(TimelineError),
}

impl Extraction {
    pub fn valid(self) -> Option<Interval> {
        match self {
            Self::Valid(interval) => Some(interval),
            Self::Skipped(_) => None,
        }
    }
}

/// Reads both boundaries of an event.
///
/// # Errors
///
/// - [`TimelineError::InvalidEvent`] when a named field is missing
/// - [`TimelineError::TypeMismatch`] when a value is not a time
/// - [`TimelineError::MixedAwareness`] when one boundary has an offset and
///   the other does not
/// - [`TimelineError::InvalidInterval`] when `stop <= start`
pub fn extract_interval<E>(
    event: &E,
    start: &Extractor<E>,
    stop: &Extractor<E>,
    fallback: Option<FixedOffset>,
) -> Result<Interval> {
    let start = normalize(start.extract(event)?, fallback)?;
    let stop = normalize(stop.extract(event)?, fallback)?;
    Interval::new(start, stop)
}

/// The two extractors plus the fallback offset, bound once per configuration.
pub(crate) struct IntervalReader<E> {
    pub(crate) start: Extractor<E>,
    pub(crate) stop: Extractor<E>,
    pub(crate) fallback: Option<FixedOffset>,
}

impl<E> IntervalReader<E> {
    /// Reads a candidate; every failure is returned.
    pub(crate) fn read(&self, event: &E) -> Result<Interval> {
        extract_interval(event, &self.start, &self.stop, self.fallback)
    }

    /// Reads a reference; skippable failures become [`Extraction::Skipped`].
    pub(crate) fn read_reference(&self, event: &E) -> Result<Extraction> {
        match self.read(event) {
            Ok(interval) => Ok(Extraction::Valid(interval)),
            Err(err) if err.is_skippable() => Ok(Extraction::Skipped(err)),
            Err(err) => Err(err),
        }
    }
}

impl<E> Clone for IntervalReader<E> {
    fn clone(&self) -> Self {
        Self {
            start: self.start.clone(),
            stop: self.stop.clone(),
            fallback: self.fallback,
        }
    }
}

impl<E> fmt::Debug for IntervalReader<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IntervalReader")
            .field("start", &self.start)
            .field("stop", &self.stop)
            .field("fallback", &self.fallback)
            .finish()
    }
}
