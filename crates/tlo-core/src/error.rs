//! Error types for timeline operations.

use std::fmt;

use thiserror::Error;

use crate::interval::Interval;
use crate::time::TimePoint;

/// Which end of an interval an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Boundary {
    Start,
    Stop,
}

impl fmt::Display for Boundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => write!(f, "start"),
            Self::Stop => write!(f, "stop"),
        }
    }
}

/// Every failure the core can report.
///
/// Reference events that fail with a [skippable](Self::is_skippable) error
/// are ignored by the loops that scan them. The same failures on a candidate
/// event are returned to the caller.
#[derive(Debug, Error)]
pub enum TimelineError {
    /// A boundary field is missing or unreadable.
    #[error("event has no readable `{field}` field")]
    InvalidEvent { field: String },

    /// The extracted boundaries do not span a positive duration.
    #[error("interval from {start} to {stop} does not have a positive duration")]
    InvalidInterval { start: TimePoint, stop: TimePoint },

    /// Nothing of the candidate survives reconciliation.
    #[error("interval {interval} is fully occluded")]
    FullyOccluded { interval: Interval },

    /// A boundary must be written back but there is no way to do so.
    #[error("no write-back path for the {boundary} boundary")]
    NoWritebackPath { boundary: Boundary },

    /// A raw value cannot be interpreted as a point in time.
    #[error("cannot interpret {found} as a point in time")]
    TypeMismatch { found: String },

    /// A timezone-aware and a timezone-naive point met in one comparison.
    #[error("cannot compare timezone-aware and timezone-naive points in time")]
    MixedAwareness,

    /// Raised by a caller-supplied extractor or setter.
    #[error(transparent)]
    External(Box<dyn std::error::Error + Send + Sync>),
}

impl TimelineError {
    /// Wraps an error raised by caller code.
    pub fn external<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::External(err.into())
    }

    /// Whether a reference event failing this way is skipped rather than fatal.
    pub const fn is_skippable(&self) -> bool {
        matches!(
            self,
            Self::InvalidEvent { .. } | Self::InvalidInterval { .. } | Self::TypeMismatch { .. }
        )
    }

    /// The original interval of a fully occluded candidate.
    pub const fn occluded_interval(&self) -> Option<&Interval> {
        match self {
            Self::FullyOccluded { interval } => Some(interval),
            _ => None,
        }
    }
}

pub type Result<T, E = TimelineError> = std::result::Result<T, E>;

/// An operation that took ownership of an event failed.
///
/// The event is handed back so the caller can log, retry, or redirect it.
pub struct Rejected<E> {
    pub event: E,
    pub error: TimelineError,
}

impl<E> Rejected<E> {
    pub const fn new(event: E, error: TimelineError) -> Self {
        Self { event, error }
    }

    /// Splits into the event and the reason it was rejected.
    pub fn into_parts(self) -> (E, TimelineError) {
        (self.event, self.error)
    }
}

impl<E> From<Rejected<E>> for TimelineError {
    fn from(rejected: Rejected<E>) -> Self {
        rejected.error
    }
}

impl<E: fmt::Debug> fmt::Debug for Rejected<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rejected")
            .field("event", &self.event)
            .field("error", &self.error)
            .finish()
    }
}

impl<E> fmt::Display for Rejected<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "event rejected: {}", self.error)
    }
}

impl<E: fmt::Debug> std::error::Error for Rejected<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}
