//! Reconcile interval events against existing timelines.
//!
//! This crate contains:
//! - Time normalization: epoch numbers, ISO 8601 text and chrono values
//! - Field access: named fields, callables and write-back setters
//! - Occlusion resolution: shrinking an event until nothing overlaps it
//! - Ordered insertion with resume offsets
//!
//! Most callers build a [`Streamliner`] once and reuse it.

mod access;
mod error;
mod insert;
mod interval;
mod project;
mod resolve;
mod streamliner;
mod time;

pub use access::{Extractor, FieldAccess, FieldValue, Setter, WritebackPolicy};
pub use error::{Boundary, Rejected, Result, TimelineError};
pub use insert::{Direction, Insertion, UnknownDirection};
pub use interval::{Extraction, Interval, Occlusion, extract_interval};
pub use resolve::FilterFn;
pub use streamliner::{
    Streamliner, StreamlinerBuilder, ordered_insert, streamline_event, streamline_event_times,
};
pub use time::{RawValue, TimePoint, normalize, parse_iso8601};
