//! The reusable configuration object and the one-shot entry points.
//!
//! A [`Streamliner`] binds the field layout of one event type once:
//! extractors, setters, the reference filter, the fallback offset, and the
//! sort direction. Every operation then reuses those bindings.
//!
//! ```
//! use serde_json::json;
//! use tlo_core::Streamliner;
//!
//! let streamliner = Streamliner::builder()
//!     .start_extractor("begin")
//!     .stop_extractor("end")
//!     .build();
//!
//! let busy = vec![json!({"begin": "2024-01-01T09:00:00", "end": "2024-01-01T10:00:00"})];
//! let mut meeting = json!({"begin": "2024-01-01T09:30:00", "end": "2024-01-01T11:00:00"});
//! streamliner.streamline_event(&mut meeting, &[&busy[..]]).unwrap();
//! assert_eq!(meeting["begin"], "2024-01-01T10:00:00");
//! ```

use std::fmt;
use std::sync::Arc;

use chrono::FixedOffset;

use crate::access::{Extractor, FieldAccess, Setter, WritebackPolicy};
use crate::error::{Boundary, Rejected, Result, TimelineError};
use crate::insert::{self, Direction, Insertion};
use crate::interval::{Interval, IntervalReader, Occlusion};
use crate::project;
use crate::resolve::{self, FilterFn};

/// Builder for [`Streamliner`].
pub struct StreamlinerBuilder<E> {
    start_extractor: Extractor<E>,
    stop_extractor: Extractor<E>,
    start_setter: Option<Setter<E>>,
    stop_setter: Option<Setter<E>>,
    filter: Option<Arc<FilterFn<E>>>,
    fallback_timezone: Option<FixedOffset>,
    sort_direction: Direction,
}

impl<E: FieldAccess + 'static> Default for StreamlinerBuilder<E> {
    fn default() -> Self {
        Self::with_extractors(Extractor::field("start"), Extractor::field("stop"))
    }
}

impl<E> StreamlinerBuilder<E> {
    /// Starts from explicit extractors, for events without [`FieldAccess`].
    pub const fn with_extractors(start: Extractor<E>, stop: Extractor<E>) -> Self {
        Self {
            start_extractor: start,
            stop_extractor: stop,
            start_setter: None,
            stop_setter: None,
            filter: None,
            fallback_timezone: None,
            sort_direction: Direction::Asc,
        }
    }

    #[must_use]
    pub fn start_extractor(mut self, extractor: impl Into<Extractor<E>>) -> Self {
        self.start_extractor = extractor.into();
        self
    }

    #[must_use]
    pub fn stop_extractor(mut self, extractor: impl Into<Extractor<E>>) -> Self {
        self.stop_extractor = extractor.into();
        self
    }

    #[must_use]
    pub fn start_setter(mut self, setter: impl Into<Setter<E>>) -> Self {
        self.start_setter = Some(setter.into());
        self
    }

    #[must_use]
    pub fn stop_setter(mut self, setter: impl Into<Setter<E>>) -> Self {
        self.stop_setter = Some(setter.into());
        self
    }

    /// Only reference events for which `keep` returns `true` are considered.
    #[must_use]
    pub fn filter<F>(mut self, keep: F) -> Self
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Arc::new(keep));
        self
    }

    /// Offset applied to boundaries that carry none.
    #[must_use]
    pub const fn fallback_timezone(mut self, offset: FixedOffset) -> Self {
        self.fallback_timezone = Some(offset);
        self
    }

    #[must_use]
    pub const fn sort_direction(mut self, direction: Direction) -> Self {
        self.sort_direction = direction;
        self
    }

    /// Builds the configuration. A missing write-back path is reported only
    /// when a write is attempted.
    pub fn build(self) -> Streamliner<E> {
        let start_setter =
            Setter::resolve(self.start_setter, &self.start_extractor, Boundary::Start);
        let stop_setter = Setter::resolve(self.stop_setter, &self.stop_extractor, Boundary::Stop);
        Streamliner {
            reader: IntervalReader {
                start: self.start_extractor,
                stop: self.stop_extractor,
                fallback: self.fallback_timezone,
            },
            start_setter,
            stop_setter,
            filter: self.filter,
            direction: self.sort_direction,
        }
    }

    /// Builds the configuration, failing with
    /// [`TimelineError::NoWritebackPath`](crate::TimelineError::NoWritebackPath)
    /// if either boundary cannot be written back.
    pub fn build_writable(self) -> Result<Streamliner<E>> {
        self.build_with(WritebackPolicy::Eager)
    }

    pub fn build_with(self, policy: WritebackPolicy) -> Result<Streamliner<E>> {
        let streamliner = self.build();
        if policy == WritebackPolicy::Eager {
            streamliner.ensure_writable()?;
        }
        Ok(streamliner)
    }
}

/// Reconciles events against timelines with one bound field layout.
///
/// Cheap to clone; all callables are shared.
pub struct Streamliner<E> {
    reader: IntervalReader<E>,
    start_setter: Setter<E>,
    stop_setter: Setter<E>,
    filter: Option<Arc<FilterFn<E>>>,
    direction: Direction,
}

impl<E: FieldAccess + 'static> Streamliner<E> {
    /// A builder reading the `start` and `stop` fields.
    pub fn builder() -> StreamlinerBuilder<E> {
        StreamlinerBuilder::default()
    }
}

impl<E: FieldAccess + 'static> Default for Streamliner<E> {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl<E> Streamliner<E> {
    pub const fn direction(&self) -> Direction {
        self.direction
    }

    pub const fn fallback_timezone(&self) -> Option<FixedOffset> {
        self.reader.fallback
    }

    /// Whether both boundaries have a write-back path.
    pub const fn is_writable(&self) -> bool {
        self.start_setter.is_available() && self.stop_setter.is_available()
    }

    fn ensure_writable(&self) -> Result<()> {
        if !self.start_setter.is_available() {
            return Err(TimelineError::NoWritebackPath {
                boundary: Boundary::Start,
            });
        }
        if !self.stop_setter.is_available() {
            return Err(TimelineError::NoWritebackPath {
                boundary: Boundary::Stop,
            });
        }
        Ok(())
    }

    /// Reads the interval of one event.
    pub fn extract_interval(&self, event: &E) -> Result<Interval> {
        self.reader.read(event)
    }

    /// Resolves `event` against the concatenation of `timelines` without
    /// modifying it.
    ///
    /// # Errors
    ///
    /// Any extraction failure of `event` itself, and
    /// [`TimelineError::FullyOccluded`](crate::TimelineError::FullyOccluded)
    /// when no free span is left.
    pub fn streamline_event_times(&self, event: &E, timelines: &[&[E]]) -> Result<Interval> {
        self.resolve(event, timelines, None)
    }

    /// Like [`streamline_event_times`](Self::streamline_event_times), and
    /// appends the clipped-away pieces to `occlusions`.
    pub fn streamline_event_times_tracked(
        &self,
        event: &E,
        timelines: &[&[E]],
        occlusions: &mut Vec<Occlusion>,
    ) -> Result<Interval> {
        self.resolve(event, timelines, Some(occlusions))
    }

    /// Resolves `event` and writes the result back onto it.
    ///
    /// With no timelines at all the event is validated but left untouched.
    pub fn streamline_event<'e>(
        &self,
        event: &'e mut E,
        timelines: &[&[E]],
    ) -> Result<&'e mut E> {
        self.apply(event, timelines, None)
    }

    /// Like [`streamline_event`](Self::streamline_event), and appends the
    /// clipped-away pieces to `occlusions`.
    pub fn streamline_event_tracked<'e>(
        &self,
        event: &'e mut E,
        timelines: &[&[E]],
        occlusions: &mut Vec<Occlusion>,
    ) -> Result<&'e mut E> {
        self.apply(event, timelines, Some(occlusions))
    }

    /// Lazily yields the interval of every usable event in `timelines`.
    pub fn transform_events_to_times<'a>(
        &'a self,
        timelines: &'a [&'a [E]],
    ) -> impl Iterator<Item = Interval> + 'a {
        self.transform_events_to_pairs(timelines)
            .map(|(interval, _)| interval)
    }

    /// Lazily yields every usable event in `timelines` with its interval.
    pub fn transform_events_to_pairs<'a>(
        &'a self,
        timelines: &'a [&'a [E]],
    ) -> impl Iterator<Item = (Interval, &'a E)> + 'a {
        project::project_pairs(&self.reader, self.filter.as_deref(), timelines)
    }

    /// Index at which `event` would be inserted, scanning from `offset`.
    pub fn insertion_point(&self, event: &E, timeline: &[E], offset: usize) -> Result<usize> {
        let candidate = self.reader.read(event)?;
        insert::insertion_point(&self.reader, &candidate, timeline, offset, self.direction)
    }

    /// Inserts `event` into `timeline`, keeping it sorted by `(start, stop)`.
    ///
    /// `offset` is the resume offset returned by the previous insertion; 0
    /// scans the whole timeline.
    pub fn ordered_insert(
        &self,
        event: E,
        timeline: &mut Vec<E>,
        offset: usize,
    ) -> Result<Insertion, Rejected<E>> {
        insert::ordered_insert(&self.reader, event, timeline, offset, self.direction)
    }

    /// Resolves `event` against the scan window of `timeline`, writes the
    /// result back, and inserts it.
    ///
    /// Calling this for every new event keeps `timeline` sorted and free of
    /// overlaps.
    pub fn streamlined_ordered_insert(
        &self,
        event: E,
        timeline: &mut Vec<E>,
        offset: usize,
    ) -> Result<Insertion, Rejected<E>> {
        self.streamlined_insert(event, timeline, offset, None)
    }

    /// Like [`streamlined_ordered_insert`](Self::streamlined_ordered_insert),
    /// and appends the clipped-away pieces to `occlusions`.
    pub fn streamlined_ordered_insert_tracked(
        &self,
        event: E,
        timeline: &mut Vec<E>,
        offset: usize,
        occlusions: &mut Vec<Occlusion>,
    ) -> Result<Insertion, Rejected<E>> {
        self.streamlined_insert(event, timeline, offset, Some(occlusions))
    }

    fn streamlined_insert(
        &self,
        mut event: E,
        timeline: &mut Vec<E>,
        offset: usize,
        occlusions: Option<&mut Vec<Occlusion>>,
    ) -> Result<Insertion, Rejected<E>> {
        let resolved = self.reader.read(&event).and_then(|candidate| {
            // The anchor entry before the scan window may still reach into
            // the candidate; everything before it ends no later than it starts.
            let resume =
                insert::resume_at(&self.reader, &candidate, timeline, offset, self.direction)?;
            let window = &timeline[self.direction.window(timeline.len(), resume.anchor)];
            // Chained shrinks need references in ascending time order.
            match self.direction {
                Direction::Asc => self.resolve_refs(&event, window, occlusions),
                Direction::Desc => self.resolve_refs(&event, window.iter().rev(), occlusions),
            }
        });
        if let Err(error) = resolved.and_then(|interval| self.write_back(&mut event, &interval)) {
            return Err(Rejected::new(event, error));
        }
        self.ordered_insert(event, timeline, offset)
    }

    fn resolve(
        &self,
        event: &E,
        timelines: &[&[E]],
        occlusions: Option<&mut Vec<Occlusion>>,
    ) -> Result<Interval> {
        self.resolve_refs(
            event,
            timelines.iter().flat_map(|timeline| timeline.iter()),
            occlusions,
        )
    }

    fn resolve_refs<'r>(
        &self,
        event: &E,
        references: impl IntoIterator<Item = &'r E>,
        occlusions: Option<&mut Vec<Occlusion>>,
    ) -> Result<Interval>
    where
        E: 'r,
    {
        resolve::resolve(
            &self.reader,
            self.filter.as_deref(),
            event,
            references,
            occlusions,
        )
    }

    fn apply<'e>(
        &self,
        event: &'e mut E,
        timelines: &[&[E]],
        occlusions: Option<&mut Vec<Occlusion>>,
    ) -> Result<&'e mut E> {
        let interval = self.resolve(event, timelines, occlusions)?;
        if !timelines.is_empty() {
            self.write_back(event, &interval)?;
        }
        Ok(event)
    }

    fn write_back(&self, event: &mut E, interval: &Interval) -> Result<()> {
        self.start_setter.assign(event, interval.start())?;
        self.stop_setter.assign(event, interval.stop())
    }
}

impl<E> Clone for Streamliner<E> {
    fn clone(&self) -> Self {
        Self {
            reader: self.reader.clone(),
            start_setter: self.start_setter.clone(),
            stop_setter: self.stop_setter.clone(),
            filter: self.filter.clone(),
            direction: self.direction,
        }
    }
}

impl<E> fmt::Debug for Streamliner<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Streamliner")
            .field("reader", &self.reader)
            .field("start_setter", &self.start_setter)
            .field("stop_setter", &self.stop_setter)
            .field("filter", &self.filter.as_ref().map(|_| "<callable>"))
            .field("direction", &self.direction)
            .finish()
    }
}

/// Resolves `event` against `timelines` using the `start` and `stop` fields.
pub fn streamline_event_times<E: FieldAccess + 'static>(
    event: &E,
    timelines: &[&[E]],
) -> Result<Interval> {
    Streamliner::default().streamline_event_times(event, timelines)
}

/// Resolves `event` against `timelines` and writes the result back onto its
/// `start` and `stop` fields.
pub fn streamline_event<'e, E: FieldAccess + 'static>(
    event: &'e mut E,
    timelines: &[&[E]],
) -> Result<&'e mut E> {
    Streamliner::builder()
        .build_writable()?
        .streamline_event(event, timelines)
}

/// Inserts `event` into `timeline` sorted by its `start` and `stop` fields.
pub fn ordered_insert<E: FieldAccess + 'static>(
    event: E,
    timeline: &mut Vec<E>,
    offset: usize,
    direction: Direction,
) -> Result<Insertion, Rejected<E>> {
    Streamliner::builder()
        .sort_direction(direction)
        .build()
        .ordered_insert(event, timeline, offset)
}
