//! Occlusion resolution.
//!
//! Shrinks a candidate interval until no reference interval overlaps it.
//!
//! # Algorithm Summary
//!
//! One pass over the references, in order. Each valid reference is checked
//! against the candidate as shrunk so far:
//!
//! 1. Reference covers the whole candidate: fully occluded.
//! 2. Reference covers the candidate's start: start moves to the reference's stop.
//! 3. Reference covers the candidate's stop: stop moves to the reference's start.
//! 4. Nothing left: fully occluded.
//!
//! Shrinks are cumulative: a later reference sees the candidate as already
//! narrowed. A reference that only reaches the candidate after a neighbour
//! has pushed its start must therefore come after that neighbour; references
//! in ascending order are always resolved completely. Touching boundaries
//! (`reference.stop == candidate.start`) do not overlap.

use crate::error::{Result, TimelineError};
use crate::interval::{Extraction, Interval, IntervalReader, Occlusion};

/// Predicate deciding whether a reference event takes part in resolution.
pub type FilterFn<E> = dyn Fn(&E) -> bool + Send + Sync;

/// Resolves `event` against `references`.
///
/// When `occlusions` is given, the clipped prefix and suffix are appended to
/// it; a fully occluded candidate appends its whole original interval.
pub(crate) fn resolve<'r, E: 'r>(
    reader: &IntervalReader<E>,
    filter: Option<&FilterFn<E>>,
    event: &E,
    references: impl IntoIterator<Item = &'r E>,
    occlusions: Option<&mut Vec<Occlusion>>,
) -> Result<Interval> {
    let original = reader.read(event)?;
    let outcome = shrink(reader, filter, original, references);
    if let Some(occlusions) = occlusions {
        record_occlusions(occlusions, original, &outcome);
    }
    outcome
}

fn shrink<'r, E: 'r>(
    reader: &IntervalReader<E>,
    filter: Option<&FilterFn<E>>,
    original: Interval,
    references: impl IntoIterator<Item = &'r E>,
) -> Result<Interval> {
    let mut start = original.start();
    let mut stop = original.stop();

    for reference in references {
        if filter.is_some_and(|keep| !keep(reference)) {
            continue;
        }
        let bounds = match reader.read_reference(reference)? {
            Extraction::Valid(bounds) => bounds,
            Extraction::Skipped(reason) => {
                tracing::trace!(%reason, "skipping reference event");
                continue;
            }
        };
        original.ensure_comparable(&bounds)?;

        if bounds.start() <= start && bounds.stop() >= stop {
            tracing::debug!(candidate = %original, occluder = %bounds, "candidate fully occluded");
            return Err(TimelineError::FullyOccluded { interval: original });
        }
        if bounds.start() <= start && bounds.stop() > start {
            start = bounds.stop();
        }
        if bounds.start() < stop && bounds.stop() >= stop {
            stop = bounds.start();
        }
        if stop <= start {
            tracing::debug!(candidate = %original, "candidate shrunk to nothing");
            return Err(TimelineError::FullyOccluded { interval: original });
        }
    }

    Ok(Interval::from_ordered(start, stop))
}

fn record_occlusions(out: &mut Vec<Occlusion>, original: Interval, outcome: &Result<Interval>) {
    match outcome {
        Ok(resolved) => {
            if resolved.start() != original.start() {
                out.push(Occlusion {
                    start: original.start(),
                    stop: resolved.start(),
                });
            }
            if resolved.stop() != original.stop() {
                out.push(Occlusion {
                    start: resolved.stop(),
                    stop: original.stop(),
                });
            }
        }
        Err(TimelineError::FullyOccluded { interval }) => out.push((*interval).into()),
        Err(_) => {}
    }
}
