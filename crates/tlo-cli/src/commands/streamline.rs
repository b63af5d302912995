//! Streamline command: builds one sorted timeline without overlaps.
//!
//! Events are sorted by start, then stop, and fed in that order. Each one is
//! clipped against the timeline built so far and inserted; events with
//! nothing left are dropped with a warning. Unreadable events sort last and
//! are dropped the same way.

use std::cmp::Ordering;
use std::io::Write;

use anyhow::Result;
use serde::Serialize;
use serde_json::Value;
use tlo_core::{Interval, Occlusion, Streamliner};

#[derive(Debug, Serialize)]
struct Report<'a> {
    timeline: &'a [Value],
    occlusions: &'a [Occlusion],
}

/// What happened to the input events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub accepted: usize,
    pub dropped: usize,
}

pub fn run<W: Write>(
    writer: &mut W,
    streamliner: &Streamliner<Value>,
    events: Vec<Value>,
    with_occlusions: bool,
) -> Result<Summary> {
    let mut timeline = Vec::with_capacity(events.len());
    let mut occlusions = Vec::new();
    let mut offset = 0;
    let mut dropped = 0;

    // Clipping only keeps the timeline free of overlaps when starts never
    // decrease.
    let mut ordered: Vec<_> = events
        .into_iter()
        .enumerate()
        .map(|(index, event)| (streamliner.extract_interval(&event).ok(), index, event))
        .collect();
    ordered.sort_by(|(a, ..), (b, ..)| input_order(a.as_ref(), b.as_ref()));

    for (_, index, event) in ordered {
        let inserted = if with_occlusions {
            streamliner.streamlined_ordered_insert_tracked(
                event,
                &mut timeline,
                offset,
                &mut occlusions,
            )
        } else {
            streamliner.streamlined_ordered_insert(event, &mut timeline, offset)
        };
        match inserted {
            Ok(insertion) => offset = insertion.offset,
            Err(rejected) => {
                tracing::warn!(index, error = %rejected.error, "dropping event");
                dropped += 1;
            }
        }
    }

    if with_occlusions {
        let report = Report {
            timeline: &timeline,
            occlusions: &occlusions,
        };
        serde_json::to_writer_pretty(&mut *writer, &report)?;
    } else {
        serde_json::to_writer_pretty(&mut *writer, &timeline)?;
    }
    writeln!(writer)?;

    tracing::debug!(accepted = timeline.len(), dropped, "timeline built");
    Ok(Summary {
        accepted: timeline.len(),
        dropped,
    })
}

/// Total order for sorting input: naive before aware, unreadable last.
fn input_order(a: Option<&Interval>, b: Option<&Interval>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a
            .is_aware()
            .cmp(&b.is_aware())
            .then_with(|| a.try_cmp(b).unwrap_or(Ordering::Equal)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
