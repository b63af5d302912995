//! Property-based tests for timeline invariants.
//!
//! 1. Streaming a non-decreasing sequence of events through the combined
//!    resolve-and-insert keeps the timeline sorted and free of overlaps.
//! 2. The combined operation matches resolving against the whole timeline
//!    and inserting as two separate steps.
//! 3. A resume offset never changes where an event lands, even with
//!    unreadable entries anywhere in the timeline.

use proptest::prelude::*;

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use serde_json::{Value, json};
use tlo_core::{Direction, Interval, Streamliner, TimelineError, impl_field_access};

#[derive(Debug, Clone, PartialEq)]
struct Slot {
    start: NaiveDateTime,
    stop: NaiveDateTime,
}

impl_field_access!(Slot { start, stop });

fn minute(m: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .expect("valid base date")
        + TimeDelta::minutes(i64::from(m))
}

fn slot(start: u32, len: u32) -> Slot {
    Slot {
        start: minute(start),
        stop: minute(start + len),
    }
}

// =============================================================================
// Strategy helpers
// =============================================================================

/// Candidate events as `(start minute, length in minutes)`.
fn slots_strategy(max: usize) -> impl Strategy<Value = Vec<Slot>> {
    prop::collection::vec((0..2_000u32, 1..240u32), 0..=max)
        .prop_map(|raw| raw.into_iter().map(|(start, len)| slot(start, len)).collect())
}

fn sorted_slots_strategy(max: usize) -> impl Strategy<Value = Vec<Slot>> {
    slots_strategy(max).prop_map(|mut slots| {
        slots.sort_by_key(|s| (s.start, s.stop));
        slots
    })
}

/// JSON events, some of which carry no usable interval.
fn json_events_strategy(max: usize) -> impl Strategy<Value = Vec<Value>> {
    prop::collection::vec(
        prop_oneof![
            8 => (0..500u32, 1..60u32).prop_map(|(start, len)| {
                json!({
                    "start": minute(start).format("%Y-%m-%dT%H:%M:%S").to_string(),
                    "stop": minute(start + len).format("%Y-%m-%dT%H:%M:%S").to_string(),
                })
            }),
            1 => Just(json!({})),
            1 => Just(json!({"start": "soon", "stop": "later"})),
        ],
        0..=max,
    )
}

fn direction_strategy() -> impl Strategy<Value = Direction> {
    prop_oneof![Just(Direction::Asc), Just(Direction::Desc)]
}

/// Sorted timeline of the valid events, with every unusable event spliced in
/// at a position picked from `seeds`.
fn timeline_with_invalid_entries(
    streamliner: &Streamliner<Value>,
    events: Vec<Value>,
    seeds: &[usize],
) -> Vec<Value> {
    let mut timeline = Vec::new();
    for (i, event) in events.into_iter().enumerate() {
        if let Err(rejected) = streamliner.ordered_insert(event, &mut timeline, 0) {
            let seed = seeds.get(i).copied().unwrap_or(i);
            let position = seed % (timeline.len() + 1);
            timeline.insert(position, rejected.event);
        }
    }
    timeline
}

fn stream(streamliner: &Streamliner<Slot>, candidates: Vec<Slot>) -> Vec<Slot> {
    let mut timeline = Vec::new();
    let mut offset = 0;
    for candidate in candidates {
        match streamliner.streamlined_ordered_insert(candidate, &mut timeline, offset) {
            Ok(insertion) => offset = insertion.offset,
            Err(rejected) => {
                assert!(
                    matches!(rejected.error, TimelineError::FullyOccluded { .. }),
                    "unexpected rejection: {rejected}"
                );
            }
        }
    }
    timeline
}

fn in_ascending_order(timeline: &[Slot], direction: Direction) -> Vec<Slot> {
    match direction {
        Direction::Asc => timeline.to_vec(),
        Direction::Desc => timeline.iter().rev().cloned().collect(),
    }
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn prop_monotonic_stream_is_sorted_and_disjoint(
        candidates in sorted_slots_strategy(40),
        direction in direction_strategy(),
    ) {
        let streamliner = Streamliner::builder().sort_direction(direction).build();
        let timeline = stream(&streamliner, candidates);

        for pair in in_ascending_order(&timeline, direction).windows(2) {
            prop_assert!(pair[0].stop <= pair[1].start, "overlap: {:?}", pair);
            prop_assert!((pair[0].start, pair[0].stop) <= (pair[1].start, pair[1].stop));
        }
        for entry in &timeline {
            prop_assert!(entry.start < entry.stop);
        }
    }

    #[test]
    fn prop_accepted_events_stay_within_their_original_interval(
        candidates in sorted_slots_strategy(40),
    ) {
        let streamliner = Streamliner::default();
        let mut timeline = Vec::new();
        let mut offset = 0;
        for candidate in candidates {
            let original = candidate.clone();
            if let Ok(insertion) =
                streamliner.streamlined_ordered_insert(candidate, &mut timeline, offset)
            {
                let accepted = &timeline[insertion.position];
                prop_assert!(accepted.start >= original.start);
                prop_assert!(accepted.stop <= original.stop);
                offset = insertion.offset;
            }
        }
    }

    #[test]
    fn prop_combined_insert_matches_two_steps(candidates in sorted_slots_strategy(40)) {
        let streamliner = Streamliner::builder().build_writable().expect("named fields");

        let combined = stream(&streamliner, candidates.clone());

        let mut two_step: Vec<Slot> = Vec::new();
        let mut offset = 0;
        for mut candidate in candidates {
            if streamliner.streamline_event(&mut candidate, &[&two_step[..]]).is_err() {
                continue;
            }
            let insertion = streamliner
                .ordered_insert(candidate, &mut two_step, offset)
                .expect("resolved event has a valid interval");
            offset = insertion.offset;
        }

        prop_assert_eq!(combined, two_step);
    }

    #[test]
    fn prop_resume_offset_never_changes_position(
        events in json_events_strategy(30),
        seeds in prop::collection::vec(any::<usize>(), 30),
        candidate in (0..500u32, 1..60u32),
        offset in 0..40usize,
        direction in direction_strategy(),
    ) {
        let streamliner: Streamliner<Value> =
            Streamliner::builder().sort_direction(direction).build();
        let timeline = timeline_with_invalid_entries(&streamliner, events, &seeds);
        let (start, len) = candidate;
        let candidate = json!({
            "start": minute(start).format("%Y-%m-%dT%H:%M:%S").to_string(),
            "stop": minute(start + len).format("%Y-%m-%dT%H:%M:%S").to_string(),
        });

        let full_scan = streamliner
            .insertion_point(&candidate, &timeline, 0)
            .expect("valid candidate");
        let resumed = streamliner
            .insertion_point(&candidate, &timeline, offset)
            .expect("valid candidate");
        prop_assert_eq!(full_scan, resumed);
    }

    #[test]
    fn prop_resolve_only_narrows(
        references in slots_strategy(20),
        candidate in (0..2_000u32, 1..240u32),
    ) {
        let streamliner = Streamliner::default();
        let candidate = slot(candidate.0, candidate.1);
        let Ok(resolved) = streamliner.streamline_event_times(&candidate, &[&references[..]]) else {
            return Ok(());
        };
        let original = streamliner.extract_interval(&candidate).expect("valid candidate");
        prop_assert!(resolved.start() >= original.start());
        prop_assert!(resolved.stop() <= original.stop());
        prop_assert!(Interval::new(resolved.start(), resolved.stop()).is_ok());
    }
}
