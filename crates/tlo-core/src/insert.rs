//! Ordered insertion into a timeline sorted by `(start, stop)`.
//!
//! # Scan
//!
//! Ascending timelines are scanned forward from the resume offset; the event
//! goes before the first entry that orders strictly after it, or at the end.
//!
//! Descending timelines are the mirror image. Scan step `k` visits forward
//! index `len - k - 1`, so the scan runs from the tail (smallest entries)
//! toward the head. The event goes right after the first entry that orders
//! strictly after it, or at index 0.
//!
//! In both directions an event lands after equal entries in scan order. For
//! descending timelines that means before them in forward index terms.
//!
//! # Resume offsets
//!
//! The offset counts scan steps that may be skipped. The returned offset is
//! the scan step of the inserted event: its index for ascending timelines,
//! `len - index - 1` for descending ones. Feeding it into the next call is
//! exact as long as successive events do not order before one another.
//!
//! An offset that is past the true insertion point is detected by looking at
//! the nearest valid entry before the window. If that entry already orders
//! after the event, the scan restarts from step 0. A wrong offset costs time,
//! never ordering.

use std::cmp::Ordering;
use std::fmt;
use std::ops::Range;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{Rejected, Result};
use crate::interval::{Extraction, Interval, IntervalReader};

/// Sort order of a timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }

    /// Forward index visited at scan `step` of a timeline with `len` entries.
    const fn index_at(self, len: usize, step: usize) -> usize {
        match self {
            Self::Asc => step,
            Self::Desc => len - step - 1,
        }
    }

    /// Forward indices covered by the scan window starting at scan step `offset`.
    pub(crate) const fn window(self, len: usize, offset: usize) -> Range<usize> {
        match self {
            Self::Asc => offset..len,
            Self::Desc => 0..len - offset,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for unrecognized sort direction strings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown sort direction: {0}")]
pub struct UnknownDirection(pub String);

impl FromStr for Direction {
    type Err = UnknownDirection;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(Self::Asc),
            "desc" | "descending" => Ok(Self::Desc),
            _ => Err(UnknownDirection(s.to_string())),
        }
    }
}

/// Where an event landed and where the next scan may resume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Insertion {
    /// Index of the event in the timeline after insertion.
    pub position: usize,
    /// Resume offset for the next insertion in the same direction.
    pub offset: usize,
}

impl Insertion {
    const fn new(position: usize, len: usize, direction: Direction) -> Self {
        let offset = match direction {
            Direction::Asc => position,
            Direction::Desc => len - position - 1,
        };
        Self { position, offset }
    }
}

/// A validated resume position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Resume {
    /// First scan step of the insertion scan.
    pub(crate) offset: usize,
    /// Scan step of the nearest valid entry before `offset`, or 0 if there is none.
    pub(crate) anchor: usize,
}

/// Clamps `offset` and falls back to 0 when it overshoots `candidate`.
pub(crate) fn resume_at<E>(
    reader: &IntervalReader<E>,
    candidate: &Interval,
    timeline: &[E],
    offset: usize,
    direction: Direction,
) -> Result<Resume> {
    let len = timeline.len();
    let offset = offset.min(len);
    for step in (0..offset).rev() {
        let index = direction.index_at(len, step);
        if let Extraction::Valid(entry) = reader.read_reference(&timeline[index])? {
            if entry.try_cmp(candidate)? == Ordering::Greater {
                tracing::debug!(offset, %direction, "resume offset overshoots, rescanning");
                return Ok(Resume {
                    offset: 0,
                    anchor: 0,
                });
            }
            return Ok(Resume {
                offset,
                anchor: step,
            });
        }
    }
    Ok(Resume { offset, anchor: 0 })
}

/// Index at which `candidate` belongs, without modifying the timeline.
pub(crate) fn insertion_point<E>(
    reader: &IntervalReader<E>,
    candidate: &Interval,
    timeline: &[E],
    offset: usize,
    direction: Direction,
) -> Result<usize> {
    let len = timeline.len();
    let offset = resume_at(reader, candidate, timeline, offset, direction)?.offset;
    for step in offset..len {
        let index = direction.index_at(len, step);
        let entry = match reader.read_reference(&timeline[index])? {
            Extraction::Valid(entry) => entry,
            Extraction::Skipped(reason) => {
                tracing::trace!(index, %reason, "skipping timeline entry");
                continue;
            }
        };
        if entry.try_cmp(candidate)? == Ordering::Greater {
            return Ok(match direction {
                Direction::Asc => index,
                Direction::Desc => index + 1,
            });
        }
    }
    Ok(match direction {
        Direction::Asc => len,
        Direction::Desc => 0,
    })
}

/// Inserts `event` at its sorted position.
pub(crate) fn ordered_insert<E>(
    reader: &IntervalReader<E>,
    event: E,
    timeline: &mut Vec<E>,
    offset: usize,
    direction: Direction,
) -> Result<Insertion, Rejected<E>> {
    let position = match reader
        .read(&event)
        .and_then(|candidate| insertion_point(reader, &candidate, timeline, offset, direction))
    {
        Ok(position) => position,
        Err(error) => return Err(Rejected::new(event, error)),
    };
    timeline.insert(position, event);
    Ok(Insertion::new(position, timeline.len(), direction))
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::{Value, json};

    use crate::access::Extractor;
    use crate::error::TimelineError;

    fn reader() -> IntervalReader<Value> {
        IntervalReader {
            start: Extractor::field("start"),
            stop: Extractor::field("stop"),
            fallback: None,
        }
    }

    fn ev(start: &str, stop: &str) -> Value {
        json!({"start": format!("2024-{start}"), "stop": format!("2024-{stop}")})
    }

    fn starts(timeline: &[Value]) -> Vec<String> {
        timeline
            .iter()
            .map(|event| event["start"].as_str().unwrap_or("-").to_string())
            .collect()
    }

    #[test]
    fn test_ascending_insert_skips_invalid_entries() {
        let reader = reader();
        let mut timeline = vec![
            ev("01-01", "01-02"),
            json!({}),
            ev("01-05", "01-06"),
            ev("01-10", "01-11"),
            ev("01-12", "01-13"),
        ];

        let first = ordered_insert(&reader, ev("01-02", "01-03"), &mut timeline, 0, Direction::Asc)
            .unwrap();
        assert_eq!(first, Insertion { position: 2, offset: 2 });

        let second = ordered_insert(
            &reader,
            ev("01-02", "01-03"),
            &mut timeline,
            first.offset,
            Direction::Asc,
        )
        .unwrap();
        assert_eq!(second, Insertion { position: 3, offset: 3 });
        assert_eq!(timeline.len(), 7);
    }

    #[test]
    fn test_ascending_appends_when_nothing_is_greater() {
        let reader = reader();
        let mut timeline = vec![ev("01-01", "01-02")];
        let insertion =
            ordered_insert(&reader, ev("01-03", "01-04"), &mut timeline, 0, Direction::Asc)
                .unwrap();
        assert_eq!(insertion, Insertion { position: 1, offset: 1 });
    }

    #[test]
    fn test_ascending_orders_by_stop_on_equal_start() {
        let reader = reader();
        let mut timeline = vec![ev("01-01", "01-02"), ev("01-01", "01-05")];
        let insertion =
            ordered_insert(&reader, ev("01-01", "01-03"), &mut timeline, 0, Direction::Asc)
                .unwrap();
        assert_eq!(insertion.position, 1);
    }

    #[test]
    fn test_descending_insert() {
        let reader = reader();
        let mut timeline = vec![
            ev("01-10", "01-11"),
            ev("01-08", "01-09"),
            ev("01-05", "01-06"),
            ev("01-03", "01-04"),
        ];

        let insertion =
            ordered_insert(&reader, ev("01-06", "01-07"), &mut timeline, 0, Direction::Desc)
                .unwrap();
        assert_eq!(insertion, Insertion { position: 2, offset: 2 });
        assert_eq!(
            starts(&timeline),
            ["2024-01-10", "2024-01-08", "2024-01-06", "2024-01-05", "2024-01-03"]
        );

        // Largest goes to the head, smallest to the tail.
        let head =
            ordered_insert(&reader, ev("01-20", "01-21"), &mut timeline, 0, Direction::Desc)
                .unwrap();
        assert_eq!(head, Insertion { position: 0, offset: 5 });
        let tail =
            ordered_insert(&reader, ev("01-01", "01-02"), &mut timeline, 0, Direction::Desc)
                .unwrap();
        assert_eq!(tail, Insertion { position: 6, offset: 0 });
    }

    #[test]
    fn test_descending_insert_skips_invalid_entries() {
        let reader = reader();
        let mut timeline = vec![
            ev("01-10", "01-11"),
            json!({}),
            ev("01-05", "01-06"),
            ev("01-03", "01-04"),
        ];

        let first = ordered_insert(&reader, ev("01-06", "01-07"), &mut timeline, 0, Direction::Desc)
            .unwrap();
        assert_eq!(first, Insertion { position: 1, offset: 3 });

        // The resumed scan starts past the empty entry.
        let second = ordered_insert(
            &reader,
            ev("01-07", "01-08"),
            &mut timeline,
            first.offset,
            Direction::Desc,
        )
        .unwrap();
        assert_eq!(second, Insertion { position: 1, offset: 4 });

        // A stale offset overshoots and falls back to a full scan.
        let stale = ordered_insert(
            &reader,
            ev("01-04", "01-05"),
            &mut timeline,
            second.offset,
            Direction::Desc,
        )
        .unwrap();
        assert_eq!(stale, Insertion { position: 5, offset: 1 });
        assert_eq!(
            starts(&timeline),
            [
                "2024-01-10",
                "2024-01-07",
                "2024-01-06",
                "-",
                "2024-01-05",
                "2024-01-04",
                "2024-01-03"
            ]
        );
    }

    #[test]
    fn test_descending_ties_land_before_equal_entries() {
        let reader = reader();
        let mut timeline = vec![
            json!({"start": "2024-01-05", "stop": "2024-01-06", "id": "old"}),
            ev("01-03", "01-04"),
        ];
        let mut tie = ev("01-05", "01-06");
        tie["id"] = json!("new");
        let insertion = ordered_insert(&reader, tie, &mut timeline, 0, Direction::Desc).unwrap();
        assert_eq!(insertion.position, 0);
        assert_eq!(timeline[0]["id"], "new");
        assert_eq!(timeline[1]["id"], "old");
    }

    #[test]
    fn test_descending_offset_reuse_with_rising_events() {
        let reader = reader();
        let mut timeline = vec![ev("01-20", "01-21"), ev("01-01", "01-02")];
        let mut offset = 0;
        for day in ["01-03", "01-05", "01-07", "01-09"] {
            let event = json!({
                "start": format!("2024-{day}"),
                "stop": format!("2024-{day}T12:00:00"),
            });
            let insertion =
                ordered_insert(&reader, event, &mut timeline, offset, Direction::Desc).unwrap();
            offset = insertion.offset;
        }
        assert_eq!(
            starts(&timeline),
            ["2024-01-20", "2024-01-09", "2024-01-07", "2024-01-05", "2024-01-03", "2024-01-01"]
        );
        assert_eq!(offset, 4);
    }

    #[test]
    fn test_overshooting_offset_rescans() {
        let reader = reader();
        let mut timeline = vec![ev("01-01", "01-02"), ev("01-05", "01-06"), ev("01-09", "01-10")];
        let insertion =
            ordered_insert(&reader, ev("01-03", "01-04"), &mut timeline, 3, Direction::Asc)
                .unwrap();
        assert_eq!(insertion.position, 1);

        let mut timeline = vec![ev("01-09", "01-10"), ev("01-05", "01-06"), ev("01-01", "01-02")];
        let insertion =
            ordered_insert(&reader, ev("01-07", "01-08"), &mut timeline, 3, Direction::Desc)
                .unwrap();
        assert_eq!(insertion.position, 1);
    }

    #[test]
    fn test_resume_anchor_skips_invalid_entries() {
        let reader = reader();
        let timeline = vec![ev("01-01", "01-03"), json!({}), ev("01-05", "01-06")];
        let candidate = reader.read(&ev("01-02", "01-04")).unwrap();
        let resume = resume_at(&reader, &candidate, &timeline, 2, Direction::Asc).unwrap();
        assert_eq!(resume, Resume { offset: 2, anchor: 0 });

        let late = reader.read(&ev("01-07", "01-08")).unwrap();
        let resume = resume_at(&reader, &late, &timeline, 3, Direction::Asc).unwrap();
        assert_eq!(resume, Resume { offset: 3, anchor: 2 });
    }

    #[test]
    fn test_offset_past_end_is_clamped() {
        let reader = reader();
        let mut timeline = vec![ev("01-01", "01-02")];
        let insertion =
            ordered_insert(&reader, ev("01-03", "01-04"), &mut timeline, 42, Direction::Asc)
                .unwrap();
        assert_eq!(insertion, Insertion { position: 1, offset: 1 });
    }

    #[test]
    fn test_invalid_candidate_is_handed_back() {
        let reader = reader();
        let mut timeline = vec![ev("01-01", "01-02")];
        let rejected =
            ordered_insert(&reader, ev("01-04", "01-01"), &mut timeline, 0, Direction::Asc)
                .unwrap_err();
        assert!(matches!(rejected.error, TimelineError::InvalidInterval { .. }));
        assert_eq!(rejected.event, ev("01-04", "01-01"));
        assert_eq!(timeline.len(), 1);
    }

    #[test]
    fn test_insert_into_empty_timeline() {
        let reader = reader();
        let mut timeline = Vec::new();
        let asc = ordered_insert(&reader, ev("01-01", "01-02"), &mut timeline, 0, Direction::Asc)
            .unwrap();
        assert_eq!(asc, Insertion { position: 0, offset: 0 });
        let mut timeline = Vec::new();
        let desc =
            ordered_insert(&reader, ev("01-01", "01-02"), &mut timeline, 0, Direction::Desc)
                .unwrap();
        assert_eq!(desc, Insertion { position: 0, offset: 0 });
    }

    #[test]
    fn test_direction_from_str() {
        assert_eq!("asc".parse::<Direction>().unwrap(), Direction::Asc);
        assert_eq!("DESC".parse::<Direction>().unwrap(), Direction::Desc);
        assert_eq!(
            "sideways".parse::<Direction>().unwrap_err().to_string(),
            "unknown sort direction: sideways"
        );
    }
}
