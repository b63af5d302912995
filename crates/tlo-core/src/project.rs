//! Projection of timelines onto their intervals.

use crate::interval::{Interval, IntervalReader};
use crate::resolve::FilterFn;

/// Lazily pairs every usable event of `timelines` with its interval.
///
/// Timelines are walked in argument order. Events rejected by `filter` or
/// without a usable interval are skipped; nothing is raised.
pub(crate) fn project_pairs<'a, E>(
    reader: &'a IntervalReader<E>,
    filter: Option<&'a FilterFn<E>>,
    timelines: &'a [&'a [E]],
) -> impl Iterator<Item = (Interval, &'a E)> + 'a {
    timelines
        .iter()
        .flat_map(|timeline| timeline.iter())
        .filter(move |&event| filter.is_none_or(|keep| keep(event)))
        .filter_map(move |event| match reader.read(event) {
            Ok(interval) => Some((interval, event)),
            Err(reason) => {
                tracing::trace!(%reason, "skipping event without a usable interval");
                None
            }
        })
}
