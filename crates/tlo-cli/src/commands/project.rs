//! Project command: prints the interval of every usable event as JSONL.

use std::io::Write;

use anyhow::Result;
use serde_json::Value;
use tlo_core::Streamliner;

pub fn run<W: Write>(
    writer: &mut W,
    streamliner: &Streamliner<Value>,
    events: &[Value],
) -> Result<usize> {
    let mut written = 0;
    for interval in streamliner.transform_events_to_times(&[events]) {
        serde_json::to_writer(&mut *writer, &interval)?;
        writeln!(writer)?;
        written += 1;
    }
    tracing::debug!(written, skipped = events.len() - written, "projected events");
    Ok(written)
}
