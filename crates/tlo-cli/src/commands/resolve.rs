//! Resolve command: clips one event against a timeline.

use std::io::Write;

use anyhow::{Context, Result};
use serde_json::Value;
use tlo_core::Streamliner;

pub fn run<W: Write>(
    writer: &mut W,
    streamliner: &Streamliner<Value>,
    event: &str,
    timeline: &[Value],
) -> Result<()> {
    let event: Value = serde_json::from_str(event).context("--event is not valid JSON")?;
    let interval = streamliner
        .streamline_event_times(&event, &[timeline])
        .context("failed to resolve event")?;
    serde_json::to_writer(&mut *writer, &interval)?;
    writeln!(writer)?;
    Ok(())
}
