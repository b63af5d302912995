//! Shared utilities for CLI commands.

use std::fs;
use std::io::{self, Read};
use std::path::Path;

use anyhow::{Context, Result};
use serde_json::Value;

/// Reads events from `path`, or from stdin when it is `None`.
pub fn read_events(path: Option<&Path>) -> Result<Vec<Value>> {
    let text = match path {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        None => {
            let mut text = String::new();
            io::stdin()
                .read_to_string(&mut text)
                .context("failed to read stdin")?;
            text
        }
    };
    parse_events(&text)
}

/// Parses either one JSON array of events or JSON lines.
pub fn parse_events(text: &str) -> Result<Vec<Value>> {
    let trimmed = text.trim_start();
    if trimmed.starts_with('[') {
        return serde_json::from_str(trimmed).context("invalid JSON array of events");
    }

    let mut events = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let event = serde_json::from_str(trimmed)
            .with_context(|| format!("invalid JSON on line {}", idx + 1))?;
        events.push(event);
    }
    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[test]
    fn test_parse_json_array() {
        let events = parse_events("  [{\"start\": 1}, {\"start\": 2}]\n").unwrap();
        assert_eq!(events, vec![json!({"start": 1}), json!({"start": 2})]);
    }

    #[test]
    fn test_parse_json_lines_skips_blank_lines() {
        let events = parse_events("{\"start\": 1}\n\n{\"start\": 2}\n").unwrap();
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn test_parse_reports_bad_line() {
        let err = parse_events("{\"start\": 1}\nnot json\n").unwrap_err();
        assert_eq!(err.to_string(), "invalid JSON on line 2");
    }

    #[test]
    fn test_read_events_from_file() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("events.jsonl");
        fs::write(&path, "{\"start\": \"2024-01-01\"}\n").unwrap();
        let events = read_events(Some(&path)).unwrap();
        assert_eq!(events, vec![json!({"start": "2024-01-01"})]);
    }
}
