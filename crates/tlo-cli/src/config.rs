//! Configuration loading and management.

use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::FixedOffset;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tlo_core::{Direction, Streamliner};

use crate::Cli;

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Field holding the start of each event.
    pub start_field: String,
    /// Field holding the stop of each event.
    pub stop_field: String,
    /// Offset for times without one, e.g. `+02:00`.
    pub fallback_timezone: Option<String>,
    /// Sort order of produced timelines.
    pub direction: Direction,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            start_field: "start".to_string(),
            stop_field: "stop".to_string(),
            fallback_timezone: None,
            direction: Direction::Asc,
        }
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Load from default config location
        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        // Load from specified config file
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // Load from environment variables (TLO_*)
        figment = figment.merge(Env::prefixed("TLO_"));

        figment.extract()
    }

    /// Applies command-line flags on top of loaded values.
    #[must_use]
    pub fn with_cli(mut self, cli: &Cli) -> Self {
        if let Some(field) = &cli.start_field {
            self.start_field.clone_from(field);
        }
        if let Some(field) = &cli.stop_field {
            self.stop_field.clone_from(field);
        }
        if cli.fallback_timezone.is_some() {
            self.fallback_timezone.clone_from(&cli.fallback_timezone);
        }
        if cli.desc {
            self.direction = Direction::Desc;
        }
        self
    }

    /// Parses the configured fallback offset.
    pub fn fallback_offset(&self) -> anyhow::Result<Option<FixedOffset>> {
        self.fallback_timezone
            .as_deref()
            .map(parse_offset)
            .transpose()
    }

    /// Builds a streamliner for JSON events with this configuration.
    pub fn streamliner(&self) -> anyhow::Result<Streamliner<Value>> {
        let mut builder = Streamliner::builder()
            .start_extractor(self.start_field.as_str())
            .stop_extractor(self.stop_field.as_str())
            .sort_direction(self.direction);
        if let Some(offset) = self.fallback_offset()? {
            builder = builder.fallback_timezone(offset);
        }
        builder
            .build_writable()
            .context("configured fields cannot be written back")
    }
}

fn parse_offset(text: &str) -> anyhow::Result<FixedOffset> {
    match text.trim() {
        "Z" | "z" | "UTC" | "utc" => FixedOffset::east_opt(0).context("zero offset"),
        offset => offset.parse().with_context(|| {
            format!("invalid fallback timezone {offset:?}, expected an offset like +02:00")
        }),
    }
}

/// Returns the platform-specific config directory for tlo.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("tlo"))
}
