//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Reconcile interval events against existing timelines.
///
/// Events are JSON objects read from a file or stdin, either as one JSON
/// array or as JSON lines.
#[derive(Debug, Parser)]
#[command(name = "tlo", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Field holding the start of each event.
    #[arg(long, global = true)]
    pub start_field: Option<String>,

    /// Field holding the stop of each event.
    #[arg(long, global = true)]
    pub stop_field: Option<String>,

    /// Offset for times without one (e.g., +02:00 or UTC).
    #[arg(long, global = true)]
    pub fallback_timezone: Option<String>,

    /// Keep timelines in descending order.
    #[arg(long, global = true)]
    pub desc: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Sort events by start and build a timeline without overlaps.
    Streamline {
        /// Input file (stdin when omitted).
        file: Option<PathBuf>,

        /// Also report the spans clipped off each event.
        #[arg(long)]
        occlusions: bool,
    },

    /// Clip one event against the events of a timeline.
    Resolve {
        /// The event to clip, as a JSON object.
        #[arg(long)]
        event: String,

        /// Timeline file (stdin when omitted).
        file: Option<PathBuf>,
    },

    /// Print the interval of every usable event.
    Project {
        /// Input file (stdin when omitted).
        file: Option<PathBuf>,
    },
}
