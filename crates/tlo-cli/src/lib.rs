//! Timeline streamlining CLI library.
//!
//! This crate provides the `tlo` command-line interface over `tlo-core`.

mod cli;
pub mod commands;
mod config;

pub use cli::{Cli, Commands};
pub use config::Config;
