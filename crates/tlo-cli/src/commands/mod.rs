//! CLI subcommand implementations.

pub mod project;
pub mod resolve;
pub mod streamline;
pub mod util;
