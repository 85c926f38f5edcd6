//! CLI subcommand implementations.

pub mod invoke;
pub mod scrape;
