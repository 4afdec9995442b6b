//! CLI subcommand implementations

pub mod carbon;
pub mod health;
pub mod instances;
pub mod summary;
pub mod timeseries;
