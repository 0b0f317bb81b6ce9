//! Subcommand implementations for the `wayfarer` binary.

pub mod agent;
pub mod plan;
pub mod planner;
pub mod status;
