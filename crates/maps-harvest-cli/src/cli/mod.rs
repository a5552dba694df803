//! CLI subcommand implementations for the `maps-harvest` binary.

pub mod config_cmd;
pub mod doctor;
pub mod output;
pub mod run_cmd;
