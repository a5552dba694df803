//! `maps-harvest config` — show the resolved configuration.

use anyhow::Result;

use crate::config::HarvestConfig;

pub fn run(config: &HarvestConfig) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}
