use super::build_manager;
use anyhow::{Context, Result};
use scratchpool_core::config::Config;

/// Prints `<path>\t<tier>`.
pub fn run(config: &Config, size: u64) -> Result<()> {
    let manager = build_manager(config)?;
    let placement = manager
        .select_workspace(size)
        .with_context(|| format!("Failed to select a workspace for {} bytes", size))?;
    println!("{}\t{}", placement.path().display(), placement.tier());
    Ok(())
}
