use super::build_manager;
use anyhow::{Context, Result, bail};
use scratchpool_core::config::Config;

pub fn run(config: &Config, size: u64, prefix: &str) -> Result<()> {
    if prefix.contains(['/', '\\']) {
        bail!("--prefix '{}' must not contain a path separator", prefix);
    }
    let manager = build_manager(config)?;
    let file = manager
        .create_temp_file(size, prefix)
        .context("Failed to create temp file")?;
    let (_file, path) = file.keep().context("Failed to keep temp file")?;
    println!("{}", path.display());
    Ok(())
}
