pub mod clean;
pub mod create;
pub mod probe;
pub mod select;
pub mod stats;

use anyhow::{Context, Result};
use scratchpool_core::config::Config;
use scratchpool_workspace::{Manager, ManagerOptions};

/// Benchmark the configured directories and build a ranked manager.
pub(crate) fn build_manager(config: &Config) -> Result<Manager> {
    Manager::with_options(
        &config.workspace.tmpdirs,
        config.workspace.capacity_threshold,
        ManagerOptions::from_config(&config.workspace),
    )
    .with_context(|| {
        format!(
            "Failed to initialize workspaces from '{}'",
            config.workspace.tmpdirs
        )
    })
}
