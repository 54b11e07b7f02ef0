use super::build_manager;
use anyhow::Result;
use scratchpool_core::config::Config;
use scratchpool_core::units::format_bytes;
use scratchpool_workspace::split_path_list;
use std::path::PathBuf;

pub fn run(config: &Config) -> Result<()> {
    let manager = build_manager(config)?;

    println!("Scratchpool Probe");
    println!("=================");
    println!();
    println!("Capacity threshold ... {:.2}", manager.capacity_threshold());
    println!(
        "Staleness bound ... {}s",
        config.workspace.staleness().as_secs()
    );

    println!();
    println!("Workspaces (fastest first):");
    for (rank, stats) in manager.get_stats().iter().enumerate() {
        println!(
            "  {}. {} ... OK ({:.2} MB/s, {} available of {})",
            rank + 1,
            stats.path.display(),
            stats.write_mbps,
            format_bytes(stats.available_bytes),
            format_bytes(stats.total_bytes),
        );
    }

    let accepted = manager.get_all_paths();
    let skipped: Vec<PathBuf> = split_path_list(&config.workspace.tmpdirs)
        .into_iter()
        .filter(|p| !accepted.contains(p))
        .collect();
    if !skipped.is_empty() {
        println!();
        println!("Skipped:");
        for path in &skipped {
            println!("  {} ... FAIL (see warnings above)", path.display());
        }
    }

    println!();
    if let Some(primary) = manager.get_primary_path() {
        println!("Primary workspace: {}", primary.display());
    }
    Ok(())
}
