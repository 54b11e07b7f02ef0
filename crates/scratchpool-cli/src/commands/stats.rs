use super::build_manager;
use anyhow::{Context, Result};
use scratchpool_core::config::Config;
use scratchpool_core::units::format_bytes;
use scratchpool_workspace::Stats;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

pub fn run(config: &Config, json: bool) -> Result<()> {
    let manager = build_manager(config)?;
    let stats = manager.get_stats();

    if json {
        let out = serde_json::to_string_pretty(&stats).context("Failed to serialize stats")?;
        println!("{}", out);
        return Ok(());
    }

    println!(
        "{:<40} {:>10} {:>12} {:>12}  CHECKED",
        "PATH", "MB/S", "AVAILABLE", "TOTAL"
    );
    for s in &stats {
        println!(
            "{:<40} {:>10.2} {:>12} {:>12}  {}",
            s.path.display(),
            s.write_mbps,
            format_bytes(s.available_bytes),
            format_bytes(s.total_bytes),
            format_checked(s),
        );
    }
    Ok(())
}

fn format_checked(stats: &Stats) -> String {
    OffsetDateTime::from(stats.last_checked)
        .format(&Rfc3339)
        .unwrap_or_else(|_| "-".to_string())
}
