mod commands;

use anyhow::Context;
use clap::{Parser, Subcommand};
use scratchpool_core::config::Config;
use scratchpool_core::constants::DEFAULT_UPLOAD_PREFIX;
use scratchpool_core::units::parse_byte_size;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "scratchpool",
    version,
    about = "Pick the fastest scratch directory with room for a file",
    long_about = "Scratchpool benchmarks a list of scratch directories, ranks them by\n\
        sequential write speed, and places temporary files in the fastest one\n\
        that still has enough free space.\n\n\
        Quick start:\n  \
        scratchpool --tmpdirs /mnt/nvme/tmp,/tmp probe\n  \
        scratchpool select --size 512M\n  \
        scratchpool create --size 10M --prefix upload-\n  \
        scratchpool clean --older-than-hours 24"
)]
struct Cli {
    /// Enable verbose logging (set log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to config file (default: ~/.scratchpool/config.toml)
    #[arg(long, global = true)]
    config: Option<String>,

    /// Comma-separated scratch directories (overrides workspace.tmpdirs)
    #[arg(long, global = true)]
    tmpdirs: Option<String>,

    /// Free-space multiplier required for a preferred placement
    /// (overrides workspace.capacity_threshold)
    #[arg(long, global = true, allow_negative_numbers = true)]
    threshold: Option<f64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Benchmark the configured directories and report their ranking
    ///
    /// Example: scratchpool --tmpdirs /mnt/fast,/tmp probe
    Probe,
    /// Show per-workspace speed and capacity
    ///
    /// Examples:
    ///   scratchpool stats
    ///   scratchpool stats --json
    Stats {
        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Print the workspace a file of the given size would be placed in
    ///
    /// Example: scratchpool select --size 2G
    Select {
        /// File size, e.g. 4096, 64K, 10M, 2GiB
        #[arg(long, value_parser = parse_byte_size)]
        size: u64,
    },
    /// Create a temp file in the selected workspace and print its path
    ///
    /// The file is kept after the command exits.
    ///
    /// Example: scratchpool create --size 10M --prefix upload-
    Create {
        /// Expected file size, e.g. 10M
        #[arg(long, value_parser = parse_byte_size)]
        size: u64,

        /// Basename prefix for the new file
        #[arg(long, default_value = DEFAULT_UPLOAD_PREFIX)]
        prefix: String,
    },
    /// Remove leftover temp files from every workspace
    ///
    /// Examples:
    ///   scratchpool clean
    ///   scratchpool clean --older-than-hours 1
    Clean {
        /// Age threshold in hours (default: cleanup.max_age_hours)
        #[arg(long)]
        older_than_hours: Option<u64>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_file = cli.config.as_deref().map(std::path::Path::new);
    let mut config = Config::load_with_file(config_file).context("Failed to load config")?;
    if let Some(tmpdirs) = cli.tmpdirs {
        config.workspace.tmpdirs = tmpdirs;
    }
    if let Some(threshold) = cli.threshold {
        config.workspace.capacity_threshold = threshold;
    }

    // Set up tracing
    let filter = if cli.verbose {
        "debug".to_string()
    } else {
        config.logging.level.clone()
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Probe => commands::probe::run(&config)?,
        Commands::Stats { json } => commands::stats::run(&config, json)?,
        Commands::Select { size } => commands::select::run(&config, size)?,
        Commands::Create { size, prefix } => commands::create::run(&config, size, &prefix)?,
        Commands::Clean { older_than_hours } => commands::clean::run(&config, older_than_hours)?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "scratchpool",
            "select",
            "--size",
            "10M",
            "--tmpdirs",
            "/a,/b",
            "--threshold",
            "2.5",
            "-v",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.tmpdirs.as_deref(), Some("/a,/b"));
        assert_eq!(cli.threshold, Some(2.5));
        match cli.command {
            Commands::Select { size } => assert_eq!(size, 10 * 1024 * 1024),
            _ => panic!("expected select"),
        }
    }

    #[test]
    fn create_defaults_to_upload_prefix() {
        let cli = Cli::try_parse_from(["scratchpool", "create", "--size", "1K"]).unwrap();
        match cli.command {
            Commands::Create { size, prefix } => {
                assert_eq!(size, 1024);
                assert_eq!(prefix, "upload-");
            }
            _ => panic!("expected create"),
        }
    }

    #[test]
    fn negative_threshold_is_accepted_by_parser() {
        let cli = Cli::try_parse_from(["scratchpool", "--threshold", "-1", "probe"]).unwrap();
        assert_eq!(cli.threshold, Some(-1.0));
    }

    #[test]
    fn rejects_malformed_size() {
        assert!(Cli::try_parse_from(["scratchpool", "select", "--size", "ten"]).is_err());
        assert!(Cli::try_parse_from(["scratchpool", "select"]).is_err());
    }

    #[test]
    fn clean_age_is_optional() {
        let cli = Cli::try_parse_from(["scratchpool", "clean"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Clean {
                older_than_hours: None
            }
        ));
    }

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
