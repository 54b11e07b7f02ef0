//! Sweep of leftover temp files in workspace roots.
//!
//! Only regular files directly in a workspace root are considered. The sweep
//! does not recurse or follow symlinks.

use scratchpool_core::constants::BENCHMARK_FILE_PREFIX;
use serde::Serialize;
use std::fs;
use std::path::Path;
use std::time::{Duration, SystemTime};
use tracing::{debug, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    /// Regular files that matched a prefix.
    pub scanned: usize,
    pub removed: usize,
    pub removed_bytes: u64,
    pub failed: usize,
}

pub(crate) fn with_benchmark_prefix(prefixes: &[String]) -> Vec<String> {
    let mut all: Vec<String> = prefixes
        .iter()
        .filter(|p| !p.is_empty())
        .cloned()
        .collect();
    if !all.iter().any(|p| p == BENCHMARK_FILE_PREFIX) {
        all.push(BENCHMARK_FILE_PREFIX.to_string());
    }
    all
}

pub(crate) fn sweep_dir(
    root: &Path,
    max_age: Duration,
    prefixes: &[String],
    report: &mut CleanupReport,
) {
    let entries = match fs::read_dir(root) {
        Ok(entries) => entries,
        Err(err) => {
            warn!(path = %root.display(), error = %err, "failed to list workspace");
            report.failed += 1;
            return;
        }
    };

    let now = SystemTime::now();
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!(path = %root.display(), error = %err, "failed to read directory entry");
                report.failed += 1;
                continue;
            }
        };

        // DirEntry::file_type does not follow symlinks.
        let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
        if !is_file {
            continue;
        }
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if !prefixes.iter().any(|p| name.starts_with(p.as_str())) {
            continue;
        }
        report.scanned += 1;

        let path = entry.path();
        let metadata = match entry.metadata() {
            Ok(metadata) => metadata,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "failed to stat temp file");
                report.failed += 1;
                continue;
            }
        };
        let modified = match metadata.modified() {
            Ok(modified) => modified,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "no modification time");
                report.failed += 1;
                continue;
            }
        };
        // Future mtimes count as fresh.
        let Ok(age) = now.duration_since(modified) else {
            continue;
        };
        if age <= max_age {
            continue;
        }

        match fs::remove_file(&path) {
            Ok(()) => {
                debug!(path = %path.display(), age_secs = age.as_secs(), "removed stale file");
                report.removed += 1;
                report.removed_bytes += metadata.len();
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "failed to remove stale file");
                report.failed += 1;
            }
        }
    }
}
