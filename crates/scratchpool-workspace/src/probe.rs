//! Probes that characterize a scratch directory.
//!
//! Both probes sit behind traits so the manager can be driven against
//! simulated filesystems. The default implementations talk to the host:
//! [`StatvfsProbe`] reads filesystem block counts, [`WriteBenchmark`] times a
//! synced sequential write.

use scratchpool_core::constants::{
    BENCHMARK_CHUNK_BYTES, BENCHMARK_FILE_PREFIX, BENCHMARK_PAYLOAD_BYTES, MIB,
};
use scratchpool_core::error::ProbeError;
use std::io::Write;
use std::path::Path;
use std::time::Instant;
use tracing::debug;

/// Byte counts for the filesystem holding a directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capacity {
    pub available_bytes: u64,
    pub total_bytes: u64,
}

pub trait CapacityProbe: Send + Sync {
    fn probe(&self, dir: &Path) -> Result<Capacity, ProbeError>;
}

pub trait ThroughputProbe: Send + Sync {
    /// Sequential write throughput of `dir` in MB/s.
    fn measure(&self, dir: &Path) -> Result<f64, ProbeError>;
}

/// `statvfs`-backed capacity probe.
///
/// total = blocks × fragment size, available = blocks available to
/// unprivileged users × fragment size.
#[derive(Debug, Default, Clone, Copy)]
pub struct StatvfsProbe;

impl CapacityProbe for StatvfsProbe {
    fn probe(&self, dir: &Path) -> Result<Capacity, ProbeError> {
        let stats = fs4::statvfs(dir).map_err(|e| ProbeError::stat(dir, e))?;
        Ok(Capacity {
            available_bytes: stats.available_space(),
            total_bytes: stats.total_space(),
        })
    }
}

/// Writes a fixed payload to a scratch file, syncs it, and reports MB/s.
///
/// The `sync_all` barrier is inside the timed region so the figure reflects
/// the storage device rather than the page cache.
#[derive(Debug, Clone, Copy)]
pub struct WriteBenchmark {
    payload_bytes: usize,
    chunk_bytes: usize,
}

impl Default for WriteBenchmark {
    fn default() -> Self {
        Self {
            payload_bytes: BENCHMARK_PAYLOAD_BYTES,
            chunk_bytes: BENCHMARK_CHUNK_BYTES,
        }
    }
}

impl WriteBenchmark {
    pub fn with_payload(payload_bytes: usize, chunk_bytes: usize) -> Self {
        Self {
            payload_bytes: payload_bytes.max(1),
            chunk_bytes: chunk_bytes.max(1),
        }
    }
}

impl ThroughputProbe for WriteBenchmark {
    fn measure(&self, dir: &Path) -> Result<f64, ProbeError> {
        // NamedTempFile unlinks on drop, so every early return below cleans up.
        let mut scratch = tempfile::Builder::new()
            .prefix(BENCHMARK_FILE_PREFIX)
            .tempfile_in(dir)
            .map_err(|e| ProbeError::create_scratch(dir, e))?;
        let chunk = benchmark_chunk(self.chunk_bytes);

        let start = Instant::now();
        let mut written = 0usize;
        while written < self.payload_bytes {
            let len = chunk.len().min(self.payload_bytes - written);
            scratch
                .as_file_mut()
                .write_all(&chunk[..len])
                .map_err(|e| ProbeError::write(dir, e))?;
            written += len;
        }
        scratch
            .as_file()
            .sync_all()
            .map_err(|e| ProbeError::sync(dir, e))?;
        let elapsed = start.elapsed().as_secs_f64().max(1e-9);

        let mbps = written as f64 / MIB as f64 / elapsed;
        if let Err(err) = scratch.close() {
            debug!(path = %dir.display(), error = %err, "failed to remove benchmark file");
        }
        Ok(mbps)
    }
}

fn benchmark_chunk(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statvfs_probe_reports_consistent_capacity() {
        let dir = tempfile::tempdir().unwrap();
        let capacity = StatvfsProbe.probe(dir.path()).unwrap();
        assert!(capacity.total_bytes > 0);
        assert!(capacity.available_bytes <= capacity.total_bytes);
    }

    #[test]
    fn statvfs_probe_fails_for_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("does-not-exist");
        let err = StatvfsProbe.probe(&missing).unwrap_err();
        assert!(matches!(err, ProbeError::Stat { .. }));
        assert_eq!(err.path(), missing.as_path());
    }

    #[test]
    fn write_benchmark_measures_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let mbps = WriteBenchmark::default().measure(dir.path()).unwrap();
        assert!(mbps.is_finite());
        assert!(mbps > 0.0);

        let leftovers = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 0, "benchmark file must be removed");
    }

    #[test]
    fn write_benchmark_handles_partial_final_chunk() {
        let dir = tempfile::tempdir().unwrap();
        let probe = WriteBenchmark::with_payload(3 * 1024 + 17, 1024);
        assert!(probe.measure(dir.path()).unwrap() > 0.0);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn write_benchmark_fails_when_directory_is_missing() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing");
        let err = WriteBenchmark::default().measure(&missing).unwrap_err();
        assert!(matches!(err, ProbeError::CreateScratch { .. }));
    }

    #[test]
    fn benchmark_chunk_content_is_deterministic() {
        assert_eq!(benchmark_chunk(4), vec![0, 1, 2, 3]);
        assert_eq!(benchmark_chunk(300)[251], 0);
        assert_eq!(benchmark_chunk(1024), benchmark_chunk(1024));
    }
}
