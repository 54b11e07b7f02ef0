/// Reservation multiplier used when the caller supplies a non-positive threshold.
pub const DEFAULT_CAPACITY_THRESHOLD: f64 = 4.0;

/// Maximum age of a capacity reading before selection refreshes it (seconds).
pub const DEFAULT_STALENESS_SECS: u64 = 10;

/// Total payload written by the throughput probe (10 MiB).
pub const BENCHMARK_PAYLOAD_BYTES: usize = 10 * MIB as usize;

/// Chunk size used by the throughput probe (1 MiB).
pub const BENCHMARK_CHUNK_BYTES: usize = MIB as usize;

/// Basename prefix of throughput probe scratch files.
pub const BENCHMARK_FILE_PREFIX: &str = "scratchpool-benchmark-";

/// Permission bits for workspace directories created at startup.
pub const WORKSPACE_DIR_MODE: u32 = 0o755;

/// Default temp-file prefix for uploads.
pub const DEFAULT_UPLOAD_PREFIX: &str = "upload-";

/// Default age after which leftover temp files are swept (hours).
pub const DEFAULT_CLEANUP_MAX_AGE_HOURS: u64 = 24;

/// Default data directory name under home.
pub const DEFAULT_DATA_DIR: &str = ".scratchpool";

/// Global config file name inside the data directory.
pub const CONFIG_FILE_NAME: &str = "config.toml";

pub const KIB: u64 = 1024;
pub const MIB: u64 = 1024 * KIB;
pub const GIB: u64 = 1024 * MIB;
pub const TIB: u64 = 1024 * GIB;
