use crate::cleanup::{self, CleanupReport};
use crate::probe::{CapacityProbe, StatvfsProbe, ThroughputProbe, WriteBenchmark};
use crate::workspace::{Stats, Workspace};
use scratchpool_core::config::WorkspaceConfig;
use scratchpool_core::constants::{
    DEFAULT_CAPACITY_THRESHOLD, DEFAULT_STALENESS_SECS, WORKSPACE_DIR_MODE,
};
use scratchpool_core::error::WorkspaceError;
use scratchpool_core::units::format_bytes;
use std::fmt;
use std::fs::DirBuilder;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};
use std::time::Duration;
use tempfile::NamedTempFile;
use tracing::{info, warn};

/// Tunables and probe implementations for a [`Manager`].
#[derive(Clone)]
pub struct ManagerOptions {
    pub staleness: Duration,
    pub capacity_probe: Arc<dyn CapacityProbe>,
    pub throughput_probe: Arc<dyn ThroughputProbe>,
}

impl Default for ManagerOptions {
    fn default() -> Self {
        Self {
            staleness: Duration::from_secs(DEFAULT_STALENESS_SECS),
            capacity_probe: Arc::new(StatvfsProbe),
            throughput_probe: Arc::new(WriteBenchmark::default()),
        }
    }
}

impl ManagerOptions {
    pub fn from_config(config: &WorkspaceConfig) -> Self {
        Self::default().with_staleness(config.staleness())
    }

    pub fn with_staleness(mut self, staleness: Duration) -> Self {
        self.staleness = staleness;
        self
    }

    pub fn with_capacity_probe(mut self, probe: Arc<dyn CapacityProbe>) -> Self {
        self.capacity_probe = probe;
        self
    }

    pub fn with_throughput_probe(mut self, probe: Arc<dyn ThroughputProbe>) -> Self {
        self.throughput_probe = probe;
        self
    }
}

impl fmt::Debug for ManagerOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagerOptions")
            .field("staleness", &self.staleness)
            .finish_non_exhaustive()
    }
}

/// Which selection pass produced a placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementTier {
    /// Available space covered `file_size × threshold`.
    Preferred,
    /// Available space covered `file_size × threshold / 2`.
    Relaxed,
    /// Workspace with the most free space, regardless of the request.
    LastResort,
}

impl PlacementTier {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Preferred => "preferred",
            Self::Relaxed => "relaxed",
            Self::LastResort => "last-resort",
        }
    }
}

impl fmt::Display for PlacementTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct Placement {
    workspace: Arc<Workspace>,
    tier: PlacementTier,
}

impl Placement {
    pub fn workspace(&self) -> &Arc<Workspace> {
        &self.workspace
    }

    pub fn path(&self) -> &Path {
        self.workspace.path()
    }

    pub fn tier(&self) -> PlacementTier {
        self.tier
    }
}

struct Inner {
    workspaces: Vec<Arc<Workspace>>,
    capacity_threshold: f64,
}

/// Ranked collection of scratch directories.
///
/// Workspaces are benchmarked once at construction and kept in descending
/// write-speed order. Every public operation takes the manager lock in
/// reader mode; capacity refreshes lock only the workspace being refreshed.
pub struct Manager {
    inner: RwLock<Inner>,
    staleness: Duration,
}

impl Manager {
    /// Build a manager from a comma-separated list of directories using the
    /// host probes.
    pub fn new(path_list: &str, capacity_threshold: f64) -> Result<Self, WorkspaceError> {
        Self::with_options(path_list, capacity_threshold, ManagerOptions::default())
    }

    pub fn with_options(
        path_list: &str,
        capacity_threshold: f64,
        options: ManagerOptions,
    ) -> Result<Self, WorkspaceError> {
        let paths = split_path_list(path_list);
        if paths.is_empty() {
            return Err(WorkspaceError::config("no workspace paths provided"));
        }

        let capacity_threshold = effective_threshold(capacity_threshold);

        let mut workspaces = Vec::with_capacity(paths.len());
        for path in paths {
            match prepare_workspace(&path, &options) {
                Ok(workspace) => {
                    info!(
                        path = %workspace.path().display(),
                        write_mbps = format_args!("{:.2}", workspace.write_mbps()),
                        available = %format_bytes(workspace.get_available_bytes()),
                        total = %format_bytes(workspace.get_total_bytes()),
                        "workspace ready"
                    );
                    workspaces.push(Arc::new(workspace));
                }
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "skipping workspace");
                }
            }
        }

        if workspaces.is_empty() {
            return Err(WorkspaceError::config("no usable workspaces"));
        }

        // Stable: equal speeds keep their input order.
        workspaces.sort_by(|a, b| b.write_mbps().total_cmp(&a.write_mbps()));

        Ok(Self {
            inner: RwLock::new(Inner {
                workspaces,
                capacity_threshold,
            }),
            staleness: options.staleness,
        })
    }

    /// Choose a workspace for a file of `file_size` bytes.
    ///
    /// Passes, in rank order: a reading covering the preferred reservation
    /// (stale readings are refreshed first), then one covering half of it,
    /// then whichever workspace has the most free space. Selection reserves
    /// nothing; concurrent callers may be handed the same workspace.
    pub fn select_workspace(&self, file_size: u64) -> Result<Placement, WorkspaceError> {
        let inner = self.read_inner();
        if inner.workspaces.is_empty() {
            return Err(WorkspaceError::NoWorkspaces);
        }

        let preferred = reservation(file_size, inner.capacity_threshold);
        for workspace in &inner.workspaces {
            if workspace.is_stale(self.staleness)
                && let Err(err) = workspace.update_capacity()
            {
                warn!(
                    path = %workspace.path().display(),
                    error = %err,
                    "failed to refresh workspace capacity"
                );
                continue;
            }
            if workspace.get_available_bytes() >= preferred {
                return Ok(Placement {
                    workspace: Arc::clone(workspace),
                    tier: PlacementTier::Preferred,
                });
            }
        }

        let relaxed = reservation(file_size, inner.capacity_threshold / 2.0);
        for workspace in &inner.workspaces {
            let available = workspace.get_available_bytes();
            if available >= relaxed {
                let percent = if preferred == 0 {
                    100.0
                } else {
                    available as f64 / preferred as f64 * 100.0
                };
                warn!(
                    path = %workspace.path().display(),
                    file_size,
                    "using workspace with limited space ({percent:.2}% of preferred buffer)"
                );
                return Ok(Placement {
                    workspace: Arc::clone(workspace),
                    tier: PlacementTier::Relaxed,
                });
            }
        }

        let mut roomiest: Option<&Arc<Workspace>> = None;
        for workspace in &inner.workspaces {
            let more_room = roomiest
                .is_none_or(|best| workspace.get_available_bytes() > best.get_available_bytes());
            if more_room {
                roomiest = Some(workspace);
            }
        }
        let workspace = roomiest.ok_or(WorkspaceError::Selection { file_size })?;
        warn!(
            path = %workspace.path().display(),
            available = %format_bytes(workspace.get_available_bytes()),
            requested = %format_bytes(file_size),
            "all workspaces are low on space"
        );
        Ok(Placement {
            workspace: Arc::clone(workspace),
            tier: PlacementTier::LastResort,
        })
    }

    /// Select a workspace and open a new empty file in it whose basename
    /// starts with `prefix`.
    ///
    /// The returned handle removes the file on drop unless the caller keeps
    /// or persists it.
    pub fn create_temp_file(
        &self,
        file_size: u64,
        prefix: &str,
    ) -> Result<NamedTempFile, WorkspaceError> {
        let placement = self.select_workspace(file_size)?;
        tempfile::Builder::new()
            .prefix(prefix)
            .tempfile_in(placement.path())
            .map_err(|e| WorkspaceError::io(placement.path(), e))
    }

    /// Path of the fastest workspace.
    pub fn get_primary_path(&self) -> Option<PathBuf> {
        self.read_inner()
            .workspaces
            .first()
            .map(|ws| ws.path().to_path_buf())
    }

    pub fn get_all_paths(&self) -> Vec<PathBuf> {
        self.read_inner()
            .workspaces
            .iter()
            .map(|ws| ws.path().to_path_buf())
            .collect()
    }

    pub fn get_stats(&self) -> Vec<Stats> {
        self.read_inner()
            .workspaces
            .iter()
            .map(|ws| ws.stats())
            .collect()
    }

    pub fn capacity_threshold(&self) -> f64 {
        self.read_inner().capacity_threshold
    }

    pub fn len(&self) -> usize {
        self.read_inner().workspaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read_inner().workspaces.is_empty()
    }

    /// Remove leftover files older than `max_age` from every workspace root.
    ///
    /// Only regular files whose basename starts with one of `prefixes`, or
    /// with the benchmark prefix, are candidates.
    pub fn clean_stale_files(&self, max_age: Duration, prefixes: &[String]) -> CleanupReport {
        let inner = self.read_inner();
        let prefixes = cleanup::with_benchmark_prefix(prefixes);
        let mut report = CleanupReport::default();
        for workspace in &inner.workspaces {
            cleanup::sweep_dir(workspace.path(), max_age, &prefixes, &mut report);
        }
        if report.removed > 0 || report.failed > 0 {
            info!(
                removed = report.removed,
                failed = report.failed,
                freed = %format_bytes(report.removed_bytes),
                "stale file sweep finished"
            );
        }
        report
    }

    fn read_inner(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for Manager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.read_inner();
        f.debug_struct("Manager")
            .field("workspaces", &inner.workspaces)
            .field("capacity_threshold", &inner.capacity_threshold)
            .field("staleness", &self.staleness)
            .finish()
    }
}

/// Comma-separated directory list as the manager reads it: entries trimmed,
/// empty entries dropped.
pub fn split_path_list(path_list: &str) -> Vec<PathBuf> {
    path_list
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(PathBuf::from)
        .collect()
}

fn effective_threshold(threshold: f64) -> f64 {
    if threshold.is_finite() && threshold > 0.0 {
        threshold
    } else {
        DEFAULT_CAPACITY_THRESHOLD
    }
}

fn prepare_workspace(path: &Path, options: &ManagerOptions) -> Result<Workspace, WorkspaceError> {
    create_workspace_dir(path).map_err(|e| WorkspaceError::io(path, e))?;
    let mut workspace = Workspace::new(path, Arc::clone(&options.capacity_probe));
    workspace.benchmark(options.throughput_probe.as_ref())?;
    workspace.update_capacity()?;
    Ok(workspace)
}

fn create_workspace_dir(path: &Path) -> std::io::Result<()> {
    let mut builder = DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(WORKSPACE_DIR_MODE);
    }
    builder.create(path)
}

/// `file_size × multiplier`, saturating at `u64::MAX`.
fn reservation(file_size: u64, multiplier: f64) -> u64 {
    (file_size as f64 * multiplier) as u64
}
