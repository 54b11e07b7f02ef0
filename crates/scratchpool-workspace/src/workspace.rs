use crate::probe::{CapacityProbe, ThroughputProbe};
use scratchpool_core::error::ProbeError;
use serde::{Serialize, Serializer};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// One scratch directory with its throughput rating and last capacity reading.
pub struct Workspace {
    path: PathBuf,
    write_mbps: f64,
    reading: RwLock<CapacityReading>,
    capacity_probe: Arc<dyn CapacityProbe>,
}

#[derive(Debug, Clone, Copy)]
struct CapacityReading {
    available_bytes: u64,
    total_bytes: u64,
    last_checked: SystemTime,
}

/// Value snapshot of a workspace, detached from the live instance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stats {
    pub path: PathBuf,
    pub write_mbps: f64,
    pub available_bytes: u64,
    pub total_bytes: u64,
    #[serde(serialize_with = "serialize_unix_secs")]
    pub last_checked: SystemTime,
}

impl Workspace {
    /// A workspace with no throughput rating and a never-checked capacity reading.
    pub fn new(path: impl Into<PathBuf>, capacity_probe: Arc<dyn CapacityProbe>) -> Self {
        Self {
            path: path.into(),
            write_mbps: 0.0,
            reading: RwLock::new(CapacityReading {
                available_bytes: 0,
                total_bytes: 0,
                last_checked: UNIX_EPOCH,
            }),
            capacity_probe,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write_mbps(&self) -> f64 {
        self.write_mbps
    }

    /// Measure write throughput and record it.
    ///
    /// Zero, negative and non-finite measurements are rejected so that every
    /// rated workspace has `write_mbps > 0`.
    pub fn benchmark(&mut self, probe: &dyn ThroughputProbe) -> Result<f64, ProbeError> {
        let mbps = probe.measure(&self.path)?;
        if !mbps.is_finite() || mbps <= 0.0 {
            return Err(ProbeError::InvalidMeasurement {
                path: self.path.clone(),
                mbps,
            });
        }
        self.write_mbps = mbps;
        Ok(mbps)
    }

    /// Re-read free space under the writer lock.
    pub fn update_capacity(&self) -> Result<(), ProbeError> {
        let mut reading = self.write_reading();
        let capacity = self.capacity_probe.probe(&self.path)?;
        reading.total_bytes = capacity.total_bytes;
        reading.available_bytes = capacity.available_bytes.min(capacity.total_bytes);
        reading.last_checked = SystemTime::now();
        Ok(())
    }

    pub fn get_available_bytes(&self) -> u64 {
        self.read_reading().available_bytes
    }

    pub fn get_total_bytes(&self) -> u64 {
        self.read_reading().total_bytes
    }

    pub fn last_checked(&self) -> SystemTime {
        self.read_reading().last_checked
    }

    /// True when the capacity reading is older than `bound`, or when the wall
    /// clock has moved behind the time it was taken.
    pub fn is_stale(&self, bound: Duration) -> bool {
        match self.last_checked().elapsed() {
            Ok(age) => age > bound,
            Err(_) => true,
        }
    }

    pub fn stats(&self) -> Stats {
        let reading = self.read_reading();
        Stats {
            path: self.path.clone(),
            write_mbps: self.write_mbps,
            available_bytes: reading.available_bytes,
            total_bytes: reading.total_bytes,
            last_checked: reading.last_checked,
        }
    }

    #[cfg(test)]
    pub(crate) fn backdate_last_checked(&self, by: Duration) {
        let mut reading = self.write_reading();
        reading.last_checked = reading
            .last_checked
            .checked_sub(by)
            .unwrap_or(UNIX_EPOCH);
    }

    // The guarded counters stay consistent even if a holder panicked.
    fn read_reading(&self) -> RwLockReadGuard<'_, CapacityReading> {
        self.reading.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_reading(&self) -> RwLockWriteGuard<'_, CapacityReading> {
        self.reading.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for Workspace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reading = *self.read_reading();
        f.debug_struct("Workspace")
            .field("path", &self.path)
            .field("write_mbps", &self.write_mbps)
            .field("available_bytes", &reading.available_bytes)
            .field("total_bytes", &reading.total_bytes)
            .field("last_checked", &reading.last_checked)
            .finish_non_exhaustive()
    }
}

fn serialize_unix_secs<S>(time: &SystemTime, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let secs = time
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    serializer.serialize_u64(secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::{Capacity, StatvfsProbe, WriteBenchmark};

    struct FixedCapacity(Capacity);

    impl CapacityProbe for FixedCapacity {
        fn probe(&self, _dir: &Path) -> Result<Capacity, ProbeError> {
            Ok(self.0)
        }
    }

    struct FailingCapacity;

    impl CapacityProbe for FailingCapacity {
        fn probe(&self, dir: &Path) -> Result<Capacity, ProbeError> {
            Err(ProbeError::stat(dir, std::io::Error::other("stat failed")))
        }
    }

    struct FixedThroughput(f64);

    impl ThroughputProbe for FixedThroughput {
        fn measure(&self, _dir: &Path) -> Result<f64, ProbeError> {
            Ok(self.0)
        }
    }

    #[test]
    fn benchmark_records_positive_throughput() {
        let dir = tempfile::tempdir().unwrap();
        let mut ws = Workspace::new(dir.path(), Arc::new(StatvfsProbe));
        let mbps = ws.benchmark(&WriteBenchmark::default()).unwrap();
        assert!(mbps > 0.0);
        assert_eq!(ws.write_mbps(), mbps);
    }

    #[test]
    fn benchmark_rejects_non_positive_measurements() {
        let dir = tempfile::tempdir().unwrap();
        let mut ws = Workspace::new(dir.path(), Arc::new(StatvfsProbe));
        for bad in [0.0, -3.0, f64::NAN, f64::INFINITY] {
            let err = ws.benchmark(&FixedThroughput(bad)).unwrap_err();
            assert!(matches!(err, ProbeError::InvalidMeasurement { .. }));
        }
        assert_eq!(ws.write_mbps(), 0.0);
    }

    #[test]
    fn update_capacity_reads_host_filesystem() {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::new(dir.path(), Arc::new(StatvfsProbe));
        assert!(ws.is_stale(Duration::from_secs(10)));

        ws.update_capacity().unwrap();
        let stats = ws.stats();
        assert!(stats.available_bytes > 0);
        assert!(stats.total_bytes > 0);
        assert!(stats.available_bytes <= stats.total_bytes);
        assert!(stats.last_checked > UNIX_EPOCH);
        assert!(!ws.is_stale(Duration::from_secs(10)));
    }

    #[test]
    fn update_capacity_clamps_available_to_total() {
        let ws = Workspace::new(
            "/scratch",
            Arc::new(FixedCapacity(Capacity {
                available_bytes: 900,
                total_bytes: 500,
            })),
        );
        ws.update_capacity().unwrap();
        assert_eq!(ws.get_available_bytes(), 500);
        assert_eq!(ws.get_total_bytes(), 500);
    }

    #[test]
    fn failed_update_keeps_previous_reading_and_releases_lock() {
        let ws = Workspace::new("/scratch", Arc::new(FailingCapacity));
        assert!(matches!(
            ws.update_capacity().unwrap_err(),
            ProbeError::Stat { .. }
        ));
        assert_eq!(ws.get_available_bytes(), 0);
        assert_eq!(ws.last_checked(), UNIX_EPOCH);
        // A second attempt must not deadlock on the writer lock.
        assert!(ws.update_capacity().is_err());
    }

    #[test]
    fn backdated_reading_becomes_stale() {
        let ws = Workspace::new(
            "/scratch",
            Arc::new(FixedCapacity(Capacity {
                available_bytes: 1,
                total_bytes: 2,
            })),
        );
        ws.update_capacity().unwrap();
        assert!(!ws.is_stale(Duration::from_secs(10)));
        ws.backdate_last_checked(Duration::from_secs(20));
        assert!(ws.is_stale(Duration::from_secs(10)));
    }

    #[test]
    fn stats_is_a_detached_copy() {
        let ws = Workspace::new(
            "/scratch",
            Arc::new(FixedCapacity(Capacity {
                available_bytes: 10,
                total_bytes: 20,
            })),
        );
        let before = ws.stats();
        ws.update_capacity().unwrap();
        assert_eq!(before.available_bytes, 0);
        assert_eq!(ws.stats().available_bytes, 10);
    }

    #[test]
    fn stats_serializes_last_checked_as_unix_seconds() {
        let stats = Stats {
            path: PathBuf::from("/scratch"),
            write_mbps: 120.5,
            available_bytes: 10,
            total_bytes: 20,
            last_checked: UNIX_EPOCH + Duration::from_secs(1_700_000_000),
        };
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["path"], "/scratch");
        assert_eq!(json["last_checked"], 1_700_000_000u64);
        assert_eq!(json["available_bytes"], 10);
    }

    #[test]
    fn concurrent_reads_do_not_race() {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::new(dir.path(), Arc::new(StatvfsProbe));
        ws.update_capacity().unwrap();
        let expected_total = ws.get_total_bytes();

        std::thread::scope(|scope| {
            for _ in 0..10 {
                scope.spawn(|| {
                    for _ in 0..100 {
                        let available = ws.get_available_bytes();
                        assert!(available <= expected_total);
                    }
                });
            }
        });
    }
}
