pub mod cleanup;
pub mod manager;
pub mod probe;
pub mod workspace;

pub use cleanup::CleanupReport;
pub use manager::{Manager, ManagerOptions, Placement, PlacementTier, split_path_list};
pub use probe::{Capacity, CapacityProbe, StatvfsProbe, ThroughputProbe, WriteBenchmark};
pub use workspace::{Stats, Workspace};
