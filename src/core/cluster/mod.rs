//! HA cluster monitoring and failover
//!
//! This module contains the probe interface, the health aggregator and
//! event differ, the continuous monitor loop and the failover orchestrator.

pub mod buffer;
pub mod events;
pub mod failover;
pub mod health;
pub mod monitor;
pub mod probe;
pub mod simulation;
pub mod types;

// Re-export commonly used types
pub use buffer::BoundedBuffer;
pub use events::{diff, LogEntry, LogLevel};
pub use failover::{
    CommandExecutor, CommandOutput, FailoverCommand, FailoverConfig, FailoverOrchestrator,
    FailoverResult, FailoverTargets, FailoverType, HaPair, StepName, StepResult,
};
pub use health::{aggregate, AggregatedSnapshot, ClusterHealth, HealthCategory};
pub use monitor::{ClusterMonitor, CycleOutcome, MonitorConfig, MonitorState};
pub use probe::{collect_cluster_status, probe_pair, ClusterProbe};
pub use simulation::{FailureSimulator, SimulationConfig, SimulationResult};
pub use types::{
    AuxiliaryService, AuxiliaryStatus, ClusterStatus, HealthRecord, JournalNodeStatus,
    NodeInventory, PairStatus, RoleSlot, ServiceKind, WorkerNode,
};
