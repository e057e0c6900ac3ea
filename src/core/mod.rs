//! Core domain logic
//!
//! Cluster health evaluation, monitoring and failover orchestration, plus
//! process-wide logging setup.

// HA monitoring and failover
pub mod cluster;

// Tracing subscriber initialisation
pub mod logging;

pub use cluster::{ClusterMonitor, ClusterProbe, CommandExecutor, FailoverOrchestrator};
