//! Hadoop HA cluster monitor
//!
//! This library continuously probes the paired NameNode and ResourceManager
//! instances of a Hadoop cluster, scores overall health, records detected
//! events, and runs operator-triggered failovers with live verification.

use std::sync::Arc;

pub mod application;
pub mod config;
pub mod core;
pub mod error;
pub mod infrastructure;
pub mod presentation;

// Re-export commonly used types
pub use error::{AppError, Result};

use crate::core::cluster::{
    ClusterMonitor, ClusterProbe, CommandExecutor, FailoverOrchestrator, FailureSimulator,
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub env: Arc<config::AppConfiguration>,
    pub probe: Arc<dyn ClusterProbe>,
    pub monitor: Arc<ClusterMonitor>,
    pub failover: Arc<FailoverOrchestrator>,
    pub simulator: Arc<FailureSimulator>,
}

impl AppState {
    /// Wire the monitor, orchestrator and simulator around one probe.
    ///
    /// The monitor is created idle; starting and stopping it is up to the caller.
    pub fn new(
        config: config::AppConfiguration,
        probe: Arc<dyn ClusterProbe>,
        executor: Arc<dyn CommandExecutor>,
    ) -> Self {
        let monitor = ClusterMonitor::new(Arc::clone(&probe), config.monitor.clone());
        let failover = FailoverOrchestrator::new(
            Arc::clone(&probe),
            executor,
            config.cluster.failover_targets(),
            config.failover.clone(),
        );
        let simulator = FailureSimulator::new(config.simulation.clone());

        Self {
            env: Arc::new(config),
            probe,
            monitor: Arc::new(monitor),
            failover: Arc::new(failover),
            simulator: Arc::new(simulator),
        }
    }
}
