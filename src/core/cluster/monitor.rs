//! Continuous cluster monitoring
//!
//! A supervised background task that probes every service, aggregates the
//! results into a health snapshot, diffs it against the previous snapshot
//! and keeps bounded history and log buffers for streaming readers.

use chrono::Utc;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::buffer::BoundedBuffer;
use super::events::{diff, LogEntry};
use super::failover::panic_message;
use super::health::{aggregate, AggregatedSnapshot};
use super::probe::{collect_cluster_status, ClusterProbe};
use super::types::ClusterStatus;
use crate::error::{AppError, Result};

/// Monitor loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Delay between successful cycles
    pub interval_ms: u64,
    /// Delay after a cycle that recorded an error
    pub error_backoff_ms: u64,
    pub max_history: usize,
    pub max_logs: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval_ms: 5000,
            error_backoff_ms: 10000,
            max_history: 100,
            max_logs: 200,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MonitorState {
    Idle,
    Running,
}

/// What one monitoring cycle produced
#[derive(Debug, Clone)]
pub struct CycleOutcome {
    pub snapshot: Arc<AggregatedSnapshot>,
    pub events: Vec<LogEntry>,
    pub error: Option<String>,
}

struct MonitorStore {
    current: RwLock<Option<Arc<AggregatedSnapshot>>>,
    history: RwLock<BoundedBuffer<Arc<AggregatedSnapshot>>>,
    logs: RwLock<BoundedBuffer<LogEntry>>,
    cycles: AtomicU64,
}

#[derive(Clone)]
struct MonitorWorker {
    probe: Arc<dyn ClusterProbe>,
    config: MonitorConfig,
    store: Arc<MonitorStore>,
}

impl MonitorWorker {
    async fn run_cycle(&self) -> CycleOutcome {
        let timestamp = Utc::now();

        let collected = AssertUnwindSafe(async {
            let (status, error) = match collect_cluster_status(&self.probe).await {
                Ok(status) => (status, None),
                Err(e) => (ClusterStatus::unavailable(), Some(e.to_string())),
            };
            let mut snapshot = aggregate(&status, timestamp);
            snapshot.error = error;
            snapshot
        })
        .catch_unwind()
        .await;

        let snapshot = match collected {
            Ok(snapshot) => snapshot,
            Err(panic) => {
                let mut snapshot = aggregate(&ClusterStatus::unavailable(), timestamp);
                snapshot.error = Some(panic_message(panic));
                snapshot
            }
        };
        if let Some(e) = &snapshot.error {
            error!(error = %e, "Error collecting cluster metrics");
        }
        let error = snapshot.error.clone();
        let snapshot = Arc::new(snapshot);

        let events = {
            let mut history = self.store.history.write().await;
            let events = match history.latest() {
                Some(previous) => {
                    std::panic::catch_unwind(AssertUnwindSafe(|| diff(previous, &snapshot)))
                        .unwrap_or_else(|panic| {
                            error!(error = %panic_message(panic), "Failed to diff snapshots");
                            Vec::new()
                        })
                }
                None => Vec::new(),
            };
            history.push(Arc::clone(&snapshot));
            events
        };

        *self.store.current.write().await = Some(Arc::clone(&snapshot));

        if !events.is_empty() {
            let mut logs = self.store.logs.write().await;
            for entry in &events {
                entry.emit();
                logs.push(entry.clone());
            }
        }

        let cycle = self.store.cycles.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(
            cycle = cycle,
            score = snapshot.cluster_health.score,
            status = %snapshot.cluster_health.status,
            events = events.len(),
            "Monitoring cycle completed"
        );

        CycleOutcome {
            snapshot,
            events,
            error,
        }
    }

    async fn run(self, shutdown: CancellationToken) {
        let interval = Duration::from_millis(self.config.interval_ms);
        let backoff = Duration::from_millis(self.config.error_backoff_ms);

        loop {
            if shutdown.is_cancelled() {
                break;
            }

            let delay = match AssertUnwindSafe(self.run_cycle()).catch_unwind().await {
                Ok(outcome) if outcome.error.is_none() => interval,
                Ok(_) => backoff,
                Err(_) => {
                    error!("Monitoring cycle panicked");
                    backoff
                }
            };

            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        info!("Cluster monitoring loop exited");
    }
}

struct MonitorTask {
    shutdown: CancellationToken,
    handle: JoinHandle<()>,
}

/// Owner of the monitoring loop and its bounded buffers
pub struct ClusterMonitor {
    worker: MonitorWorker,
    task: Mutex<Option<MonitorTask>>,
}

impl ClusterMonitor {
    pub fn new(probe: Arc<dyn ClusterProbe>, config: MonitorConfig) -> Self {
        let store = MonitorStore {
            current: RwLock::new(None),
            history: RwLock::new(BoundedBuffer::new(config.max_history)),
            logs: RwLock::new(BoundedBuffer::new(config.max_logs)),
            cycles: AtomicU64::new(0),
        };

        Self {
            worker: MonitorWorker {
                probe,
                config,
                store: Arc::new(store),
            },
            task: Mutex::new(None),
        }
    }

    /// Start the monitoring loop. Calling this while running is a no-op.
    pub async fn start(&self) -> Result<()> {
        let mut task = self.task.lock().await;
        if task.as_ref().is_some_and(|t| !t.handle.is_finished()) {
            warn!("Cluster monitoring is already running");
            return Ok(());
        }

        info!(
            interval_ms = self.worker.config.interval_ms,
            error_backoff_ms = self.worker.config.error_backoff_ms,
            "Starting cluster monitoring"
        );

        let shutdown = CancellationToken::new();
        let worker = self.worker.clone();
        let handle = tokio::spawn(worker.run(shutdown.clone()));
        *task = Some(MonitorTask { shutdown, handle });

        Ok(())
    }

    /// Stop the loop and wait for any in-flight cycle to finish
    pub async fn stop(&self) -> Result<()> {
        let Some(task) = self.task.lock().await.take() else {
            debug!("Cluster monitoring is not running");
            return Ok(());
        };

        info!("Stopping cluster monitoring");
        task.shutdown.cancel();
        task.handle
            .await
            .map_err(|e| AppError::InternalServerError(format!("Monitor task failed: {}", e)))
    }

    pub async fn state(&self) -> MonitorState {
        match self.task.lock().await.as_ref() {
            Some(task) if !task.handle.is_finished() => MonitorState::Running,
            _ => MonitorState::Idle,
        }
    }

    /// Run a single cycle on the caller's task. Meant for an idle monitor.
    pub async fn run_cycle(&self) -> CycleOutcome {
        self.worker.run_cycle().await
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.worker.config
    }

    pub fn cycles_completed(&self) -> u64 {
        self.worker.store.cycles.load(Ordering::SeqCst)
    }

    pub async fn current_snapshot(&self) -> Option<Arc<AggregatedSnapshot>> {
        self.worker.store.current.read().await.clone()
    }

    /// Up to `limit` snapshots, most recent last
    pub async fn history(&self, limit: usize) -> Vec<Arc<AggregatedSnapshot>> {
        self.worker.store.history.read().await.tail(limit)
    }

    /// Up to `limit` log entries, most recent last
    pub async fn recent_logs(&self, limit: usize) -> Vec<LogEntry> {
        self.worker.store.logs.read().await.tail(limit)
    }
}
