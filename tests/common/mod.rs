#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use hadoop_ha_monitor::{
    config::AppConfiguration,
    core::cluster::{
        AuxiliaryService, AuxiliaryStatus, ClusterProbe, CommandExecutor, CommandOutput,
        FailoverCommand, FailoverConfig, FailoverOrchestrator, FailoverTargets, HealthRecord,
        JournalNodeStatus, MonitorConfig, NodeInventory, RoleSlot, ServiceKind, WorkerNode,
    },
    error::{AppError, Result},
    AppState,
};

/// Reported state that makes the scripted probe return an unreachable record
pub const UNREACHABLE: &str = "unreachable";

/// Per-slot queue of reported states. The last state repeats once the queue drains.
#[derive(Default)]
struct SlotScript {
    states: VecDeque<String>,
    last: Option<String>,
}

impl SlotScript {
    fn next(&mut self) -> String {
        if let Some(state) = self.states.pop_front() {
            self.last = Some(state.clone());
            return state;
        }
        self.last.clone().unwrap_or_else(|| "unknown".to_string())
    }
}

/// `ClusterProbe` double driven by scripted HA states.
///
/// Each `probe_pair` call consumes exactly one state per slot, so a script of
/// `(active, standby)` tuples reads as one tuple per pair poll.
pub struct ScriptedProbe {
    scripts: Mutex<HashMap<(ServiceKind, RoleSlot), SlotScript>>,
    metrics: Mutex<HashMap<ServiceKind, HashMap<String, f64>>>,
    nodes: Mutex<NodeInventory>,
    auxiliary_healthy: AtomicBool,
    panic_on_probe: AtomicBool,
    panic_on_nodes: AtomicBool,
    probe_calls: Mutex<HashMap<ServiceKind, usize>>,
}

impl ScriptedProbe {
    /// Both pairs steady in their deployed roles, every node and service healthy
    pub fn healthy() -> Self {
        let probe = Self {
            scripts: Mutex::new(HashMap::new()),
            metrics: Mutex::new(HashMap::new()),
            nodes: Mutex::new(healthy_inventory()),
            auxiliary_healthy: AtomicBool::new(true),
            panic_on_probe: AtomicBool::new(false),
            panic_on_nodes: AtomicBool::new(false),
            probe_calls: Mutex::new(HashMap::new()),
        };
        for service in ServiceKind::ALL {
            probe.script(service, &[("active", "standby")]);
        }
        probe
    }

    /// Replace the script for `service` with one `(active, standby)` tuple per poll
    pub fn script(&self, service: ServiceKind, polls: &[(&str, &str)]) {
        let mut scripts = self.scripts.lock().unwrap();
        for (index, slot) in [RoleSlot::Active, RoleSlot::Standby].into_iter().enumerate() {
            let states = polls
                .iter()
                .map(|poll| if index == 0 { poll.0 } else { poll.1 }.to_string())
                .collect();
            scripts.insert((service, slot), SlotScript { states, last: None });
        }
    }

    pub fn with_script(self, service: ServiceKind, polls: &[(&str, &str)]) -> Self {
        self.script(service, polls);
        self
    }

    pub fn set_metrics(&self, service: ServiceKind, metrics: &[(&str, f64)]) {
        self.metrics.lock().unwrap().insert(
            service,
            metrics.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
        );
    }

    pub fn set_auxiliary_healthy(&self, healthy: bool) {
        self.auxiliary_healthy.store(healthy, Ordering::SeqCst);
    }

    pub fn set_panic_on_probe(&self, panic: bool) {
        self.panic_on_probe.store(panic, Ordering::SeqCst);
    }

    pub fn set_panic_on_nodes(&self, panic: bool) {
        self.panic_on_nodes.store(panic, Ordering::SeqCst);
    }

    /// Number of `probe_pair` polls served for `service`
    pub fn polls(&self, service: ServiceKind) -> usize {
        let calls = self
            .probe_calls
            .lock()
            .unwrap()
            .get(&service)
            .copied()
            .unwrap_or(0);
        calls / 2
    }
}

#[async_trait]
impl ClusterProbe for ScriptedProbe {
    async fn probe(&self, service: ServiceKind, slot: RoleSlot) -> HealthRecord {
        if self.panic_on_probe.load(Ordering::SeqCst) && slot == RoleSlot::Standby {
            panic!("scripted probe failure");
        }

        *self
            .probe_calls
            .lock()
            .unwrap()
            .entry(service)
            .or_insert(0) += 1;

        let state = self
            .scripts
            .lock()
            .unwrap()
            .entry((service, slot))
            .or_default()
            .next();
        let endpoint = format!("http://{}-{}", service, slot);

        if state == UNREACHABLE {
            return HealthRecord::unreachable(slot, endpoint, "connection refused");
        }

        let metrics = self
            .metrics
            .lock()
            .unwrap()
            .get(&service)
            .cloned()
            .unwrap_or_default();
        HealthRecord::reachable(slot, endpoint, state, 0.01, metrics)
    }

    async fn probe_nodes(&self) -> NodeInventory {
        if self.panic_on_nodes.load(Ordering::SeqCst) {
            panic!("scripted node listing failure");
        }
        self.nodes.lock().unwrap().clone()
    }

    async fn probe_auxiliary(&self, service: AuxiliaryService) -> AuxiliaryStatus {
        let healthy = self.auxiliary_healthy.load(Ordering::SeqCst);
        AuxiliaryStatus {
            service,
            healthy,
            url: format!("http://{}", service),
            response_time_seconds: 0.01,
            error: (!healthy).then(|| "connection refused".to_string()),
        }
    }
}

pub fn healthy_inventory() -> NodeInventory {
    let workers = |prefix: &str, state: &str| {
        (1..=3)
            .map(|i| WorkerNode {
                id: format!("{}{}", prefix, i),
                state: state.to_string(),
            })
            .collect()
    };

    NodeInventory {
        datanodes: workers("datanode", "NORMAL"),
        nodemanagers: workers("nodemanager", "RUNNING"),
        journalnodes: (1..=3)
            .map(|i| JournalNodeStatus {
                host: format!("journalnode{}", i),
                port: 8480,
                healthy: true,
                response_time_seconds: 0.01,
                error: None,
            })
            .collect(),
    }
}

/// How the recording executor answers
#[derive(Debug, Clone)]
pub enum ExecutorBehaviour {
    Succeed,
    Fail(String),
    Error(String),
}

/// `CommandExecutor` double that records every command it receives
pub struct RecordingExecutor {
    behaviour: ExecutorBehaviour,
    commands: Mutex<Vec<FailoverCommand>>,
    calls: AtomicUsize,
}

impl RecordingExecutor {
    pub fn new(behaviour: ExecutorBehaviour) -> Self {
        Self {
            behaviour,
            commands: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn succeeding() -> Self {
        Self::new(ExecutorBehaviour::Succeed)
    }

    pub fn commands(&self) -> Vec<FailoverCommand> {
        self.commands.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CommandExecutor for RecordingExecutor {
    fn render(&self, command: &FailoverCommand) -> String {
        format!(
            "failover {}{} {} {}",
            command.service,
            if command.force { " --forcemanual" } else { "" },
            command.from,
            command.to
        )
    }

    async fn execute_failover(&self, command: &FailoverCommand) -> Result<CommandOutput> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.commands.lock().unwrap().push(command.clone());

        match &self.behaviour {
            ExecutorBehaviour::Succeed => Ok(CommandOutput {
                success: true,
                output: format!("Failover to {} successful", command.to),
                error: None,
            }),
            ExecutorBehaviour::Fail(message) => Ok(CommandOutput {
                success: false,
                output: String::new(),
                error: Some(message.clone()),
            }),
            ExecutorBehaviour::Error(message) => Err(AppError::CommandError(message.clone())),
        }
    }
}

/// Failover timings short enough for tests
pub fn fast_failover_config(verify_attempts: u32) -> FailoverConfig {
    FailoverConfig {
        settle_delay_ms: 1,
        verify_attempts,
        verify_interval_ms: 1,
    }
}

pub fn orchestrator(
    probe: Arc<ScriptedProbe>,
    executor: Arc<RecordingExecutor>,
    config: FailoverConfig,
) -> FailoverOrchestrator {
    FailoverOrchestrator::new(probe, executor, FailoverTargets::default(), config)
}

pub fn fast_monitor_config() -> MonitorConfig {
    MonitorConfig {
        interval_ms: 10,
        error_backoff_ms: 10,
        max_history: 100,
        max_logs: 200,
    }
}

/// Application state over the doubles with every delay shortened
pub fn test_app_state(probe: Arc<ScriptedProbe>, executor: Arc<RecordingExecutor>) -> AppState {
    let mut config = AppConfiguration::default();
    config.monitor = fast_monitor_config();
    config.failover = fast_failover_config(3);
    config.simulation.pause_ms = 1;
    config.streaming.metrics_interval_ms = 10;
    config.streaming.logs_interval_ms = 10;

    AppState::new(config, probe, executor)
}
