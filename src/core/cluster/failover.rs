//! Operator-triggered HA failover
//!
//! Each run is a three-step workflow against one paired service:
//!
//! 1. `check_status`: probe both slots live and find the single active instance
//! 2. `execute_failover`: hand the role switch to a [`CommandExecutor`]
//! 3. `verify_failover`: after a settle delay, poll until the former standby
//!    reports active and the former active no longer does
//!
//! A failing step stops the workflow. The caller always receives a complete
//! [`FailoverResult`]; unexpected failures (probe task panics, panics inside
//! the workflow) are converted into a trailing `error` step.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::probe::{probe_pair, ClusterProbe};
use super::types::{HealthRecord, PairStatus, RoleSlot, ServiceKind};
use crate::error::Result;

/// Failover workflow configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FailoverConfig {
    /// Wait after the command before the first verification poll
    pub settle_delay_ms: u64,
    /// Maximum verification polls
    pub verify_attempts: u32,
    /// Wait before each verification poll
    pub verify_interval_ms: u64,
}

impl Default for FailoverConfig {
    fn default() -> Self {
        Self {
            settle_delay_ms: 10000,
            verify_attempts: 6,
            verify_interval_ms: 5000,
        }
    }
}

/// HA service ids of a pair, as the admin tooling knows them
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HaPair {
    pub active_id: String,
    pub standby_id: String,
}

impl HaPair {
    pub fn new(active_id: impl Into<String>, standby_id: impl Into<String>) -> Self {
        Self {
            active_id: active_id.into(),
            standby_id: standby_id.into(),
        }
    }

    pub fn id(&self, slot: RoleSlot) -> &str {
        match slot {
            RoleSlot::Active => &self.active_id,
            RoleSlot::Standby => &self.standby_id,
        }
    }
}

/// HA ids for every failover-capable service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailoverTargets {
    pub namenode: HaPair,
    pub resourcemanager: HaPair,
}

impl FailoverTargets {
    pub fn pair(&self, service: ServiceKind) -> &HaPair {
        match service {
            ServiceKind::NameNode => &self.namenode,
            ServiceKind::ResourceManager => &self.resourcemanager,
        }
    }
}

impl Default for FailoverTargets {
    fn default() -> Self {
        Self {
            namenode: HaPair::new("active-nn", "standby-nn"),
            resourcemanager: HaPair::new("active-rm", "standby-rm"),
        }
    }
}

/// A role switch request handed to the command executor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailoverCommand {
    pub service: ServiceKind,
    pub from: String,
    pub to: String,
    /// Bypass the target system's manual-transition safety checks
    pub force: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandOutput {
    pub success: bool,
    pub output: String,
    pub error: Option<String>,
}

/// Dispatches role switch commands to the cluster.
///
/// Called at most once per workflow run.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Human-readable command line recorded in the step trail
    fn render(&self, command: &FailoverCommand) -> String;

    async fn execute_failover(&self, command: &FailoverCommand) -> Result<CommandOutput>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailoverType {
    NamenodeFailover,
    ResourcemanagerFailover,
}

impl From<ServiceKind> for FailoverType {
    fn from(service: ServiceKind) -> Self {
        match service {
            ServiceKind::NameNode => FailoverType::NamenodeFailover,
            ServiceKind::ResourceManager => FailoverType::ResourcemanagerFailover,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepName {
    CheckStatus,
    ExecuteFailover,
    VerifyFailover,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusData {
    pub current_active: String,
    pub current_standby: String,
    pub active_slot: RoleSlot,
    pub active_status: HealthRecord,
    pub standby_status: HealthRecord,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationData {
    pub failover_verified: bool,
    pub new_active: Option<String>,
    pub new_standby: Option<String>,
    pub attempts: u32,
    pub final_status: Option<PairStatus>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StepData {
    Status(StatusData),
    Verification(VerificationData),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    pub step: StepName,
    pub success: bool,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<StepData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    pub error: Option<String>,
}

impl StepResult {
    fn new(step: StepName) -> Self {
        Self {
            step,
            success: false,
            timestamp: Utc::now(),
            data: None,
            command: None,
            output: None,
            error: None,
        }
    }

    fn failed(step: StepName, error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::new(step)
        }
    }

    pub fn status_data(&self) -> Option<&StatusData> {
        match &self.data {
            Some(StepData::Status(data)) => Some(data),
            _ => None,
        }
    }

    pub fn verification_data(&self) -> Option<&VerificationData> {
        match &self.data {
            Some(StepData::Verification(data)) => Some(data),
            _ => None,
        }
    }
}

/// Step-by-step record of one failover run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailoverResult {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub failover_type: FailoverType,
    pub service: ServiceKind,
    pub force: bool,
    pub timestamp: DateTime<Utc>,
    pub success: bool,
    /// The run was cancelled before it could reach a verdict
    pub incomplete: bool,
    pub steps: Vec<StepResult>,
    pub error: Option<String>,
    pub duration_ms: u64,
}

impl FailoverResult {
    fn new(service: ServiceKind, force: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            failover_type: service.into(),
            service,
            force,
            timestamp: Utc::now(),
            success: false,
            incomplete: false,
            steps: Vec::new(),
            error: None,
            duration_ms: 0,
        }
    }

    pub fn step(&self, name: StepName) -> Option<&StepResult> {
        self.steps.iter().find(|s| s.step == name)
    }

    fn fail(&mut self, error: String) {
        self.success = false;
        self.error = Some(error);
    }

    fn cancel(&mut self, error: String) {
        self.incomplete = true;
        self.fail(error);
    }

    fn abort(&mut self, error: String) {
        self.steps.push(StepResult::failed(StepName::Error, error.clone()));
        self.fail(error);
    }
}

/// Which physical instance holds each role before the switch
#[derive(Debug, Clone)]
struct RoleAssignment {
    active_slot: RoleSlot,
    active_id: String,
    standby_id: String,
}

enum Verification {
    Verified,
    Exhausted,
    Cancelled,
}

/// Runs failover workflows against live probe results
pub struct FailoverOrchestrator {
    probe: Arc<dyn ClusterProbe>,
    executor: Arc<dyn CommandExecutor>,
    targets: FailoverTargets,
    config: FailoverConfig,
}

impl FailoverOrchestrator {
    pub fn new(
        probe: Arc<dyn ClusterProbe>,
        executor: Arc<dyn CommandExecutor>,
        targets: FailoverTargets,
        config: FailoverConfig,
    ) -> Self {
        Self {
            probe,
            executor,
            targets,
            config,
        }
    }

    pub fn config(&self) -> &FailoverConfig {
        &self.config
    }

    /// Fail over `service` and block until the switch is verified or given up on
    pub async fn run_failover(&self, service: ServiceKind, force: bool) -> FailoverResult {
        self.run_failover_with_cancel(service, force, CancellationToken::new())
            .await
    }

    /// Cancellable variant of [`run_failover`](Self::run_failover).
    ///
    /// Cancellation stops further waiting and polling and yields a result
    /// with `incomplete = true`.
    pub async fn run_failover_with_cancel(
        &self,
        service: ServiceKind,
        force: bool,
        cancel: CancellationToken,
    ) -> FailoverResult {
        info!(service = %service, force = force, "Starting {} failover", service);

        let started = Instant::now();
        let mut result = FailoverResult::new(service, force);

        let outcome = AssertUnwindSafe(self.drive(service, force, &cancel, &mut result))
            .catch_unwind()
            .await;

        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(e)) => result.abort(e.to_string()),
            Err(panic) => result.abort(panic_message(panic)),
        }
        result.duration_ms = started.elapsed().as_millis() as u64;

        if result.success {
            info!(
                service = %service,
                duration_ms = result.duration_ms,
                "{} failover completed successfully",
                service
            );
        } else if result.incomplete {
            warn!(
                service = %service,
                error = ?result.error,
                "{} failover cancelled before completion",
                service
            );
        } else {
            error!(
                service = %service,
                error = ?result.error,
                steps = result.steps.len(),
                "{} failover failed",
                service
            );
        }

        result
    }

    async fn drive(
        &self,
        service: ServiceKind,
        force: bool,
        cancel: &CancellationToken,
        result: &mut FailoverResult,
    ) -> Result<()> {
        let status = probe_pair(&self.probe, service).await?;
        let (step, assignment) = check_status(&status, self.targets.pair(service));
        let check_error = step.error.clone().unwrap_or_default();
        result.steps.push(step);

        let Some(assignment) = assignment else {
            result.fail(format!("Failed to get initial {} status: {}", service, check_error));
            return Ok(());
        };

        if cancel.is_cancelled() {
            result.cancel("Failover cancelled before the command was issued".to_string());
            return Ok(());
        }

        let command = FailoverCommand {
            service,
            from: assignment.active_id.clone(),
            to: assignment.standby_id.clone(),
            force,
        };
        let step = self.execute(&command).await;
        let command_failed = !step.success;
        let command_error = step.error.clone();
        result.steps.push(step);

        if command_failed {
            result.fail(format!(
                "Failover command failed: {}",
                command_error.unwrap_or_else(|| "Unknown error".to_string())
            ));
            return Ok(());
        }

        if !pause(Duration::from_millis(self.config.settle_delay_ms), cancel).await {
            result.cancel("Failover cancelled while waiting for the switch to settle".to_string());
            return Ok(());
        }

        let (step, verification) = self.verify(service, &assignment, cancel).await?;
        let verify_error = step.error.clone();
        result.steps.push(step);

        match verification {
            Verification::Verified => result.success = true,
            Verification::Exhausted => {
                result.fail(verify_error.unwrap_or_else(|| "Failover verification failed".to_string()))
            }
            Verification::Cancelled => result.cancel(
                verify_error.unwrap_or_else(|| "Failover verification cancelled".to_string()),
            ),
        }

        Ok(())
    }

    async fn execute(&self, command: &FailoverCommand) -> StepResult {
        let rendered = self.executor.render(command);
        info!(
            service = %command.service,
            from = %command.from,
            to = %command.to,
            force = command.force,
            command = %rendered,
            "Executing failover command"
        );

        let mut step = StepResult::new(StepName::ExecuteFailover);
        step.command = Some(rendered);

        match self.executor.execute_failover(command).await {
            Ok(output) => {
                step.success = output.success;
                step.output = Some(output.output);
                if !output.success {
                    step.error = Some(
                        output
                            .error
                            .unwrap_or_else(|| "Command reported failure".to_string()),
                    );
                }
            }
            Err(e) => step.error = Some(e.to_string()),
        }

        step
    }

    async fn verify(
        &self,
        service: ServiceKind,
        assignment: &RoleAssignment,
        cancel: &CancellationToken,
    ) -> Result<(StepResult, Verification)> {
        let max_attempts = self.config.verify_attempts;
        let interval = Duration::from_millis(self.config.verify_interval_ms);
        let promoted_slot = assignment.active_slot.peer();
        let demoted_slot = assignment.active_slot;

        let mut step = StepResult::new(StepName::VerifyFailover);
        let mut final_status = None;

        for attempt in 1..=max_attempts {
            if !pause(interval, cancel).await {
                step.error = Some(format!(
                    "Failover verification cancelled after {} attempts",
                    attempt - 1
                ));
                step.data = Some(StepData::Verification(VerificationData {
                    failover_verified: false,
                    new_active: None,
                    new_standby: None,
                    attempts: attempt - 1,
                    final_status,
                }));
                return Ok((step, Verification::Cancelled));
            }

            let status = probe_pair(&self.probe, service).await?;
            let promoted = status.record(promoted_slot).is_active();
            let demoted = !status.record(demoted_slot).is_active();

            debug!(
                service = %service,
                attempt = attempt,
                promoted = promoted,
                demoted = demoted,
                "Failover verification poll"
            );

            if promoted && demoted {
                step.success = true;
                step.data = Some(StepData::Verification(VerificationData {
                    failover_verified: true,
                    new_active: Some(assignment.standby_id.clone()),
                    new_standby: Some(assignment.active_id.clone()),
                    attempts: attempt,
                    final_status: Some(status),
                }));
                return Ok((step, Verification::Verified));
            }

            final_status = Some(status);
        }

        step.error = Some(format!(
            "Failover verification failed after {} attempts",
            max_attempts
        ));
        step.data = Some(StepData::Verification(VerificationData {
            failover_verified: false,
            new_active: None,
            new_standby: None,
            attempts: max_attempts,
            final_status,
        }));
        Ok((step, Verification::Exhausted))
    }
}

/// Step 1: exactly one slot must report itself active
fn check_status(status: &PairStatus, ids: &HaPair) -> (StepResult, Option<RoleAssignment>) {
    let active_slots = status.active_slots();
    let active_slot = match active_slots.as_slice() {
        [slot] => *slot,
        [] => {
            return (
                StepResult::failed(
                    StepName::CheckStatus,
                    format!("No active {} found", status.service),
                ),
                None,
            )
        }
        _ => {
            return (
                StepResult::failed(
                    StepName::CheckStatus,
                    format!("Both {} instances report active", status.service),
                ),
                None,
            )
        }
    };

    let assignment = RoleAssignment {
        active_slot,
        active_id: ids.id(active_slot).to_string(),
        standby_id: ids.id(active_slot.peer()).to_string(),
    };

    let mut step = StepResult::new(StepName::CheckStatus);
    step.success = true;
    step.data = Some(StepData::Status(StatusData {
        current_active: assignment.active_id.clone(),
        current_standby: assignment.standby_id.clone(),
        active_slot,
        active_status: status.active.clone(),
        standby_status: status.standby.clone(),
    }));

    (step, Some(assignment))
}

/// Sleep unless cancelled first. Returns `false` on cancellation.
async fn pause(delay: Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(delay) => true,
    }
}

pub(crate) fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        format!("Unexpected failure: {}", msg)
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        format!("Unexpected failure: {}", msg)
    } else {
        "Unexpected failure".to_string()
    }
}
