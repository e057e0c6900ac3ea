//! Event detection between consecutive health snapshots

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{error, info, warn};

use super::health::AggregatedSnapshot;
use super::types::{RoleSlot, ServiceKind};

const CRITICAL_MEMORY_PERCENT: f64 = 95.0;
const HIGH_MEMORY_PERCENT: f64 = 85.0;
const PENDING_APPS_EVENT_THRESHOLD: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warning,
    Error,
}

/// Operator-facing log entry kept by the monitor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
}

impl LogEntry {
    pub fn new(level: LogLevel, message: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            level,
            message: message.into(),
        }
    }

    /// Mirror the entry to the process log
    pub fn emit(&self) {
        match self.level {
            LogLevel::Error => error!(event = %self.message, "Cluster event"),
            LogLevel::Warning => warn!(event = %self.message, "Cluster event"),
            LogLevel::Info => info!(event = %self.message, "Cluster event"),
        }
    }
}

/// Compare two consecutive snapshots and describe what changed.
///
/// Order: HA state changes, health category change, new then resolved
/// issues, then threshold checks on `current` alone. A message is emitted at
/// most once per call.
pub fn diff(previous: &AggregatedSnapshot, current: &AggregatedSnapshot) -> Vec<LogEntry> {
    let timestamp = current.timestamp;
    let mut entries = Vec::new();

    for service in ServiceKind::ALL {
        let before = previous.service(service);
        let after = current.service(service);
        for slot in [RoleSlot::Active, RoleSlot::Standby] {
            if before.state(slot) != after.state(slot) {
                entries.push(LogEntry::new(
                    LogLevel::Warning,
                    format!(
                        "{} {} state changed: {} → {}",
                        service,
                        slot.expected_state(),
                        before.state(slot),
                        after.state(slot)
                    ),
                    timestamp,
                ));
            }
        }
    }

    let before_status = previous.cluster_health.status;
    let after_status = current.cluster_health.status;
    if before_status != after_status {
        let level = if after_status.is_degraded() {
            LogLevel::Error
        } else {
            LogLevel::Info
        };
        entries.push(LogEntry::new(
            level,
            format!("Cluster health status changed: {} → {}", before_status, after_status),
            timestamp,
        ));
    }

    let before_issues: HashSet<&str> =
        previous.cluster_health.issues.iter().map(String::as_str).collect();
    let after_issues: HashSet<&str> =
        current.cluster_health.issues.iter().map(String::as_str).collect();

    for issue in &current.cluster_health.issues {
        if !before_issues.contains(issue.as_str()) {
            entries.push(LogEntry::new(
                LogLevel::Warning,
                format!("New issue detected: {}", issue),
                timestamp,
            ));
        }
    }
    for issue in &previous.cluster_health.issues {
        if !after_issues.contains(issue.as_str()) {
            entries.push(LogEntry::new(
                LogLevel::Info,
                format!("Issue resolved: {}", issue),
                timestamp,
            ));
        }
    }

    entries.extend(threshold_events(current));

    let mut seen = HashSet::new();
    entries.retain(|entry| seen.insert(entry.message.clone()));
    entries
}

fn threshold_events(current: &AggregatedSnapshot) -> Vec<LogEntry> {
    let timestamp = current.timestamp;
    let perf = &current.performance_metrics;
    let mut entries = Vec::new();

    if let Some(usage) = perf.memory_utilization() {
        if usage > CRITICAL_MEMORY_PERCENT {
            entries.push(LogEntry::new(
                LogLevel::Error,
                format!("Critical memory usage: {:.1}%", usage),
                timestamp,
            ));
        } else if usage > HIGH_MEMORY_PERCENT {
            entries.push(LogEntry::new(
                LogLevel::Warning,
                format!("High memory usage: {:.1}%", usage),
                timestamp,
            ));
        }
    }

    if perf.pending_apps > PENDING_APPS_EVENT_THRESHOLD {
        entries.push(LogEntry::new(
            LogLevel::Warning,
            format!("High number of pending applications: {}", perf.pending_apps),
            timestamp,
        ));
    }

    entries
}
