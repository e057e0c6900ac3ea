//! Cluster health aggregation
//!
//! Turns the latest [`ClusterStatus`] into an [`AggregatedSnapshot`]. The
//! scoring budget is fixed at 100 points:
//!
//! - NameNode HA correctness: 25 (15 active, 10 standby)
//! - ResourceManager HA correctness: 25 (15 active, 10 standby)
//! - worker nodes: 30 (15 DataNodes, 15 NodeManagers, floored per class)
//! - auxiliary services: 20 (10 History Server, 10 Hive)
//!
//! The issue list is built independently of the score, so the two can
//! disagree.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::types::{ClusterStatus, PairStatus, RoleSlot, ServiceKind};

pub const MAX_SCORE: u32 = 100;

const ACTIVE_ROLE_POINTS: u32 = 15;
const STANDBY_ROLE_POINTS: u32 = 10;
const NODE_CLASS_POINTS: u32 = 15;
const AUXILIARY_SERVICE_POINTS: u32 = 10;

const MEMORY_ISSUE_PERCENT: f64 = 90.0;
const PENDING_APPS_ISSUE_THRESHOLD: u64 = 5;

/// Categorical health bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthCategory {
    Excellent,
    Good,
    Warning,
    Critical,
}

impl HealthCategory {
    pub fn from_percentage(percentage: f64) -> Self {
        if percentage >= 90.0 {
            HealthCategory::Excellent
        } else if percentage >= 75.0 {
            HealthCategory::Good
        } else if percentage >= 50.0 {
            HealthCategory::Warning
        } else {
            HealthCategory::Critical
        }
    }

    /// Whether a transition into this category should be logged as an error
    pub fn is_degraded(self) -> bool {
        matches!(self, HealthCategory::Warning | HealthCategory::Critical)
    }
}

impl fmt::Display for HealthCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HealthCategory::Excellent => "excellent",
            HealthCategory::Good => "good",
            HealthCategory::Warning => "warning",
            HealthCategory::Critical => "critical",
        };
        f.write_str(name)
    }
}

/// HA view of one paired service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceMetrics {
    pub active_healthy: bool,
    pub standby_healthy: bool,
    pub active_state: String,
    pub standby_state: String,
    pub ha_enabled: bool,
    pub active_response_time: f64,
    pub standby_response_time: f64,
}

impl ServiceMetrics {
    fn from_pair(pair: &PairStatus) -> Self {
        Self {
            active_healthy: pair.active.reachable,
            standby_healthy: pair.standby.reachable,
            active_state: pair.active.reported_state.clone(),
            standby_state: pair.standby.reported_state.clone(),
            ha_enabled: pair.ha_enabled,
            active_response_time: pair.active.round_trip_seconds,
            standby_response_time: pair.standby.round_trip_seconds,
        }
    }

    pub fn state(&self, slot: RoleSlot) -> &str {
        match slot {
            RoleSlot::Active => &self.active_state,
            RoleSlot::Standby => &self.standby_state,
        }
    }

    fn healthy(&self, slot: RoleSlot) -> bool {
        match slot {
            RoleSlot::Active => self.active_healthy,
            RoleSlot::Standby => self.standby_healthy,
        }
    }

    /// Slot is reachable and reporting the role it is deployed for
    fn role_correct(&self, slot: RoleSlot) -> bool {
        self.healthy(slot) && self.state(slot) == slot.expected_state()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeMetrics {
    pub total_datanodes: usize,
    pub healthy_datanodes: usize,
    pub total_nodemanagers: usize,
    pub healthy_nodemanagers: usize,
    pub total_journalnodes: usize,
    pub healthy_journalnodes: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuxiliaryMetrics {
    pub historyserver_healthy: bool,
    pub hive_healthy: bool,
    pub historyserver_response_time: f64,
    pub hive_response_time: f64,
}

/// Scheduler-wide resource figures, read from the ResourceManager
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub total_memory_mb: u64,
    pub available_memory_mb: u64,
    pub allocated_memory_mb: u64,
    pub total_vcores: u64,
    pub available_vcores: u64,
    pub allocated_vcores: u64,
    pub active_nodes: u64,
    pub decommissioned_nodes: u64,
    pub lost_nodes: u64,
    pub unhealthy_nodes: u64,
    pub running_apps: u64,
    pub pending_apps: u64,
}

impl PerformanceMetrics {
    /// Allocated memory as a percentage of total, if total is known
    pub fn memory_utilization(&self) -> Option<f64> {
        if self.total_memory_mb == 0 {
            return None;
        }
        Some(self.allocated_memory_mb as f64 / self.total_memory_mb as f64 * 100.0)
    }

    fn from_pair(pair: &PairStatus) -> Self {
        // Standby RMs redirect their REST API, so read whichever slot is live.
        let record = pair
            .active_slots()
            .first()
            .map(|slot| pair.record(*slot))
            .unwrap_or(&pair.active);

        if record.metrics.is_empty() {
            return Self::default();
        }

        let value = |name: &str| record.metric(name).max(0.0) as u64;
        Self {
            total_memory_mb: value("totalMB"),
            available_memory_mb: value("availableMB"),
            allocated_memory_mb: value("allocatedMB"),
            total_vcores: value("totalVirtualCores"),
            available_vcores: value("availableVirtualCores"),
            allocated_vcores: value("allocatedVirtualCores"),
            active_nodes: value("activeNodes"),
            decommissioned_nodes: value("decommissionedNodes"),
            lost_nodes: value("lostNodes"),
            unhealthy_nodes: value("unhealthyNodes"),
            running_apps: value("appsRunning"),
            pending_apps: value("appsPending"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterHealth {
    pub score: u32,
    pub max_score: u32,
    pub percentage: f64,
    pub status: HealthCategory,
    pub issues: Vec<String>,
}

/// One aggregated point-in-time measurement of cluster health
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedSnapshot {
    pub timestamp: DateTime<Utc>,
    pub namenode_metrics: ServiceMetrics,
    pub resourcemanager_metrics: ServiceMetrics,
    pub node_metrics: NodeMetrics,
    pub service_metrics: AuxiliaryMetrics,
    pub performance_metrics: PerformanceMetrics,
    pub cluster_health: ClusterHealth,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AggregatedSnapshot {
    pub fn service(&self, service: ServiceKind) -> &ServiceMetrics {
        match service {
            ServiceKind::NameNode => &self.namenode_metrics,
            ServiceKind::ResourceManager => &self.resourcemanager_metrics,
        }
    }
}

/// Build a snapshot from raw probe results. Pure and deterministic.
pub fn aggregate(status: &ClusterStatus, timestamp: DateTime<Utc>) -> AggregatedSnapshot {
    let namenode_metrics = ServiceMetrics::from_pair(&status.namenode);
    let resourcemanager_metrics = ServiceMetrics::from_pair(&status.resourcemanager);

    let node_metrics = NodeMetrics {
        total_datanodes: status.nodes.datanodes.len(),
        healthy_datanodes: status.nodes.healthy_datanodes(),
        total_nodemanagers: status.nodes.nodemanagers.len(),
        healthy_nodemanagers: status.nodes.healthy_nodemanagers(),
        total_journalnodes: status.nodes.journalnodes.len(),
        healthy_journalnodes: status.nodes.healthy_journalnodes(),
    };

    let service_metrics = AuxiliaryMetrics {
        historyserver_healthy: status.historyserver.healthy,
        hive_healthy: status.hive.healthy,
        historyserver_response_time: status.historyserver.response_time_seconds,
        hive_response_time: status.hive.response_time_seconds,
    };

    let performance_metrics = PerformanceMetrics::from_pair(&status.resourcemanager);

    let mut snapshot = AggregatedSnapshot {
        timestamp,
        namenode_metrics,
        resourcemanager_metrics,
        node_metrics,
        service_metrics,
        performance_metrics,
        cluster_health: ClusterHealth {
            score: 0,
            max_score: MAX_SCORE,
            percentage: 0.0,
            status: HealthCategory::Critical,
            issues: Vec::new(),
        },
        error: None,
    };

    let score = health_score(&snapshot);
    let percentage = f64::from(score) / f64::from(MAX_SCORE) * 100.0;
    snapshot.cluster_health = ClusterHealth {
        score,
        max_score: MAX_SCORE,
        percentage,
        status: HealthCategory::from_percentage(percentage),
        issues: identify_issues(&snapshot),
    };

    snapshot
}

/// Weighted health score in `0..=MAX_SCORE`
pub fn health_score(snapshot: &AggregatedSnapshot) -> u32 {
    let mut score = 0;

    for service in ServiceKind::ALL {
        let metrics = snapshot.service(service);
        if metrics.role_correct(RoleSlot::Active) {
            score += ACTIVE_ROLE_POINTS;
        }
        if metrics.role_correct(RoleSlot::Standby) {
            score += STANDBY_ROLE_POINTS;
        }
    }

    let nodes = &snapshot.node_metrics;
    score += proportional_points(nodes.healthy_datanodes, nodes.total_datanodes);
    score += proportional_points(nodes.healthy_nodemanagers, nodes.total_nodemanagers);

    if snapshot.service_metrics.historyserver_healthy {
        score += AUXILIARY_SERVICE_POINTS;
    }
    if snapshot.service_metrics.hive_healthy {
        score += AUXILIARY_SERVICE_POINTS;
    }

    score.min(MAX_SCORE)
}

/// Floor of `healthy / total * NODE_CLASS_POINTS`, zero for an empty class
fn proportional_points(healthy: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    let healthy = healthy.min(total) as u64;
    (healthy * u64::from(NODE_CLASS_POINTS) / total as u64) as u32
}

/// Human-readable issues, independent of the score
pub fn identify_issues(snapshot: &AggregatedSnapshot) -> Vec<String> {
    let mut issues = Vec::new();

    for service in ServiceKind::ALL {
        let metrics = snapshot.service(service);
        if !metrics.active_healthy {
            issues.push(format!("Active {} is unhealthy", service));
        }
        if !metrics.standby_healthy {
            issues.push(format!("Standby {} is unhealthy", service));
        }
        for slot in [RoleSlot::Active, RoleSlot::Standby] {
            let state = metrics.state(slot);
            if state != slot.expected_state() {
                issues.push(format!("{} {} is in '{}' state", slot, service, state));
            }
        }
    }

    let nodes = &snapshot.node_metrics;
    let unhealthy = [
        (nodes.total_datanodes, nodes.healthy_datanodes, "DataNode"),
        (nodes.total_nodemanagers, nodes.healthy_nodemanagers, "NodeManager"),
        (nodes.total_journalnodes, nodes.healthy_journalnodes, "JournalNode"),
    ];
    for (total, healthy, class) in unhealthy {
        let count = total.saturating_sub(healthy);
        if count > 0 {
            issues.push(format!("{} {}(s) are unhealthy", count, class));
        }
    }

    if !snapshot.service_metrics.historyserver_healthy {
        issues.push("History Server is unhealthy".to_string());
    }
    if !snapshot.service_metrics.hive_healthy {
        issues.push("Hive WebUI is unhealthy".to_string());
    }

    let perf = &snapshot.performance_metrics;
    if let Some(usage) = perf.memory_utilization() {
        if usage > MEMORY_ISSUE_PERCENT {
            issues.push(format!("High memory usage: {:.1}%", usage));
        }
    }
    if perf.pending_apps > PENDING_APPS_ISSUE_THRESHOLD {
        issues.push(format!("{} applications are pending", perf.pending_apps));
    }

    issues
}
