//! Probe records for the paired control-plane services
//!
//! Every record here is produced fresh by a [`ClusterProbe`](super::probe::ClusterProbe)
//! call and is never mutated afterwards.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Reported state of an instance whose endpoint could not be reached.
pub const UNREACHABLE_STATE: &str = "unreachable";

/// Reported state used when no probe result exists yet.
pub const UNKNOWN_STATE: &str = "unknown";

/// Paired control-plane service types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceKind {
    /// HDFS metadata service
    NameNode,
    /// YARN scheduler service
    ResourceManager,
}

impl ServiceKind {
    pub const ALL: [ServiceKind; 2] = [ServiceKind::NameNode, ServiceKind::ResourceManager];
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceKind::NameNode => write!(f, "NameNode"),
            ServiceKind::ResourceManager => write!(f, "ResourceManager"),
        }
    }
}

/// Configured slot of an instance within its pair, named after the role the
/// instance is deployed to hold. The live role may differ after a failover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoleSlot {
    Active,
    Standby,
}

impl RoleSlot {
    pub fn peer(self) -> RoleSlot {
        match self {
            RoleSlot::Active => RoleSlot::Standby,
            RoleSlot::Standby => RoleSlot::Active,
        }
    }

    /// The HA state an instance in this slot should report at steady state
    pub fn expected_state(self) -> &'static str {
        match self {
            RoleSlot::Active => "active",
            RoleSlot::Standby => "standby",
        }
    }
}

impl fmt::Display for RoleSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoleSlot::Active => write!(f, "Active"),
            RoleSlot::Standby => write!(f, "Standby"),
        }
    }
}

/// Result of a single probe against one instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthRecord {
    pub service_role: RoleSlot,
    pub endpoint: String,
    pub reachable: bool,
    pub reported_state: String,
    pub round_trip_seconds: f64,
    #[serde(default)]
    pub metrics: HashMap<String, f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HealthRecord {
    pub fn reachable(
        service_role: RoleSlot,
        endpoint: impl Into<String>,
        reported_state: impl Into<String>,
        round_trip_seconds: f64,
        metrics: HashMap<String, f64>,
    ) -> Self {
        Self {
            service_role,
            endpoint: endpoint.into(),
            reachable: true,
            reported_state: reported_state.into().to_lowercase(),
            round_trip_seconds,
            metrics,
            error: None,
        }
    }

    pub fn unreachable(
        service_role: RoleSlot,
        endpoint: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            service_role,
            endpoint: endpoint.into(),
            reachable: false,
            reported_state: UNREACHABLE_STATE.to_string(),
            round_trip_seconds: 0.0,
            metrics: HashMap::new(),
            error: Some(error.into()),
        }
    }

    /// Placeholder for a slot that has not been probed
    pub fn unknown(service_role: RoleSlot) -> Self {
        Self {
            service_role,
            endpoint: String::new(),
            reachable: false,
            reported_state: UNKNOWN_STATE.to_string(),
            round_trip_seconds: 0.0,
            metrics: HashMap::new(),
            error: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.reachable && self.reported_state == "active"
    }

    pub fn metric(&self, name: &str) -> f64 {
        self.metrics.get(name).copied().unwrap_or(0.0)
    }
}

/// Both instances of one paired service, probed together
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairStatus {
    pub service: ServiceKind,
    pub active: HealthRecord,
    pub standby: HealthRecord,
    pub ha_enabled: bool,
}

impl PairStatus {
    pub fn unknown(service: ServiceKind) -> Self {
        Self {
            service,
            active: HealthRecord::unknown(RoleSlot::Active),
            standby: HealthRecord::unknown(RoleSlot::Standby),
            ha_enabled: false,
        }
    }

    pub fn record(&self, slot: RoleSlot) -> &HealthRecord {
        match slot {
            RoleSlot::Active => &self.active,
            RoleSlot::Standby => &self.standby,
        }
    }

    /// Slots currently reporting the active role
    pub fn active_slots(&self) -> Vec<RoleSlot> {
        [RoleSlot::Active, RoleSlot::Standby]
            .into_iter()
            .filter(|slot| self.record(*slot).is_active())
            .collect()
    }
}

/// A worker node as listed by the NameNode or ResourceManager
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerNode {
    pub id: String,
    pub state: String,
}

/// A JournalNode reachability check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalNodeStatus {
    pub host: String,
    pub port: u16,
    pub healthy: bool,
    pub response_time_seconds: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Worker and quorum node listings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeInventory {
    pub datanodes: Vec<WorkerNode>,
    pub nodemanagers: Vec<WorkerNode>,
    pub journalnodes: Vec<JournalNodeStatus>,
}

impl NodeInventory {
    pub fn healthy_datanodes(&self) -> usize {
        self.datanodes.iter().filter(|n| n.state == "NORMAL").count()
    }

    pub fn healthy_nodemanagers(&self) -> usize {
        self.nodemanagers.iter().filter(|n| n.state == "RUNNING").count()
    }

    pub fn healthy_journalnodes(&self) -> usize {
        self.journalnodes.iter().filter(|n| n.healthy).count()
    }
}

/// Auxiliary web services scored by the aggregator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuxiliaryService {
    HistoryServer,
    Hive,
}

impl fmt::Display for AuxiliaryService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuxiliaryService::HistoryServer => write!(f, "History Server"),
            AuxiliaryService::Hive => write!(f, "Hive WebUI"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuxiliaryStatus {
    pub service: AuxiliaryService,
    pub healthy: bool,
    pub url: String,
    pub response_time_seconds: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AuxiliaryStatus {
    pub fn unknown(service: AuxiliaryService) -> Self {
        Self {
            service,
            healthy: false,
            url: String::new(),
            response_time_seconds: 0.0,
            error: None,
        }
    }
}

/// Raw input of the health aggregator: the latest set of probe results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterStatus {
    pub namenode: PairStatus,
    pub resourcemanager: PairStatus,
    pub nodes: NodeInventory,
    pub historyserver: AuxiliaryStatus,
    pub hive: AuxiliaryStatus,
}

impl ClusterStatus {
    /// Status used when a collection attempt failed outright
    pub fn unavailable() -> Self {
        Self {
            namenode: PairStatus::unknown(ServiceKind::NameNode),
            resourcemanager: PairStatus::unknown(ServiceKind::ResourceManager),
            nodes: NodeInventory::default(),
            historyserver: AuxiliaryStatus::unknown(AuxiliaryService::HistoryServer),
            hive: AuxiliaryStatus::unknown(AuxiliaryService::Hive),
        }
    }

    pub fn pair(&self, service: ServiceKind) -> &PairStatus {
        match service {
            ServiceKind::NameNode => &self.namenode,
            ServiceKind::ResourceManager => &self.resourcemanager,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unreachable_record_is_never_active() {
        let record = HealthRecord::unreachable(RoleSlot::Active, "http://nn:9870", "refused");
        assert!(!record.is_active());
        assert_eq!(record.reported_state, UNREACHABLE_STATE);
        assert_eq!(record.error.as_deref(), Some("refused"));
    }

    #[test]
    fn test_reported_state_is_lowercased() {
        let record =
            HealthRecord::reachable(RoleSlot::Standby, "http://nn2:9870", "ACTIVE", 0.01, HashMap::new());
        assert_eq!(record.reported_state, "active");
        assert!(record.is_active());
    }

    #[test]
    fn test_active_slots() {
        let mut pair = PairStatus::unknown(ServiceKind::NameNode);
        assert!(pair.active_slots().is_empty());

        pair.standby =
            HealthRecord::reachable(RoleSlot::Standby, "http://nn2:9870", "active", 0.01, HashMap::new());
        assert_eq!(pair.active_slots(), vec![RoleSlot::Standby]);
    }

    #[test]
    fn test_node_inventory_health_counts() {
        let inventory = NodeInventory {
            datanodes: vec![
                WorkerNode { id: "dn1".into(), state: "NORMAL".into() },
                WorkerNode { id: "dn2".into(), state: "DECOMMISSIONED".into() },
            ],
            nodemanagers: vec![WorkerNode { id: "nm1".into(), state: "RUNNING".into() }],
            journalnodes: vec![],
        };
        assert_eq!(inventory.healthy_datanodes(), 1);
        assert_eq!(inventory.healthy_nodemanagers(), 1);
        assert_eq!(inventory.healthy_journalnodes(), 0);
    }
}
