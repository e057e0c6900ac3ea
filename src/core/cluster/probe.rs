//! Probe interface consumed by the monitor loop and the failover orchestrator

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use super::types::{
    AuxiliaryService, AuxiliaryStatus, ClusterStatus, HealthRecord, NodeInventory, PairStatus,
    RoleSlot, ServiceKind,
};
use crate::error::{AppError, Result};

/// Health-check capability supplied per deployment.
///
/// Implementations must not fail: transport errors are reported through
/// `HealthRecord { reachable: false, error: Some(..) }`.
#[async_trait]
pub trait ClusterProbe: Send + Sync {
    /// Probe one instance of a paired service
    async fn probe(&self, service: ServiceKind, slot: RoleSlot) -> HealthRecord;

    /// List worker and journal nodes
    async fn probe_nodes(&self) -> NodeInventory;

    /// Check an auxiliary web service
    async fn probe_auxiliary(&self, service: AuxiliaryService) -> AuxiliaryStatus;

    fn ha_enabled(&self, _service: ServiceKind) -> bool {
        true
    }
}

/// Probe both instances of a pair concurrently and combine once both finish.
pub async fn probe_pair(probe: &Arc<dyn ClusterProbe>, service: ServiceKind) -> Result<PairStatus> {
    let active_task = {
        let probe = Arc::clone(probe);
        tokio::spawn(async move { probe.probe(service, RoleSlot::Active).await })
    };
    let standby_task = {
        let probe = Arc::clone(probe);
        tokio::spawn(async move { probe.probe(service, RoleSlot::Standby).await })
    };

    let (active, standby) = tokio::join!(active_task, standby_task);

    let active = active.map_err(|e| {
        AppError::ProbeError(format!("{} active probe task failed: {}", service, e))
    })?;
    let standby = standby.map_err(|e| {
        AppError::ProbeError(format!("{} standby probe task failed: {}", service, e))
    })?;

    debug!(
        service = %service,
        active_state = %active.reported_state,
        standby_state = %standby.reported_state,
        "Probed service pair"
    );

    Ok(PairStatus {
        service,
        active,
        standby,
        ha_enabled: probe.ha_enabled(service),
    })
}

/// Collect the full raw cluster status used by the health aggregator.
///
/// Every probe runs on its own task so a panicking probe surfaces as a
/// `ProbeError` instead of unwinding into the caller.
pub async fn collect_cluster_status(probe: &Arc<dyn ClusterProbe>) -> Result<ClusterStatus> {
    let nodes_task = {
        let probe = Arc::clone(probe);
        tokio::spawn(async move { probe.probe_nodes().await })
    };
    let historyserver_task = spawn_auxiliary(probe, AuxiliaryService::HistoryServer);
    let hive_task = spawn_auxiliary(probe, AuxiliaryService::Hive);

    let (namenode, resourcemanager, nodes, historyserver, hive) = tokio::join!(
        probe_pair(probe, ServiceKind::NameNode),
        probe_pair(probe, ServiceKind::ResourceManager),
        nodes_task,
        historyserver_task,
        hive_task,
    );

    let nodes =
        nodes.map_err(|e| AppError::ProbeError(format!("Node probe task failed: {}", e)))?;
    let historyserver = historyserver.map_err(|e| {
        AppError::ProbeError(format!(
            "{} probe task failed: {}",
            AuxiliaryService::HistoryServer,
            e
        ))
    })?;
    let hive = hive.map_err(|e| {
        AppError::ProbeError(format!("{} probe task failed: {}", AuxiliaryService::Hive, e))
    })?;

    Ok(ClusterStatus {
        namenode: namenode?,
        resourcemanager: resourcemanager?,
        nodes,
        historyserver,
        hive,
    })
}

fn spawn_auxiliary(
    probe: &Arc<dyn ClusterProbe>,
    service: AuxiliaryService,
) -> tokio::task::JoinHandle<AuxiliaryStatus> {
    let probe = Arc::clone(probe);
    tokio::spawn(async move { probe.probe_auxiliary(service).await })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct PanickingStandbyProbe;

    #[async_trait]
    impl ClusterProbe for PanickingStandbyProbe {
        async fn probe(&self, _service: ServiceKind, slot: RoleSlot) -> HealthRecord {
            match slot {
                RoleSlot::Active => {
                    HealthRecord::reachable(slot, "http://a", "active", 0.01, HashMap::new())
                }
                RoleSlot::Standby => panic!("standby probe exploded"),
            }
        }

        async fn probe_nodes(&self) -> NodeInventory {
            NodeInventory::default()
        }

        async fn probe_auxiliary(&self, service: AuxiliaryService) -> AuxiliaryStatus {
            AuxiliaryStatus::unknown(service)
        }
    }

    #[tokio::test]
    async fn test_probe_task_panic_becomes_probe_error() {
        let probe: Arc<dyn ClusterProbe> = Arc::new(PanickingStandbyProbe);
        let err = probe_pair(&probe, ServiceKind::NameNode).await.unwrap_err();
        assert!(matches!(err, AppError::ProbeError(_)));
        assert!(err.to_string().contains("standby probe task failed"));

        assert!(collect_cluster_status(&probe).await.is_err());
    }

    struct PanickingNodesProbe;

    #[async_trait]
    impl ClusterProbe for PanickingNodesProbe {
        async fn probe(&self, _service: ServiceKind, slot: RoleSlot) -> HealthRecord {
            HealthRecord::reachable(slot, "http://a", "active", 0.01, HashMap::new())
        }

        async fn probe_nodes(&self) -> NodeInventory {
            panic!("node listing exploded")
        }

        async fn probe_auxiliary(&self, service: AuxiliaryService) -> AuxiliaryStatus {
            AuxiliaryStatus::unknown(service)
        }
    }

    #[tokio::test]
    async fn test_node_probe_panic_becomes_probe_error() {
        let probe: Arc<dyn ClusterProbe> = Arc::new(PanickingNodesProbe);
        let err = collect_cluster_status(&probe).await.unwrap_err();
        assert!(matches!(err, AppError::ProbeError(_)));
        assert!(err.to_string().contains("Node probe task failed"));
    }
}
