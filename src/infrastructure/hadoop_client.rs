//! HTTP probe against the Hadoop web endpoints
//!
//! NameNodes are read through their JMX servlet, ResourceManagers through the
//! YARN REST API. Transport, HTTP and decoding errors never escape a probe:
//! they become unreachable records carrying the error text.

use async_trait::async_trait;
use futures::future::join_all;
use reqwest::Client;
use serde_json::Value;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::config::{ClusterEndpoints, NodeEndpoint, ProbeConfig};
use crate::core::cluster::{
    AuxiliaryService, AuxiliaryStatus, ClusterProbe, HealthRecord, JournalNodeStatus,
    NodeInventory, RoleSlot, ServiceKind, WorkerNode,
};
use crate::core::cluster::types::UNKNOWN_STATE;
use crate::error::{AppError, Result};

const NAMENODE_STATUS_PATH: &str = "/jmx?qry=Hadoop:service=NameNode,name=NameNodeStatus";
const CLUSTER_INFO_PATH: &str = "/ws/v1/cluster/info";
const CLUSTER_METRICS_PATH: &str = "/ws/v1/cluster/metrics";
const CLUSTER_NODES_PATH: &str = "/ws/v1/cluster/nodes";
const JOURNALNODE_PATH: &str = "/jmx";
const HISTORY_INFO_PATH: &str = "/ws/v1/history/info";

pub struct HttpClusterProbe {
    client: Client,
    endpoints: ClusterEndpoints,
}

impl HttpClusterProbe {
    pub fn new(endpoints: ClusterEndpoints, config: &ProbeConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .map_err(|e| AppError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, endpoints })
    }

    /// GET `url` and decode a JSON body. Returns the body and the round trip in seconds.
    async fn get_json(&self, url: &str) -> Result<(Value, f64)> {
        let started = Instant::now();
        let response = self.client.get(url).send().await?.error_for_status()?;
        let elapsed = started.elapsed().as_secs_f64();
        let body = response.json::<Value>().await?;
        Ok((body, elapsed))
    }

    /// GET `url` and report whether it answered 200
    async fn check(&self, url: &str) -> Result<(bool, f64)> {
        let started = Instant::now();
        let response = self.client.get(url).send().await?;
        Ok((
            response.status() == reqwest::StatusCode::OK,
            started.elapsed().as_secs_f64(),
        ))
    }

    async fn probe_namenode(&self, base_url: &str) -> Result<(String, f64, HashMap<String, f64>)> {
        let (body, elapsed) = self
            .get_json(&format!("{}{}", base_url, NAMENODE_STATUS_PATH))
            .await?;
        let (state, metrics) = parse_namenode_status(&body);
        Ok((state, elapsed, metrics))
    }

    async fn probe_resourcemanager(
        &self,
        base_url: &str,
    ) -> Result<(String, f64, HashMap<String, f64>)> {
        let (info, elapsed) = self
            .get_json(&format!("{}{}", base_url, CLUSTER_INFO_PATH))
            .await?;
        let (metrics, _) = self
            .get_json(&format!("{}{}", base_url, CLUSTER_METRICS_PATH))
            .await?;
        Ok((
            parse_resourcemanager_state(&info),
            elapsed,
            parse_cluster_metrics(&metrics),
        ))
    }

    async fn list_nodes(&self, endpoint: &NodeEndpoint, class: &str) -> Vec<WorkerNode> {
        let url = format!("{}{}", endpoint.base_url(), CLUSTER_NODES_PATH);
        match self.get_json(&url).await {
            Ok((body, _)) => parse_worker_nodes(&body),
            Err(e) => {
                debug!(url = %url, error = %e, "Could not list {}", class);
                Vec::new()
            }
        }
    }

    async fn probe_journalnode(&self, endpoint: &NodeEndpoint) -> JournalNodeStatus {
        let url = format!("{}{}", endpoint.base_url(), JOURNALNODE_PATH);
        match self.check(&url).await {
            Ok((healthy, elapsed)) => JournalNodeStatus {
                host: endpoint.host.clone(),
                port: endpoint.port,
                healthy,
                response_time_seconds: elapsed,
                error: None,
            },
            Err(e) => {
                warn!(host = %endpoint.host, error = %e, "Error checking JournalNode");
                JournalNodeStatus {
                    host: endpoint.host.clone(),
                    port: endpoint.port,
                    healthy: false,
                    response_time_seconds: 0.0,
                    error: Some(e.to_string()),
                }
            }
        }
    }
}

#[async_trait]
impl ClusterProbe for HttpClusterProbe {
    async fn probe(&self, service: ServiceKind, slot: RoleSlot) -> HealthRecord {
        let base_url = self.endpoints.pair(service).endpoint(slot).base_url();

        let outcome = match service {
            ServiceKind::NameNode => self.probe_namenode(&base_url).await,
            ServiceKind::ResourceManager => self.probe_resourcemanager(&base_url).await,
        };

        match outcome {
            Ok((state, elapsed, metrics)) => {
                HealthRecord::reachable(slot, base_url, state, elapsed, metrics)
            }
            Err(e) => {
                warn!(
                    service = %service,
                    slot = %slot,
                    url = %base_url,
                    error = %e,
                    "Error checking {} health",
                    service
                );
                HealthRecord::unreachable(slot, base_url, e.to_string())
            }
        }
    }

    async fn probe_nodes(&self) -> NodeInventory {
        let (datanodes, nodemanagers, journalnodes) = tokio::join!(
            self.list_nodes(&self.endpoints.namenode.active, "DataNodes"),
            self.list_nodes(&self.endpoints.resourcemanager.active, "NodeManagers"),
            join_all(
                self.endpoints
                    .journalnodes
                    .iter()
                    .map(|jn| self.probe_journalnode(jn))
            ),
        );

        NodeInventory {
            datanodes,
            nodemanagers,
            journalnodes,
        }
    }

    async fn probe_auxiliary(&self, service: AuxiliaryService) -> AuxiliaryStatus {
        let (endpoint, path) = match service {
            AuxiliaryService::HistoryServer => (&self.endpoints.historyserver, HISTORY_INFO_PATH),
            AuxiliaryService::Hive => (&self.endpoints.hive, "/"),
        };
        let url = endpoint.base_url();

        match self.check(&format!("{}{}", url, path)).await {
            Ok((healthy, elapsed)) => AuxiliaryStatus {
                service,
                healthy,
                url,
                response_time_seconds: elapsed,
                error: None,
            },
            Err(e) => {
                warn!(service = %service, error = %e, "Error checking {}", service);
                AuxiliaryStatus {
                    service,
                    healthy: false,
                    url,
                    response_time_seconds: 0.0,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    fn ha_enabled(&self, service: ServiceKind) -> bool {
        self.endpoints.pair(service).ha_enabled
    }
}

/// HA state and numeric fields of the first JMX bean carrying a `State`
pub fn parse_namenode_status(body: &Value) -> (String, HashMap<String, f64>) {
    let bean = body
        .get("beans")
        .and_then(Value::as_array)
        .and_then(|beans| beans.iter().find(|bean| bean.get("State").is_some()));

    match bean {
        Some(bean) => {
            let state = bean
                .get("State")
                .and_then(Value::as_str)
                .unwrap_or(UNKNOWN_STATE)
                .to_lowercase();
            (state, numeric_fields(bean))
        }
        None => (UNKNOWN_STATE.to_string(), HashMap::new()),
    }
}

pub fn parse_resourcemanager_state(body: &Value) -> String {
    body.pointer("/clusterInfo/haState")
        .and_then(Value::as_str)
        .unwrap_or(UNKNOWN_STATE)
        .to_lowercase()
}

pub fn parse_cluster_metrics(body: &Value) -> HashMap<String, f64> {
    body.get("clusterMetrics")
        .map(numeric_fields)
        .unwrap_or_default()
}

/// Entries of a `nodes.node[]` listing. A `null` listing means no nodes.
pub fn parse_worker_nodes(body: &Value) -> Vec<WorkerNode> {
    body.pointer("/nodes/node")
        .and_then(Value::as_array)
        .map(|nodes| {
            nodes
                .iter()
                .map(|node| WorkerNode {
                    id: node
                        .get("id")
                        .or_else(|| node.get("nodeHostName"))
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                    state: node
                        .get("state")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                })
                .collect()
        })
        .unwrap_or_default()
}

fn numeric_fields(object: &Value) -> HashMap<String, f64> {
    object
        .as_object()
        .map(|fields| {
            fields
                .iter()
                .filter_map(|(key, value)| value.as_f64().map(|v| (key.clone(), v)))
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_namenode_status_uses_first_bean_with_state() {
        let body = json!({
            "beans": [
                { "name": "other" },
                { "State": "Active", "LastHATransitionTime": 1700000000000u64, "HostAndPort": "nn1:8020" },
                { "State": "standby" }
            ]
        });
        let (state, metrics) = parse_namenode_status(&body);
        assert_eq!(state, "active");
        assert_eq!(metrics.get("LastHATransitionTime"), Some(&1700000000000.0));
        assert!(!metrics.contains_key("HostAndPort"));
    }

    #[test]
    fn test_parse_namenode_status_without_beans() {
        let (state, metrics) = parse_namenode_status(&json!({}));
        assert_eq!(state, UNKNOWN_STATE);
        assert!(metrics.is_empty());
    }

    #[test]
    fn test_parse_resourcemanager_payloads() {
        let info = json!({ "clusterInfo": { "haState": "STANDBY", "state": "STARTED" } });
        assert_eq!(parse_resourcemanager_state(&info), "standby");
        assert_eq!(parse_resourcemanager_state(&json!({})), UNKNOWN_STATE);

        let metrics = json!({
            "clusterMetrics": { "totalMB": 8192, "allocatedMB": 2048, "appsPending": 3 }
        });
        let parsed = parse_cluster_metrics(&metrics);
        assert_eq!(parsed.get("totalMB"), Some(&8192.0));
        assert_eq!(parsed.get("appsPending"), Some(&3.0));
    }

    #[test]
    fn test_parse_worker_nodes() {
        let body = json!({
            "nodes": { "node": [
                { "id": "nm1:45454", "state": "RUNNING" },
                { "nodeHostName": "nm2", "state": "LOST" }
            ]}
        });
        let nodes = parse_worker_nodes(&body);
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0].id, "nm1:45454");
        assert_eq!(nodes[1].id, "nm2");
        assert_eq!(nodes[1].state, "LOST");

        assert!(parse_worker_nodes(&json!({ "nodes": null })).is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_yields_unreachable_record() {
        let mut endpoints = ClusterEndpoints::default();
        endpoints.namenode.active = NodeEndpoint::new("nn1", "127.0.0.1", 1);
        let probe = HttpClusterProbe::new(
            endpoints,
            &ProbeConfig {
                request_timeout_seconds: 2,
            },
        )
        .unwrap();

        let record = probe.probe(ServiceKind::NameNode, RoleSlot::Active).await;
        assert!(!record.reachable);
        assert!(!record.is_active());
        assert_eq!(record.endpoint, "http://127.0.0.1:1");
        assert!(record.error.is_some());
    }
}
