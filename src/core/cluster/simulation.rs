//! Demo-only node failure simulation
//!
//! Produces a narrative of a node failure and the automatic failover that
//! would follow. Nothing is stopped and nothing is checked against live probes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Pause between the two narrative steps
    pub pause_ms: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self { pause_ms: 3000 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationStep {
    pub step: String,
    pub success: bool,
    pub timestamp: DateTime<Utc>,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    #[serde(rename = "type")]
    pub simulation_type: String,
    pub node_type: String,
    pub node_name: String,
    pub timestamp: DateTime<Utc>,
    pub success: bool,
    pub steps: Vec<SimulationStep>,
    pub error: Option<String>,
}

pub struct FailureSimulator {
    config: SimulationConfig,
}

impl FailureSimulator {
    pub fn new(config: SimulationConfig) -> Self {
        Self { config }
    }

    pub async fn simulate_node_failure(&self, node_type: &str, node_name: &str) -> SimulationResult {
        info!(node_type = %node_type, node_name = %node_name, "Simulating node failure");

        let mut steps = vec![SimulationStep {
            step: "stop_services".to_string(),
            success: true,
            timestamp: Utc::now(),
            description: format!("Stopped services on {}", node_name),
        }];

        tokio::time::sleep(Duration::from_millis(self.config.pause_ms)).await;

        steps.push(SimulationStep {
            step: "verify_failover".to_string(),
            success: true,
            timestamp: Utc::now(),
            description: format!("Verified automatic failover from {}", node_name),
        });

        SimulationResult {
            simulation_type: "node_failure_simulation".to_string(),
            node_type: node_type.to_string(),
            node_name: node_name.to_string(),
            timestamp: steps[0].timestamp,
            success: true,
            steps,
            error: None,
        }
    }
}
