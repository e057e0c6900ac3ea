//! Cluster API Routes

use axum::{
    routing::{get, post},
    Router,
};

use crate::{
    application::handlers::{
        cluster::{
            get_cluster_status, get_current_metrics, get_logs, get_metrics_history,
            get_namenode_status, get_nodes_health, get_resourcemanager_status, stream_logs,
            stream_metrics,
        },
        failover::{simulate_failure, trigger_failover},
    },
    AppState,
};

/// Read API over live probes and the monitor's buffers
pub fn status_router() -> Router<AppState> {
    Router::new()
        .route("/cluster/status", get(get_cluster_status))
        .route("/namenode/status", get(get_namenode_status))
        .route("/resourcemanager/status", get(get_resourcemanager_status))
        .route("/nodes/health", get(get_nodes_health))
        .route("/metrics/current", get(get_current_metrics))
        .route("/metrics/history", get(get_metrics_history))
        .route("/logs", get(get_logs))
}

/// Operator-triggered actions
pub fn ha_router() -> Router<AppState> {
    Router::new()
        .route("/:service/failover", post(trigger_failover))
        .route("/simulate-failure", post(simulate_failure))
}

/// Server-sent event streams
pub fn stream_router() -> Router<AppState> {
    Router::new()
        .route("/metrics", get(stream_metrics))
        .route("/logs", get(stream_logs))
}
