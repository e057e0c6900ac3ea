//! Cluster status HTTP handlers
//!
//! Live probe reads, monitor snapshot/history/log reads and the SSE streams
//! fed from the monitor's buffers.

use axum::{
    extract::{Query, State},
    response::{
        sse::{Event, KeepAlive, Sse},
        Json,
    },
};
use chrono::Utc;
use futures::stream::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::{convert::Infallible, sync::Arc, time::Duration};
use tokio_stream::wrappers::IntervalStream;
use tracing::{debug, info};

use crate::core::cluster::{
    aggregate, collect_cluster_status, probe_pair, AggregatedSnapshot, ClusterStatus,
    LogEntry, MonitorState, NodeInventory, PairStatus, ServiceKind,
};
use crate::error::Result;
use crate::AppState;

/// Default page size of history and log reads
pub const DEFAULT_LIMIT: usize = 50;

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<usize>,
}

impl LimitQuery {
    fn limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_LIMIT)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub monitor: MonitorState,
    pub cycles_completed: u64,
    pub timestamp: String,
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: "hadoop-ha-monitor".to_string(),
        monitor: state.monitor.state().await,
        cycles_completed: state.monitor.cycles_completed(),
        timestamp: Utc::now().to_rfc3339(),
    })
}

pub async fn get_cluster_status(State(state): State<AppState>) -> Result<Json<ClusterStatus>> {
    debug!("Received request for live cluster status");
    Ok(Json(collect_cluster_status(&state.probe).await?))
}

pub async fn get_namenode_status(State(state): State<AppState>) -> Result<Json<PairStatus>> {
    Ok(Json(probe_pair(&state.probe, ServiceKind::NameNode).await?))
}

pub async fn get_resourcemanager_status(
    State(state): State<AppState>,
) -> Result<Json<PairStatus>> {
    Ok(Json(
        probe_pair(&state.probe, ServiceKind::ResourceManager).await?,
    ))
}

pub async fn get_nodes_health(State(state): State<AppState>) -> Json<NodeInventory> {
    Json(state.probe.probe_nodes().await)
}

/// Latest monitor snapshot, or a fresh unrecorded one before the first cycle
pub async fn get_current_metrics(
    State(state): State<AppState>,
) -> Result<Json<Arc<AggregatedSnapshot>>> {
    if let Some(snapshot) = state.monitor.current_snapshot().await {
        return Ok(Json(snapshot));
    }

    let status = collect_cluster_status(&state.probe).await?;
    Ok(Json(Arc::new(aggregate(&status, Utc::now()))))
}

pub async fn get_metrics_history(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> Json<Vec<Arc<AggregatedSnapshot>>> {
    Json(state.monitor.history(query.limit()).await)
}

pub async fn get_logs(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> Json<Vec<LogEntry>> {
    Json(state.monitor.recent_logs(query.limit()).await)
}

pub async fn stream_metrics(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    info!("Metrics stream client connected");

    let period = Duration::from_millis(state.env.streaming.metrics_interval_ms);
    let stream = IntervalStream::new(tokio::time::interval(period)).then(move |_| {
        let monitor = Arc::clone(&state.monitor);
        async move {
            let event = match monitor.current_snapshot().await {
                Some(snapshot) => json_event("metrics", snapshot.as_ref()),
                None => Event::default().comment("no snapshot yet"),
            };
            Ok::<_, Infallible>(event)
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

pub async fn stream_logs(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    info!("Log stream client connected");

    let period = Duration::from_millis(state.env.streaming.logs_interval_ms);
    let stream = IntervalStream::new(tokio::time::interval(period)).then(move |_| {
        let monitor = Arc::clone(&state.monitor);
        async move {
            let logs = monitor.recent_logs(DEFAULT_LIMIT).await;
            Ok::<_, Infallible>(json_event("logs", &logs))
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

fn json_event<T: Serialize>(name: &str, payload: &T) -> Event {
    match serde_json::to_string(payload) {
        Ok(data) => Event::default().event(name).data(data),
        Err(e) => Event::default()
            .event("error")
            .data(format!("Failed to encode {}: {}", name, e)),
    }
}
