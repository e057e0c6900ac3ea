//! Failover and failure simulation HTTP handlers

use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use serde::Deserialize;
use tracing::info;

use crate::core::cluster::{FailoverResult, ServiceKind, SimulationResult};
use crate::error::{AppError, Result};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct FailoverQuery {
    #[serde(default)]
    pub force: bool,
}

#[derive(Debug, Deserialize)]
pub struct SimulateFailureRequest {
    pub node_type: String,
    pub node_name: String,
}

/// Run a failover for `service` and return the full step trail.
///
/// A failed workflow is still a 200: the outcome lives in the body.
pub async fn trigger_failover(
    State(state): State<AppState>,
    Path(service): Path<ServiceKind>,
    Query(query): Query<FailoverQuery>,
) -> Json<FailoverResult> {
    info!(service = %service, force = query.force, "Received failover request");
    Json(state.failover.run_failover(service, query.force).await)
}

pub async fn simulate_failure(
    State(state): State<AppState>,
    Json(request): Json<SimulateFailureRequest>,
) -> Result<Json<SimulationResult>> {
    if request.node_type.trim().is_empty() || request.node_name.trim().is_empty() {
        return Err(AppError::BadRequest(
            "node_type and node_name are required".to_string(),
        ));
    }

    Ok(Json(
        state
            .simulator
            .simulate_node_failure(&request.node_type, &request.node_name)
            .await,
    ))
}
