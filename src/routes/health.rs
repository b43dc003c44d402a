//! Health check endpoints
//!
//! - `/health` - liveness, 200 whenever the process serves requests
//! - `/api/` - readiness, also probes the document store

use hyper::Response;
use serde::Serialize;
use serde_json::Value;

use crate::routes::response::{error_response, success, FullBody};
use crate::server::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub healthy: bool,
    pub version: &'static str,
    pub commit: &'static str,
    pub built: &'static str,
    /// Seconds since start-up
    pub uptime: u64,
    /// `development` or `production`
    pub mode: &'static str,
    /// Whether the last store probe succeeded; absent for liveness checks
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store: Option<bool>,
}

fn health(state: &AppState, store: Option<bool>) -> HealthResponse {
    HealthResponse {
        healthy: store.unwrap_or(true),
        version: env!("CARGO_PKG_VERSION"),
        commit: env!("GIT_COMMIT_SHORT"),
        built: env!("BUILD_TIMESTAMP"),
        uptime: state.started_at.elapsed().as_secs(),
        mode: if state.args.dev_mode {
            "development"
        } else {
            "production"
        },
        store,
    }
}

fn to_value(response: &HealthResponse) -> Value {
    serde_json::to_value(response).unwrap_or(Value::Null)
}

/// Liveness probe
pub fn handle_liveness(state: &AppState) -> Response<FullBody> {
    success("Folio up and running", to_value(&health(state, None)))
}

/// Readiness probe
pub async fn handle_readiness(state: &AppState) -> Response<FullBody> {
    let reachable = state.db.collection_names().await.is_ok();
    if reachable {
        success("Folio up and running", to_value(&health(state, Some(true))))
    } else {
        error_response(
            hyper::StatusCode::SERVICE_UNAVAILABLE,
            "Document store unreachable",
        )
    }
}
