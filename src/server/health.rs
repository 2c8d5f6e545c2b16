//! Liveness probe (/health)

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use serde::Serialize;

use super::http::{json_response, AppState};
use super::routes::API_VERSION;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub healthy: bool,
    /// Crate version
    pub version: &'static str,
    /// Delivery API version served
    pub api_version: &'static str,
    pub node_id: String,
    /// Uptime in seconds
    pub uptime: u64,
    pub timestamp: String,
}

pub fn build_health_response(state: &AppState) -> HealthResponse {
    HealthResponse {
        healthy: true,
        version: env!("CARGO_PKG_VERSION"),
        api_version: API_VERSION,
        node_id: state.args.node_id.to_string(),
        uptime: state.started_at.elapsed().as_secs(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    }
}

/// Always 200 while the process is serving
pub fn health_check(state: &AppState) -> Response<Full<Bytes>> {
    json_response(StatusCode::OK, &build_health_response(state))
}
