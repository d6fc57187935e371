//! Scout HTTP handlers.

use axum::Json;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use serde::Serialize;
use tracing::{debug, info};

use medea_metrics::{CONTENT_TYPE, render_prometheus};
use medea_placement::{PlacementRequest, PlacementResponse};

use crate::ScoutState;
use crate::scout::ScoutError;

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

fn error_response(msg: &str, status: StatusCode) -> Response {
    (
        status,
        Json(ErrorBody {
            error: msg.to_string(),
        }),
    )
        .into_response()
}

// ── Placement ──────────────────────────────────────────────────

/// POST /api/request
pub async fn request_placement(State(state): State<ScoutState>, body: Bytes) -> Response {
    let req: PlacementRequest = match serde_json::from_slice(&body) {
        Ok(req) => req,
        Err(e) => {
            debug!(error = %e, "malformed placement request");
            state.metrics.placements.inc("bad_request");
            return error_response(
                &format!("invalid request body: {e}"),
                StatusCode::BAD_REQUEST,
            );
        }
    };

    match state.scout.place(&req.namespace, &req.requirement()).await {
        Ok(cluster) => {
            info!(namespace = %req.namespace, cpu = req.cpu, ram = req.ram, %cluster, "cluster selected");
            state.metrics.placements.inc("placed");
            Json(PlacementResponse { cluster }).into_response()
        }
        Err(e) => match &e {
            ScoutError::NotFound { .. } => {
                info!(namespace = %req.namespace, cpu = req.cpu, ram = req.ram, "no suitable cluster");
                state.metrics.placements.inc("not_found");
                error_response(&e.to_string(), StatusCode::NOT_FOUND)
            }
            ScoutError::Upstream { kind, .. } => {
                state.metrics.placements.inc("upstream_error");
                state.metrics.probe_failures.inc(&kind.to_string());
                error_response(&e.to_string(), StatusCode::INTERNAL_SERVER_ERROR)
            }
        },
    }
}

// ── Operations ─────────────────────────────────────────────────

/// GET /healthz
pub async fn healthz() -> impl IntoResponse {
    "ok"
}

/// GET /metrics
pub async fn prometheus_metrics(State(state): State<ScoutState>) -> impl IntoResponse {
    let body = render_prometheus(&[&state.metrics.placements, &state.metrics.probe_failures]);
    ([(header::CONTENT_TYPE, CONTENT_TYPE)], body)
}
