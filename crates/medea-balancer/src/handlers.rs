//! Balancer HTTP handlers.

use axum::body::Body;
use axum::extract::{OriginalUri, Path, State};
use axum::http::{HeaderMap, HeaderValue, Method, header};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;

use medea_metrics::{CONTENT_TYPE, render_prometheus};
use medea_upstream::UpstreamResponse;

use crate::BalancerState;

/// Downstream status, content type and body. `fallback` is used only
/// when the downstream sent no content type.
fn relay(resp: UpstreamResponse, fallback: Option<HeaderValue>) -> Response {
    let content_type = resp.content_type().cloned().or(fallback);
    let mut out = Response::new(Body::from(resp.body));
    *out.status_mut() = resp.status;
    if let Some(content_type) = content_type {
        out.headers_mut().insert(header::CONTENT_TYPE, content_type);
    }
    out
}

// ── Workflows ──────────────────────────────────────────────────

/// POST /api/v1/workflows/{namespace}/submit
pub async fn submit_workflow(
    State(state): State<BalancerState>,
    Path(namespace): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    match state.orchestrator.submit(&namespace, &headers, body).await {
        Ok(resp) => relay(resp, Some(HeaderValue::from_static("application/json"))),
        Err(e) => e.into_response(),
    }
}

/// GET|DELETE /api/v1/workflows/{namespace}/{workflow_name}
/// PUT /api/v1/workflows/{namespace}/{workflow_name}/stop
pub async fn proxy_lifecycle(
    State(state): State<BalancerState>,
    Path((namespace, workflow_name)): Path<(String, String)>,
    method: Method,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    match state
        .proxy
        .forward(method, &namespace, &workflow_name, &uri, &headers, body)
        .await
    {
        Ok(resp) => relay(resp, None),
        Err(e) => e.into_response(),
    }
}

// ── Operations ─────────────────────────────────────────────────

/// GET /healthz
pub async fn healthz() -> impl IntoResponse {
    "ok"
}

/// GET /metrics
pub async fn prometheus_metrics(State(state): State<BalancerState>) -> impl IntoResponse {
    let m = &state.metrics;
    let body = render_prometheus(&[
        &m.submissions,
        &m.lifecycle_requests,
        &m.routing_write_failures,
    ]);
    ([(header::CONTENT_TYPE, CONTENT_TYPE)], body)
}
