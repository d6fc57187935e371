//! Request-scoped failures and their HTTP mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

use medea_placement::ValidationError;
use medea_upstream::UpstreamError;

use crate::locator::PlacementError;
use crate::routing::RoutingCallError;

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

pub(crate) fn error_response(msg: &str, status: StatusCode) -> Response {
    (
        status,
        Json(ErrorBody {
            error: msg.to_string(),
        }),
    )
        .into_response()
}

/// A submission that never reached a cluster, or whose forward failed.
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("invalid submission body: {0}")]
    Body(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Placement(#[from] PlacementError),

    #[error("forwarding to {cluster} failed: {source}")]
    Forward {
        cluster: String,
        #[source]
        source: UpstreamError,
    },

    #[error("submission task failed: {0}")]
    Task(String),
}

impl SubmitError {
    pub fn status(&self) -> StatusCode {
        match self {
            SubmitError::Body(_) | SubmitError::Validation(_) => StatusCode::BAD_REQUEST,
            SubmitError::Placement(e) if e.is_not_found() => StatusCode::NOT_FOUND,
            SubmitError::Placement(_) => StatusCode::INTERNAL_SERVER_ERROR,
            SubmitError::Forward { .. } => StatusCode::BAD_GATEWAY,
            SubmitError::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Metrics label.
    pub fn outcome(&self) -> &'static str {
        match self {
            SubmitError::Body(_) | SubmitError::Validation(_) => "validation_failed",
            SubmitError::Placement(e) if e.is_not_found() => "placement_not_found",
            SubmitError::Placement(_) => "placement_failed",
            SubmitError::Forward { .. } => "forward_failed",
            SubmitError::Task(_) => "internal_error",
        }
    }
}

impl IntoResponse for SubmitError {
    fn into_response(self) -> Response {
        error_response(&self.to_string(), self.status())
    }
}

/// A lifecycle call that could not be relayed.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("workflow {namespace}/{workflow_name} not found")]
    NotFound {
        namespace: String,
        workflow_name: String,
    },

    #[error("routing lookup failed: {0}")]
    Store(#[source] RoutingCallError),

    #[error("forwarding to {cluster} failed: {source}")]
    Forward {
        cluster: String,
        #[source]
        source: UpstreamError,
    },
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::NotFound { .. } => StatusCode::NOT_FOUND,
            ProxyError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ProxyError::Forward { .. } => StatusCode::BAD_GATEWAY,
        }
    }

    pub fn outcome(&self) -> &'static str {
        match self {
            ProxyError::NotFound { .. } => "not_found",
            ProxyError::Store(_) => "store_error",
            ProxyError::Forward { .. } => "forward_failed",
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        error_response(&self.to_string(), self.status())
    }
}
