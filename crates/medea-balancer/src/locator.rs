//! Finding a cluster for a requirement.

use async_trait::async_trait;
use http::StatusCode;
use thiserror::Error;
use tracing::debug;

use medea_placement::{PlacementRequest, PlacementResponse, ResourceRequirement};
use medea_upstream::{UpstreamClient, UpstreamError, UpstreamRequest};

#[derive(Debug, Error)]
pub enum PlacementError {
    #[error("no cluster can host the workflow in namespace {namespace}")]
    NotFound { namespace: String },

    #[error("scout unreachable: {0}")]
    Unreachable(#[from] UpstreamError),

    #[error("scout answered {status}")]
    Status { status: u16 },

    #[error("undecodable scout response: {0}")]
    Decode(String),
}

impl PlacementError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, PlacementError::NotFound { .. })
    }
}

/// Answers "which cluster should run this?".
#[async_trait]
pub trait ClusterLocator: Send + Sync + 'static {
    async fn locate(
        &self,
        namespace: &str,
        req: &ResourceRequirement,
    ) -> Result<String, PlacementError>;
}

/// [`ClusterLocator`] that asks a scout over HTTP.
#[derive(Clone)]
pub struct ScoutClient {
    base_url: String,
    client: UpstreamClient,
}

impl ScoutClient {
    pub fn new(base_url: impl Into<String>, client: UpstreamClient) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        }
    }
}

#[async_trait]
impl ClusterLocator for ScoutClient {
    async fn locate(
        &self,
        namespace: &str,
        req: &ResourceRequirement,
    ) -> Result<String, PlacementError> {
        let body = serde_json::to_vec(&PlacementRequest::new(namespace, req))
            .map_err(|e| PlacementError::Decode(e.to_string()))?;
        let resp = self
            .client
            .send(UpstreamRequest::post_json(
                format!("{}/api/request", self.base_url),
                body,
            ))
            .await?;

        match resp.status {
            StatusCode::OK => {}
            StatusCode::NOT_FOUND => {
                return Err(PlacementError::NotFound {
                    namespace: namespace.to_string(),
                });
            }
            status => {
                return Err(PlacementError::Status {
                    status: status.as_u16(),
                });
            }
        }

        let placed: PlacementResponse = serde_json::from_slice(&resp.body)
            .map_err(|e| PlacementError::Decode(e.to_string()))?;
        if placed.cluster.is_empty() {
            return Err(PlacementError::Decode("empty cluster".to_string()));
        }
        debug!(namespace, cluster = %placed.cluster, "scout placed workflow");
        Ok(placed.cluster)
    }
}
