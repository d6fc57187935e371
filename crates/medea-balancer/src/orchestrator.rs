//! Submission orchestration.
//!
//! A submission moves through
//!
//! ```text
//! Received → Validated → Placed → Forwarded → (Persisted) → Completed
//! ```
//!
//! and leaves early as `ValidationFailed`, `PlacementFailed` or
//! `ForwardFailed`. `Persisted` is skipped when the cluster rejects the
//! workflow or the routing write fails; neither changes the response the
//! caller sees. There is no capacity reservation between placement and
//! forward, so concurrent submissions may land on the same cluster.
//!
//! Each submission runs on its own task: a caller that disconnects after
//! the forward started does not stop the routing record from being
//! written.

use std::fmt;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue};
use serde::Deserialize;
use tracing::{debug, info, warn};

use medea_placement::calculate;
use medea_state::NewRoutingRecord;
use medea_upstream::{UpstreamClient, UpstreamRequest, UpstreamResponse};

use crate::BalancerMetrics;
use crate::error::SubmitError;
use crate::locator::ClusterLocator;
use crate::routing::RoutingHandle;

/// Body of `POST /api/v1/workflows/{namespace}/submit`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SubmitRequest {
    pub resource_kind: String,
    pub resource_name: String,
    pub submit_options: SubmitOptions,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SubmitOptions {
    pub labels: Option<String>,
    pub parameters: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionPhase {
    Received,
    Validated,
    Placed,
    Forwarded,
    Persisted,
    Completed,
    ValidationFailed,
    PlacementFailed,
    ForwardFailed,
}

impl fmt::Display for SubmissionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SubmissionPhase::Received => "received",
            SubmissionPhase::Validated => "validated",
            SubmissionPhase::Placed => "placed",
            SubmissionPhase::Forwarded => "forwarded",
            SubmissionPhase::Persisted => "persisted",
            SubmissionPhase::Completed => "completed",
            SubmissionPhase::ValidationFailed => "validation_failed",
            SubmissionPhase::PlacementFailed => "placement_failed",
            SubmissionPhase::ForwardFailed => "forward_failed",
        };
        f.write_str(name)
    }
}

#[derive(Deserialize)]
struct AcceptedWorkflow {
    metadata: AcceptedMetadata,
}

#[derive(Deserialize)]
struct AcceptedMetadata {
    #[serde(default)]
    name: String,
}

/// Name the cluster gave an accepted workflow, if the body carries one.
fn accepted_name(body: &[u8]) -> Option<String> {
    serde_json::from_slice::<AcceptedWorkflow>(body)
        .ok()
        .map(|w| w.metadata.name)
        .filter(|name| !name.is_empty())
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[derive(Clone)]
pub struct Orchestrator {
    locator: Arc<dyn ClusterLocator>,
    client: UpstreamClient,
    routing: RoutingHandle,
    auth_header: HeaderName,
    metrics: Arc<BalancerMetrics>,
}

impl Orchestrator {
    pub fn new(
        locator: Arc<dyn ClusterLocator>,
        client: UpstreamClient,
        routing: RoutingHandle,
        auth_header: HeaderName,
        metrics: Arc<BalancerMetrics>,
    ) -> Self {
        Self {
            locator,
            client,
            routing,
            auth_header,
            metrics,
        }
    }

    /// Place and forward one submission.
    ///
    /// Any response the cluster returns in time is `Ok`, whatever its
    /// status; it is relayed to the caller verbatim. The work runs on a
    /// spawned task, so dropping this future does not cancel it.
    pub async fn submit(
        &self,
        namespace: &str,
        headers: &HeaderMap,
        body: Bytes,
    ) -> Result<UpstreamResponse, SubmitError> {
        let this = self.clone();
        let namespace = namespace.to_string();
        let token = headers.get(&self.auth_header).cloned();
        let task = tokio::spawn(async move {
            let result = this.run(&namespace, token, body).await;
            let outcome = match &result {
                Ok(resp) if resp.is_success() => "completed",
                Ok(_) => "rejected",
                Err(e) => e.outcome(),
            };
            this.metrics.submissions.inc(outcome);
            result
        });
        task.await.unwrap_or_else(|e| {
            warn!(error = %e, "submission task failed");
            self.metrics.submissions.inc("internal_error");
            Err(SubmitError::Task(e.to_string()))
        })
    }

    async fn run(
        &self,
        namespace: &str,
        token: Option<HeaderValue>,
        body: Bytes,
    ) -> Result<UpstreamResponse, SubmitError> {
        debug!(phase = %SubmissionPhase::Received, namespace, bytes = body.len());

        let request: SubmitRequest = serde_json::from_slice(&body).map_err(|e| {
            info!(phase = %SubmissionPhase::ValidationFailed, namespace, error = %e);
            SubmitError::Body(e.to_string())
        })?;
        let requirement = calculate(&request.submit_options.parameters).map_err(|e| {
            info!(phase = %SubmissionPhase::ValidationFailed, namespace, error = %e);
            SubmitError::from(e)
        })?;
        debug!(
            phase = %SubmissionPhase::Validated,
            namespace,
            template = %request.resource_name,
            cpu = requirement.cpu_cores,
            ram = requirement.ram_gigabytes,
        );

        let cluster = self
            .locator
            .locate(namespace, &requirement)
            .await
            .map_err(|e| {
                warn!(phase = %SubmissionPhase::PlacementFailed, namespace, error = %e);
                SubmitError::from(e)
            })?;
        debug!(phase = %SubmissionPhase::Placed, namespace, %cluster);

        let uri = format!(
            "{}/api/v1/workflows/{}/submit",
            cluster.trim_end_matches('/'),
            namespace
        );
        let forward = UpstreamRequest::post_json(uri, body)
            .header_opt(self.auth_header.clone(), token.as_ref());
        let resp = self.client.send(forward).await.map_err(|source| {
            warn!(phase = %SubmissionPhase::ForwardFailed, namespace, %cluster, error = %source);
            SubmitError::Forward {
                cluster: cluster.clone(),
                source,
            }
        })?;
        debug!(phase = %SubmissionPhase::Forwarded, namespace, %cluster, status = %resp.status);

        if resp.is_success() {
            match accepted_name(&resp.body) {
                Some(workflow_name) => {
                    self.persist(workflow_name, &request.resource_name, namespace, &cluster)
                        .await
                }
                None => warn!(namespace, %cluster, "accepted submission has no metadata.name, not recorded"),
            }
        } else {
            info!(namespace, %cluster, status = %resp.status, "cluster rejected submission");
        }

        debug!(phase = %SubmissionPhase::Completed, namespace, status = %resp.status);
        Ok(resp)
    }

    async fn persist(&self, workflow_name: String, template: &str, namespace: &str, cluster: &str) {
        let record = NewRoutingRecord {
            workflow_name: workflow_name.clone(),
            workflow_template: template.to_string(),
            namespace: namespace.to_string(),
            cluster: cluster.to_string(),
            created_at: unix_now(),
        };
        match self.routing.record(record).await {
            Ok(stored) => {
                info!(
                    phase = %SubmissionPhase::Persisted,
                    workflow = %workflow_name,
                    namespace,
                    cluster,
                    id = stored.id,
                    "workflow routed"
                );
            }
            Err(e) => {
                self.metrics.routing_write_failures.inc_plain();
                warn!(
                    workflow = %workflow_name,
                    namespace,
                    cluster,
                    error = %e,
                    "routing record not written, lifecycle calls for this workflow will 404"
                );
            }
        }
    }
}
