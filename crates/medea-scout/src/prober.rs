//! Capacity probing against Prometheus.
//!
//! Available capacity is the namespace's resource quota headroom,
//! `hard - used`, as exported per cluster by kube-state-metrics:
//!
//! ```text
//! kube_resourcequota{namespace="NS",resource="limits.cpu",type="hard"}
//!   - on(cluster)
//! kube_resourcequota{namespace="NS",resource="limits.cpu",type="used"}
//! ```
//!
//! Memory uses `limits.memory` and is divided by `1024^3` in the query so
//! the snapshot is in gigabytes. A cluster that lacks either side of the
//! subtraction simply does not appear in the result.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use medea_placement::{CapacitySnapshot, ResourceKind};
use medea_upstream::{UpstreamClient, UpstreamError, UpstreamRequest};

/// Label carrying the cluster address on every sample.
pub const CLUSTER_LABEL: &str = "cluster";

/// Failure to obtain a capacity snapshot. Never retried.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("metrics backend unreachable: {0}")]
    Upstream(#[from] UpstreamError),

    #[error("metrics backend answered {status}")]
    Status { status: u16 },

    #[error("undecodable metrics response: {0}")]
    Decode(String),

    #[error("metrics query failed: {0}")]
    Query(String),
}

/// Source of per-cluster available capacity.
#[async_trait]
pub trait CapacitySource: Send + Sync + 'static {
    /// Snapshot one resource kind for all clusters serving `namespace`.
    async fn available(
        &self,
        namespace: &str,
        kind: ResourceKind,
    ) -> Result<CapacitySnapshot, ProbeError>;
}

/// [`CapacitySource`] backed by the Prometheus instant-query API.
#[derive(Clone)]
pub struct PrometheusProber {
    base_url: String,
    client: UpstreamClient,
}

impl PrometheusProber {
    pub fn new(base_url: impl Into<String>, client: UpstreamClient) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        }
    }

    fn query_url(&self, query: &str) -> String {
        format!(
            "{}/api/v1/query?query={}",
            self.base_url,
            urlencoding::encode(query)
        )
    }
}

#[async_trait]
impl CapacitySource for PrometheusProber {
    async fn available(
        &self,
        namespace: &str,
        kind: ResourceKind,
    ) -> Result<CapacitySnapshot, ProbeError> {
        let query = capacity_query(namespace, kind);
        let resp = self
            .client
            .send(UpstreamRequest::get(self.query_url(&query)))
            .await?;

        if !resp.is_success() {
            warn!(status = %resp.status, %kind, namespace, "prometheus query rejected");
            return Err(ProbeError::Status {
                status: resp.status.as_u16(),
            });
        }

        let snapshot = decode_snapshot(kind, &resp.body)?;
        debug!(%kind, namespace, clusters = snapshot.len(), "capacity probed");
        Ok(snapshot)
    }
}

/// PromQL for the available amount of `kind` in `namespace`.
pub fn capacity_query(namespace: &str, kind: ResourceKind) -> String {
    let ns = escape_label_value(namespace);
    match kind {
        ResourceKind::Cpu => format!(
            "kube_resourcequota{{namespace=\"{ns}\",resource=\"limits.cpu\",type=\"hard\"}} - on(cluster) kube_resourcequota{{namespace=\"{ns}\",resource=\"limits.cpu\",type=\"used\"}}"
        ),
        ResourceKind::Memory => format!(
            "(kube_resourcequota{{namespace=\"{ns}\",resource=\"limits.memory\",type=\"hard\"}} - on(cluster) kube_resourcequota{{namespace=\"{ns}\",resource=\"limits.memory\",type=\"used\"}})/1024^3"
        ),
    }
}

fn escape_label_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    status: String,
    #[serde(default)]
    data: Option<QueryData>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct QueryData {
    #[serde(default)]
    result: Vec<Sample>,
}

#[derive(Debug, Deserialize)]
struct Sample {
    #[serde(default)]
    metric: HashMap<String, String>,
    #[serde(default)]
    value: Vec<serde_json::Value>,
}

/// Decode an instant-query vector into a snapshot.
///
/// Samples with no cluster label, or whose value is not a finite number
/// encoded as a string, are skipped.
pub fn decode_snapshot(kind: ResourceKind, body: &[u8]) -> Result<CapacitySnapshot, ProbeError> {
    let resp: QueryResponse =
        serde_json::from_slice(body).map_err(|e| ProbeError::Decode(e.to_string()))?;

    if resp.status != "success" {
        return Err(ProbeError::Query(
            resp.error.unwrap_or_else(|| format!("status {}", resp.status)),
        ));
    }

    let mut snapshot = CapacitySnapshot::new(kind);
    for sample in resp.data.map(|d| d.result).unwrap_or_default() {
        let Some(cluster) = sample.metric.get(CLUSTER_LABEL) else {
            debug!(%kind, "sample without cluster label skipped");
            continue;
        };
        let value = sample
            .value
            .get(1)
            .and_then(|v| v.as_str())
            .and_then(|v| v.parse::<f64>().ok())
            .filter(|v| v.is_finite());
        match value {
            Some(value) => snapshot.insert(cluster.clone(), value),
            None => debug!(%kind, cluster, "non-numeric sample skipped"),
        }
    }
    Ok(snapshot)
}
