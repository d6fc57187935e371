//! Lifecycle proxy: get, delete and stop calls follow a workflow to the
//! cluster it was routed to.

use std::sync::Arc;

use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{HeaderMap, HeaderName, Method, Uri};
use tracing::{debug, warn};

use medea_upstream::{UpstreamClient, UpstreamRequest, UpstreamResponse};

use crate::BalancerMetrics;
use crate::error::ProxyError;
use crate::routing::RoutingHandle;

pub struct LifecycleProxy {
    routing: RoutingHandle,
    client: UpstreamClient,
    auth_header: HeaderName,
    metrics: Arc<BalancerMetrics>,
}

impl LifecycleProxy {
    pub fn new(
        routing: RoutingHandle,
        client: UpstreamClient,
        auth_header: HeaderName,
        metrics: Arc<BalancerMetrics>,
    ) -> Self {
        Self {
            routing,
            client,
            auth_header,
            metrics,
        }
    }

    /// Reissue `method uri` against the owning cluster.
    pub async fn forward(
        &self,
        method: Method,
        namespace: &str,
        workflow_name: &str,
        uri: &Uri,
        headers: &HeaderMap,
        body: Bytes,
    ) -> Result<UpstreamResponse, ProxyError> {
        let result = self
            .relay(method, namespace, workflow_name, uri, headers, body)
            .await;
        let outcome = match &result {
            Ok(_) => "forwarded",
            Err(e) => e.outcome(),
        };
        self.metrics.lifecycle_requests.inc(outcome);
        result
    }

    async fn relay(
        &self,
        method: Method,
        namespace: &str,
        workflow_name: &str,
        uri: &Uri,
        headers: &HeaderMap,
        body: Bytes,
    ) -> Result<UpstreamResponse, ProxyError> {
        let cluster = match self.routing.resolve(workflow_name, namespace).await {
            Ok(cluster) => cluster,
            Err(e) if e.is_not_found() => {
                debug!(namespace, workflow = workflow_name, "no route for workflow");
                return Err(ProxyError::NotFound {
                    namespace: namespace.to_string(),
                    workflow_name: workflow_name.to_string(),
                });
            }
            Err(e) => {
                warn!(namespace, workflow = workflow_name, error = %e, "routing lookup failed");
                return Err(ProxyError::Store(e));
            }
        };

        let target = target_uri(&cluster, uri);
        let request = UpstreamRequest::new(method.clone(), target)
            .header_opt(self.auth_header.clone(), headers.get(&self.auth_header))
            .header_opt(CONTENT_TYPE, headers.get(CONTENT_TYPE))
            .body(body);

        let resp = self.client.send(request).await.map_err(|source| {
            warn!(%method, namespace, workflow = workflow_name, %cluster, error = %source, "lifecycle forward failed");
            ProxyError::Forward {
                cluster: cluster.clone(),
                source,
            }
        })?;
        debug!(%method, namespace, workflow = workflow_name, %cluster, status = %resp.status, "lifecycle call relayed");
        Ok(resp)
    }
}

/// `{cluster}{path}[?{query}]`; the query string is kept byte for byte.
pub fn target_uri(cluster: &str, uri: &Uri) -> String {
    let base = cluster.trim_end_matches('/');
    match uri.query() {
        Some(query) => format!("{base}{}?{query}", uri.path()),
        None => format!("{base}{}", uri.path()),
    }
}
