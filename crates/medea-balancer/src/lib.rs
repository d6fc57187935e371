//! medea-balancer — workflow submission routing and lifecycle proxy.
//!
//! Submissions are placed on a cluster chosen by the scout, forwarded
//! there, and remembered in the routing table so that later lifecycle
//! calls for the same workflow reach the same cluster.
//!
//! # API Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | POST | `/api/v1/workflows/{namespace}/submit` | Place and submit a workflow |
//! | GET | `/api/v1/workflows/{namespace}/{workflowName}` | Proxied to the owning cluster |
//! | DELETE | `/api/v1/workflows/{namespace}/{workflowName}` | Proxied to the owning cluster |
//! | PUT | `/api/v1/workflows/{namespace}/{workflowName}/stop` | Proxied to the owning cluster |
//! | GET | `/metrics` | Prometheus exposition |
//! | GET | `/healthz` | Liveness |

pub mod error;
pub mod handlers;
pub mod locator;
pub mod orchestrator;
pub mod proxy;
pub mod routing;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post, put};
use http::HeaderName;

use medea_metrics::CounterFamily;
use medea_upstream::UpstreamClient;

pub use error::{ProxyError, SubmitError};
pub use locator::{ClusterLocator, PlacementError, ScoutClient};
pub use orchestrator::{Orchestrator, SubmissionPhase, SubmitRequest};
pub use proxy::LifecycleProxy;
pub use routing::{RouteStore, RoutingCallError, RoutingHandle};

/// Self-metrics of the balancer.
pub struct BalancerMetrics {
    /// Submissions by outcome.
    pub submissions: CounterFamily,
    /// Lifecycle calls by outcome.
    pub lifecycle_requests: CounterFamily,
    /// Accepted workflows whose routing record could not be written.
    pub routing_write_failures: CounterFamily,
}

impl BalancerMetrics {
    pub fn new() -> Self {
        Self {
            submissions: CounterFamily::labeled(
                "medea_balancer_submissions_total",
                "Workflow submissions handled, by outcome.",
                "outcome",
            ),
            lifecycle_requests: CounterFamily::labeled(
                "medea_balancer_lifecycle_requests_total",
                "Lifecycle calls handled, by outcome.",
                "outcome",
            ),
            routing_write_failures: CounterFamily::plain(
                "medea_routing_write_failures_total",
                "Accepted workflows whose routing record was not written.",
            ),
        }
    }
}

impl Default for BalancerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared state for balancer handlers.
#[derive(Clone)]
pub struct BalancerState {
    pub orchestrator: Arc<Orchestrator>,
    pub proxy: Arc<LifecycleProxy>,
    pub routing: RoutingHandle,
    pub metrics: Arc<BalancerMetrics>,
}

impl BalancerState {
    /// `client` is used for cluster calls; the locator brings its own.
    pub fn new(
        routing: RoutingHandle,
        client: UpstreamClient,
        locator: Arc<dyn ClusterLocator>,
        auth_header: HeaderName,
    ) -> Self {
        let metrics = Arc::new(BalancerMetrics::new());
        let orchestrator = Orchestrator::new(
            locator,
            client.clone(),
            routing.clone(),
            auth_header.clone(),
            Arc::clone(&metrics),
        );
        let proxy = LifecycleProxy::new(routing.clone(), client, auth_header, Arc::clone(&metrics));
        Self {
            orchestrator: Arc::new(orchestrator),
            proxy: Arc::new(proxy),
            routing,
            metrics,
        }
    }
}

/// Build the balancer router.
pub fn build_router(state: BalancerState) -> Router {
    let workflows = Router::new()
        .route("/{namespace}/submit", post(handlers::submit_workflow))
        .route(
            "/{namespace}/{workflow_name}",
            get(handlers::proxy_lifecycle).delete(handlers::proxy_lifecycle),
        )
        .route("/{namespace}/{workflow_name}/stop", put(handlers::proxy_lifecycle));

    Router::new()
        .nest("/api/v1/workflows", workflows)
        .route("/metrics", get(handlers::prometheus_metrics))
        .route("/healthz", get(handlers::healthz))
        .with_state(state)
}
