//! medea-scout — capacity-aware cluster selection service.
//!
//! Probes Prometheus for the per-cluster resource quota headroom of a
//! namespace and answers with one cluster that fits the request.
//!
//! # API Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | POST | `/api/request` | `{namespace, cpu, ram}` → `{cluster}` |
//! | GET | `/metrics` | Prometheus exposition |
//! | GET | `/healthz` | Liveness |

pub mod handlers;
pub mod prober;
pub mod scout;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};

use medea_metrics::CounterFamily;

pub use prober::{CapacitySource, ProbeError, PrometheusProber};
pub use scout::{Scout, ScoutError};

/// Self-metrics of the scout.
pub struct ScoutMetrics {
    /// Placement requests by outcome.
    pub placements: CounterFamily,
    /// Failed capacity probes by resource.
    pub probe_failures: CounterFamily,
}

impl ScoutMetrics {
    pub fn new() -> Self {
        Self {
            placements: CounterFamily::labeled(
                "medea_scout_placements_total",
                "Placement requests handled, by outcome.",
                "outcome",
            ),
            probe_failures: CounterFamily::labeled(
                "medea_scout_probe_failures_total",
                "Capacity probes that failed, by resource.",
                "resource",
            ),
        }
    }
}

impl Default for ScoutMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared state for scout handlers.
#[derive(Clone)]
pub struct ScoutState {
    pub scout: Arc<Scout>,
    pub metrics: Arc<ScoutMetrics>,
}

impl ScoutState {
    pub fn new(scout: Scout) -> Self {
        Self {
            scout: Arc::new(scout),
            metrics: Arc::new(ScoutMetrics::new()),
        }
    }
}

/// Build the scout router.
pub fn build_router(state: ScoutState) -> Router {
    Router::new()
        .route("/api/request", post(handlers::request_placement))
        .route("/metrics", get(handlers::prometheus_metrics))
        .route("/healthz", get(handlers::healthz))
        .with_state(state)
}
