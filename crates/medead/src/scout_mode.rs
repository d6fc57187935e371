//! Scout role: Prometheus-backed placement API.

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::info;

use medea_core::ScoutConfig;
use medea_scout::{PrometheusProber, Scout, ScoutState, build_router};
use medea_upstream::UpstreamClient;

pub async fn run(config: ScoutConfig) -> anyhow::Result<()> {
    let client = UpstreamClient::new(config.query_timeout());
    let prober = PrometheusProber::new(config.prometheus_url.clone(), client);
    let scout = Scout::new(Arc::new(prober), config.seed);
    let router = build_router(ScoutState::new(scout));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "scout listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(crate::shutdown_signal())
        .await?;

    info!("scout stopped");
    Ok(())
}
