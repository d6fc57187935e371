//! Balancer role: submission routing and lifecycle proxy.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use http::HeaderName;
use tracing::info;

use medea_balancer::{BalancerState, RoutingHandle, ScoutClient, build_router};
use medea_core::BalancerConfig;
use medea_state::RoutingTable;
use medea_upstream::UpstreamClient;

pub async fn run(config: BalancerConfig) -> anyhow::Result<()> {
    if let Some(dir) = config.state_path.parent() {
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("creating state directory {}", dir.display()))?;
        }
    }
    let table = RoutingTable::open(&config.state_path)
        .with_context(|| format!("opening routing table {}", config.state_path.display()))?;
    info!(path = ?config.state_path, records = table.len()?, "routing table opened");

    let auth_header = HeaderName::from_bytes(config.auth_header.as_bytes())
        .with_context(|| format!("auth header '{}'", config.auth_header))?;
    let client = UpstreamClient::new(config.forward_timeout());
    let scout = ScoutClient::new(config.scout_url.clone(), client.clone());

    let state = BalancerState::new(
        RoutingHandle::new(table, config.store_timeout()),
        client,
        Arc::new(scout),
        auth_header,
    );
    let router = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, auth_header = %config.auth_header, "balancer listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(crate::shutdown_signal())
        .await?;

    info!("balancer stopped");
    Ok(())
}
