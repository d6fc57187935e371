//! medead — the Medea daemon.
//!
//! One binary, two roles:
//! - `scout`: probes Prometheus and picks a cluster per request
//! - `balancer`: places, forwards and routes workflow submissions
//!
//! # Usage
//!
//! ```text
//! medead scout --prometheus-url http://prometheus:9090
//! medead balancer --scout-url http://medea-scout:8080 --state-path /var/lib/medea/routing.redb
//! ```
//!
//! Settings come from an optional `--config medea.toml`, then environment
//! variables and flags.

mod balancer_mode;
mod scout_mode;
mod settings;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use medea_core::MedeaConfig;

use crate::settings::{BalancerArgs, ScoutArgs};

const DEFAULT_FILTER: &str = "info,medead=debug,medea=debug";

#[derive(Parser)]
#[command(name = "medead", about = "Medea workflow placement daemon")]
struct Cli {
    /// TOML configuration file.
    #[arg(long, global = true, env = "MEDEA_CONFIG")]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the capacity scout.
    Scout(ScoutArgs),
    /// Run the submission balancer.
    Balancer(BalancerArgs),
}

fn init_tracing(json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let file = match &cli.config {
        Some(path) => MedeaConfig::from_file(path)?,
        None => MedeaConfig::default(),
    };

    match cli.command {
        Command::Scout(args) => {
            let config = args.apply(file.scout).validate()?;
            info!(port = config.port, prometheus = %config.prometheus_url, "starting scout");
            scout_mode::run(config).await
        }
        Command::Balancer(args) => {
            let config = args.apply(file.balancer).validate()?;
            info!(port = config.port, scout = %config.scout_url, "starting balancer");
            balancer_mode::run(config).await
        }
    }
}

/// Resolves on Ctrl-C.
pub(crate) async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install CTRL+C handler");
    info!("shutdown signal received");
}
