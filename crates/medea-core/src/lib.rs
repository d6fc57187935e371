//! medea-core — configuration shared by the Medea services.
//!
//! Both services are configured from an optional `medea.toml` file that
//! the daemon overlays with environment variables and CLI flags before
//! calling [`validate`](BalancerConfig::validate). Components never read
//! the environment themselves; they receive the validated structs.

pub mod config;

pub use config::{BalancerConfig, ConfigError, MedeaConfig, ScoutConfig};
