//! Command-line and environment overrides on top of `medea.toml`.

use std::path::PathBuf;

use clap::Args;

use medea_core::{BalancerConfig, ScoutConfig};

#[derive(Debug, Default, Args)]
pub struct ScoutArgs {
    /// Port to listen on.
    #[arg(long, env = "MEDEA_SCOUT_PORT")]
    pub port: Option<u16>,

    /// Prometheus base URL.
    #[arg(long, env = "PROMETHEUS_URL")]
    pub prometheus_url: Option<String>,

    /// Prometheus query timeout in seconds.
    #[arg(long)]
    pub query_timeout_secs: Option<u64>,

    /// Seed for reproducible cluster selection.
    #[arg(long, env = "MEDEA_SCOUT_SEED")]
    pub seed: Option<u64>,
}

impl ScoutArgs {
    pub fn apply(self, mut config: ScoutConfig) -> ScoutConfig {
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(url) = self.prometheus_url {
            config.prometheus_url = url;
        }
        if let Some(secs) = self.query_timeout_secs {
            config.query_timeout_secs = secs;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        config
    }
}

#[derive(Debug, Default, Args)]
pub struct BalancerArgs {
    /// Port to listen on.
    #[arg(long, env = "MEDEA_BALANCER_PORT")]
    pub port: Option<u16>,

    /// Scout base URL.
    #[arg(long, env = "MEDEA_SCOUT_URL")]
    pub scout_url: Option<String>,

    /// Routing table file.
    #[arg(long, env = "MEDEA_STATE_PATH")]
    pub state_path: Option<PathBuf>,

    /// Header carrying the caller's token.
    #[arg(long, env = "MEDEA_AUTH_HEADER")]
    pub auth_header: Option<String>,

    /// Scout and cluster call timeout in seconds.
    #[arg(long)]
    pub forward_timeout_secs: Option<u64>,

    /// Routing table call timeout in seconds.
    #[arg(long)]
    pub store_timeout_secs: Option<u64>,
}

impl BalancerArgs {
    pub fn apply(self, mut config: BalancerConfig) -> BalancerConfig {
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(url) = self.scout_url {
            config.scout_url = url;
        }
        if let Some(path) = self.state_path {
            config.state_path = path;
        }
        if let Some(header) = self.auth_header {
            config.auth_header = header;
        }
        if let Some(secs) = self.forward_timeout_secs {
            config.forward_timeout_secs = secs;
        }
        if let Some(secs) = self.store_timeout_secs {
            config.store_timeout_secs = secs;
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use medea_core::MedeaConfig;

    use super::*;

    #[test]
    fn flags_override_file_values() {
        let file = MedeaConfig::from_toml_str(
            r#"
            [scout]
            port = 9000
            prometheus_url = "http://prom:9090"
            "#,
        )
        .unwrap();

        let args = ScoutArgs {
            prometheus_url: Some("http://other:9090/".to_string()),
            seed: Some(7),
            ..Default::default()
        };
        let config = args.apply(file.scout).validate().unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.prometheus_url, "http://other:9090");
        assert_eq!(config.seed, Some(7));
    }

    #[test]
    fn balancer_defaults_survive_empty_overrides() {
        let args = BalancerArgs {
            scout_url: Some("http://scout:8080".to_string()),
            auth_header: Some("Tuz".to_string()),
            ..Default::default()
        };
        let config = args.apply(BalancerConfig::default()).validate().unwrap();
        assert_eq!(config.port, 8081);
        assert_eq!(config.auth_header, "tuz");
        assert_eq!(config.forward_timeout_secs, 10);
    }

    #[test]
    fn missing_scout_url_fails_validation() {
        let err = BalancerArgs::default()
            .apply(BalancerConfig::default())
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("scout_url"));
    }
}
