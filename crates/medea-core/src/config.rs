//! medea.toml configuration.
//!
//! ```toml
//! [scout]
//! port = 8080
//! prometheus_url = "http://prometheus:9090"
//!
//! [balancer]
//! port = 8081
//! scout_url = "http://medea-scout:8080"
//! state_path = "/var/lib/medea/routing.redb"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

/// Top-level configuration file. Both sections are optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MedeaConfig {
    pub scout: ScoutConfig,
    pub balancer: BalancerConfig,
}

impl MedeaConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&content)?;
        debug!(?path, "configuration file loaded");
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }
}

/// Settings for the capacity-query service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoutConfig {
    /// Port the scout API listens on.
    pub port: u16,
    /// Base address of the Prometheus server holding `kube_resourcequota`.
    pub prometheus_url: String,
    /// Timeout for a single Prometheus query.
    pub query_timeout_secs: u64,
    /// Fixed seed for cluster selection. Entropy-seeded when absent.
    pub seed: Option<u64>,
}

impl Default for ScoutConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            prometheus_url: String::new(),
            query_timeout_secs: 10,
            seed: None,
        }
    }
}

impl ScoutConfig {
    /// Check every field and normalize URLs (trailing slashes removed).
    pub fn validate(mut self) -> Result<Self, ConfigError> {
        self.prometheus_url = validate_base_url("prometheus_url", &self.prometheus_url)?;
        if self.query_timeout_secs == 0 {
            return Err(invalid("query_timeout_secs", "must be greater than zero"));
        }
        Ok(self)
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }
}

/// Settings for the submission balancer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BalancerConfig {
    /// Port the balancer API listens on.
    pub port: u16,
    /// redb file holding the routing table.
    pub state_path: PathBuf,
    /// Base address of the scout service.
    pub scout_url: String,
    /// Request header carrying the caller's opaque token, relayed downstream.
    pub auth_header: String,
    /// Timeout for scout calls and calls to the target cluster.
    pub forward_timeout_secs: u64,
    /// Timeout for a routing table read or write.
    pub store_timeout_secs: u64,
}

impl Default for BalancerConfig {
    fn default() -> Self {
        Self {
            port: 8081,
            state_path: PathBuf::from("/var/lib/medea/routing.redb"),
            scout_url: String::new(),
            auth_header: "authorization".to_string(),
            forward_timeout_secs: 10,
            store_timeout_secs: 10,
        }
    }
}

impl BalancerConfig {
    /// Check every field and normalize URLs and the header name.
    pub fn validate(mut self) -> Result<Self, ConfigError> {
        self.scout_url = validate_base_url("scout_url", &self.scout_url)?;

        let header = self.auth_header.trim().to_ascii_lowercase();
        if header.is_empty() || !header.bytes().all(is_header_char) {
            return Err(invalid(
                "auth_header",
                format!("'{}' is not a valid header name", self.auth_header),
            ));
        }
        self.auth_header = header;

        if self.state_path.as_os_str().is_empty() {
            return Err(invalid("state_path", "must not be empty"));
        }
        if self.forward_timeout_secs == 0 {
            return Err(invalid("forward_timeout_secs", "must be greater than zero"));
        }
        if self.store_timeout_secs == 0 {
            return Err(invalid("store_timeout_secs", "must be greater than zero"));
        }
        Ok(self)
    }

    pub fn forward_timeout(&self) -> Duration {
        Duration::from_secs(self.forward_timeout_secs)
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_secs(self.store_timeout_secs)
    }
}

/// The outbound client speaks plain HTTP only.
fn validate_base_url(field: &'static str, url: &str) -> Result<String, ConfigError> {
    let url = url.trim();
    if url.is_empty() {
        return Err(invalid(field, "must be set"));
    }
    let Some(host) = url.strip_prefix("http://") else {
        return Err(invalid(field, format!("'{url}' must start with http://")));
    };
    if host.trim_end_matches('/').is_empty() {
        return Err(invalid(field, format!("'{url}' has no host")));
    }
    Ok(url.trim_end_matches('/').to_string())
}

fn is_header_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_service_ports() {
        let config = MedeaConfig::default();
        assert_eq!(config.scout.port, 8080);
        assert_eq!(config.balancer.port, 8081);
        assert_eq!(config.balancer.auth_header, "authorization");
        assert_eq!(config.balancer.forward_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn parse_partial_file() {
        let config = MedeaConfig::from_toml_str(
            r#"
[scout]
prometheus_url = "http://prom:9090/"
seed = 7

[balancer]
scout_url = "http://scout:8080"
auth_header = "Tuz"
"#,
        )
        .unwrap();

        assert_eq!(config.scout.seed, Some(7));
        assert_eq!(config.scout.port, 8080);

        let scout = config.scout.validate().unwrap();
        assert_eq!(scout.prometheus_url, "http://prom:9090");

        let balancer = config.balancer.validate().unwrap();
        assert_eq!(balancer.auth_header, "tuz");
        assert_eq!(balancer.scout_url, "http://scout:8080");
    }

    #[test]
    fn empty_file_is_all_defaults() {
        let config = MedeaConfig::from_toml_str("").unwrap();
        assert!(config.scout.prometheus_url.is_empty());
        assert_eq!(config.balancer.store_timeout_secs, 10);
    }

    #[test]
    fn missing_urls_are_rejected() {
        let err = ScoutConfig::default().validate().unwrap_err();
        assert!(err.to_string().contains("prometheus_url"));

        let err = BalancerConfig::default().validate().unwrap_err();
        assert!(err.to_string().contains("scout_url"));
    }

    #[test]
    fn https_is_rejected() {
        let scout = ScoutConfig {
            prometheus_url: "https://prom:9090".to_string(),
            ..ScoutConfig::default()
        };
        assert!(matches!(
            scout.validate(),
            Err(ConfigError::Invalid { field: "prometheus_url", .. })
        ));
    }

    #[test]
    fn bad_header_and_timeouts_are_rejected() {
        let base = BalancerConfig {
            scout_url: "http://scout".to_string(),
            ..BalancerConfig::default()
        };

        let bad_header = BalancerConfig {
            auth_header: "x token".to_string(),
            ..base.clone()
        };
        assert!(bad_header.validate().is_err());

        let zero_timeout = BalancerConfig {
            forward_timeout_secs: 0,
            ..base.clone()
        };
        assert!(zero_timeout.validate().is_err());

        assert!(base.validate().is_ok());
    }

    #[test]
    fn from_file_reports_missing_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        assert!(matches!(
            MedeaConfig::from_file(&path),
            Err(ConfigError::Read { .. })
        ));

        let path = dir.path().join("medea.toml");
        std::fs::write(&path, "[scout]\nport = 9000\n").unwrap();
        assert_eq!(MedeaConfig::from_file(&path).unwrap().scout.port, 9000);
    }
}
