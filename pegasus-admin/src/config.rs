//! Admin client configuration
//!
//! Default config location: ~/.pegasus-admin/config.toml

use crate::error::AdminError;
use crate::stats::Reducer;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main admin configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AdminConfig {
    /// Meta server addresses (host:port), tried in order
    #[serde(default = "default_meta_servers")]
    pub meta_servers: Vec<String>,

    /// Deadline for a single meta server call in milliseconds
    #[serde(default = "default_timeout")]
    pub call_timeout_ms: u64,

    /// Deadline for node discovery in milliseconds
    #[serde(default = "default_timeout")]
    pub discovery_timeout_ms: u64,

    /// Deadline for each per-node perf counter query in milliseconds
    #[serde(default = "default_timeout")]
    pub node_timeout_ms: u64,

    /// QUIC connection establishment timeout in milliseconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,

    /// Maximum number of simultaneous per-node queries
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,

    /// TLS configuration for cluster communication
    #[serde(default)]
    pub tls: ClusterTlsConfig,

    /// Perf counter selection and reduction
    #[serde(default)]
    pub stats: StatsConfig,
}

fn default_meta_servers() -> Vec<String> {
    vec!["127.0.0.1:34601".to_string()]
}

fn default_timeout() -> u64 {
    10_000
}

fn default_connect_timeout() -> u64 {
    5000
}

fn default_max_in_flight() -> usize {
    16
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            meta_servers: default_meta_servers(),
            call_timeout_ms: default_timeout(),
            discovery_timeout_ms: default_timeout(),
            node_timeout_ms: default_timeout(),
            connect_timeout_ms: default_connect_timeout(),
            max_in_flight: default_max_in_flight(),
            tls: ClusterTlsConfig::default(),
            stats: StatsConfig::default(),
        }
    }
}

/// TLS configuration for cluster transport
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClusterTlsConfig {
    /// Server name presented during the TLS handshake
    #[serde(default = "default_server_name")]
    pub server_name: String,

    /// Path to CA certificate for verifying peer certificates.
    /// System roots are used when unset.
    pub ca_cert_path: Option<PathBuf>,

    /// Skip peer certificate verification (INSECURE - for development only)
    #[serde(default)]
    pub skip_verify: bool,
}

fn default_server_name() -> String {
    "pegasus-cluster".to_string()
}

impl Default for ClusterTlsConfig {
    fn default() -> Self {
        Self {
            server_name: default_server_name(),
            ca_cert_path: None,
            skip_verify: false,
        }
    }
}

/// Which counters to collect and how to reduce them
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StatsConfig {
    /// Counter names sent to each node; empty collects everything
    #[serde(default)]
    pub counters: Vec<String>,

    /// Per-counter reducer overrides
    #[serde(default)]
    pub reducers: HashMap<String, Reducer>,

    /// Reducer for counters missing from the built-in table and overrides
    #[serde(default)]
    pub default_reducer: Option<Reducer>,
}

impl AdminConfig {
    /// Load config from the default location, falling back to defaults
    pub fn load() -> Result<Self, AdminError> {
        Self::load_from(&default_config_path())
    }

    /// Load config from file path; a missing file yields the defaults
    pub fn load_from(path: &Path) -> Result<Self, AdminError> {
        let path = expand_tilde(path)?;
        let mut config = if path.exists() {
            let content = fs::read_to_string(&path).map_err(|e| {
                AdminError::Config(format!("Failed to read {}: {}", path.display(), e))
            })?;
            toml::from_str::<AdminConfig>(&content).map_err(|e| {
                AdminError::Config(format!("Failed to parse {}: {}", path.display(), e))
            })?
        } else {
            AdminConfig::default()
        };

        if let Some(ref ca) = config.tls.ca_cert_path {
            config.tls.ca_cert_path = Some(expand_tilde(ca)?);
        }
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the executors cannot run with
    pub fn validate(&self) -> Result<(), AdminError> {
        if self.meta_servers.is_empty() {
            return Err(AdminError::Config("meta_servers must not be empty".into()));
        }
        if self.max_in_flight == 0 {
            return Err(AdminError::Config("max_in_flight must be at least 1".into()));
        }
        for (name, value) in [
            ("call_timeout_ms", self.call_timeout_ms),
            ("discovery_timeout_ms", self.discovery_timeout_ms),
            ("node_timeout_ms", self.node_timeout_ms),
            ("connect_timeout_ms", self.connect_timeout_ms),
        ] {
            if value == 0 {
                return Err(AdminError::Config(format!("{} must be greater than 0", name)));
            }
        }
        Ok(())
    }

    /// Get meta call deadline as Duration
    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }

    /// Get discovery deadline as Duration
    pub fn discovery_timeout(&self) -> Duration {
        Duration::from_millis(self.discovery_timeout_ms)
    }

    /// Get per-node query deadline as Duration
    pub fn node_timeout(&self) -> Duration {
        Duration::from_millis(self.node_timeout_ms)
    }

    /// Get connection timeout as Duration
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

/// Default config file path
pub fn default_config_path() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(".pegasus-admin").join("config.toml"))
        .unwrap_or_else(|| PathBuf::from("pegasus-admin.toml"))
}

/// Expand a leading `~` to the home directory
pub fn expand_tilde(path: &Path) -> Result<PathBuf, AdminError> {
    let Ok(rest) = path.strip_prefix("~") else {
        return Ok(path.to_path_buf());
    };
    let home = dirs::home_dir()
        .ok_or_else(|| AdminError::Config("Could not determine home directory".into()))?;
    Ok(home.join(rest))
}
