// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Service configuration.
//!
//! Loaded from a TOML file; every tunable has a default so a minimal file only
//! needs the `[rpc]` section.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Services XML-RPC endpoint and credentials.
    pub rpc: RpcConfig,

    /// Optional InfluxDB metrics sink.
    #[serde(default)]
    pub influx: InfluxConfig,

    /// Nicknames surfaced as network staff.
    #[serde(default)]
    pub ircops: Vec<String>,

    #[serde(default)]
    pub refresh: RefreshConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub http: HttpConfig,
}

/// Services XML-RPC endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcConfig {
    pub host: String,
    pub port: u16,

    /// Administrative account (OperServ UPTIME, NickServ INFO).
    pub admin: String,
    pub admin_password: String,

    /// Restricted account for public listings.
    pub user: String,
    pub user_password: String,

    /// Per-request transport timeout (seconds).
    #[serde(default = "default_rpc_timeout")]
    pub timeout_secs: u64,
}

/// InfluxDB 1.x write endpoint. Disabled while `endpoint` is empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InfluxConfig {
    #[serde(default)]
    pub endpoint: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub database: String,
    #[serde(default)]
    pub retention: String,
}

/// Refresh cadence and startup gating.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshConfig {
    /// Time between cycle starts once running (seconds).
    #[serde(default = "default_interval")]
    pub interval_secs: u64,

    /// Retry delay before the first successful cycle (seconds).
    #[serde(default = "default_backoff")]
    pub backoff_secs: u64,

    /// Failed cycles tolerated before the first success.
    #[serde(default = "default_max_startup_failures")]
    pub max_startup_failures: u32,

    /// Upper bound on a single cycle (seconds).
    #[serde(default = "default_cycle_timeout")]
    pub cycle_timeout_secs: u64,
}

/// User lookup cache sizing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,

    #[serde(default = "default_cache_ttl")]
    pub ttl_secs: u64,
}

/// HTTP listener.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_bind")]
    pub bind: SocketAddr,
}

fn default_rpc_timeout() -> u64 {
    10
}

fn default_interval() -> u64 {
    30
}

fn default_backoff() -> u64 {
    15
}

fn default_max_startup_failures() -> u32 {
    5
}

fn default_cycle_timeout() -> u64 {
    120
}

fn default_cache_capacity() -> usize {
    crate::cache::DEFAULT_CAPACITY
}

fn default_cache_ttl() -> u64 {
    crate::cache::DEFAULT_TTL.as_secs()
}

fn default_bind() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval(),
            backoff_secs: default_backoff(),
            max_startup_failures: default_max_startup_failures(),
            cycle_timeout_secs: default_cycle_timeout(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: default_cache_capacity(),
            ttl_secs: default_cache_ttl(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

impl RpcConfig {
    /// XML-RPC endpoint URL.
    pub fn url(&self) -> String {
        format!("http://{}:{}/xmlrpc", self.host, self.port)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl InfluxConfig {
    pub fn is_enabled(&self) -> bool {
        !self.endpoint.trim().is_empty()
    }
}

impl RefreshConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn backoff(&self) -> Duration {
        Duration::from_secs(self.backoff_secs)
    }

    pub fn cycle_timeout(&self) -> Duration {
        Duration::from_secs(self.cycle_timeout_secs)
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl Config {
    /// Load and validate configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let rpc = &self.rpc;
        if rpc.host.trim().is_empty() {
            return Err(ConfigError::Invalid("rpc.host cannot be empty".into()));
        }
        if rpc.port == 0 {
            return Err(ConfigError::Invalid("rpc.port cannot be 0".into()));
        }
        if rpc.admin.is_empty() || rpc.admin_password.is_empty() {
            return Err(ConfigError::Invalid(
                "rpc.admin and rpc.admin_password are required".into(),
            ));
        }
        if rpc.user.is_empty() || rpc.user_password.is_empty() {
            return Err(ConfigError::Invalid(
                "rpc.user and rpc.user_password are required".into(),
            ));
        }
        if rpc.timeout_secs == 0 {
            return Err(ConfigError::Invalid("rpc.timeout_secs cannot be 0".into()));
        }

        if self.influx.is_enabled() && self.influx.database.is_empty() {
            return Err(ConfigError::Invalid(
                "influx.database required when influx.endpoint is set".into(),
            ));
        }

        if self.refresh.interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "refresh.interval_secs cannot be 0".into(),
            ));
        }
        if self.refresh.backoff_secs == 0 {
            return Err(ConfigError::Invalid(
                "refresh.backoff_secs cannot be 0".into(),
            ));
        }
        if self.refresh.max_startup_failures == 0 {
            return Err(ConfigError::Invalid(
                "refresh.max_startup_failures cannot be 0".into(),
            ));
        }
        if self.refresh.cycle_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "refresh.cycle_timeout_secs cannot be 0".into(),
            ));
        }

        if self.cache.capacity == 0 {
            return Err(ConfigError::Invalid("cache.capacity cannot be 0".into()));
        }
        if self.cache.ttl_secs == 0 {
            return Err(ConfigError::Invalid("cache.ttl_secs cannot be 0".into()));
        }

        Ok(())
    }

    /// Commented example configuration.
    pub fn example() -> &'static str {
        EXAMPLE_CONFIG
    }
}

const EXAMPLE_CONFIG: &str = r#"# ircstats configuration

ircops = ["alice", "bob"]

[rpc]
host = "127.0.0.1"
port = 8080
# Administrative account: OperServ UPTIME, NickServ INFO.
admin = "statsadmin"
admin_password = "change-me"
# Restricted account: ALIS, BotServ, ChanServ, InfoServ.
user = "stats"
user_password = "change-me"
timeout_secs = 10

[refresh]
interval_secs = 30
backoff_secs = 15
max_startup_failures = 5
cycle_timeout_secs = 120

[cache]
capacity = 50
ttl_secs = 900

[http]
bind = "0.0.0.0:8080"

# Leave endpoint empty to disable metrics.
[influx]
endpoint = ""
username = ""
password = ""
database = "irc"
retention = ""
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const MINIMAL_TOML: &str = r#"
[rpc]
host = "services.example.net"
port = 8080
admin = "root"
admin_password = "secret"
user = "stats"
user_password = "public"
"#;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = Config::from_toml(MINIMAL_TOML).expect("parse minimal toml");

        assert_eq!(config.rpc.url(), "http://services.example.net:8080/xmlrpc");
        assert_eq!(config.rpc.timeout(), Duration::from_secs(10));
        assert!(config.ircops.is_empty());
        assert!(!config.influx.is_enabled());
        assert_eq!(config.refresh.interval(), Duration::from_secs(30));
        assert_eq!(config.refresh.backoff(), Duration::from_secs(15));
        assert_eq!(config.refresh.max_startup_failures, 5);
        assert_eq!(config.cache.capacity, 50);
        assert_eq!(config.cache.ttl(), Duration::from_secs(900));
        assert_eq!(config.http.bind.port(), 8080);
    }

    #[test]
    fn test_example_config_is_valid() {
        let config = Config::from_toml(Config::example()).expect("parse example");
        assert_eq!(config.ircops, vec!["alice", "bob"]);
        assert_eq!(config.influx.database, "irc");
        assert!(!config.influx.is_enabled());
    }

    #[test]
    fn test_missing_credentials_rejected() {
        let toml = MINIMAL_TOML.replace("user_password = \"public\"", "user_password = \"\"");
        let err = Config::from_toml(&toml).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_influx_requires_database() {
        let toml = format!(
            "{}\n[influx]\nendpoint = \"http://influx:8086\"\n",
            MINIMAL_TOML
        );
        assert!(Config::from_toml(&toml).is_err());

        let toml = format!(
            "{}\n[influx]\nendpoint = \"http://influx:8086\"\ndatabase = \"irc\"\n",
            MINIMAL_TOML
        );
        assert!(Config::from_toml(&toml).unwrap().influx.is_enabled());
    }

    #[test]
    fn test_zero_intervals_rejected() {
        for key in ["interval_secs", "backoff_secs", "cycle_timeout_secs"] {
            let toml = format!("{}\n[refresh]\n{} = 0\n", MINIMAL_TOML, key);
            let err = Config::from_toml(&toml).unwrap_err();
            assert!(
                matches!(&err, ConfigError::Invalid(msg) if msg.contains(key)),
                "{} = 0 accepted: {}",
                key,
                err
            );
        }
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(MINIMAL_TOML.as_bytes()).unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.rpc.admin, "root");

        assert!(matches!(
            Config::from_file(file.path().with_extension("missing")),
            Err(ConfigError::Io(_))
        ));
    }
}
