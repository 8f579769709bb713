// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! InfluxDB metrics sink.
//!
//! After each published snapshot one point is written through the InfluxDB
//! 1.x HTTP write API:
//!
//! ```text
//! POST {endpoint}/write?db=<database>[&rp=<retention>]
//! stats accounts=120i,nicks=530i,channels=40i,active=12i 1700000000000000000
//! ```

use crate::config::InfluxConfig;
use crate::model::Snapshot;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Measurement name for network counters.
pub const MEASUREMENT: &str = "stats";

const WRITE_TIMEOUT: Duration = Duration::from_secs(5);

/// Metrics write errors.
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("InfluxDB rejected write: HTTP {status}: {body}")]
    Rejected { status: StatusCode, body: String },
}

/// Point for a snapshot's network counters, stamped with its build time.
pub fn snapshot_point(snapshot: &Snapshot) -> String {
    let count = |n: u64| i64::try_from(n).unwrap_or(i64::MAX);
    let fields = [
        ("accounts", count(snapshot.account_count)),
        ("nicks", count(snapshot.nick_count)),
        ("channels", count(snapshot.channel_count)),
        ("active", count(snapshot.active_count)),
    ]
    .iter()
    .map(|(key, value)| format!("{}={}i", key, value))
    .collect::<Vec<_>>()
    .join(",");
    let timestamp = snapshot
        .generated_at
        .timestamp_nanos_opt()
        .unwrap_or_default();
    format!("{} {} {}", MEASUREMENT, fields, timestamp)
}

/// Writes snapshot counters to InfluxDB.
pub struct InfluxSink {
    client: Client,
    write_url: String,
    username: String,
    password: String,
    database: String,
    retention: String,
}

impl InfluxSink {
    /// Build a sink, or `None` when no endpoint is configured.
    pub fn from_config(config: &InfluxConfig) -> Result<Option<Self>, MetricsError> {
        if !config.is_enabled() {
            return Ok(None);
        }

        let client = Client::builder().timeout(WRITE_TIMEOUT).build()?;
        Ok(Some(Self {
            client,
            write_url: format!("{}/write", config.endpoint.trim().trim_end_matches('/')),
            username: config.username.clone(),
            password: config.password.clone(),
            database: config.database.clone(),
            retention: config.retention.clone(),
        }))
    }

    pub fn write_url(&self) -> &str {
        &self.write_url
    }

    fn query(&self) -> Vec<(&'static str, &str)> {
        let mut query = vec![("db", self.database.as_str())];
        if !self.retention.is_empty() {
            query.push(("rp", self.retention.as_str()));
        }
        query
    }

    /// Write the counters of `snapshot`.
    pub async fn record(&self, snapshot: &Snapshot) -> Result<(), MetricsError> {
        let line = snapshot_point(snapshot);
        debug!("influx write: {}", line);

        let mut request = self.client.post(&self.write_url).query(&self.query());
        if !self.username.is_empty() {
            request = request.basic_auth(&self.username, Some(&self.password));
        }

        let response = request.body(line).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MetricsError::Rejected { status, body });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn snapshot() -> Snapshot {
        Snapshot {
            account_count: 120,
            nick_count: 530,
            channel_count: 40,
            active_count: 12,
            generated_at: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            notifications: Vec::new(),
            channels: Vec::new(),
            bots: Vec::new(),
            irc_ops: Vec::new(),
        }
    }

    #[test]
    fn test_snapshot_point() {
        assert_eq!(
            snapshot_point(&snapshot()),
            "stats accounts=120i,nicks=530i,channels=40i,active=12i 1700000000000000000"
        );
    }

    #[test]
    fn test_snapshot_point_saturates_counts() {
        let snapshot = Snapshot {
            account_count: u64::MAX,
            ..snapshot()
        };
        assert!(snapshot_point(&snapshot)
            .starts_with(&format!("stats accounts={}i,nicks=530i,", i64::MAX)));
    }

    #[test]
    fn test_disabled_without_endpoint() {
        let sink = InfluxSink::from_config(&InfluxConfig::default()).unwrap();
        assert!(sink.is_none());
    }

    #[test]
    fn test_query_includes_retention_when_set() {
        let mut config = InfluxConfig {
            endpoint: "http://influx:8086/".into(),
            database: "irc".into(),
            ..Default::default()
        };
        let sink = InfluxSink::from_config(&config).unwrap().unwrap();
        assert_eq!(sink.write_url(), "http://influx:8086/write");
        assert_eq!(sink.query(), vec![("db", "irc")]);

        config.retention = "autogen".into();
        let sink = InfluxSink::from_config(&config).unwrap().unwrap();
        assert_eq!(sink.query(), vec![("db", "irc"), ("rp", "autogen")]);
    }
}
