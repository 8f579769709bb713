// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Periodic snapshot refresh.
//!
//! ```text
//!            failure (< max)                 success / failure
//!           +-------------+                 +---------------+
//!           v             |                 v               |
//!   Starting{failures} ---+--- success ---> Running --------+
//!           |
//!           +-- failure (== max) --> StartupExhausted (fatal)
//! ```
//!
//! Before the first success, a failed cycle is retried after `backoff`. Once
//! running, cycles start every `interval` whatever their outcome and failures
//! only leave the previous snapshot in place.

use crate::builder::SnapshotBuilder;
use crate::config::RefreshConfig;
use crate::error::{BuildError, RefreshError};
use crate::metrics::InfluxSink;
use crate::model::Snapshot;
use crate::rpc::ServicesRpc;
use crate::store::SnapshotStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// Refresh timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshPolicy {
    /// Time between cycle starts once running.
    pub interval: Duration,
    /// Delay before retrying a failed cycle during startup.
    pub backoff: Duration,
    /// Failed cycles tolerated before the first success.
    pub max_startup_failures: u32,
    /// Upper bound on one cycle.
    pub cycle_timeout: Duration,
}

impl Default for RefreshPolicy {
    fn default() -> Self {
        Self::from(&RefreshConfig::default())
    }
}

impl From<&RefreshConfig> for RefreshPolicy {
    fn from(config: &RefreshConfig) -> Self {
        Self {
            interval: config.interval(),
            backoff: config.backoff(),
            max_startup_failures: config.max_startup_failures,
            cycle_timeout: config.cycle_timeout(),
        }
    }
}

/// Scheduler lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshState {
    /// No snapshot published yet.
    Starting { failures: u32 },
    /// At least one snapshot published.
    Running,
}

/// Stops a running [`RefreshScheduler`].
#[derive(Debug, Clone)]
pub struct ShutdownHandle(Arc<Notify>);

impl ShutdownHandle {
    /// Request shutdown. Takes effect at the next suspension point, including
    /// an in-flight cycle.
    pub fn shutdown(&self) {
        self.0.notify_one();
    }
}

/// Drives [`SnapshotBuilder`] cycles and publishes into a [`SnapshotStore`].
pub struct RefreshScheduler<R> {
    builder: SnapshotBuilder<R>,
    store: Arc<SnapshotStore>,
    metrics: Option<InfluxSink>,
    policy: RefreshPolicy,
    shutdown: Arc<Notify>,
}

impl<R: ServicesRpc> RefreshScheduler<R> {
    pub fn new(builder: SnapshotBuilder<R>, store: Arc<SnapshotStore>, policy: RefreshPolicy) -> Self {
        Self {
            builder,
            store,
            metrics: None,
            policy,
            shutdown: Arc::new(Notify::new()),
        }
    }

    /// Write counters to `sink` after every publication.
    pub fn with_metrics(mut self, sink: InfluxSink) -> Self {
        self.metrics = Some(sink);
        self
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle(Arc::clone(&self.shutdown))
    }

    /// Run until shut down, or until startup gives up.
    pub async fn run(&self) -> Result<(), RefreshError> {
        let mut state = RefreshState::Starting { failures: 0 };
        info!(
            "refresh scheduler started (interval {:?}, backoff {:?})",
            self.policy.interval, self.policy.backoff
        );

        loop {
            let started = Instant::now();

            let outcome = tokio::select! {
                outcome = self.cycle() => outcome,
                _ = self.shutdown.notified() => break,
            };

            let delay = match (state, outcome) {
                (_, Ok(snapshot)) => {
                    if state != RefreshState::Running {
                        info!("first snapshot ready");
                    }
                    state = RefreshState::Running;
                    self.publish(snapshot).await;
                    self.policy.interval.saturating_sub(started.elapsed())
                }
                (RefreshState::Starting { failures }, Err(e)) => {
                    let failures = failures + 1;
                    if failures >= self.policy.max_startup_failures {
                        error!(
                            "refresh failed {} times before first snapshot: {}",
                            failures, e
                        );
                        return Err(RefreshError::StartupExhausted {
                            attempts: failures,
                            last: e,
                        });
                    }
                    warn!(
                        "refresh attempt {}/{} failed: {}; retrying in {:?}",
                        failures, self.policy.max_startup_failures, e, self.policy.backoff
                    );
                    state = RefreshState::Starting { failures };
                    self.policy.backoff
                }
                (RefreshState::Running, Err(e)) => {
                    warn!("refresh failed, keeping previous snapshot: {}", e);
                    self.policy.interval.saturating_sub(started.elapsed())
                }
            };

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = self.shutdown.notified() => break,
            }
        }

        info!("refresh scheduler stopped");
        Ok(())
    }

    async fn cycle(&self) -> Result<Snapshot, BuildError> {
        let timeout = self.policy.cycle_timeout;
        tokio::time::timeout(timeout, self.builder.build())
            .await
            .map_err(|_| BuildError::TimedOut(timeout))?
    }

    async fn publish(&self, snapshot: Snapshot) {
        info!(
            "snapshot published: {} accounts, {} nicks, {} channels, {} online",
            snapshot.account_count,
            snapshot.nick_count,
            snapshot.channel_count,
            snapshot.active_count
        );
        self.store.publish(snapshot);

        let (Some(sink), Some(current)) = (&self.metrics, self.store.current()) else {
            return;
        };
        match sink.record(&current).await {
            Ok(()) => debug!("metrics written"),
            Err(e) => warn!("metrics write failed: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::UserCache;
    use crate::config::InfluxConfig;
    use crate::error::RpcError;
    use crate::resolver::Resolver;
    use crate::rpc::scripted::ScriptedRpc;

    fn healthy() -> ScriptedRpc {
        ScriptedRpc::new()
            .reply("OperServ UPTIME", "Registered accounts: 3")
            .reply("InfoServ LIST", "")
            .reply("ALIS LIST * -show t -min 3 -topic ?", "")
            .reply("BotServ BOTLIST", "")
    }

    fn policy() -> RefreshPolicy {
        RefreshPolicy {
            interval: Duration::from_millis(50),
            backoff: Duration::from_millis(5),
            max_startup_failures: 5,
            cycle_timeout: Duration::from_secs(5),
        }
    }

    fn scheduler(rpc: &Arc<ScriptedRpc>) -> (RefreshScheduler<ScriptedRpc>, Arc<SnapshotStore>) {
        let resolver = Resolver::new(Arc::clone(rpc), Arc::new(UserCache::default()));
        let builder = SnapshotBuilder::new(Arc::clone(rpc), resolver, Vec::new());
        let store = Arc::new(SnapshotStore::new());
        (
            RefreshScheduler::new(builder, Arc::clone(&store), policy()),
            store,
        )
    }

    #[test]
    fn test_policy_from_config_defaults() {
        let policy = RefreshPolicy::default();
        assert_eq!(policy.interval, Duration::from_secs(30));
        assert_eq!(policy.backoff, Duration::from_secs(15));
        assert_eq!(policy.max_startup_failures, 5);
        assert_eq!(policy.cycle_timeout, Duration::from_secs(120));
    }

    #[tokio::test]
    async fn test_startup_exhaustion_is_fatal() {
        let rpc = Arc::new(
            healthy().fail("OperServ UPTIME", RpcError::Transport("refused".into())),
        );
        let (scheduler, store) = scheduler(&rpc);

        let err = scheduler.run().await.unwrap_err();
        let RefreshError::StartupExhausted { attempts, .. } = err;
        assert_eq!(attempts, 5);
        assert_eq!(rpc.count("OperServ UPTIME"), 5);
        assert!(store.current().is_none());
    }

    #[tokio::test]
    async fn test_first_success_publishes_and_shutdown_stops() {
        let rpc = Arc::new(healthy());
        let (scheduler, store) = scheduler(&rpc);
        let scheduler = Arc::new(scheduler);
        let handle = scheduler.shutdown_handle();

        let task = {
            let scheduler = Arc::clone(&scheduler);
            tokio::spawn(async move { scheduler.run().await })
        };

        tokio::time::timeout(Duration::from_secs(2), store.wait_ready())
            .await
            .expect("first snapshot");
        assert_eq!(store.current().unwrap().account_count, 3);

        handle.shutdown();
        let result = tokio::time::timeout(Duration::from_secs(2), task)
            .await
            .expect("scheduler stops")
            .unwrap();
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_running_failure_keeps_previous_snapshot() {
        let rpc = Arc::new(healthy());
        let (scheduler, store) = scheduler(&rpc);
        let scheduler = Arc::new(scheduler);
        let handle = scheduler.shutdown_handle();

        let task = {
            let scheduler = Arc::clone(&scheduler);
            tokio::spawn(async move { scheduler.run().await })
        };

        store.wait_ready().await;
        rpc.set(
            "BotServ BOTLIST",
            Err(RpcError::Transport("connection reset".into())),
        );
        let generation = store.generation();

        // Several failing cycles, none fatal once running.
        tokio::time::sleep(Duration::from_millis(250)).await;
        assert!(rpc.count("OperServ UPTIME") > 2);
        assert_eq!(store.generation(), generation);
        assert_eq!(store.current().unwrap().account_count, 3);
        assert!(!task.is_finished());

        handle.shutdown();
        assert!(task.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_metrics_failure_is_not_a_cycle_failure() {
        let rpc = Arc::new(healthy());
        let sink = InfluxSink::from_config(&InfluxConfig {
            endpoint: "http://127.0.0.1:9".into(),
            database: "irc".into(),
            ..Default::default()
        })
        .unwrap()
        .unwrap();
        let (scheduler, store) = scheduler(&rpc);
        let scheduler = Arc::new(scheduler.with_metrics(sink));
        let handle = scheduler.shutdown_handle();

        let task = {
            let scheduler = Arc::clone(&scheduler);
            tokio::spawn(async move { scheduler.run().await })
        };

        tokio::time::timeout(Duration::from_secs(2), store.wait_ready())
            .await
            .expect("published despite metrics failure");

        handle.shutdown();
        assert!(task.await.unwrap().is_ok());
    }
}
