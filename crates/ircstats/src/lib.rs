// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! IRC services statistics collector
//!
//! Periodically queries an Atheme services daemon over XML-RPC and publishes
//! an immutable snapshot of network counters, notices, popular channels, bots
//! and staff profiles.
//!
//! # Features
//!
//! - **Snapshot refresh**: one full cycle every 30 s, atomically published
//! - **Profile cache**: LRU + TTL cache of `NickServ INFO` lookups
//! - **Graceful degradation**: unknown nicks become placeholders, failed
//!   cycles keep the previous snapshot
//! - **Metrics**: optional InfluxDB counters per snapshot
//!
//! # Quick Start
//!
//! ```bash
//! # Write a template, edit credentials, run
//! ircstats gen-config --output ircstats.toml
//! ircstats --config ircstats.toml
//! ```
//!
//! # Library use
//!
//! ```ignore
//! let session = Arc::new(XmlRpcSession::new(&config.rpc)?);
//! let resolver = Resolver::new(Arc::clone(&session), Arc::new(UserCache::default()));
//! let builder = SnapshotBuilder::new(session, resolver, config.ircops.clone());
//! let snapshot = builder.build().await?;
//! ```

pub mod builder;
pub mod cache;
pub mod config;
pub mod error;
pub mod extract;
pub mod http;
pub mod metrics;
pub mod model;
pub mod resolver;
pub mod rpc;
pub mod scheduler;
pub mod store;

pub use builder::SnapshotBuilder;
pub use cache::{CacheStats, UserCache};
pub use config::{Config, ConfigError};
pub use error::{BuildError, RefreshError, ResolveError, RpcError, Stage};
pub use metrics::InfluxSink;
pub use model::{Bot, Channel, Notification, Snapshot, User, UserMetadata};
pub use resolver::Resolver;
pub use rpc::{Command, Privilege, ServicesRpc, XmlRpcSession};
pub use scheduler::{RefreshPolicy, RefreshScheduler, RefreshState, ShutdownHandle};
pub use store::SnapshotStore;
