// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Error types shared across the refresh pipeline.
//!
//! Errors are layered the same way the pipeline is:
//!
//! ```text
//! RpcError      one XML-RPC call (transport, auth, fault)
//! ResolveError  one nickname lookup (never fatal to a cycle)
//! BuildError    one refresh cycle (previous snapshot stays current)
//! RefreshError  the scheduler itself (fatal to the process)
//! ```

use crate::model::User;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Substring the services daemon uses when a nick or channel has no registration.
const NOT_REGISTERED: &str = "not registered";

/// Errors from a single services RPC call.
#[derive(Debug, Clone, Error)]
pub enum RpcError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("services fault {code}: {message}")]
    Fault { code: i32, message: String },

    #[error("malformed response: {0}")]
    Malformed(String),
}

impl RpcError {
    /// True when the daemon reported that the target has no registration.
    pub fn is_not_registered(&self) -> bool {
        match self {
            RpcError::Fault { message, .. } => message.contains(NOT_REGISTERED),
            _ => false,
        }
    }
}

impl From<reqwest::Error> for RpcError {
    fn from(e: reqwest::Error) -> Self {
        RpcError::Transport(e.to_string())
    }
}

/// A failed nickname lookup.
///
/// Every variant carries a placeholder [`User`] holding only the nickname, so
/// aggregation call sites can keep the record that referenced it.
#[derive(Debug, Clone, Error)]
pub enum ResolveError {
    #[error("nick {} is not registered", .placeholder.nick)]
    NotRegistered { placeholder: Arc<User> },

    #[error("lookup of nick {} failed: {source}", .placeholder.nick)]
    Rpc {
        placeholder: Arc<User>,
        #[source]
        source: RpcError,
    },
}

impl ResolveError {
    pub(crate) fn from_rpc(nick: &str, source: RpcError) -> Self {
        let placeholder = Arc::new(User::placeholder(nick));
        if source.is_not_registered() {
            ResolveError::NotRegistered { placeholder }
        } else {
            ResolveError::Rpc {
                placeholder,
                source,
            }
        }
    }

    /// Minimal user standing in for the profile that could not be fetched.
    pub fn placeholder(&self) -> Arc<User> {
        match self {
            ResolveError::NotRegistered { placeholder } | ResolveError::Rpc { placeholder, .. } => {
                Arc::clone(placeholder)
            }
        }
    }

    /// Expected "no profile" outcome, as opposed to a transport or auth fault.
    pub fn is_not_registered(&self) -> bool {
        matches!(self, ResolveError::NotRegistered { .. })
    }
}

/// Listing fetched by a refresh cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Statistics,
    Notifications,
    Channels,
    Bots,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Statistics => "statistics",
            Stage::Notifications => "notifications",
            Stage::Channels => "channel list",
            Stage::Bots => "bot list",
        };
        f.write_str(name)
    }
}

/// Errors that abort a whole refresh cycle.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("failed to fetch {stage}: {source}")]
    Fetch {
        stage: Stage,
        #[source]
        source: RpcError,
    },

    #[error("refresh cycle timed out after {0:?}")]
    TimedOut(Duration),
}

impl BuildError {
    pub(crate) fn fetch(stage: Stage) -> impl FnOnce(RpcError) -> Self {
        move |source| BuildError::Fetch { stage, source }
    }
}

/// Errors that stop the refresh scheduler.
#[derive(Debug, Error)]
pub enum RefreshError {
    #[error("giving up after {attempts} failed refresh attempts before first snapshot: {last}")]
    StartupExhausted {
        attempts: u32,
        #[source]
        last: BuildError,
    },
}
