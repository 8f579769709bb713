// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Services RPC layer.
//!
//! # Architecture
//!
//! ```text
//! ServicesRpc Trait
//! +-- XmlRpcSession   (atheme.login + atheme.command over HTTP)
//! +-- ScriptedRpc     (canned replies, tests only)
//! ```
//!
//! Every call authenticates from scratch; sessions are never reused and calls
//! are never retried here. Retry is a refresh-cycle concern.

pub mod session;
pub mod xmlrpc;

#[cfg(test)]
pub(crate) mod scripted;

pub use session::XmlRpcSession;

use crate::error::RpcError;
use std::fmt;

/// Which credential pair a call authenticates with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Privilege {
    /// Administrative account (OperServ, full NickServ INFO).
    Admin,
    /// Restricted account used for public listings.
    User,
}

/// A services command: target service, verb and arguments.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Command {
    pub service: &'static str,
    pub verb: &'static str,
    pub args: Vec<String>,
}

impl Command {
    pub fn new(service: &'static str, verb: &'static str) -> Self {
        Self {
            service,
            verb,
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// `OperServ UPTIME`: registration and usage counters.
    pub fn uptime() -> Self {
        Self::new("OperServ", "UPTIME")
    }

    /// `InfoServ LIST`: network notices.
    pub fn news() -> Self {
        Self::new("InfoServ", "LIST")
    }

    /// `ALIS LIST * -show t -min 3 -topic ?`: channels with 3+ users and a topic.
    pub fn channel_list() -> Self {
        ["*", "-show", "t", "-min", "3", "-topic", "?"]
            .into_iter()
            .fold(Self::new("ALIS", "LIST"), |command, arg| command.arg(arg))
    }

    /// `BotServ BOTLIST`.
    pub fn bot_list() -> Self {
        Self::new("BotServ", "BOTLIST")
    }

    /// `ChanServ INFO <channel>`.
    pub fn channel_info(channel: &str) -> Self {
        Self::new("ChanServ", "INFO").arg(channel)
    }

    /// `NickServ INFO <nick>`.
    pub fn nick_info(nick: &str) -> Self {
        Self::new("NickServ", "INFO").arg(nick)
    }

    /// Positional XML-RPC parameters following the cookie, account and source.
    pub fn params(&self) -> impl Iterator<Item = &str> {
        [self.service, self.verb]
            .into_iter()
            .chain(self.args.iter().map(String::as_str))
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.service, self.verb)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Backend-agnostic interface to the services daemon.
pub trait ServicesRpc: Send + Sync {
    /// Authenticate with the credentials for `privilege`, run `command`, and
    /// return its text output.
    fn execute(
        &self,
        privilege: Privilege,
        command: &Command,
    ) -> impl std::future::Future<Output = Result<String, RpcError>> + Send;
}

/// Raw `INFO` output for a nick, or for a channel when `target` starts with `#`.
///
/// Uses the restricted credentials, as for any public lookup.
pub async fn whois<R: ServicesRpc>(rpc: &R, target: &str) -> Result<String, RpcError> {
    let command = if target.starts_with('#') {
        Command::channel_info(target)
    } else {
        Command::nick_info(target)
    };
    rpc.execute(Privilege::User, &command).await
}
