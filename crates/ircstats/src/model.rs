// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Snapshot data model.
//!
//! Everything here is immutable once built. Users are shared as `Arc<User>`
//! between the resolver cache and any number of published snapshots.

use chrono::{DateTime, Utc};
use md5::{Digest, Md5};
use serde::Serialize;
use std::fmt::Write;
use std::sync::Arc;
use url::Url;

const GRAVATAR_BASE: &str = "https://www.gravatar.com/avatar";
const GRAVATAR_PARAMS: &str = "d=identicon&s=300";

/// Free-form profile metadata set by the user through NickServ.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UserMetadata {
    pub url: Option<Url>,
    pub display_name: String,
    pub location: String,
    pub about: String,
}

/// A registered nickname and its account profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct User {
    pub nick: String,
    pub account: String,
    pub registered: Option<DateTime<Utc>>,
    pub last_seen: Option<DateTime<Utc>>,
    pub last_addr: String,
    pub real_addr: String,
    pub email: String,
    pub nicks: String,
    pub channels: String,
    pub last_quit: String,
    pub metadata: UserMetadata,
    pub avatar: String,
}

impl User {
    /// Minimal user carrying only a nickname, used when no profile is available.
    pub fn placeholder(nick: &str) -> Self {
        Self {
            nick: nick.to_string(),
            avatar: avatar_url(""),
            ..Default::default()
        }
    }

    /// True when this user only carries a nickname.
    pub fn is_placeholder(&self) -> bool {
        self.account.is_empty() && self.registered.is_none()
    }
}

/// Case-insensitive identity key of a nickname.
pub fn nick_key(nick: &str) -> String {
    nick.to_lowercase()
}

/// Gravatar identicon URL for an email address (generic identicon when empty).
pub fn avatar_url(email: &str) -> String {
    if email.is_empty() {
        return format!("{}?{}", GRAVATAR_BASE, GRAVATAR_PARAMS);
    }

    let digest = Md5::digest(email.as_bytes());
    let mut hex = String::with_capacity(digest.len() * 2);
    for byte in digest {
        let _ = write!(hex, "{:02x}", byte);
    }
    format!("{}/{}?{}", GRAVATAR_BASE, hex, GRAVATAR_PARAMS)
}

/// A registered channel with a visible topic.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Channel {
    pub name: String,
    pub member_count: u32,
    pub topic: String,
    /// Last user to set the topic.
    pub last_modifier: Arc<User>,
    pub founder: Option<Arc<User>>,
    pub registered: Option<DateTime<Utc>>,
}

/// A BotServ bot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Bot {
    pub id: u32,
    pub nick: String,
    pub user: String,
    pub host: String,
    pub description: String,
}

/// An InfoServ network notice.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub id: u32,
    pub author: Arc<User>,
    pub time: String,
    pub date: String,
    pub message: String,
}

/// One complete, immutable aggregate produced by a successful refresh cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub account_count: u64,
    pub nick_count: u64,
    pub channel_count: u64,
    pub active_count: u64,
    pub generated_at: DateTime<Utc>,
    pub notifications: Vec<Notification>,
    /// Sorted by descending member count, ties in listing order.
    pub channels: Vec<Channel>,
    pub bots: Vec<Bot>,
    pub irc_ops: Vec<Arc<User>>,
}
