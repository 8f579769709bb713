// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Parsers for the semi-structured text returned by services commands.
//!
//! Services replies are human-oriented text, so every record shape gets its own
//! small line matcher. All parsers are tolerant:
//!
//! - a line that does not match the expected shape is skipped
//! - a numeric field that does not parse (overflow, format drift) becomes zero
//! - a timestamp that does not parse becomes `None`
//!
//! Zero-defaulting hides upstream format drift instead of reporting it. This
//! keeps a snapshot flowing when one field changes shape, but it also means a
//! renamed counter silently reads as 0.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::model::Bot;

static RE_CHANNEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(#\S+)\s+([0-9]+)\s+:(.*) \(([^)]+)\)$").expect("channel row regex")
});
static RE_BOT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^ *([0-9]+): ([^ ]+) \(([^@]+)@([^)]+)\) \[([^\]]+)\]$").expect("bot row regex")
});
static RE_NOTIFICATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([0-9]+): \[[^\]]+\] by (\S+) at (\S+) on ([^:]+): (.*)$")
        .expect("notification row regex")
});
static RE_ACCOUNT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Information on (\S+) \(account (\S+)\)").expect("account header regex")
});
static RE_METADATA: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^ *Metadata *: +([^=]+?) *= *(.*)$").expect("metadata line regex")
});

/// Timestamp layout used by services, e.g. `Jun 10 22:19:08 2015 -0400`.
const SERVICES_TIME_FORMAT: &str = "%b %d %H:%M:%S %Y %z";

// ============================================================================
// Key/value blocks
// ============================================================================

/// Ordered `key : value` pairs.
///
/// Iteration follows the position at which each key was first seen; a
/// repeated key overwrites the earlier value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KvBlock {
    entries: Vec<(String, String)>,
}

impl KvBlock {
    /// Parse every `key : value` line of `text`.
    ///
    /// The first colon splits key from value, both sides are trimmed, and
    /// lines without a colon or with an empty key are ignored.
    pub fn parse(text: &str) -> Self {
        let mut block = Self::default();
        for line in text.lines() {
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            block.insert(key.trim(), value.trim());
        }
        block
    }

    fn insert(&mut self, key: &str, value: &str) {
        if key.is_empty() {
            return;
        }
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value.to_string(),
            None => self.entries.push((key.to_string(), value.to_string())),
        }
    }

    /// Value for `key`, if present.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Value for `key`, or the empty string.
    pub fn get_or_empty(&self, key: &str) -> &str {
        self.get(key).unwrap_or_default()
    }

    /// Keys in first-seen order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }
}

// ============================================================================
// Field helpers
// ============================================================================

/// Parse a count, treating anything unparseable as zero.
pub fn parse_count<T: std::str::FromStr + Default>(value: &str) -> T {
    value.trim().parse().unwrap_or_default()
}

/// Parse a services timestamp.
///
/// Accepts `now` (any case) as the current time, and otherwise
/// `Jun 10 22:19:08 2015 -0400`, optionally followed by a relative age such as
/// `(2y 21w 4d ago)`. Returns `None` when the input does not parse.
pub fn parse_services_time(input: &str) -> Option<DateTime<Utc>> {
    let input = input.trim();
    if input.eq_ignore_ascii_case("now") {
        return Some(Utc::now());
    }

    let input = match input.find('(') {
        Some(idx) => input[..idx].trim(),
        None => input,
    };

    DateTime::parse_from_str(input, SERVICES_TIME_FORMAT)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

// ============================================================================
// OperServ UPTIME
// ============================================================================

/// Network-wide registration and usage counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NetworkCounts {
    pub accounts: u64,
    pub nicks: u64,
    pub channels: u64,
    pub active: u64,
}

/// Extract the counters from `OperServ UPTIME` output.
pub fn parse_network_counts(text: &str) -> NetworkCounts {
    let fields = KvBlock::parse(text);
    NetworkCounts {
        accounts: parse_count(fields.get_or_empty("Registered accounts")),
        nicks: parse_count(fields.get_or_empty("Registered nicknames")),
        channels: parse_count(fields.get_or_empty("Registered channels")),
        active: parse_count(fields.get_or_empty("Users currently online")),
    }
}

// ============================================================================
// Listings
// ============================================================================

/// One row of `ALIS LIST` output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelRow {
    pub name: String,
    pub member_count: u32,
    pub topic: String,
    pub last_modifier: String,
}

/// Parse `ALIS LIST ... -show t` rows: `#name  count  :topic (setter)`.
pub fn parse_channel_rows(text: &str) -> Vec<ChannelRow> {
    text.lines()
        .filter_map(|line| RE_CHANNEL.captures(line))
        .map(|caps| ChannelRow {
            name: caps[1].to_string(),
            member_count: parse_count(&caps[2]),
            topic: caps[3].to_string(),
            last_modifier: caps[4].to_string(),
        })
        .collect()
}

/// Parse `BotServ BOTLIST` rows: `1: nick (user@host) [description]`.
pub fn parse_bot_rows(text: &str) -> Vec<Bot> {
    text.lines()
        .filter_map(|line| RE_BOT.captures(line))
        .map(|caps| Bot {
            id: parse_count(&caps[1]),
            nick: caps[2].to_string(),
            user: caps[3].to_string(),
            host: caps[4].to_string(),
            description: caps[5].to_string(),
        })
        .collect()
}

/// One row of `InfoServ LIST` output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationRow {
    pub id: u32,
    pub author: String,
    pub time: String,
    pub date: String,
    pub message: String,
}

/// Parse `InfoServ LIST` rows:
/// `1: [Subject] by author at 12:00 on 01/02/2024: message`.
pub fn parse_notification_rows(text: &str) -> Vec<NotificationRow> {
    text.lines()
        .filter_map(|line| RE_NOTIFICATION.captures(line))
        .map(|caps| NotificationRow {
            id: parse_count(&caps[1]),
            author: caps[2].to_string(),
            time: caps[3].to_string(),
            date: caps[4].to_string(),
            message: caps[5].to_string(),
        })
        .collect()
}

// ============================================================================
// NickServ INFO
// ============================================================================

/// Nick and account named in the `Information on ...` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountHeader {
    pub nick: String,
    pub account: String,
}

/// Find `Information on nick (account acct)` anywhere in `text`.
pub fn parse_account_header(text: &str) -> Option<AccountHeader> {
    RE_ACCOUNT.captures(text).map(|caps| AccountHeader {
        nick: caps[1].to_string(),
        account: caps[2].to_string(),
    })
}

/// Collect `Metadata : KEY = value` lines into a block keyed by `KEY`.
pub fn parse_metadata(text: &str) -> KvBlock {
    let mut block = KvBlock::default();
    for caps in text.lines().filter_map(|line| RE_METADATA.captures(line)) {
        block.insert(caps[1].trim(), caps[2].trim());
    }
    block
}
