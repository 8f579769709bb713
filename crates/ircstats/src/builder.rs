// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Snapshot assembly.
//!
//! One [`SnapshotBuilder::build`] call is one refresh cycle. Stages run in a
//! fixed order, and a failed top-level listing aborts the whole cycle:
//!
//! ```text
//! OperServ UPTIME  -> counts
//! InfoServ LIST    -> notifications (authors resolved leniently)
//! ALIS LIST        -> channels (+ ChanServ INFO per channel, degradable)
//! BotServ BOTLIST  -> bots
//! ircops           -> operators (resolved strictly, skipped on failure)
//! ```

use crate::error::{BuildError, Stage};
use crate::extract::{self, ChannelRow, KvBlock, NotificationRow};
use crate::model::{Channel, Notification, Snapshot, User};
use crate::resolver::Resolver;
use crate::rpc::{Command, Privilege, ServicesRpc};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, warn};

/// Builds [`Snapshot`]s from a services connection.
pub struct SnapshotBuilder<R> {
    rpc: Arc<R>,
    resolver: Resolver<R>,
    irc_ops: Vec<String>,
}

impl<R: ServicesRpc> SnapshotBuilder<R> {
    pub fn new(rpc: Arc<R>, resolver: Resolver<R>, irc_ops: Vec<String>) -> Self {
        Self {
            rpc,
            resolver,
            irc_ops,
        }
    }

    /// Run one full refresh cycle.
    pub async fn build(&self) -> Result<Snapshot, BuildError> {
        let text = self
            .fetch(Stage::Statistics, Privilege::Admin, Command::uptime())
            .await?;
        let counts = extract::parse_network_counts(&text);

        let text = self
            .fetch(Stage::Notifications, Privilege::User, Command::news())
            .await?;
        let mut notifications = Vec::new();
        for row in extract::parse_notification_rows(&text) {
            notifications.push(self.notification(row).await);
        }

        let text = self
            .fetch(Stage::Channels, Privilege::User, Command::channel_list())
            .await?;
        let mut channels = Vec::new();
        for row in extract::parse_channel_rows(&text) {
            channels.push(self.channel(row).await);
        }
        // Stable: equal member counts keep listing order.
        channels.sort_by(|a, b| b.member_count.cmp(&a.member_count));

        let text = self
            .fetch(Stage::Bots, Privilege::User, Command::bot_list())
            .await?;
        let bots = extract::parse_bot_rows(&text);

        let irc_ops = self.operators().await;

        debug!(
            "built snapshot: {} notifications, {} channels, {} bots, {} operators",
            notifications.len(),
            channels.len(),
            bots.len(),
            irc_ops.len()
        );

        Ok(Snapshot {
            account_count: counts.accounts,
            nick_count: counts.nicks,
            channel_count: counts.channels,
            active_count: counts.active,
            generated_at: Utc::now(),
            notifications,
            channels,
            bots,
            irc_ops,
        })
    }

    async fn fetch(
        &self,
        stage: Stage,
        privilege: Privilege,
        command: Command,
    ) -> Result<String, BuildError> {
        self.rpc
            .execute(privilege, &command)
            .await
            .map_err(BuildError::fetch(stage))
    }

    async fn notification(&self, row: NotificationRow) -> Notification {
        Notification {
            id: row.id,
            author: self.resolver.resolve_lenient(&row.author).await,
            time: row.time,
            date: row.date,
            message: row.message,
        }
    }

    async fn channel(&self, row: ChannelRow) -> Channel {
        let last_modifier = self.resolver.resolve_lenient(&row.last_modifier).await;

        let info = match self
            .rpc
            .execute(Privilege::User, &Command::channel_info(&row.name))
            .await
        {
            Ok(text) => KvBlock::parse(&text),
            Err(e) => {
                warn!("channel info for {} unavailable: {}", row.name, e);
                KvBlock::default()
            }
        };

        let founder = match info.get_or_empty("Founder") {
            "" => None,
            nick => Some(self.resolver.resolve_lenient(nick).await),
        };

        Channel {
            name: row.name,
            member_count: row.member_count,
            topic: row.topic,
            last_modifier,
            founder,
            registered: extract::parse_services_time(info.get_or_empty("Registered")),
        }
    }

    async fn operators(&self) -> Vec<Arc<User>> {
        let mut operators = Vec::with_capacity(self.irc_ops.len());
        for nick in &self.irc_ops {
            match self.resolver.resolve(nick).await {
                Ok(user) => operators.push(user),
                Err(e) => warn!("skipping operator: {}", e),
            }
        }
        operators
    }
}
