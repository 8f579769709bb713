// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Nickname to profile resolution, backed by [`UserCache`].

use crate::cache::UserCache;
use crate::error::ResolveError;
use crate::extract::{self, KvBlock};
use crate::model::{avatar_url, nick_key, User, UserMetadata};
use crate::rpc::{Command, Privilege, ServicesRpc};
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;

/// Suffix services append to emails the owner chose to hide.
const HIDDEN_SUFFIX: &str = " (hidden)";

/// Resolves nicknames into [`User`] profiles through `NickServ INFO`.
pub struct Resolver<R> {
    rpc: Arc<R>,
    cache: Arc<UserCache>,
}

impl<R> Clone for Resolver<R> {
    fn clone(&self) -> Self {
        Self {
            rpc: Arc::clone(&self.rpc),
            cache: Arc::clone(&self.cache),
        }
    }
}

impl<R: ServicesRpc> Resolver<R> {
    pub fn new(rpc: Arc<R>, cache: Arc<UserCache>) -> Self {
        Self { rpc, cache }
    }

    /// Resolve `nick`, serving unexpired cached profiles without a call.
    pub async fn resolve(&self, nick: &str) -> Result<Arc<User>, ResolveError> {
        let key = nick_key(nick);

        if let Some(user) = self.cache.get(&key) {
            debug!("user cache hit: {}", key);
            return Ok(user);
        }
        debug!("user cache miss: {}", key);

        let text = self
            .rpc
            .execute(Privilege::Admin, &Command::nick_info(nick))
            .await
            .map_err(|e| ResolveError::from_rpc(nick, e))?;

        let user = Arc::new(user_from_info(nick, &text));
        self.cache.insert(&key, Arc::clone(&user));
        Ok(user)
    }

    /// Resolve `nick`, falling back to a nickname-only placeholder on failure.
    pub async fn resolve_lenient(&self, nick: &str) -> Arc<User> {
        match self.resolve(nick).await {
            Ok(user) => user,
            Err(e) => {
                if e.is_not_registered() {
                    debug!("{}", e);
                } else {
                    warn!("{}", e);
                }
                e.placeholder()
            }
        }
    }
}

/// Build a profile from `NickServ INFO` output.
fn user_from_info(requested: &str, text: &str) -> User {
    let fields = KvBlock::parse(text);
    let meta = extract::parse_metadata(text);
    let header = extract::parse_account_header(text);

    let (nick, account) = match header {
        Some(h) => (h.nick, h.account),
        None => (requested.to_string(), String::new()),
    };

    let email = fields.get_or_empty("Email");
    let email = email.strip_suffix(HIDDEN_SUFFIX).unwrap_or(email).trim();

    User {
        nick,
        account,
        registered: extract::parse_services_time(fields.get_or_empty("Registered")),
        last_seen: extract::parse_services_time(fields.get_or_empty("Last seen")),
        last_addr: fields.get_or_empty("Last addr").to_string(),
        real_addr: fields.get_or_empty("Real addr").to_string(),
        email: email.to_string(),
        nicks: fields.get_or_empty("Nicks").to_string(),
        channels: fields.get_or_empty("Channels").to_string(),
        last_quit: fields.get_or_empty("Last quit").to_string(),
        metadata: UserMetadata {
            url: meta.get("URL").and_then(|u| Url::parse(u).ok()),
            display_name: meta.get_or_empty("DISPLAY").to_string(),
            location: meta.get_or_empty("LOCATION").to_string(),
            about: meta.get_or_empty("ABOUT").to_string(),
        },
        avatar: avatar_url(email),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RpcError;
    use crate::rpc::scripted::ScriptedRpc;

    const ALICE_INFO: &str = "\
Information on Alice (account alice):
Registered : Jun 10 22:19:08 2015 -0400 (2y 21w 4d ago)
Last addr  : ~alice@example.net
Real addr  : ~alice@203.0.113.7
Last seen  : now
Nicks      : alice alice_
Channels   : @#rust +#ops
Email      : test@example.com (hidden)
Last quit  : Ping timeout
Metadata   : URL = https://alice.example.net/
Metadata   : DISPLAY = Alice L.
Metadata   : LOCATION = Lisbon
Metadata   : ABOUT = hacks on things
*** End of Info ***";

    fn resolver(rpc: ScriptedRpc) -> (Resolver<ScriptedRpc>, Arc<ScriptedRpc>, Arc<UserCache>) {
        let rpc = Arc::new(rpc);
        let cache = Arc::new(UserCache::default());
        let resolver = Resolver::new(Arc::clone(&rpc), Arc::clone(&cache));
        (resolver, rpc, cache)
    }

    #[tokio::test]
    async fn test_resolve_populates_profile() {
        let (resolver, rpc, _) = resolver(ScriptedRpc::new().reply("NickServ INFO alice", ALICE_INFO));

        let user = resolver.resolve("alice").await.unwrap();
        assert_eq!(user.nick, "Alice");
        assert_eq!(user.account, "alice");
        assert!(user.registered.is_some());
        assert!(user.last_seen.is_some());
        assert_eq!(user.last_addr, "~alice@example.net");
        assert_eq!(user.real_addr, "~alice@203.0.113.7");
        assert_eq!(user.email, "test@example.com");
        assert_eq!(user.nicks, "alice alice_");
        assert_eq!(user.channels, "@#rust +#ops");
        assert_eq!(user.last_quit, "Ping timeout");
        assert_eq!(
            user.metadata.url.as_ref().map(Url::as_str),
            Some("https://alice.example.net/")
        );
        assert_eq!(user.metadata.display_name, "Alice L.");
        assert_eq!(user.metadata.location, "Lisbon");
        assert_eq!(user.metadata.about, "hacks on things");
        assert!(user.avatar.contains("55502f40dc8b7c769880b10874abc9d0"));
        assert!(!user.is_placeholder());

        assert_eq!(rpc.calls(), vec![(Privilege::Admin, "NickServ INFO alice".to_string())]);
    }

    #[tokio::test]
    async fn test_resolve_is_cached_case_insensitively() {
        let (resolver, rpc, cache) = resolver(
            ScriptedRpc::new()
                .reply("NickServ INFO alice", ALICE_INFO)
                .reply("NickServ INFO ALICE", ALICE_INFO),
        );

        let first = resolver.resolve("alice").await.unwrap();
        let second = resolver.resolve("ALICE").await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(rpc.calls().len(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_header_falls_back_to_requested_nick() {
        let (resolver, _, _) = resolver(
            ScriptedRpc::new().reply("NickServ INFO Bob", "Registered : now\nEmail : bob@example.org"),
        );

        let user = resolver.resolve("Bob").await.unwrap();
        assert_eq!(user.nick, "Bob");
        assert!(user.account.is_empty());
        assert_eq!(user.email, "bob@example.org");
        assert!(user.metadata.url.is_none());
    }

    #[tokio::test]
    async fn test_unregistered_nick_yields_placeholder() {
        let (resolver, _, cache) = resolver(ScriptedRpc::new());

        let err = resolver.resolve("Ghost").await.unwrap_err();
        assert!(err.is_not_registered());
        assert_eq!(err.placeholder().nick, "Ghost");

        let user = resolver.resolve_lenient("Ghost").await;
        assert_eq!(user.nick, "Ghost");
        assert!(user.is_placeholder());
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_transport_failure_is_not_fatal() {
        let (resolver, _, _) = resolver(ScriptedRpc::new().fail(
            "NickServ INFO alice",
            RpcError::Transport("connection reset".into()),
        ));

        let err = resolver.resolve("alice").await.unwrap_err();
        assert!(matches!(err, ResolveError::Rpc { .. }));

        let user = resolver.resolve_lenient("alice").await;
        assert_eq!(user.nick, "alice");
        assert!(user.is_placeholder());
    }

    #[test]
    fn test_unparseable_url_is_dropped() {
        let user = user_from_info("x", "Metadata : URL = not a url");
        assert!(user.metadata.url.is_none());
    }
}
