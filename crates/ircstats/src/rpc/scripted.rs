// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! In-memory `ServicesRpc` with canned replies, for tests.

use super::{Command, Privilege, ServicesRpc};
use crate::error::RpcError;
use parking_lot::Mutex;
use std::collections::HashMap;

/// Replies keyed by the command's display form (`"ChanServ INFO #rust"`).
///
/// Unscripted commands fail with a "not registered" fault, which is what the
/// daemon answers for unknown nicks and channels.
#[derive(Default)]
pub(crate) struct ScriptedRpc {
    replies: Mutex<HashMap<String, Result<String, RpcError>>>,
    calls: Mutex<Vec<(Privilege, String)>>,
}

impl ScriptedRpc {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn reply(self, command: &str, text: &str) -> Self {
        self.set(command, Ok(text.to_string()));
        self
    }

    pub(crate) fn fail(self, command: &str, error: RpcError) -> Self {
        self.set(command, Err(error));
        self
    }

    pub(crate) fn set(&self, command: &str, reply: Result<String, RpcError>) {
        self.replies.lock().insert(command.to_string(), reply);
    }

    pub(crate) fn calls(&self) -> Vec<(Privilege, String)> {
        self.calls.lock().clone()
    }

    pub(crate) fn count(&self, command: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|(_, c)| c == command)
            .count()
    }
}

impl ServicesRpc for ScriptedRpc {
    async fn execute(&self, privilege: Privilege, command: &Command) -> Result<String, RpcError> {
        let key = command.to_string();
        self.calls.lock().push((privilege, key.clone()));

        self.replies
            .lock()
            .get(&key)
            .cloned()
            .unwrap_or_else(|| {
                Err(RpcError::Fault {
                    code: 4,
                    message: format!("{} is not registered.", command.args.join(" ")),
                })
            })
    }
}
