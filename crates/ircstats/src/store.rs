// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Latest published snapshot.
//!
//! Writers swap a whole `Arc<Snapshot>` in one atomic store; readers load the
//! pointer without locking and keep whatever snapshot they loaded for as long
//! as they hold it.

use crate::model::Snapshot;
use arc_swap::ArcSwapOption;
use std::sync::Arc;
use tokio::sync::watch;

/// Atomically replaceable holder of the current [`Snapshot`].
pub struct SnapshotStore {
    current: ArcSwapOption<Snapshot>,
    generation: watch::Sender<u64>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        let (generation, _) = watch::channel(0);
        Self {
            current: ArcSwapOption::empty(),
            generation,
        }
    }

    /// Replace the current snapshot.
    pub fn publish(&self, snapshot: Snapshot) {
        self.current.store(Some(Arc::new(snapshot)));
        self.generation.send_modify(|g| *g += 1);
    }

    /// Latest snapshot, or `None` before the first publication.
    pub fn current(&self) -> Option<Arc<Snapshot>> {
        self.current.load_full()
    }

    /// Number of snapshots published so far.
    pub fn generation(&self) -> u64 {
        *self.generation.borrow()
    }

    pub fn is_ready(&self) -> bool {
        self.generation() > 0
    }

    /// Resolve once the first snapshot has been published.
    pub async fn wait_ready(&self) {
        let mut rx = self.generation.subscribe();
        // The sender lives in `self`, so the channel cannot close here.
        let _ = rx.wait_for(|g| *g > 0).await;
    }
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}
