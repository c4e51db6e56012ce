// SPDX-FileCopyrightText: 2026 Atendo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Change feed: coarse row-change notifications and the cache-invalidating
//! listener.
//!
//! The feed is deliberately payload-blind. Publishers announce only which
//! table changed; subscribers never inspect row contents and re-derive any
//! visible state through fresh queries. A dropped or lagged notification
//! therefore costs a redundant refetch, never a correctness violation.

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::cache::QueryCache;

/// Default buffer size for the notification channel.
const DEFAULT_FEED_CAPACITY: usize = 256;

/// Tables whose changes are announced on the feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Conversations,
    Messages,
}

/// A coarse change notification: which table changed, nothing else.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableChange {
    pub table: Table,
}

/// Broadcast bus for [`TableChange`] notifications.
///
/// Cloning is cheap and all clones publish to the same set of subscribers.
/// Publishing with no subscribers attached is a no-op.
#[derive(Debug, Clone)]
pub struct ChangeFeed {
    tx: broadcast::Sender<TableChange>,
}

impl ChangeFeed {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Announce that rows in `table` changed.
    pub fn publish(&self, table: Table) {
        trace!(?table, "publishing table change");
        let _ = self.tx.send(TableChange { table });
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TableChange> {
        self.tx.subscribe()
    }

    /// Number of live subscribers, used by tests and shutdown diagnostics.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new(DEFAULT_FEED_CAPACITY)
    }
}

/// Background task that turns feed notifications into cache invalidations.
///
/// Every notification for a conversation-affecting table invalidates the
/// whole cache namespace. If the subscription lags and drops notifications,
/// the listener invalidates anyway, trading a redundant refetch for
/// guaranteed freshness. The task is aborted when the listener is dropped.
pub struct ChangeFeedListener {
    handle: JoinHandle<()>,
}

impl ChangeFeedListener {
    pub fn spawn<K, V>(feed: &ChangeFeed, cache: Arc<QueryCache<K, V>>) -> Self
    where
        K: std::hash::Hash + Eq + Clone + Send + Sync + 'static,
        V: Send + Sync + 'static,
    {
        let mut rx = feed.subscribe();
        let handle = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(change) => match change.table {
                        Table::Conversations | Table::Messages => {
                            trace!(table = ?change.table, "table changed, invalidating cache");
                            cache.invalidate_all();
                        }
                    },
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "change feed lagged, invalidating cache anyway");
                        cache.invalidate_all();
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        debug!("change feed closed, listener stopping");
                        break;
                    }
                }
            }
        });
        Self { handle }
    }

    /// True while the background task is still running.
    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }
}

impl Drop for ChangeFeedListener {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
