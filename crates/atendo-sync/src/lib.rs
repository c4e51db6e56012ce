// SPDX-FileCopyrightText: 2026 Atendo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Real-time conversation synchronization and assignment layer.
//!
//! Keeps the conversation list, unread counts, and message ordering
//! consistent across concurrently-connected viewers:
//!
//! - [`ChangeFeed`]: broadcast bus of "row changed" notifications.
//! - [`ChangeFeedListener`]: per-session subscription that invalidates the
//!   query cache on any notification, payload-blind.
//! - [`QueryCache`]: filter-keyed result cache with single-flight
//!   de-duplication and namespace-wide generation invalidation.
//! - [`ConversationQueryService`]: filtered listing with joined summaries,
//!   local free-text search, and one-pass aggregate statistics.
//! - [`AssignmentService`]: last-write-wins assignment/transfer with an
//!   audit reason and downstream notification.

pub mod assignment;
pub mod cache;
pub mod feed;
pub mod query;

pub use assignment::AssignmentService;
pub use cache::QueryCache;
pub use feed::{ChangeFeed, ChangeFeedListener, Table, TableChange};
pub use query::{ConversationPage, ConversationQueryService, ConversationStats};
