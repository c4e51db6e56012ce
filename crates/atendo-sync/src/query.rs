// SPDX-FileCopyrightText: 2026 Atendo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation listing: two-phase filtering, aggregate stats, caching.
//!
//! Structured filters (status, instance, assignee) are pushed down into SQL;
//! free-text search runs locally over the fetched page so that a keystroke
//! never costs a round trip. Stats are derived from the post-search result
//! set in a single pass, so the numbers always agree with the visible list.

use std::sync::Arc;

use atendo_core::{AtendoError, Conversation, ConversationFilter, ConversationStatus};
use atendo_storage::{Database, queries};
use serde::Serialize;
use tracing::debug;

use crate::cache::QueryCache;

/// Aggregate counters over a conversation result set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConversationStats {
    pub total: usize,
    pub active: usize,
    pub waiting: usize,
    pub unassigned: usize,
    pub with_unread: usize,
}

/// A filtered conversation list together with its stats.
#[derive(Debug, Clone, Serialize)]
pub struct ConversationPage {
    pub conversations: Vec<Conversation>,
    pub stats: ConversationStats,
}

/// Cache-backed conversation query service.
///
/// One instance serves all connected viewers; results are shared through
/// the [`QueryCache`] keyed by the full filter shape.
pub struct ConversationQueryService {
    db: Arc<Database>,
    cache: Arc<QueryCache<ConversationFilter, ConversationPage>>,
}

impl ConversationQueryService {
    pub fn new(db: Arc<Database>) -> Self {
        Self {
            db,
            cache: Arc::new(QueryCache::new()),
        }
    }

    /// The cache backing this service, for wiring up a feed listener.
    pub fn cache(&self) -> Arc<QueryCache<ConversationFilter, ConversationPage>> {
        Arc::clone(&self.cache)
    }

    /// List conversations matching `filter`, newest activity first.
    pub async fn list(
        &self,
        filter: &ConversationFilter,
    ) -> Result<Arc<ConversationPage>, AtendoError> {
        let db = Arc::clone(&self.db);
        let fetch_filter = filter.clone();
        self.cache
            .get_or_fetch(filter.clone(), move || {
                let db = Arc::clone(&db);
                let filter = fetch_filter.clone();
                async move {
                    let mut conversations =
                        queries::conversations::list_conversations(&db, &filter).await?;
                    if let Some(term) = filter.search.as_deref().filter(|s| !s.is_empty()) {
                        apply_search(&mut conversations, term);
                    }
                    let stats = compute_stats(&conversations);
                    debug!(
                        total = stats.total,
                        active = stats.active,
                        "conversation page fetched"
                    );
                    Ok(ConversationPage {
                        conversations,
                        stats,
                    })
                }
            })
            .await
    }

    /// Drop all cached pages so the next read hits storage.
    pub fn refresh(&self) {
        self.cache.invalidate_all();
    }
}

/// Retain only conversations matching the free-text search term.
///
/// Case-insensitive substring match over contact name, contact phone
/// number, and last message preview.
fn apply_search(conversations: &mut Vec<Conversation>, term: &str) {
    let needle = term.to_lowercase();
    conversations.retain(|conv| {
        let contact_match = conv.contact.as_ref().is_some_and(|c| {
            c.name.to_lowercase().contains(&needle) || c.phone_number.contains(&needle)
        });
        let preview_match = conv
            .last_message_preview
            .as_ref()
            .is_some_and(|p| p.to_lowercase().contains(&needle));
        contact_match || preview_match
    });
}

/// One pass over the result set; `Closed` and unknown statuses count only
/// toward the total.
fn compute_stats(conversations: &[Conversation]) -> ConversationStats {
    let mut stats = ConversationStats {
        total: conversations.len(),
        ..Default::default()
    };
    for conv in conversations {
        match conv.status() {
            ConversationStatus::Active => stats.active += 1,
            ConversationStatus::Waiting => stats.waiting += 1,
            ConversationStatus::Closed | ConversationStatus::Unknown => {}
        }
        if conv.assigned_to.is_none() {
            stats.unassigned += 1;
        }
        if conv.unread_count > 0 {
            stats.with_unread += 1;
        }
    }
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use atendo_core::ContactSummary;
    use proptest::prelude::*;

    fn conv(
        id: &str,
        status: &str,
        assigned_to: Option<&str>,
        unread: i64,
        contact_name: &str,
        preview: Option<&str>,
    ) -> Conversation {
        Conversation {
            id: id.to_string(),
            contact_id: format!("contact-{id}"),
            instance_id: "inst-1".to_string(),
            assigned_to: assigned_to.map(str::to_string),
            status: Some(status.to_string()),
            last_message_at: None,
            last_message_preview: preview.map(str::to_string),
            unread_count: unread,
            created_at: "2026-02-01T09:00:00.000Z".to_string(),
            contact: Some(ContactSummary {
                id: format!("contact-{id}"),
                name: contact_name.to_string(),
                phone_number: "+5511999990001".to_string(),
                avatar_url: None,
            }),
            instance: None,
            assigned_agent: None,
        }
    }

    #[test]
    fn stats_count_each_dimension_independently() {
        let conversations = vec![
            conv("c1", "active", Some("agent-1"), 3, "Maria", None),
            conv("c2", "waiting", None, 2, "João", None),
            conv("c3", "closed", Some("agent-2"), 0, "Pedro", None),
        ];
        let stats = compute_stats(&conversations);
        assert_eq!(
            stats,
            ConversationStats {
                total: 3,
                active: 1,
                waiting: 1,
                unassigned: 1,
                with_unread: 2,
            }
        );
    }

    #[test]
    fn stats_on_empty_set_are_zero() {
        assert_eq!(compute_stats(&[]), ConversationStats::default());
    }

    #[test]
    fn search_matches_name_phone_and_preview() {
        let mut by_name = vec![conv("c1", "active", None, 0, "Maria Silva", None)];
        apply_search(&mut by_name, "mArIa");
        assert_eq!(by_name.len(), 1);

        let mut by_phone = vec![conv("c1", "active", None, 0, "Maria Silva", None)];
        apply_search(&mut by_phone, "11999990001");
        assert_eq!(by_phone.len(), 1);

        let mut by_preview = vec![conv(
            "c1",
            "active",
            None,
            0,
            "Maria Silva",
            Some("Olá, preciso de ajuda"),
        )];
        apply_search(&mut by_preview, "ajuda");
        assert_eq!(by_preview.len(), 1);

        let mut no_match = vec![conv("c1", "active", None, 0, "Maria Silva", None)];
        apply_search(&mut no_match, "zzz");
        assert!(no_match.is_empty());
    }

    #[test]
    fn search_without_contact_falls_back_to_preview() {
        let mut conversations = vec![conv("c1", "active", None, 0, "x", Some("pedido 1234"))];
        conversations[0].contact = None;
        apply_search(&mut conversations, "1234");
        assert_eq!(conversations.len(), 1);

        apply_search(&mut conversations, "maria");
        assert!(conversations.is_empty());
    }

    proptest! {
        /// Searching always yields a subset of the input, preserves order,
        /// and every survivor actually matches the term.
        #[test]
        fn search_result_is_a_matching_subset(
            names in proptest::collection::vec("[a-zA-Z ]{0,12}", 0..8),
            term in "[a-zA-Z]{1,4}",
        ) {
            let original: Vec<Conversation> = names
                .iter()
                .enumerate()
                .map(|(i, name)| conv(&format!("c{i}"), "active", None, 0, name, None))
                .collect();

            let mut filtered = original.clone();
            apply_search(&mut filtered, &term);

            prop_assert!(filtered.len() <= original.len());
            let needle = term.to_lowercase();
            let mut cursor = 0usize;
            for kept in &filtered {
                // Order preserved: each survivor appears later in the input.
                let pos = original[cursor..]
                    .iter()
                    .position(|c| c.id == kept.id)
                    .expect("survivor must come from the input");
                cursor += pos + 1;
                let name = kept.contact.as_ref().unwrap().name.to_lowercase();
                prop_assert!(name.contains(&needle) || kept.contact.as_ref().unwrap().phone_number.contains(&needle));
            }
        }
    }
}
