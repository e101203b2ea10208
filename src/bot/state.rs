//! Per-conversation repeat tracking.
//!
//! Each conversation owns a small `{last_trigger, repeat_count}` record kept in
//! a moka cache. Entries for different chats never contend; the read-modify-write
//! runs inside moka's per-key compute so bursts from one chat can't lose
//! updates. Idle conversations are evicted after a TTL and the total is capped
//! with LRU eviction, so a new chat is always admitted.

use std::fmt;
use std::future;
use std::time::Duration;

use moka::future::Cache;
use moka::ops::compute::Op;
use moka::policy::EvictionPolicy;
use tracing::debug;

use crate::bot::catalog::Trigger;

/// Telegram chat id, used as the only key into conversation state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConversationId(pub i64);

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationState {
    /// Most recently matched trigger. Unmatched chatter never lands here.
    pub last_trigger: Option<Trigger>,
    /// Consecutive requests for `last_trigger`, including the latest one.
    pub repeat_count: u32,
}

impl ConversationState {
    /// State after one more matched request for `trigger`.
    pub fn advance(&self, trigger: &Trigger) -> Self {
        let repeat_count = match &self.last_trigger {
            Some(last) if last == trigger => self.repeat_count.saturating_add(1),
            _ => 1,
        };
        Self {
            last_trigger: Some(trigger.clone()),
            repeat_count,
        }
    }
}

/// Concurrent store of conversation state with idle eviction.
#[derive(Clone)]
pub struct ConversationStore {
    cache: Cache<ConversationId, ConversationState>,
}

impl ConversationStore {
    pub fn new(idle_ttl: Duration, max_conversations: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_conversations)
            .eviction_policy(EvictionPolicy::lru())
            .time_to_idle(idle_ttl)
            .build();
        Self { cache }
    }

    /// Current state, or the default if the conversation is unknown.
    pub async fn get(&self, id: ConversationId) -> ConversationState {
        self.cache.get(&id).await.unwrap_or_default()
    }

    /// Record a matched request and return the post-update state.
    pub async fn update(&self, id: ConversationId, trigger: &Trigger) -> ConversationState {
        let mut next = ConversationState::default();
        self.cache
            .entry(id)
            .and_compute_with(|current| {
                let prior = current.map(|e| e.into_value()).unwrap_or_default();
                next = prior.advance(trigger);
                future::ready(Op::Put(next.clone()))
            })
            .await;

        debug!(
            "Conversation {}: {:?} x{}",
            id, trigger.as_str(), next.repeat_count
        );
        next
    }

    /// Approximate number of tracked conversations.
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }

    #[cfg(test)]
    pub(crate) async fn sync(&self) {
        self.cache.run_pending_tasks().await;
    }
}
