//! History-derived routing signals.
//!
//! Every lookup degrades to its quiet default (`false` / `0`) when the store
//! fails, so a broken database never blocks a suggestion.

use std::sync::Arc;

use crate::db::HistoryStore;
use crate::logging;

pub struct ContextGatekeeper {
    store: Arc<dyn HistoryStore>,
}

impl ContextGatekeeper {
    pub fn new(store: Arc<dyn HistoryStore>) -> Self {
        Self { store }
    }

    /// Any agent-routed message for the family in the last 24 hours.
    pub fn has_recent_conflict(&self, family_id: &str) -> bool {
        match self.store.recent_conflict_count(family_id) {
            Ok(count) => count > 0,
            Err(e) => {
                logging::log_storage(Some(family_id), &format!("recent conflict lookup failed: {e}"));
                false
            }
        }
    }

    /// Any feedback rated 2 or lower by the user in the last 7 days.
    pub fn has_negative_feedback(&self, user_id: &str) -> bool {
        match self.store.negative_feedback_count(user_id) {
            Ok(count) => count > 0,
            Err(e) => {
                logging::log_storage(None, &format!("feedback lookup failed for {user_id}: {e}"));
                false
            }
        }
    }

    /// Messages exchanged in the family over the last hour.
    pub fn conversation_depth(&self, family_id: &str) -> i64 {
        match self.store.conversation_depth(family_id) {
            Ok(depth) => depth,
            Err(e) => {
                logging::log_storage(Some(family_id), &format!("conversation depth lookup failed: {e}"));
                0
            }
        }
    }
}
