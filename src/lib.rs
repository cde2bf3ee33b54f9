pub mod agent;
pub mod classifier;
pub mod config;
pub mod db;
pub mod error;
pub mod gatekeeper;
pub mod logging;
pub mod mock;
pub mod model;
pub mod openai;
pub mod orchestrator;
pub mod pipeline;
pub mod prompts;
pub mod router;
pub mod tools;
pub mod types;

#[cfg(test)]
mod test_utils;

use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub use classifier::{classify, Classification, MessageType};
pub use config::Config;
pub use db::{HistoryStore, NewFeedback, NewMessage, SqliteStore};
pub use error::{Error, Result};
pub use model::ModelClient;
pub use orchestrator::{Orchestrator, SuggestionRequest};
pub use router::RoutingDecision;
pub use types::{AiResult, Mode, Photo, Reasoning, Role, UserContext};

/// A suggestion plus the id of the message row it was stored under.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    /// `None` if the suggestion could not be recorded.
    pub message_id: Option<String>,
    pub result: AiResult,
}

/// The embedded core: one store, one orchestrator over it.
pub struct Wowli {
    store: Arc<SqliteStore>,
    orchestrator: Orchestrator,
}

impl Wowli {
    /// Open the database at `config.db_path` and wire the backends.
    pub fn open(config: &Config) -> Result<Self> {
        let store = Arc::new(SqliteStore::open(&config.db_path)?);
        Self::with_store(config, store)
    }

    pub fn with_store(config: &Config, store: Arc<SqliteStore>) -> Result<Self> {
        let orchestrator = Orchestrator::from_config(config, store.clone())?;
        Ok(Self { store, orchestrator })
    }

    pub fn store(&self) -> &SqliteStore {
        &self.store
    }

    /// Produce a suggestion and record the message with the mode that
    /// answered it, which later feeds the routing history.
    pub async fn suggest(&self, request: &SuggestionRequest) -> Result<Suggestion> {
        let result = self.orchestrator.handle(request).await?;

        let saved = self.store.save_message(&NewMessage {
            family_id: request.context.family_id.clone(),
            sender_id: request.context.user_id.clone(),
            image_path: request.photo.path.clone(),
            caption: Some(request.caption.clone()),
            ai_response: Some(result.suggestion.clone()),
            ai_mode: Some(result.mode),
            created_at: None,
        });

        let message_id = match saved {
            Ok(id) => Some(id),
            Err(e) => {
                logging::log_storage(
                    Some(&request.context.family_id),
                    &format!("could not record suggestion: {e}"),
                );
                None
            }
        };

        Ok(Suggestion { message_id, result })
    }

    /// Rate a suggestion, 1 (unhelpful) to 5.
    pub fn rate(&self, message_id: &str, user_id: &str, rating: i64, used_suggestion: bool) -> Result<String> {
        Ok(self.store.save_feedback(&NewFeedback {
            message_id: message_id.to_string(),
            user_id: user_id.to_string(),
            rating,
            used_suggestion,
            created_at: None,
        })?)
    }
}
