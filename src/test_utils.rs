//! Test doubles for the storage and model seams.

use async_trait::async_trait;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use crate::db::{HistoryEntry, HistoryStore};
use crate::error::{ModelError, StoreError};
use crate::model::{Completion, CompletionRequest, ModelClient, ToolCallRequest};

/// Returns the same counts for every id.
#[derive(Default)]
pub struct FixedStore {
    pub conflicts: i64,
    pub negative_feedback: i64,
    pub depth: i64,
    pub history: Vec<HistoryEntry>,
}

impl HistoryStore for FixedStore {
    fn recent_conflict_count(&self, _family_id: &str) -> Result<i64, StoreError> {
        Ok(self.conflicts)
    }

    fn negative_feedback_count(&self, _user_id: &str) -> Result<i64, StoreError> {
        Ok(self.negative_feedback)
    }

    fn conversation_depth(&self, _family_id: &str) -> Result<i64, StoreError> {
        Ok(self.depth)
    }

    fn recent_messages(&self, _family_id: &str, limit: usize) -> Result<Vec<HistoryEntry>, StoreError> {
        Ok(self.history.iter().take(limit).cloned().collect())
    }
}

/// Every read fails.
pub struct FailingStore;

impl HistoryStore for FailingStore {
    fn recent_conflict_count(&self, _family_id: &str) -> Result<i64, StoreError> {
        Err(StoreError::Unavailable("disk gone".to_string()))
    }

    fn negative_feedback_count(&self, _user_id: &str) -> Result<i64, StoreError> {
        Err(StoreError::Unavailable("disk gone".to_string()))
    }

    fn conversation_depth(&self, _family_id: &str) -> Result<i64, StoreError> {
        Err(StoreError::Unavailable("disk gone".to_string()))
    }

    fn recent_messages(&self, _family_id: &str, _limit: usize) -> Result<Vec<HistoryEntry>, StoreError> {
        Err(StoreError::Unavailable("disk gone".to_string()))
    }
}

/// Plays back queued completions; once the queue is empty it repeats the
/// fallback (if any) or fails.
pub struct ScriptedModel {
    queue: Mutex<VecDeque<Result<Completion, ModelError>>>,
    fallback: Option<Completion>,
    pub requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedModel {
    pub fn new(script: Vec<Result<Completion, ModelError>>) -> Self {
        Self {
            queue: Mutex::new(script.into()),
            fallback: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn always(completion: Completion) -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            fallback: Some(completion),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl ModelClient for ScriptedModel {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<Completion, ModelError> {
        self.requests.lock().unwrap().push(request);
        if let Some(next) = self.queue.lock().unwrap().pop_front() {
            return next;
        }
        self.fallback.clone().ok_or(ModelError::EmptyResponse)
    }
}

/// Never answers within any sane timeout.
pub struct HangingModel;

#[async_trait]
impl ModelClient for HangingModel {
    fn name(&self) -> &'static str {
        "hanging"
    }

    async fn complete(&self, _request: CompletionRequest) -> Result<Completion, ModelError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Err(ModelError::Transport("gave up".to_string()))
    }
}

pub fn tool_request(id: &str, name: &str, text: &str) -> ToolCallRequest {
    ToolCallRequest::new(id, name, json!({ "text": text }))
}
