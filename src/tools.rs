//! Tool registry for the agent loop.
//!
//! The set of tools is closed: a model request is parsed into a [`ToolCall`]
//! (name checked, arguments deserialized into typed structs) before anything
//! runs. Rejected requests become `{"error": ...}` results so the model can
//! correct itself; only storage failures escape as errors.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use thiserror::Error;

use crate::classifier::{detect_emotions, scan_sensitive_topics};
use crate::db::HistoryStore;
use crate::error::StoreError;
use crate::logging;
use crate::model::{ToolCallRequest, ToolDefinition};
use crate::types::UserContext;

const DEFAULT_HISTORY_LIMIT: usize = 5;
const MAX_HISTORY_LIMIT: usize = 20;

// ============ Tool Names ============

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolName {
    AnalyzeEmotion,
    GetConversationHistory,
    CheckSensitiveTopics,
    GetUserPreferences,
    GenerateResponse,
}

impl ToolName {
    pub const ALL: [ToolName; 5] = [
        ToolName::AnalyzeEmotion,
        ToolName::GetConversationHistory,
        ToolName::CheckSensitiveTopics,
        ToolName::GetUserPreferences,
        ToolName::GenerateResponse,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolName::AnalyzeEmotion => "analyze_emotion",
            ToolName::GetConversationHistory => "get_conversation_history",
            ToolName::CheckSensitiveTopics => "check_sensitive_topics",
            ToolName::GetUserPreferences => "get_user_preferences",
            ToolName::GenerateResponse => "generate_response",
        }
    }

    pub fn from_str(s: &str) -> Option<ToolName> {
        ToolName::ALL.into_iter().find(|t| t.as_str() == s)
    }
}

// ============ Typed Calls ============

/// Reply tone the model may ask for in `generate_response`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tone {
    #[serde(rename = "温暖", alias = "warm")]
    Warm,
    #[serde(rename = "轻松", alias = "relaxed")]
    Relaxed,
    #[serde(rename = "认真", alias = "serious")]
    Serious,
    #[serde(rename = "鼓励", alias = "encouraging")]
    Encouraging,
    #[serde(rename = "安慰", alias = "comforting")]
    Comforting,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
struct TextArgs {
    text: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
struct HistoryArgs {
    family_id: String,
    #[serde(default)]
    limit: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
struct PreferenceArgs {
    user_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponsePlan {
    pub tone: Tone,
    pub key_points: Vec<String>,
    #[serde(default)]
    pub avoid_topics: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ToolCall {
    AnalyzeEmotion { text: String },
    GetConversationHistory { limit: usize },
    CheckSensitiveTopics { text: String },
    GetUserPreferences { user_id: String },
    GenerateResponse(ResponsePlan),
}

#[derive(Debug, Error, PartialEq)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    Unknown(String),

    #[error("Invalid arguments for {tool}: {reason}")]
    InvalidArguments { tool: &'static str, reason: String },
}

impl ToolCall {
    pub fn name(&self) -> ToolName {
        match self {
            ToolCall::AnalyzeEmotion { .. } => ToolName::AnalyzeEmotion,
            ToolCall::GetConversationHistory { .. } => ToolName::GetConversationHistory,
            ToolCall::CheckSensitiveTopics { .. } => ToolName::CheckSensitiveTopics,
            ToolCall::GetUserPreferences { .. } => ToolName::GetUserPreferences,
            ToolCall::GenerateResponse(_) => ToolName::GenerateResponse,
        }
    }

    /// Validate a raw model request against the tool's argument shape.
    ///
    /// History lookups are pinned to the requesting family.
    pub fn parse(request: &ToolCallRequest, ctx: &UserContext) -> Result<ToolCall, ToolError> {
        let name = ToolName::from_str(&request.name)
            .ok_or_else(|| ToolError::Unknown(request.name.clone()))?;
        let invalid = |reason: String| ToolError::InvalidArguments {
            tool: name.as_str(),
            reason,
        };
        let args = request.arguments.clone();

        match name {
            ToolName::AnalyzeEmotion | ToolName::CheckSensitiveTopics => {
                let TextArgs { text } =
                    serde_json::from_value(args).map_err(|e| invalid(e.to_string()))?;
                Ok(if name == ToolName::AnalyzeEmotion {
                    ToolCall::AnalyzeEmotion { text }
                } else {
                    ToolCall::CheckSensitiveTopics { text }
                })
            }
            ToolName::GetConversationHistory => {
                let HistoryArgs { family_id, limit } =
                    serde_json::from_value(args).map_err(|e| invalid(e.to_string()))?;
                if family_id != ctx.family_id {
                    return Err(invalid(format!(
                        "family_id '{family_id}' is not the requesting family"
                    )));
                }
                let limit = limit.unwrap_or(DEFAULT_HISTORY_LIMIT).clamp(1, MAX_HISTORY_LIMIT);
                Ok(ToolCall::GetConversationHistory { limit })
            }
            ToolName::GetUserPreferences => {
                let PreferenceArgs { user_id } =
                    serde_json::from_value(args).map_err(|e| invalid(e.to_string()))?;
                Ok(ToolCall::GetUserPreferences { user_id })
            }
            ToolName::GenerateResponse => {
                let plan: ResponsePlan =
                    serde_json::from_value(args).map_err(|e| invalid(e.to_string()))?;
                Ok(ToolCall::GenerateResponse(plan))
            }
        }
    }
}

// ============ Definitions ============

static TOOL_DEFINITIONS: Lazy<Vec<ToolDefinition>> = Lazy::new(|| {
    vec![
        ToolDefinition {
            name: ToolName::AnalyzeEmotion.as_str().to_string(),
            description: "深度分析文字中的情绪和意图".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "text": { "type": "string", "description": "要分析的文字" }
                },
                "required": ["text"]
            }),
        },
        ToolDefinition {
            name: ToolName::GetConversationHistory.as_str().to_string(),
            description: "获取最近的对话历史，了解上下文".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "family_id": { "type": "string" },
                    "limit": { "type": "number", "description": "获取条数，默认5" }
                },
                "required": ["family_id"]
            }),
        },
        ToolDefinition {
            name: ToolName::CheckSensitiveTopics.as_str().to_string(),
            description: "检查是否涉及敏感话题".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "text": { "type": "string" }
                },
                "required": ["text"]
            }),
        },
        ToolDefinition {
            name: ToolName::GetUserPreferences.as_str().to_string(),
            description: "获取用户的沟通偏好".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "user_id": { "type": "string" }
                },
                "required": ["user_id"]
            }),
        },
        ToolDefinition {
            name: ToolName::GenerateResponse.as_str().to_string(),
            description: "基于分析结果，生成最终回复".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "tone": {
                        "type": "string",
                        "enum": ["温暖", "轻松", "认真", "鼓励", "安慰"],
                        "description": "回复的语气"
                    },
                    "key_points": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "回复要包含的要点"
                    },
                    "avoid_topics": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "需要避免的话题"
                    }
                },
                "required": ["tone", "key_points"]
            }),
        },
    ]
});

// ============ Registry ============

pub struct ToolRegistry {
    store: Arc<dyn HistoryStore>,
}

impl ToolRegistry {
    pub fn new(store: Arc<dyn HistoryStore>) -> Self {
        Self { store }
    }

    pub fn definitions(&self) -> &'static [ToolDefinition] {
        &TOOL_DEFINITIONS
    }

    /// Parse and run one model request. Validation problems come back as an
    /// error payload for the model, not as `Err`.
    pub fn dispatch(&self, request: &ToolCallRequest, ctx: &UserContext) -> Result<Value, StoreError> {
        match ToolCall::parse(request, ctx) {
            Ok(call) => self.execute(&call, ctx),
            Err(e) => {
                logging::log_tool(Some(&ctx.family_id), &format!("rejected tool call: {e}"));
                Ok(json!({ "error": e.to_string() }))
            }
        }
    }

    pub fn execute(&self, call: &ToolCall, ctx: &UserContext) -> Result<Value, StoreError> {
        let result = match call {
            ToolCall::AnalyzeEmotion { text } => {
                let report = detect_emotions(text);
                json!({
                    "primary_emotion": report.primary_emotion,
                    "secondary_emotion": report.secondary_emotion,
                    "intensity": report.intensity,
                    "needs_care": report.needs_care,
                })
            }
            ToolCall::GetConversationHistory { limit } => {
                let entries = self.store.recent_messages(&ctx.family_id, *limit)?;
                Value::Array(
                    entries
                        .into_iter()
                        .map(|m| {
                            json!({
                                "sender": m.sender_role,
                                "caption": m.caption,
                                "time": m.created_at,
                            })
                        })
                        .collect(),
                )
            }
            ToolCall::CheckSensitiveTopics { text } => {
                let found = scan_sensitive_topics(text);
                json!({
                    "hasSensitive": found.has_sensitive,
                    "categories": found.categories,
                    "recommendation": found.recommendation,
                })
            }
            // No preference learning yet; every user gets the same profile.
            ToolCall::GetUserPreferences { .. } => json!({
                "preferred_tone": "温暖",
                "avoid_directness": true,
                "likes_emoji": false,
                "response_length": "short",
            }),
            ToolCall::GenerateResponse(plan) => json!({
                "ready": true,
                "params": plan,
            }),
        };

        Ok(result)
    }
}
