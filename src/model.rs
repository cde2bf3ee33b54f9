//! Model-call seam shared by the pipeline and agent processors.
//!
//! Processors only talk to [`ModelClient`]; `OpenAiClient` is the live
//! implementation and tests plug in scripted doubles.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ModelError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
    Tool,
}

/// One piece of a multimodal user turn.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentPart {
    Text(String),
    /// `data:` or `https:` URL.
    ImageUrl(String),
}

/// A conversation turn. The system prompt travels separately in
/// [`CompletionRequest::system`].
#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: Vec<ContentPart>,
    /// Set on `tool` turns: the call this result answers.
    pub tool_call_id: Option<String>,
    /// Set on `assistant` turns that requested tools.
    pub tool_calls: Vec<ToolCallRequest>,
}

impl ChatMessage {
    pub fn user(parts: Vec<ContentPart>) -> Self {
        Self {
            role: ChatRole::User,
            content: parts,
            tool_call_id: None,
            tool_calls: Vec::new(),
        }
    }

    pub fn user_text(text: impl Into<String>) -> Self {
        Self::user(vec![ContentPart::Text(text.into())])
    }

    pub fn assistant_tool_calls(text: Option<String>, calls: Vec<ToolCallRequest>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: text.map(ContentPart::Text).into_iter().collect(),
            tool_call_id: None,
            tool_calls: calls,
        }
    }

    pub fn tool_result(call_id: impl Into<String>, result: &Value) -> Self {
        Self {
            role: ChatRole::Tool,
            content: vec![ContentPart::Text(result.to_string())],
            tool_call_id: Some(call_id.into()),
            tool_calls: Vec::new(),
        }
    }

    /// All text parts joined, images skipped.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|part| match part {
                ContentPart::Text(t) => Some(t.as_str()),
                ContentPart::ImageUrl(_) => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// A tool invocation requested by the model, arguments not yet validated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    pub id: String,
    pub name: String,
    pub arguments: Value,
    /// The model's argument text when it was not valid JSON, replayed as-is.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_arguments: Option<String>,
}

impl ToolCallRequest {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
            raw_arguments: None,
        }
    }

    /// Argument text to send back to the model in the transcript.
    pub fn arguments_text(&self) -> String {
        self.raw_arguments
            .clone()
            .unwrap_or_else(|| self.arguments.to_string())
    }
}

/// Function-style tool definition (OpenAI shape).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON schema for the arguments object.
    pub parameters: Value,
}

#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub system: String,
    pub messages: Vec<ChatMessage>,
    pub tools: Option<Vec<ToolDefinition>>,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Completion {
    pub text: Option<String>,
    pub tool_calls: Vec<ToolCallRequest>,
    pub completion_tokens: Option<u32>,
}

impl Completion {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn tools(calls: Vec<ToolCallRequest>) -> Self {
        Self {
            tool_calls: calls,
            ..Default::default()
        }
    }

    pub fn wants_tools(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// Anything that can answer a chat completion request.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Provider name for logging
    fn name(&self) -> &'static str;

    async fn complete(&self, request: CompletionRequest) -> Result<Completion, ModelError>;
}
