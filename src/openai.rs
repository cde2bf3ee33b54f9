use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use crate::config::OpenAiConfig;
use crate::error::ModelError;
use crate::model::{
    ChatMessage, ChatRole, Completion, CompletionRequest, ContentPart, ModelClient,
    ToolCallRequest, ToolDefinition,
};

const REQUEST_TIMEOUT_SECS: u64 = 60; // 60 second timeout for API requests

// ============ Wire Types ============

#[derive(Debug, Serialize)]
struct WireMessage {
    role: &'static str,
    content: WireContent,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<WireToolCall>>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum WireContent {
    Text(String),
    Parts(Vec<WirePart>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WirePart {
    Text { text: String },
    ImageUrl { image_url: WireImageUrl },
}

#[derive(Debug, Serialize)]
struct WireImageUrl {
    url: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireToolCall {
    id: String,
    #[serde(rename = "type")]
    kind: String,
    function: WireFunction,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireFunction {
    name: String,
    /// JSON-encoded argument object.
    arguments: String,
}

#[derive(Debug, Serialize)]
struct WireTool<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    function: &'a ToolDefinition,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<WireTool<'a>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<&'static str>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
    tool_calls: Option<Vec<WireToolCall>>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    completion_tokens: Option<u32>,
}

// ============ Client ============

pub struct OpenAiClient {
    client: Client,
    api_key: String,
    model: String,
    url: String,
}

impl OpenAiClient {
    pub fn new(config: &OpenAiConfig) -> Result<Self, ModelError> {
        let api_key = config.api_key.clone().ok_or(ModelError::MissingApiKey)?;

        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            api_key,
            model: config.model.clone(),
            url: config.base_url.clone(),
        })
    }
}

#[async_trait]
impl ModelClient for OpenAiClient {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<Completion, ModelError> {
        let body = ChatCompletionRequest {
            model: &self.model,
            messages: to_wire_messages(&request.system, &request.messages),
            max_tokens: request.max_tokens,
            tools: request.tools.as_ref().map(|tools| {
                tools
                    .iter()
                    .map(|function| WireTool {
                        kind: "function",
                        function,
                    })
                    .collect()
            }),
            tool_choice: request.tools.as_ref().map(|_| "auto"),
        };

        let response = self
            .client
            .post(&self.url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ModelError::Http { status, body });
        }

        let completion: ChatCompletionResponse = response.json().await?;
        parse_completion(completion)
    }
}

// ============ Conversion ============

fn to_wire_messages(system: &str, messages: &[ChatMessage]) -> Vec<WireMessage> {
    let mut wire = Vec::with_capacity(messages.len() + 1);
    wire.push(WireMessage {
        role: "system",
        content: WireContent::Text(system.to_string()),
        tool_call_id: None,
        tool_calls: None,
    });

    for msg in messages {
        let role = match msg.role {
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
            ChatRole::Tool => "tool",
        };

        let has_image = msg
            .content
            .iter()
            .any(|p| matches!(p, ContentPart::ImageUrl(_)));
        // Empty string, not null, on assistant tool-call turns
        let content = if has_image {
            WireContent::Parts(
                msg.content
                    .iter()
                    .map(|part| match part {
                        ContentPart::Text(text) => WirePart::Text { text: text.clone() },
                        ContentPart::ImageUrl(url) => WirePart::ImageUrl {
                            image_url: WireImageUrl { url: url.clone() },
                        },
                    })
                    .collect(),
            )
        } else {
            WireContent::Text(msg.text())
        };

        let tool_calls = (!msg.tool_calls.is_empty()).then(|| {
            msg.tool_calls
                .iter()
                .map(|call| WireToolCall {
                    id: call.id.clone(),
                    kind: "function".to_string(),
                    function: WireFunction {
                        name: call.name.clone(),
                        arguments: call.arguments_text(),
                    },
                })
                .collect()
        });

        wire.push(WireMessage {
            role,
            content,
            tool_call_id: msg.tool_call_id.clone(),
            tool_calls,
        });
    }

    wire
}

fn parse_completion(response: ChatCompletionResponse) -> Result<Completion, ModelError> {
    let tokens = response.usage.and_then(|u| u.completion_tokens);
    let message = response
        .choices
        .into_iter()
        .next()
        .ok_or(ModelError::EmptyResponse)?
        .message;

    let tool_calls = message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .map(|call| {
            // Malformed arguments are kept verbatim; the tool registry
            // rejects them and tells the model.
            match serde_json::from_str(&call.function.arguments) {
                Ok(arguments) => ToolCallRequest::new(call.id, call.function.name, arguments),
                Err(e) => {
                    tracing::warn!(target: "wowli::agent", tool = %call.function.name, error = %e, "unparseable tool arguments");
                    ToolCallRequest {
                        id: call.id,
                        name: call.function.name,
                        arguments: Value::String(call.function.arguments.clone()),
                        raw_arguments: Some(call.function.arguments),
                    }
                }
            }
        })
        .collect();

    Ok(Completion {
        text: message.content.filter(|t| !t.trim().is_empty()),
        tool_calls,
        completion_tokens: tokens,
    })
}
