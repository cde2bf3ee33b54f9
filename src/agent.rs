//! Careful path: a bounded tool-using loop for sensitive or tense exchanges.
//!
//! Each iteration sends the whole transcript, including earlier tool
//! results, back to the model. The loop ends on the first plain-text answer;
//! if the model is still asking for tools after [`MAX_ITERATIONS`] rounds the
//! processor gives up gracefully with [`FALLBACK_SUGGESTION`].

use std::sync::Arc;

use crate::classifier::detect_emotions;
use crate::db::HistoryStore;
use crate::error::Result;
use crate::logging;
use crate::mock::{MockCategory, MockResponder, AGENT_DELAY_MS};
use crate::model::{ChatMessage, CompletionRequest, ModelClient};
use crate::pipeline::{user_parts, Backend};
use crate::prompts;
use crate::tools::{ToolName, ToolRegistry};
use crate::types::{AiResult, Mode, Photo, Reasoning, UserContext};

pub const MAX_ITERATIONS: u32 = 5;
pub const FALLBACK_SUGGESTION: &str = "让 Wowli 想想怎么说...";
/// Used when the model reports no usage.
const ESTIMATED_TOKENS_PER_ITERATION: u32 = 500;

const MOCK_ITERATIONS: u32 = 2;
const MOCK_TOOLS: [ToolName; 3] = [
    ToolName::AnalyzeEmotion,
    ToolName::CheckSensitiveTopics,
    ToolName::GenerateResponse,
];

pub struct AgentProcessor {
    backend: Backend,
    tools: ToolRegistry,
}

impl AgentProcessor {
    pub fn new(backend: Backend, store: Arc<dyn HistoryStore>) -> Self {
        Self {
            backend,
            tools: ToolRegistry::new(store),
        }
    }

    pub async fn run(&self, photo: &Photo, caption: &str, ctx: &UserContext) -> Result<AiResult> {
        match &self.backend {
            Backend::Mock(responder) => Ok(self.mock_run(responder, caption, ctx).await),
            Backend::Live { client, max_tokens } => {
                self.live_run(client.as_ref(), *max_tokens, photo, caption, ctx).await
            }
        }
    }

    async fn live_run(
        &self,
        client: &dyn ModelClient,
        max_tokens: u32,
        photo: &Photo,
        caption: &str,
        ctx: &UserContext,
    ) -> Result<AiResult> {
        let family = Some(ctx.family_id.as_str());
        let system = prompts::agent_system_prompt(ctx);
        let definitions = self.tools.definitions().to_vec();
        let mut messages = vec![ChatMessage::user(user_parts(
            photo,
            prompts::agent_user_text(caption),
        ))];
        let mut used_tools: Vec<String> = Vec::new();
        let mut reported_tokens: Option<u32> = None;

        for iteration in 1..=MAX_ITERATIONS {
            let completion = client
                .complete(CompletionRequest {
                    system: system.clone(),
                    messages: messages.clone(),
                    tools: Some(definitions.clone()),
                    max_tokens,
                })
                .await?;

            if let Some(tokens) = completion.completion_tokens {
                reported_tokens = Some(reported_tokens.unwrap_or(0) + tokens);
            }

            if completion.wants_tools() {
                messages.push(ChatMessage::assistant_tool_calls(
                    completion.text.clone(),
                    completion.tool_calls.clone(),
                ));
                for call in &completion.tool_calls {
                    tracing::debug!(
                        target: "wowli::tool",
                        family = %ctx.family_id,
                        tool = %call.name,
                        iteration,
                        "tool call"
                    );
                    used_tools.push(call.name.clone());
                    let result = self.tools.dispatch(call, ctx)?;
                    messages.push(ChatMessage::tool_result(call.id.clone(), &result));
                }
                continue;
            }

            match completion.text {
                Some(text) => {
                    logging::log_agent(
                        family,
                        &format!("answered after {iteration} iteration(s), tools={used_tools:?}"),
                    );
                    let tokens = reported_tokens.unwrap_or(iteration * ESTIMATED_TOKENS_PER_ITERATION);
                    return Ok(AiResult::new(text, Mode::Agent)
                        .with_reasoning(Reasoning {
                            iterations: iteration,
                            used_tools,
                            emotion_detected: None,
                        })
                        .with_tokens(Some(tokens)));
                }
                None => logging::log_agent(family, &format!("iteration {iteration} returned nothing, retrying")),
            }
        }

        logging::log_agent(family, "iteration cap reached, using fallback");
        let tokens = reported_tokens.unwrap_or(MAX_ITERATIONS * ESTIMATED_TOKENS_PER_ITERATION);
        Ok(AiResult::new(FALLBACK_SUGGESTION, Mode::Agent)
            .with_reasoning(Reasoning {
                iterations: MAX_ITERATIONS,
                used_tools,
                emotion_detected: None,
            })
            .with_tokens(Some(tokens)))
    }

    async fn mock_run(&self, responder: &MockResponder, caption: &str, ctx: &UserContext) -> AiResult {
        let emotion = detect_emotions(caption);
        let category = if emotion.needs_care {
            MockCategory::Sensitive
        } else {
            MockCategory::Normal
        };
        let delay = responder.delay(AGENT_DELAY_MS);
        tokio::time::sleep(delay).await;

        logging::log_agent(
            Some(&ctx.family_id),
            &format!(
                "mock reply, emotion={}, category={}",
                emotion.primary_emotion.as_str(),
                category.as_str()
            ),
        );
        AiResult::new(responder.pick(category), Mode::AgentMock).with_reasoning(Reasoning {
            iterations: MOCK_ITERATIONS,
            used_tools: MOCK_TOOLS.iter().map(|t| t.as_str().to_string()).collect(),
            emotion_detected: Some(emotion.primary_emotion.as_str().to_string()),
        })
    }
}
