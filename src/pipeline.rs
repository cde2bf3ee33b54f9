//! Fast path: one model call (or one canned reply) per photo.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::sync::Arc;

use crate::error::{ModelError, Result};
use crate::logging;
use crate::mock::{MockCategory, MockResponder, PIPELINE_DELAY_MS};
use crate::model::{ChatMessage, CompletionRequest, ContentPart, ModelClient};
use crate::prompts;
use crate::types::{AiResult, Mode, Photo, UserContext};

const DEFAULT_MEDIA_TYPE: &str = "image/jpeg";

/// Where suggestions come from. Shared by both processors.
#[derive(Clone)]
pub enum Backend {
    Mock(Arc<MockResponder>),
    Live {
        client: Arc<dyn ModelClient>,
        max_tokens: u32,
    },
}

pub struct PipelineProcessor {
    backend: Backend,
}

impl PipelineProcessor {
    pub fn new(backend: Backend) -> Self {
        Self { backend }
    }

    pub async fn run(&self, photo: &Photo, caption: &str, ctx: &UserContext) -> Result<AiResult> {
        match &self.backend {
            Backend::Mock(responder) => Ok(mock_reply(responder, caption, ctx).await),
            Backend::Live { client, max_tokens } => {
                live_reply(client.as_ref(), *max_tokens, photo, caption, ctx).await
            }
        }
    }
}

/// Canned reply after a simulated 300-800 ms think.
async fn mock_reply(responder: &MockResponder, caption: &str, ctx: &UserContext) -> AiResult {
    let category = MockCategory::for_caption(caption);
    let delay = responder.delay(PIPELINE_DELAY_MS);
    tokio::time::sleep(delay).await;

    logging::log_pipeline(
        Some(&ctx.family_id),
        &format!("mock reply, category={}", category.as_str()),
    );
    AiResult::new(responder.pick(category), Mode::PipelineMock)
}

async fn live_reply(
    client: &dyn ModelClient,
    max_tokens: u32,
    photo: &Photo,
    caption: &str,
    ctx: &UserContext,
) -> Result<AiResult> {
    let request = CompletionRequest {
        system: prompts::pipeline_system_prompt(ctx.role),
        messages: vec![ChatMessage::user(user_parts(
            photo,
            prompts::pipeline_user_text(caption),
        ))],
        tools: None,
        max_tokens,
    };

    let completion = client.complete(request).await?;
    let suggestion = completion.text.ok_or(ModelError::EmptyResponse)?;

    logging::log_pipeline(
        Some(&ctx.family_id),
        &format!("{} reply, tokens={:?}", client.name(), completion.completion_tokens),
    );
    Ok(AiResult::new(suggestion, Mode::Pipeline).with_tokens(completion.completion_tokens))
}

/// Image first (when there is one), then the instruction text.
pub(crate) fn user_parts(photo: &Photo, text: String) -> Vec<ContentPart> {
    let mut parts = Vec::with_capacity(2);
    if let Some(url) = image_data_url(photo) {
        parts.push(ContentPart::ImageUrl(url));
    }
    parts.push(ContentPart::Text(text));
    parts
}

pub(crate) fn image_data_url(photo: &Photo) -> Option<String> {
    let data = photo.data.as_ref().filter(|d| !d.is_empty())?;
    let media_type = photo.media_type.as_deref().unwrap_or(DEFAULT_MEDIA_TYPE);
    Some(format!("data:{media_type};base64,{}", STANDARD.encode(data)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::model::Completion;
    use crate::test_utils::ScriptedModel;
    use crate::types::Role;

    fn ctx() -> UserContext {
        UserContext::new("kid", Role::Daughter, "fam-1")
    }

    fn live(model: Arc<ScriptedModel>) -> PipelineProcessor {
        PipelineProcessor::new(Backend::Live {
            client: model,
            max_tokens: 500,
        })
    }

    #[test]
    fn test_image_data_url() {
        let photo = Photo::from_bytes(vec![1, 2, 3], "image/png");
        assert_eq!(image_data_url(&photo).as_deref(), Some("data:image/png;base64,AQID"));

        let untyped = Photo {
            data: Some(vec![1, 2, 3]),
            ..Default::default()
        };
        assert!(image_data_url(&untyped).unwrap().starts_with("data:image/jpeg;base64,"));
        assert!(image_data_url(&Photo::default()).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_mock_food_reply() {
        let processor = PipelineProcessor::new(Backend::Mock(Arc::new(MockResponder::seeded(3))));
        let start = tokio::time::Instant::now();

        let result = processor.run(&Photo::default(), "今天吃了好吃的面", &ctx()).await.unwrap();

        assert_eq!(result.mode, Mode::PipelineMock);
        assert!(MockCategory::Food.responses().contains(&result.suggestion.as_str()));
        assert!(result.reasoning.is_none());
        assert!(start.elapsed().as_millis() >= 300);
    }

    #[tokio::test(start_paused = true)]
    async fn test_mock_generalized_accusation_reply() {
        let processor = PipelineProcessor::new(Backend::Mock(Arc::new(MockResponder::seeded(3))));
        let result = processor.run(&Photo::default(), "又在熬夜", &ctx()).await.unwrap();
        assert!(MockCategory::GenerationGap.responses().contains(&result.suggestion.as_str()));
    }

    #[tokio::test]
    async fn test_live_reply_sends_photo_and_returns_text() {
        let model = Arc::new(ScriptedModel::always(Completion {
            text: Some("这碗面看起来好香呀".to_string()),
            completion_tokens: Some(18),
            ..Default::default()
        }));
        let processor = live(model.clone());
        let photo = Photo::from_bytes(vec![0xff, 0xd8], "image/jpeg");

        let result = processor.run(&photo, "晚饭", &ctx()).await.unwrap();

        assert_eq!(result.suggestion, "这碗面看起来好香呀");
        assert_eq!(result.mode, Mode::Pipeline);
        assert_eq!(result.tokens, Some(18));

        let requests = model.requests.lock().unwrap();
        let request = &requests[0];
        assert!(request.tools.is_none());
        assert_eq!(request.max_tokens, 500);
        assert!(request.system.ends_with("当前用户：女儿"));
        let parts = &request.messages[0].content;
        assert!(matches!(&parts[0], ContentPart::ImageUrl(url) if url.starts_with("data:image/jpeg;base64,")));
        assert!(matches!(&parts[1], ContentPart::Text(text) if text.contains("\"晚饭\"")));
    }

    #[tokio::test]
    async fn test_live_failure_propagates() {
        let model = Arc::new(ScriptedModel::new(vec![Err(ModelError::Http {
            status: 500,
            body: "boom".to_string(),
        })]));

        let err = live(model.clone()).run(&Photo::default(), "晚饭", &ctx()).await.unwrap_err();

        assert!(matches!(err, Error::Model(ModelError::Http { status: 500, .. })));
        assert_eq!(model.request_count(), 1);
    }

    #[tokio::test]
    async fn test_live_without_text_is_empty_response() {
        let model = Arc::new(ScriptedModel::always(Completion::default()));
        let err = live(model).run(&Photo::default(), "晚饭", &ctx()).await.unwrap_err();
        assert!(matches!(err, Error::Model(ModelError::EmptyResponse)));
    }
}
