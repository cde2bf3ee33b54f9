use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use crate::agent::AgentProcessor;
use crate::config::Config;
use crate::db::HistoryStore;
use crate::error::{Error, Result};
use crate::logging;
use crate::mock::MockResponder;
use crate::model::ModelClient;
use crate::openai::OpenAiClient;
use crate::pipeline::{Backend, PipelineProcessor};
use crate::router::{PathRouter, RoutingDecision};
use crate::types::{AiResult, Photo, UserContext};

// ============ Request Envelope ============

/// Everything one suggestion request carries.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionRequest {
    #[serde(default)]
    pub photo: Photo,
    pub caption: String,
    pub context: UserContext,
}

// ============ Orchestrator ============

/// Single entry point: validate, route, run one processor, stamp the duration.
///
/// Shareable behind an `Arc`; every call is independent.
pub struct Orchestrator {
    router: PathRouter,
    pipeline: PipelineProcessor,
    agent: AgentProcessor,
    timeout: Duration,
}

impl Orchestrator {
    pub fn new(
        pipeline: Backend,
        agent: Backend,
        store: Arc<dyn HistoryStore>,
        timeout: Duration,
    ) -> Self {
        Self {
            router: PathRouter::new(store.clone()),
            pipeline: PipelineProcessor::new(pipeline),
            agent: AgentProcessor::new(agent, store),
            timeout,
        }
    }

    /// Canned replies for both paths, sharing one random source.
    pub fn mock(store: Arc<dyn HistoryStore>, seed: Option<u64>, timeout: Duration) -> Self {
        let responder = Arc::new(MockResponder::new(seed));
        Self::new(
            Backend::Mock(responder.clone()),
            Backend::Mock(responder),
            store,
            timeout,
        )
    }

    /// One client for both paths, each with its own token budget.
    pub fn live(
        client: Arc<dyn ModelClient>,
        max_tokens: u32,
        agent_max_tokens: u32,
        store: Arc<dyn HistoryStore>,
        timeout: Duration,
    ) -> Self {
        Self::new(
            Backend::Live {
                client: client.clone(),
                max_tokens,
            },
            Backend::Live {
                client,
                max_tokens: agent_max_tokens,
            },
            store,
            timeout,
        )
    }

    pub fn from_config(config: &Config, store: Arc<dyn HistoryStore>) -> Result<Self> {
        config.validate()?;

        if config.use_mock {
            logging::log_routing(None, "using mock responses");
            return Ok(Self::mock(store, config.mock_seed, config.request_timeout()));
        }

        let client = OpenAiClient::new(&config.openai)?;
        logging::log_routing(None, &format!("using live model {}", config.openai.model));
        Ok(Self::live(
            Arc::new(client),
            config.openai.max_tokens,
            config.openai.agent_max_tokens,
            store,
            config.request_timeout(),
        ))
    }

    pub async fn process(&self, photo: &Photo, caption: &str, ctx: &UserContext) -> Result<AiResult> {
        validate(caption, ctx)?;
        let start = Instant::now();

        let mut result = self
            .bounded(async {
                let decision = self.router.select_path(caption, ctx);
                self.dispatch(decision, photo, caption, ctx).await
            })
            .await?;

        result.duration = elapsed_ms(start);
        logging::log_routing(
            Some(&ctx.family_id),
            &format!("{} suggestion in {}ms", result.mode, result.duration),
        );
        Ok(result)
    }

    /// Skip routing and run the given path.
    pub async fn process_with_mode(
        &self,
        decision: RoutingDecision,
        photo: &Photo,
        caption: &str,
        ctx: &UserContext,
    ) -> Result<AiResult> {
        validate(caption, ctx)?;
        let start = Instant::now();

        let mut result = self
            .bounded(self.dispatch(decision, photo, caption, ctx))
            .await?;

        result.duration = elapsed_ms(start);
        Ok(result)
    }

    pub async fn handle(&self, request: &SuggestionRequest) -> Result<AiResult> {
        self.process(&request.photo, &request.caption, &request.context)
            .await
    }

    async fn dispatch(
        &self,
        decision: RoutingDecision,
        photo: &Photo,
        caption: &str,
        ctx: &UserContext,
    ) -> Result<AiResult> {
        match decision {
            RoutingDecision::Pipeline => self.pipeline.run(photo, caption, ctx).await,
            RoutingDecision::Agent => self.agent.run(photo, caption, ctx).await,
        }
    }

    async fn bounded<F>(&self, work: F) -> Result<AiResult>
    where
        F: Future<Output = Result<AiResult>>,
    {
        tokio::time::timeout(self.timeout, work)
            .await
            .map_err(|_| Error::Timeout {
                after_ms: self.timeout.as_millis() as u64,
            })?
    }
}

fn validate(caption: &str, ctx: &UserContext) -> Result<()> {
    if caption.trim().is_empty() {
        return Err(Error::Validation("caption is empty".to_string()));
    }
    if ctx.user_id.trim().is_empty() {
        return Err(Error::Validation("user_id is empty".to_string()));
    }
    if ctx.family_id.trim().is_empty() {
        return Err(Error::Validation("family_id is empty".to_string()));
    }
    Ok(())
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}
