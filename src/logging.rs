//! Structured logging for the Wowli AI core
//!
//! Events go through `tracing`, one target per category:
//! - ROUTING: pipeline/agent path decisions and their signals
//! - PIPELINE: single-shot reply generation
//! - AGENT: agent loop iterations and outcomes
//! - TOOL: agent tool invocations
//! - STORAGE: history lookups that degraded to defaults

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "wowli=info";

/// Log categories for structured logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogCategory {
    Routing,
    Pipeline,
    Agent,
    Tool,
    Storage,
}

impl LogCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogCategory::Routing => "ROUTING",
            LogCategory::Pipeline => "PIPELINE",
            LogCategory::Agent => "AGENT",
            LogCategory::Tool => "TOOL",
            LogCategory::Storage => "STORAGE",
        }
    }
}

/// Install the global subscriber. `RUST_LOG` wins over `filter`.
///
/// Returns `false` if a subscriber was already installed (e.g. by the host app).
pub fn init_logging(filter: Option<&str>) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter.unwrap_or(DEFAULT_FILTER)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_ansi(false)
        .try_init()
        .is_ok()
}

/// Log a message with category and optional family context
pub fn log(category: LogCategory, family_id: Option<&str>, message: &str) {
    let family = family_id.unwrap_or("-");
    match category {
        LogCategory::Routing => tracing::info!(target: "wowli::routing", family, "{message}"),
        LogCategory::Pipeline => tracing::info!(target: "wowli::pipeline", family, "{message}"),
        LogCategory::Agent => tracing::info!(target: "wowli::agent", family, "{message}"),
        LogCategory::Tool => tracing::debug!(target: "wowli::tool", family, "{message}"),
        LogCategory::Storage => tracing::warn!(target: "wowli::storage", family, "{message}"),
    }
}

pub fn log_routing(family_id: Option<&str>, message: &str) {
    log(LogCategory::Routing, family_id, message);
}

pub fn log_pipeline(family_id: Option<&str>, message: &str) {
    log(LogCategory::Pipeline, family_id, message);
}

pub fn log_agent(family_id: Option<&str>, message: &str) {
    log(LogCategory::Agent, family_id, message);
}

pub fn log_tool(family_id: Option<&str>, message: &str) {
    log(LogCategory::Tool, family_id, message);
}

/// A storage read failed and the caller fell back to a default.
pub fn log_storage(family_id: Option<&str>, message: &str) {
    log(LogCategory::Storage, family_id, message);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_labels() {
        assert_eq!(LogCategory::Routing.as_str(), "ROUTING");
        assert_eq!(LogCategory::Storage.as_str(), "STORAGE");
    }

    #[test]
    fn test_second_init_is_rejected() {
        init_logging(Some("wowli=debug"));
        assert!(!init_logging(None));
        log_routing(Some("fam-1"), "still logs after init");
    }
}
