//! Chooses between the fast pipeline and the tool-using agent.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::classifier::{classify, MessageType};
use crate::db::HistoryStore;
use crate::gatekeeper::ContextGatekeeper;
use crate::types::UserContext;

/// Sensitivity strictly above this goes to the agent.
pub const SENSITIVITY_THRESHOLD: f64 = 0.6;
/// More messages than this in the last hour goes to the agent.
pub const MAX_PIPELINE_DEPTH: i64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoutingDecision {
    Pipeline,
    Agent,
}

impl RoutingDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoutingDecision::Pipeline => "pipeline",
            RoutingDecision::Agent => "agent",
        }
    }
}

/// Everything the router looked at for one caption.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutingSignals {
    pub sensitivity_score: f64,
    pub message_type: MessageType,
    pub has_recent_conflict: bool,
    pub has_negative_feedback: bool,
    pub conversation_depth: i64,
}

impl RoutingSignals {
    /// Agent iff any single signal trips.
    pub fn decision(&self) -> RoutingDecision {
        let escalate = self.sensitivity_score > SENSITIVITY_THRESHOLD
            || self.message_type.needs_escalation()
            || self.has_recent_conflict
            || self.has_negative_feedback
            || self.conversation_depth > MAX_PIPELINE_DEPTH;

        if escalate {
            RoutingDecision::Agent
        } else {
            RoutingDecision::Pipeline
        }
    }
}

pub struct PathRouter {
    gatekeeper: ContextGatekeeper,
}

impl PathRouter {
    pub fn new(store: Arc<dyn HistoryStore>) -> Self {
        Self {
            gatekeeper: ContextGatekeeper::new(store),
        }
    }

    pub fn evaluate(&self, caption: &str, ctx: &UserContext) -> RoutingSignals {
        let classification = classify(caption);
        RoutingSignals {
            sensitivity_score: classification.sensitivity,
            message_type: classification.message_type,
            has_recent_conflict: self.gatekeeper.has_recent_conflict(&ctx.family_id),
            has_negative_feedback: self.gatekeeper.has_negative_feedback(&ctx.user_id),
            conversation_depth: self.gatekeeper.conversation_depth(&ctx.family_id),
        }
    }

    pub fn select_path(&self, caption: &str, ctx: &UserContext) -> RoutingDecision {
        let signals = self.evaluate(caption, ctx);
        let decision = signals.decision();

        tracing::info!(
            target: "wowli::routing",
            family = %ctx.family_id,
            decision = decision.as_str(),
            sensitivity = signals.sensitivity_score,
            message_type = signals.message_type.as_str(),
            recent_conflict = signals.has_recent_conflict,
            negative_feedback = signals.has_negative_feedback,
            depth = signals.conversation_depth,
            "path selected"
        );

        decision
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{NewMessage, SqliteStore};
    use crate::test_utils::{FailingStore, FixedStore};
    use crate::types::Role;

    fn ctx() -> UserContext {
        UserContext::new("kid", Role::Daughter, "fam-1")
    }

    fn quiet() -> RoutingSignals {
        RoutingSignals {
            sensitivity_score: 0.0,
            message_type: MessageType::Normal,
            has_recent_conflict: false,
            has_negative_feedback: false,
            conversation_depth: 0,
        }
    }

    #[test]
    fn test_quiet_signals_take_pipeline() {
        assert_eq!(quiet().decision(), RoutingDecision::Pipeline);
    }

    #[test]
    fn test_any_single_trigger_is_enough() {
        let triggers = [
            RoutingSignals { sensitivity_score: 0.7, ..quiet() },
            RoutingSignals { message_type: MessageType::Complaint, ..quiet() },
            RoutingSignals { message_type: MessageType::Conflict, ..quiet() },
            RoutingSignals { has_recent_conflict: true, ..quiet() },
            RoutingSignals { has_negative_feedback: true, ..quiet() },
            RoutingSignals { conversation_depth: 6, ..quiet() },
        ];
        for signals in triggers {
            assert_eq!(signals.decision(), RoutingDecision::Agent, "{signals:?}");
        }
    }

    #[test]
    fn test_thresholds_are_strict() {
        let at_threshold = RoutingSignals { sensitivity_score: 0.6, ..quiet() };
        assert_eq!(at_threshold.decision(), RoutingDecision::Pipeline);

        let at_depth = RoutingSignals { conversation_depth: 5, ..quiet() };
        assert_eq!(at_depth.decision(), RoutingDecision::Pipeline);

        let positive = RoutingSignals { message_type: MessageType::Positive, ..quiet() };
        assert_eq!(positive.decision(), RoutingDecision::Pipeline);
    }

    #[test]
    fn test_accusation_goes_to_agent() {
        let router = PathRouter::new(Arc::new(FixedStore::default()));
        let signals = router.evaluate("你总是不理我", &ctx());
        assert_eq!(signals.message_type, MessageType::Conflict);
        assert_eq!(router.select_path("你总是不理我", &ctx()), RoutingDecision::Agent);
    }

    #[test]
    fn test_everyday_food_photo_takes_pipeline() {
        let router = PathRouter::new(Arc::new(FixedStore::default()));
        assert_eq!(router.select_path("今天吃了好吃的面", &ctx()), RoutingDecision::Pipeline);
    }

    #[test]
    fn test_history_signals_escalate() {
        let router = PathRouter::new(Arc::new(FixedStore {
            negative_feedback: 2,
            ..Default::default()
        }));
        assert_eq!(router.select_path("公园的花开了", &ctx()), RoutingDecision::Agent);
    }

    #[test]
    fn test_broken_store_routes_on_text_alone() {
        let router = PathRouter::new(Arc::new(FailingStore));
        let signals = router.evaluate("公园的花开了", &ctx());
        assert_eq!(signals, quiet());
        assert_eq!(router.select_path("公园的花开了", &ctx()), RoutingDecision::Pipeline);
    }

    #[test]
    fn test_depth_boundary_against_sqlite() {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        store.create_family("fam-1", None).unwrap();
        store.create_user("kid", "Xiao", Role::Daughter, "fam-1", None).unwrap();
        let router = PathRouter::new(store.clone());

        let post = || {
            store
                .save_message(&NewMessage {
                    family_id: "fam-1".to_string(),
                    sender_id: "kid".to_string(),
                    caption: Some("花".to_string()),
                    ..Default::default()
                })
                .unwrap();
        };

        for _ in 0..5 {
            post();
        }
        assert_eq!(router.select_path("公园的花开了", &ctx()), RoutingDecision::Pipeline);

        post();
        assert_eq!(router.select_path("公园的花开了", &ctx()), RoutingDecision::Agent);
    }
}
