use std::sync::Arc;
use std::time::Duration;

use switchboard_core::{with_timeout, NextAction, RouteDecider};

use crate::SharedState;

/// What the Router chose and the trail entry explaining it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RouteDecision {
    pub action: NextAction,
    pub trail: String,
}

/// Maps free-form decider output to an action.
///
/// Upper-cased substring match, first hit wins in the order DATA_AGENT,
/// SUPPORT_AGENT, ESCALATE, COMPLETE.
pub fn parse_route(raw: &str) -> Option<NextAction> {
    let clean = raw.trim().to_uppercase();
    [
        NextAction::DataAgent,
        NextAction::SupportAgent,
        NextAction::Escalate,
        NextAction::Complete,
    ]
    .into_iter()
    .find(|action| clean.contains(action.as_str()))
}

pub struct Router {
    decider: Arc<dyn RouteDecider>,
}

impl Router {
    pub fn new(decider: Arc<dyn RouteDecider>) -> Self {
        Self { decider }
    }

    /// Decides the next step. Never fails: an erroring or silent decider
    /// falls back to the response worker.
    pub async fn decide(&self, state: &SharedState, call_timeout: Duration) -> RouteDecision {
        if state.has_final_response() {
            return RouteDecision {
                action: NextAction::Complete,
                trail: "Router: final response present → COMPLETE".to_string(),
            };
        }

        // A request is answered once a data result records its code.
        if let Some(code) = state
            .support_request()
            .filter(|_| state.context().has_unanswered_request())
        {
            let trail = format!("Router hard-rule: support_request present ({code}) → DATA_AGENT");
            tracing::info!(request = %code, "routing pending support request to data worker");
            return RouteDecision {
                action: NextAction::DataAgent,
                trail,
            };
        }

        let (action, raw) = match with_timeout(
            call_timeout,
            self.decider.decide(state.query(), state.context()),
        )
        .await
        {
            Ok(raw) => {
                let action = parse_route(&raw).unwrap_or_else(|| {
                    tracing::debug!(raw = %raw, "unrecognised route, defaulting to support");
                    NextAction::SupportAgent
                });
                (action, raw)
            }
            Err(err) => {
                tracing::warn!(error = %err, "route decider failed, defaulting to support");
                (NextAction::SupportAgent, err.to_string())
            }
        };

        tracing::info!(action = %action, "router decision");
        RouteDecision {
            action,
            trail: format!("Router Decision: {action} (Raw: {raw})"),
        }
    }
}
