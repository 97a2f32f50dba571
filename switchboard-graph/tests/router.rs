use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use switchboard_core::{DataResult, NextAction, RouteDecider, SupportContext, SwitchboardError};
use switchboard_graph::{parse_route, Router, SharedState};

const TIMEOUT: Duration = Duration::from_secs(5);

struct FixedDecider {
    reply: Result<&'static str, &'static str>,
    calls: AtomicUsize,
}

impl FixedDecider {
    fn replying(reply: &'static str) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(reply),
            calls: AtomicUsize::new(0),
        })
    }

    fn failing(message: &'static str) -> Arc<Self> {
        Arc::new(Self {
            reply: Err(message),
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait::async_trait]
impl RouteDecider for FixedDecider {
    async fn decide(
        &self,
        _query: &str,
        _context: &SupportContext,
    ) -> Result<String, SwitchboardError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.reply
            .map(str::to_string)
            .map_err(|message| SwitchboardError::LlmProvider(message.to_string()))
    }
}

struct SlowDecider;

#[async_trait::async_trait]
impl RouteDecider for SlowDecider {
    async fn decide(
        &self,
        _query: &str,
        _context: &SupportContext,
    ) -> Result<String, SwitchboardError> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok("COMPLETE".to_string())
    }
}

#[test]
fn parse_route_uses_priority_order() {
    assert_eq!(parse_route("data_agent"), Some(NextAction::DataAgent));
    assert_eq!(
        parse_route("  support_agent, then COMPLETE "),
        Some(NextAction::SupportAgent)
    );
    assert_eq!(
        parse_route("COMPLETE or DATA_AGENT"),
        Some(NextAction::DataAgent)
    );
    assert_eq!(parse_route("please ESCALATE"), Some(NextAction::Escalate));
    assert_eq!(parse_route("Complete."), Some(NextAction::Complete));
    assert_eq!(parse_route("I am not sure"), None);
}

#[tokio::test]
async fn pending_request_beats_soft_decision() {
    let decider = FixedDecider::replying("COMPLETE");
    let router = Router::new(decider.clone());
    let mut state = SharedState::new("help me");
    state.set_support_request("CUSTOMER_PROFILE_3");

    let decision = router.decide(&state, TIMEOUT).await;

    assert_eq!(decision.action, NextAction::DataAgent);
    assert_eq!(
        decision.trail,
        "Router hard-rule: support_request present (CUSTOMER_PROFILE_3) → DATA_AGENT"
    );
    assert_eq!(decider.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn empty_request_code_still_routes_to_data() {
    let router = Router::new(FixedDecider::replying("SUPPORT_AGENT"));
    let mut state = SharedState::new("help me");
    state.set_support_request("");

    let decision = router.decide(&state, TIMEOUT).await;
    assert_eq!(decision.action, NextAction::DataAgent);
}

#[tokio::test]
async fn final_response_completes_without_consulting_decider() {
    let decider = FixedDecider::replying("DATA_AGENT");
    let router = Router::new(decider.clone());
    let mut state = SharedState::new("hi");
    assert!(state.set_final_response("done"));
    state.set_support_request("ignored");

    let decision = router.decide(&state, TIMEOUT).await;
    assert_eq!(decision.action, NextAction::Complete);
    assert_eq!(decider.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn soft_decision_is_recorded_with_raw_text() {
    let router = Router::new(FixedDecider::replying("Route to DATA_AGENT please"));
    let state = SharedState::new("Get customer 5");

    let decision = router.decide(&state, TIMEOUT).await;
    assert_eq!(decision.action, NextAction::DataAgent);
    assert_eq!(
        decision.trail,
        "Router Decision: DATA_AGENT (Raw: Route to DATA_AGENT please)"
    );
}

#[tokio::test]
async fn data_result_alone_defers_to_soft_decision() {
    let router = Router::new(FixedDecider::replying("SUPPORT_AGENT"));
    let mut context = SupportContext::new();
    context.set_data_result(
        DataResult::new(serde_json::json!({"success": true})).answering(Some("X".to_string())),
    );
    let state = SharedState::new("q").with_context(context);

    let decision = router.decide(&state, TIMEOUT).await;
    assert_eq!(decision.action, NextAction::SupportAgent);
}

#[tokio::test]
async fn answered_request_defers_to_soft_decision() {
    let decider = FixedDecider::replying("SUPPORT_AGENT");
    let router = Router::new(decider.clone());
    let mut context = SupportContext::new();
    context.set_data_result(
        DataResult::new(serde_json::json!({"success": true}))
            .answering(Some("CUSTOMER_PROFILE_3".to_string())),
    );
    context.set_support_request("CUSTOMER_PROFILE_3");
    let state = SharedState::new("help me").with_context(context);

    let decision = router.decide(&state, TIMEOUT).await;

    assert_eq!(decision.action, NextAction::SupportAgent);
    assert!(decision.trail.starts_with("Router Decision:"));
    assert_eq!(decider.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn result_for_another_request_keeps_hard_rule() {
    let router = Router::new(FixedDecider::replying("SUPPORT_AGENT"));
    let mut context = SupportContext::new();
    context.set_data_result(
        DataResult::new(serde_json::json!({"success": true})).answering(Some("OLD".to_string())),
    );
    context.set_support_request("CUSTOMER_PROFILE_3");
    let state = SharedState::new("help me").with_context(context);

    let decision = router.decide(&state, TIMEOUT).await;
    assert_eq!(decision.action, NextAction::DataAgent);
}

#[tokio::test]
async fn ambiguity_and_failures_fall_back_to_support() {
    let state = SharedState::new("???");

    let unclear = Router::new(FixedDecider::replying("no idea"))
        .decide(&state, TIMEOUT)
        .await;
    assert_eq!(unclear.action, NextAction::SupportAgent);
    assert_eq!(unclear.trail, "Router Decision: SUPPORT_AGENT (Raw: no idea)");

    // Error text naming an action must not be parsed as a route.
    let failed = Router::new(FixedDecider::failing("DATA_AGENT unavailable"))
        .decide(&state, TIMEOUT)
        .await;
    assert_eq!(failed.action, NextAction::SupportAgent);
    assert!(failed.trail.contains("DATA_AGENT unavailable"));

    let slow = Router::new(Arc::new(SlowDecider))
        .decide(&state, Duration::from_millis(20))
        .await;
    assert_eq!(slow.action, NextAction::SupportAgent);
    assert!(slow.trail.contains("timed out"));
}
