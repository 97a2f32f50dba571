use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::json;
use switchboard_core::{
    NextAction, ResponseDrafter, RouteDecider, SelectionRequest, SupportContext,
    SwitchboardError, ToolSelection, ToolSelector,
};
use switchboard_graph::{
    CancellationToken, ExecutionConfig, ExecutionOptions, GraphError, Observer, RunStatus,
    SharedState, SupportGraph, GENERIC_FAILURE_NOTICE,
};
use switchboard_store::{CustomerStore, InMemoryCustomerStore, NewCustomer, NewTicket};
use switchboard_tools::customer_registry;

/// DATA_AGENT until a data result exists, then SUPPORT_AGENT.
struct DataThenSupport;

#[async_trait::async_trait]
impl RouteDecider for DataThenSupport {
    async fn decide(
        &self,
        _query: &str,
        context: &SupportContext,
    ) -> Result<String, SwitchboardError> {
        Ok(match context.data_query_result() {
            Some(_) => "SUPPORT_AGENT".to_string(),
            None => "DATA_AGENT".to_string(),
        })
    }
}

struct Constant(&'static str);

#[async_trait::async_trait]
impl RouteDecider for Constant {
    async fn decide(
        &self,
        _query: &str,
        _context: &SupportContext,
    ) -> Result<String, SwitchboardError> {
        Ok(self.0.to_string())
    }
}

/// Picks `get_customer` for the id found in the query; history for
/// anything mentioning "account" so the profile override has work to do.
struct IdSelector;

#[async_trait::async_trait]
impl ToolSelector for IdSelector {
    async fn select(
        &self,
        request: SelectionRequest<'_>,
    ) -> Result<Option<ToolSelection>, SwitchboardError> {
        let id: Option<i64> = request
            .query
            .split(|c: char| !c.is_ascii_digit())
            .find(|part| !part.is_empty())
            .and_then(|part| part.parse().ok());
        let Some(id) = id else {
            return Ok(None);
        };
        let tool = if request.query.contains("account") {
            "get_customer_history"
        } else {
            "get_customer"
        };
        Ok(Some(ToolSelection::new(tool, json!({ "customer_id": id }))))
    }
}

/// Greets the customer named in the data result, or asks for a profile.
struct ProfileDrafter {
    calls: AtomicUsize,
}

impl ProfileDrafter {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait::async_trait]
impl ResponseDrafter for ProfileDrafter {
    async fn draft(
        &self,
        query: &str,
        context: &SupportContext,
    ) -> Result<String, SwitchboardError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match context.data_query_result() {
            Some(result) => Ok(format!(
                "Hello {}, we looked into: {query}",
                result.payload["customer"]["name"].as_str().unwrap_or("there")
            )),
            None => Ok("ROUTING_REQUEST: CUSTOMER_PROFILE_3".to_string()),
        }
    }
}

struct AlwaysAsks;

#[async_trait::async_trait]
impl ResponseDrafter for AlwaysAsks {
    async fn draft(
        &self,
        _query: &str,
        _context: &SupportContext,
    ) -> Result<String, SwitchboardError> {
        Ok("ROUTING_REQUEST: MORE".to_string())
    }
}

struct EchoDrafter;

#[async_trait::async_trait]
impl ResponseDrafter for EchoDrafter {
    async fn draft(
        &self,
        query: &str,
        _context: &SupportContext,
    ) -> Result<String, SwitchboardError> {
        tokio::task::yield_now().await;
        Ok(format!("answer to {query}"))
    }
}

struct BrokenDrafter;

#[async_trait::async_trait]
impl ResponseDrafter for BrokenDrafter {
    async fn draft(
        &self,
        _query: &str,
        _context: &SupportContext,
    ) -> Result<String, SwitchboardError> {
        Err(SwitchboardError::LlmProvider("model offline".to_string()))
    }
}

/// Cancels the run's token the first time it is asked to draft.
struct CancellingDrafter(CancellationToken);

#[async_trait::async_trait]
impl ResponseDrafter for CancellingDrafter {
    async fn draft(
        &self,
        _query: &str,
        _context: &SupportContext,
    ) -> Result<String, SwitchboardError> {
        self.0.cancel();
        Ok("ROUTING_REQUEST: PROFILE".to_string())
    }
}

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<String>>,
}

impl Observer for Recorder {
    fn on_node_enter(&self, node: &str) {
        self.events.lock().unwrap().push(format!("enter:{node}"));
    }

    fn on_node_exit(&self, node: &str) {
        self.events.lock().unwrap().push(format!("exit:{node}"));
    }

    fn on_route(&self, action: NextAction, _trail: &str) {
        self.events.lock().unwrap().push(format!("route:{action}"));
    }

    fn on_tool_call(&self, tool: &str, _args: &serde_json::Value) {
        self.events.lock().unwrap().push(format!("tool:{tool}"));
    }

    fn on_error(&self, node: &str, _error: &str) {
        self.events.lock().unwrap().push(format!("error:{node}"));
    }
}

async fn five_customers() -> Arc<InMemoryCustomerStore> {
    let store = Arc::new(InMemoryCustomerStore::default());
    for name in ["Ada", "Grace", "Alan", "Edsger", "Barbara"] {
        store
            .add_customer(NewCustomer::new(name).email(format!("{}@example.com", name.to_lowercase())))
            .await
            .unwrap();
    }
    store
        .add_ticket(NewTicket::new(3, "Cannot log in"))
        .await
        .unwrap();
    store
}

fn graph_with(
    store: Arc<InMemoryCustomerStore>,
    decider: Arc<dyn RouteDecider>,
    drafter: Arc<dyn ResponseDrafter>,
) -> SupportGraph {
    SupportGraph::builder()
        .route_decider(decider)
        .tool_selector(Arc::new(IdSelector))
        .response_drafter(drafter)
        .registry(customer_registry(store))
        .build()
        .unwrap()
}

#[tokio::test]
async fn lookup_by_id_runs_data_then_support() {
    let graph = graph_with(
        five_customers().await,
        Arc::new(DataThenSupport),
        ProfileDrafter::new(),
    );

    let outcome = graph
        .invoke("Get customer information for ID 5")
        .await
        .unwrap();

    assert_eq!(outcome.status, RunStatus::Completed);
    assert_eq!(
        outcome.user_response(),
        "Hello Barbara, we looked into: Get customer information for ID 5"
    );
    assert_eq!(outcome.state.router_invocations(), 2);
    assert_eq!(
        outcome.state.trail(),
        [
            "Router Decision: DATA_AGENT (Raw: DATA_AGENT)",
            "Executed get_customer",
            "Router Decision: SUPPORT_AGENT (Raw: SUPPORT_AGENT)",
            "Support Agent responded.",
        ]
    );
    let customer = &outcome.state.data_result().unwrap().payload["customer"];
    assert_eq!(customer["id"], 5);
    assert_eq!(customer["email"], "barbara@example.com");
}

#[tokio::test]
async fn negotiation_round_trip_answers_profile_request() {
    let drafter = ProfileDrafter::new();
    let graph = graph_with(
        five_customers().await,
        Arc::new(Constant("SUPPORT_AGENT")),
        drafter.clone(),
    );

    let outcome = graph
        .invoke("I need help with my account, customer ID 3")
        .await
        .unwrap();

    assert!(outcome.is_completed());
    assert!(outcome.user_response().starts_with("Hello Alan"));
    assert_eq!(outcome.state.router_invocations(), 3);
    assert_eq!(drafter.calls.load(Ordering::SeqCst), 2);
    assert_eq!(
        outcome.state.trail(),
        [
            "Router Decision: SUPPORT_AGENT (Raw: SUPPORT_AGENT)",
            "Support requested data: CUSTOMER_PROFILE_3",
            "Router hard-rule: support_request present (CUSTOMER_PROFILE_3) → DATA_AGENT",
            "Executed get_customer",
            "Router Decision: SUPPORT_AGENT (Raw: SUPPORT_AGENT)",
            "Support Agent responded.",
        ]
    );
    assert!(outcome.state.support_request().is_none());
    assert!(outcome
        .state
        .data_result()
        .unwrap()
        .answers("CUSTOMER_PROFILE_3"));
}

#[tokio::test]
async fn hard_rule_wins_over_soft_complete() {
    let graph = graph_with(
        five_customers().await,
        Arc::new(Constant("COMPLETE")),
        ProfileDrafter::new(),
    );
    let mut state = SharedState::new("customer 2 needs a profile check");
    state.set_support_request("PROFILE");

    let outcome = graph.invoke_with_state(state).await.unwrap();

    assert_eq!(
        outcome.state.trail()[0],
        "Router hard-rule: support_request present (PROFILE) → DATA_AGENT"
    );
    assert_eq!(outcome.state.trail()[1], "Executed get_customer");
    assert!(outcome.state.support_request().is_none());
    // The soft decider then says COMPLETE without an answer.
    assert!(outcome.is_completed());
    assert_eq!(outcome.state.final_response(), None);
    assert_eq!(outcome.user_response(), GENERIC_FAILURE_NOTICE);
}

#[tokio::test]
async fn ambiguous_decider_terminates_at_step_limit() {
    let graph = graph_with(
        five_customers().await,
        Arc::new(Constant("hmm, hard to say")),
        Arc::new(AlwaysAsks),
    );

    let outcome = graph.invoke("something vague").await.unwrap();

    assert_eq!(
        outcome.status,
        RunStatus::StepLimitExceeded {
            max: 15,
            reached: 16
        }
    );
    assert_eq!(outcome.state.router_invocations(), 15);
    assert_eq!(outcome.user_response(), GENERIC_FAILURE_NOTICE);
    assert!(matches!(
        outcome.into_state(),
        Err(GraphError::MaxStepsExceeded { max: 15, .. })
    ));
}

#[tokio::test]
async fn per_run_options_override_step_limit() {
    let graph = graph_with(
        five_customers().await,
        Arc::new(Constant("unclear")),
        Arc::new(AlwaysAsks),
    );
    let options = ExecutionOptions {
        max_steps: Some(3),
        ..ExecutionOptions::default()
    };

    let outcome = graph
        .invoke_with_options(SharedState::new("vague"), options)
        .await
        .unwrap();
    assert_eq!(outcome.state.router_invocations(), 3);

    let zero = ExecutionOptions {
        max_steps: Some(0),
        ..ExecutionOptions::default()
    };
    let err = graph
        .invoke_with_options(SharedState::new("vague"), zero)
        .await
        .unwrap_err();
    assert!(matches!(err, GraphError::InvalidConfig(_)));
}

#[tokio::test]
async fn seeded_trail_is_kept_as_prefix() {
    let graph = graph_with(
        five_customers().await,
        Arc::new(DataThenSupport),
        ProfileDrafter::new(),
    );
    let mut state = SharedState::new("Get customer information for ID 1");
    state.append_trail("seeded by caller");

    let outcome = graph.invoke_with_state(state).await.unwrap();

    let trail = outcome.state.trail();
    assert_eq!(trail[0], "seeded by caller");
    assert_eq!(trail.len(), 5);
}

#[tokio::test]
async fn trail_only_grows_across_negotiation_steps() {
    let graph = graph_with(
        five_customers().await,
        Arc::new(Constant("SUPPORT_AGENT")),
        ProfileDrafter::new(),
    );
    let query = "I need help with my account, customer ID 3";
    let start = || {
        let mut state = SharedState::new(query);
        state.append_trail("seeded by caller");
        state
    };

    // Stopping after k router steps exposes the trail as it stood then.
    let mut snapshots = Vec::new();
    for max_steps in 1..=2 {
        let options = ExecutionOptions {
            max_steps: Some(max_steps),
            ..ExecutionOptions::default()
        };
        let outcome = graph.invoke_with_options(start(), options).await.unwrap();
        assert!(!outcome.is_completed());
        snapshots.push(outcome.state.trail().to_vec());
    }
    let finished = graph.invoke_with_state(start()).await.unwrap();
    assert!(finished.is_completed());
    snapshots.push(finished.state.trail().to_vec());

    assert_eq!(
        snapshots.iter().map(Vec::len).collect::<Vec<_>>(),
        [3, 5, 7]
    );
    for pair in snapshots.windows(2) {
        let (earlier, later) = (&pair[0], &pair[1]);
        assert!(later.len() >= earlier.len());
        assert_eq!(&later[..earlier.len()], earlier.as_slice());
    }
    assert_eq!(snapshots[0][2], "Support requested data: CUSTOMER_PROFILE_3");
    assert_eq!(
        snapshots[1][3],
        "Router hard-rule: support_request present (CUSTOMER_PROFILE_3) → DATA_AGENT"
    );
}

#[tokio::test]
async fn drafter_failure_is_fatal() {
    let recorder = Arc::new(Recorder::default());
    let graph = SupportGraph::builder()
        .route_decider(Arc::new(Constant("SUPPORT_AGENT")))
        .tool_selector(Arc::new(IdSelector))
        .response_drafter(Arc::new(BrokenDrafter))
        .observer(recorder.clone())
        .build()
        .unwrap();

    let err = graph.invoke("hello").await.unwrap_err();

    match err {
        GraphError::NodeFailed { node, source } => {
            assert_eq!(node, "response_worker");
            assert!(source.to_string().contains("model offline"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(recorder
        .events
        .lock()
        .unwrap()
        .contains(&"error:response_worker".to_string()));
}

#[tokio::test]
async fn observer_sees_every_step_in_order() {
    let recorder = Arc::new(Recorder::default());
    let graph = SupportGraph::builder()
        .route_decider(Arc::new(DataThenSupport))
        .tool_selector(Arc::new(IdSelector))
        .response_drafter(ProfileDrafter::new())
        .registry(customer_registry(five_customers().await))
        .observer(recorder.clone())
        .build()
        .unwrap();

    graph.invoke("customer 4 please").await.unwrap();

    assert_eq!(
        recorder.events.lock().unwrap().as_slice(),
        [
            "enter:router",
            "route:DATA_AGENT",
            "exit:router",
            "enter:data_worker",
            "tool:get_customer",
            "exit:data_worker",
            "enter:router",
            "route:SUPPORT_AGENT",
            "exit:router",
            "enter:response_worker",
            "exit:response_worker",
        ]
    );
}

#[tokio::test]
async fn cancelled_token_stops_the_run() {
    let token = CancellationToken::new();
    let graph = graph_with(
        five_customers().await,
        Arc::new(Constant("SUPPORT_AGENT")),
        Arc::new(CancellingDrafter(token.clone())),
    );

    let err = graph
        .invoke_with_options(
            SharedState::new("help"),
            ExecutionOptions::default().with_cancellation(token.clone()),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, GraphError::Cancelled));

    let err = graph
        .invoke_with_options(
            SharedState::new("help"),
            ExecutionOptions::default().with_cancellation(token),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, GraphError::Cancelled));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn independent_runs_proceed_concurrently() {
    let graph = Arc::new(graph_with(
        five_customers().await,
        Arc::new(Constant("SUPPORT_AGENT")),
        Arc::new(EchoDrafter),
    ));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let graph = graph.clone();
            tokio::spawn(async move { graph.invoke(format!("question {i}")).await })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        let outcome = handle.await.unwrap().unwrap();
        assert_eq!(outcome.user_response(), format!("answer to question {i}"));
        assert_eq!(outcome.state.router_invocations(), 1);
    }
}

#[test]
fn builder_rejects_missing_collaborators_and_zero_steps() {
    let missing = SupportGraph::builder()
        .route_decider(Arc::new(Constant("COMPLETE")))
        .build();
    assert!(matches!(missing, Err(GraphError::InvalidConfig(_))));

    let zero = SupportGraph::builder()
        .route_decider(Arc::new(Constant("COMPLETE")))
        .tool_selector(Arc::new(IdSelector))
        .response_drafter(Arc::new(EchoDrafter))
        .max_steps(0)
        .build();
    assert!(matches!(zero, Err(GraphError::InvalidConfig(_))));
}

#[test]
fn execution_config_defaults_and_merge() {
    let defaults = ExecutionConfig::default();
    assert_eq!(defaults.max_steps, 15);
    assert_eq!(defaults.call_timeout, Duration::from_secs(30));

    let merged = defaults.merge(&ExecutionOptions {
        max_steps: Some(4),
        call_timeout: Some(Duration::from_millis(250)),
        cancellation: None,
    });
    assert_eq!(merged.max_steps, 4);
    assert_eq!(merged.call_timeout, Duration::from_millis(250));

    assert_eq!(defaults.merge(&ExecutionOptions::default()), defaults);
}
