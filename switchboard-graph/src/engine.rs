use std::sync::Arc;

use switchboard_core::{NextAction, ResponseDrafter, RouteDecider, ToolSelector};
use switchboard_tools::ToolRegistry;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::{
    DataRules, DataWorker, ExecutionConfig, ExecutionOptions, GraphError, Observer,
    ResponseResult, ResponseWorker, Router, SharedState,
};

pub const ROUTER_NODE: &str = "router";
pub const DATA_WORKER_NODE: &str = "data_worker";
pub const RESPONSE_WORKER_NODE: &str = "response_worker";

/// Returned to the user when a run ends without a final answer.
pub const GENERIC_FAILURE_NOTICE: &str =
    "Sorry, we could not complete your request right now. Please try again or contact support.";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunStatus {
    Completed,
    StepLimitExceeded { max: usize, reached: usize },
}

#[derive(Clone, Debug)]
pub struct RunOutcome {
    pub state: SharedState,
    pub status: RunStatus,
}

impl RunOutcome {
    pub fn is_completed(&self) -> bool {
        self.status == RunStatus::Completed
    }

    /// The final answer, or a generic notice. Internal errors never leak.
    pub fn user_response(&self) -> &str {
        match self.state.final_response() {
            Some(text) if !text.is_empty() => text,
            _ => GENERIC_FAILURE_NOTICE,
        }
    }

    pub fn into_state(self) -> Result<SharedState, GraphError> {
        match self.status {
            RunStatus::Completed => Ok(self.state),
            RunStatus::StepLimitExceeded { max, reached } => {
                Err(GraphError::MaxStepsExceeded { max, reached })
            }
        }
    }
}

/// The router / data worker / response worker loop.
///
/// Holds no per-run state; one graph can serve many concurrent runs.
pub struct SupportGraph {
    router: Router,
    data_worker: DataWorker,
    response_worker: ResponseWorker,
    config: ExecutionConfig,
    observer: Option<Arc<dyn Observer>>,
}

impl SupportGraph {
    pub fn builder() -> SupportGraphBuilder {
        SupportGraphBuilder::new()
    }

    pub fn config(&self) -> &ExecutionConfig {
        &self.config
    }

    pub fn registry(&self) -> &ToolRegistry {
        self.data_worker.registry()
    }

    pub async fn invoke(&self, query: impl Into<String>) -> Result<RunOutcome, GraphError> {
        self.invoke_with_state(SharedState::new(query)).await
    }

    pub async fn invoke_with_state(&self, state: SharedState) -> Result<RunOutcome, GraphError> {
        self.invoke_with_options(state, ExecutionOptions::default())
            .await
    }

    pub async fn invoke_with_options(
        &self,
        state: SharedState,
        options: ExecutionOptions,
    ) -> Result<RunOutcome, GraphError> {
        let config = self.config.merge(&options);
        config.validate()?;
        let span = tracing::info_span!(
            "support_run",
            run_id = %state.run_id(),
            query = %state.query()
        );
        self.run(state, config, options.cancellation)
            .instrument(span)
            .await
    }

    async fn run(
        &self,
        mut state: SharedState,
        config: ExecutionConfig,
        cancellation: Option<CancellationToken>,
    ) -> Result<RunOutcome, GraphError> {
        if state.next_action() == NextAction::Start {
            state.set_next_action(NextAction::Router);
        }
        tracing::info!(max_steps = config.max_steps, "run started");

        loop {
            if cancellation.as_ref().is_some_and(|token| token.is_cancelled()) {
                tracing::warn!(
                    router_invocations = state.router_invocations(),
                    "run cancelled"
                );
                return Err(GraphError::Cancelled);
            }

            match state.next_action() {
                NextAction::Start | NextAction::Router => {
                    if state.router_invocations() >= config.max_steps {
                        let reached = state.router_invocations() + 1;
                        tracing::warn!(max = config.max_steps, reached, "step limit exceeded");
                        return Ok(RunOutcome {
                            state,
                            status: RunStatus::StepLimitExceeded {
                                max: config.max_steps,
                                reached,
                            },
                        });
                    }
                    state.record_router_invocation();
                    self.enter(ROUTER_NODE);
                    let decision = self.router.decide(&state, config.call_timeout).await;
                    if let Some(observer) = &self.observer {
                        observer.on_route(decision.action, &decision.trail);
                    }
                    state.append_trail(decision.trail);
                    state.set_next_action(decision.action);
                    self.exit(ROUTER_NODE);
                }
                NextAction::DataAgent => {
                    self.enter(DATA_WORKER_NODE);
                    let outcome = self
                        .data_worker
                        .act(
                            state.query(),
                            state.context(),
                            config.call_timeout,
                            self.observer.as_deref(),
                        )
                        .await;
                    state.replace_context(outcome.context);
                    state.append_trail(outcome.trail);
                    state.set_next_action(NextAction::Router);
                    self.exit(DATA_WORKER_NODE);
                }
                NextAction::SupportAgent | NextAction::Escalate => {
                    self.enter(RESPONSE_WORKER_NODE);
                    let result = self
                        .response_worker
                        .act(state.query(), state.context(), config.call_timeout)
                        .await;
                    match result {
                        Ok(ResponseResult::Final(text)) => {
                            if !state.set_final_response(text) {
                                tracing::warn!("final response already set, keeping the first");
                            }
                            state.append_trail("Support Agent responded.");
                            state.set_next_action(NextAction::Complete);
                        }
                        Ok(ResponseResult::NeedData(code)) => {
                            tracing::info!(request = %code, "support requested data");
                            state.append_trail(format!("Support requested data: {code}"));
                            state.set_support_request(code);
                            state.set_next_action(NextAction::Router);
                        }
                        Err(err) => {
                            tracing::error!(error = %err, "response worker failed");
                            if let Some(observer) = &self.observer {
                                observer.on_error(RESPONSE_WORKER_NODE, &err.to_string());
                            }
                            return Err(GraphError::NodeFailed {
                                node: RESPONSE_WORKER_NODE.to_string(),
                                source: Box::new(err),
                            });
                        }
                    }
                    self.exit(RESPONSE_WORKER_NODE);
                }
                NextAction::Complete => {
                    tracing::info!(
                        router_invocations = state.router_invocations(),
                        answered = state.has_final_response(),
                        "run completed"
                    );
                    return Ok(RunOutcome {
                        state,
                        status: RunStatus::Completed,
                    });
                }
            }
        }
    }

    fn enter(&self, node: &str) {
        tracing::debug!(node, "entering node");
        if let Some(observer) = &self.observer {
            observer.on_node_enter(node);
        }
    }

    fn exit(&self, node: &str) {
        if let Some(observer) = &self.observer {
            observer.on_node_exit(node);
        }
    }
}

#[derive(Default)]
pub struct SupportGraphBuilder {
    route_decider: Option<Arc<dyn RouteDecider>>,
    tool_selector: Option<Arc<dyn ToolSelector>>,
    response_drafter: Option<Arc<dyn ResponseDrafter>>,
    registry: ToolRegistry,
    rules: DataRules,
    config: ExecutionConfig,
    observer: Option<Arc<dyn Observer>>,
}

impl SupportGraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route_decider(mut self, decider: Arc<dyn RouteDecider>) -> Self {
        self.route_decider = Some(decider);
        self
    }

    pub fn tool_selector(mut self, selector: Arc<dyn ToolSelector>) -> Self {
        self.tool_selector = Some(selector);
        self
    }

    pub fn response_drafter(mut self, drafter: Arc<dyn ResponseDrafter>) -> Self {
        self.response_drafter = Some(drafter);
        self
    }

    pub fn registry(mut self, registry: ToolRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn rules(mut self, rules: DataRules) -> Self {
        self.rules = rules;
        self
    }

    pub fn config(mut self, config: ExecutionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn max_steps(mut self, max_steps: usize) -> Self {
        self.config.max_steps = max_steps;
        self
    }

    pub fn call_timeout(mut self, call_timeout: std::time::Duration) -> Self {
        self.config.call_timeout = call_timeout;
        self
    }

    pub fn observer(mut self, observer: Arc<dyn Observer>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn build(self) -> Result<SupportGraph, GraphError> {
        self.config.validate()?;
        let route_decider = self
            .route_decider
            .ok_or_else(|| GraphError::InvalidConfig("route decider is required".to_string()))?;
        let tool_selector = self
            .tool_selector
            .ok_or_else(|| GraphError::InvalidConfig("tool selector is required".to_string()))?;
        let response_drafter = self.response_drafter.ok_or_else(|| {
            GraphError::InvalidConfig("response drafter is required".to_string())
        })?;

        Ok(SupportGraph {
            router: Router::new(route_decider),
            data_worker: DataWorker::new(tool_selector, self.registry, self.rules),
            response_worker: ResponseWorker::new(response_drafter),
            config: self.config,
            observer: self.observer,
        })
    }
}
