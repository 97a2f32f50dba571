//! Orchestration loop for the router / data worker / response worker
//! pipeline.
//!
//! A [`SupportGraph`] runs one query at a time per call: the [`Router`]
//! picks the next role, the [`DataWorker`] fetches through a
//! [`switchboard_tools::ToolRegistry`], and the [`ResponseWorker`] either
//! answers or asks for more data with `ROUTING_REQUEST: <code>`. Runs are
//! bounded by [`ExecutionConfig::max_steps`] Router invocations.
mod config;
mod data_worker;
mod engine;
mod error;
mod llm_decider;
mod observer;
mod response_worker;
mod router;
mod rules;
mod state;

pub use config::{ExecutionConfig, ExecutionOptions, DEFAULT_CALL_TIMEOUT, DEFAULT_MAX_STEPS};
pub use data_worker::{DataOutcome, DataWorker, COMPOSITE_TYPE, NO_TOOL_SELECTED};
pub use engine::{
    RunOutcome, RunStatus, SupportGraph, SupportGraphBuilder, DATA_WORKER_NODE,
    GENERIC_FAILURE_NOTICE, RESPONSE_WORKER_NODE, ROUTER_NODE,
};
pub use error::GraphError;
pub use llm_decider::{
    LlmResponseDrafter, LlmRouteDecider, LlmToolSelector, DRAFTER_PROMPT, ROUTER_PROMPT,
    SELECTOR_PROMPT,
};
pub use observer::Observer;
pub use response_worker::{parse_response, ResponseResult, ResponseWorker, ROUTING_REQUEST_PREFIX};
pub use router::{parse_route, RouteDecision, Router};
pub use rules::{CompositeRule, DataRules, ProfileOverrideRule};
pub use state::SharedState;
pub use tokio_util::sync::CancellationToken;
