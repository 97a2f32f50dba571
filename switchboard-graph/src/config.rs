use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::GraphError;

pub const DEFAULT_MAX_STEPS: usize = 15;
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Limits applied to every run of a graph.
///
/// `max_steps` bounds Router invocations; `call_timeout` bounds each
/// individual decider or tool call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecutionConfig {
    pub max_steps: usize,
    pub call_timeout: Duration,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            max_steps: DEFAULT_MAX_STEPS,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }
}

impl ExecutionConfig {
    pub fn merge(&self, overrides: &ExecutionOptions) -> Self {
        Self {
            max_steps: overrides.max_steps.unwrap_or(self.max_steps),
            call_timeout: overrides.call_timeout.unwrap_or(self.call_timeout),
        }
    }

    pub fn validate(&self) -> Result<(), GraphError> {
        if self.max_steps == 0 {
            return Err(GraphError::InvalidConfig(
                "max_steps must be at least 1".to_string(),
            ));
        }
        if self.call_timeout.is_zero() {
            return Err(GraphError::InvalidConfig(
                "call_timeout must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Per-run overrides.
#[derive(Clone, Debug, Default)]
pub struct ExecutionOptions {
    pub max_steps: Option<usize>,
    pub call_timeout: Option<Duration>,
    pub cancellation: Option<CancellationToken>,
}

impl ExecutionOptions {
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }
}
