//! Error types shared by the agent client, the analysis stages and the
//! pipeline entry point.

use thiserror::Error;

/// Final outcome of a failed AnalysisAgent invocation.
///
/// Retries happen inside the agent; by the time one of these reaches a
/// caller every attempt has been spent.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("cannot reach agent endpoint: {0}")]
    Transport(String),

    #[error("agent request timed out after {0}s")]
    Timeout(u64),

    #[error("agent API error {status}: {body}")]
    Status { status: u16, body: String },

    #[error("agent reply is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("agent reply does not match the expected schema: {0}")]
    SchemaMismatch(String),

    #[error("agent call failed: {0}")]
    Failed(String),
}

impl AgentError {
    /// Transport-level failures are worth another attempt; malformed
    /// replies are not.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AgentError::Transport(_) | AgentError::Timeout(_) | AgentError::Status { .. }
        )
    }
}

/// Failure of a single pipeline stage. Always absorbed by the coordinator.
#[derive(Debug, Error)]
pub enum StageError {
    #[error(transparent)]
    Agent(#[from] AgentError),

    #[error("precondition violated: {0}")]
    Precondition(String),

    #[error("stage task aborted: {0}")]
    Join(String),
}

/// Errors surfaced to the caller of `analyze`.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("precondition violated: {0}")]
    PreconditionViolation(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_error_wraps_agent_error() {
        let err: StageError = AgentError::Timeout(30).into();
        assert_eq!(err.to_string(), "agent request timed out after 30s");
    }

    #[test]
    fn test_precondition_message() {
        let err = PipelineError::PreconditionViolation("query must not be empty".into());
        assert!(err.to_string().contains("query must not be empty"));
    }
}
