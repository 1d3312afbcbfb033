use thiserror::Error;

/// Truly unexpected failures — not the pipeline's own semantic tags (rejected,
/// clarification, plan_error, execution_error), which are represented in
/// `TurnOutcome` instead and never surfaced as an error to transport callers.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("session store error: {0}")]
    Session(#[from] nlsql_session::SessionError),

    #[error("llm provider call failed: {0}")]
    Llm(#[from] nlsql_llm::LlmError),
}
