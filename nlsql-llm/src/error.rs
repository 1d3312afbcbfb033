use thiserror::Error;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("request to provider failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("provider returned an unexpected response shape: {0}")]
    InvalidResponse(String),

    #[error("provider returned an error: {0}")]
    Provider(String),

    #[error("response failed to parse as JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("structured response failed validation: {0}")]
    Validation(String),

    #[error("call to provider timed out after {0}s")]
    Timeout(u64),
}
