use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("thread not found: {0}")]
    ThreadNotFound(String),
}
