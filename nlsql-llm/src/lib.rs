pub mod adapter;
pub mod adapters;
pub mod client;
pub mod error;
pub mod structured;

pub use adapter::{Adapter, LlmAdapter};
pub use client::{Completion, DebugTrace, LlmClient, Usage};
pub use error::LlmError;
