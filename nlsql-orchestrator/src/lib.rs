mod error;
mod orchestrator;
mod schemas;
mod turn;

pub use error::OrchestratorError;
pub use orchestrator::Orchestrator;
pub use schemas::{DecisionAction, DecisionResult, SummaryResult, ValidationResult};
pub use turn::TurnOutcome;
