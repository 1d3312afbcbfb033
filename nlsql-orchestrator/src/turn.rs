use nlsql_core::types::{Confidence, QueryPlan, StepResult};
use serde::Serialize;

/// Exactly one variant is produced per completed turn.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "tag", rename_all = "snake_case")]
pub enum TurnOutcome {
    Rejected { reason: String },
    Clarification { question: String },
    AnswerDirect { text: String },
    Answer { text: String, confidence: Confidence, data_sources_used: Vec<String> },
    PlanError { reason: String },
    ExecutionError { failing_step: u32, error: String, plan: QueryPlan, results: Vec<StepResult> },
}
