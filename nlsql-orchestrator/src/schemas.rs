use nlsql_core::types::Confidence;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ValidationResult {
    pub is_relevant: bool,
    #[serde(default)]
    pub relevant_databases: Vec<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionAction {
    AnswerDirectly,
    AskClarification,
    CreatePlan,
    Reject,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DecisionResult {
    pub action: DecisionAction,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SummaryResult {
    pub answer: String,
    pub confidence: Confidence,
    #[serde(default)]
    pub data_sources_used: Vec<String>,
}
