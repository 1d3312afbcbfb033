use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Category assigned to a failed SQL execution by the error-analysis stage.
/// Recoverability is a function of category, not of the raw database message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    Syntax,
    Schema,
    Permission,
    Connection,
    Data,
    Other,
}

impl ErrorCategory {
    /// Permission and connection failures never benefit from another attempt.
    pub fn is_inherently_unrecoverable(self) -> bool {
        matches!(self, ErrorCategory::Permission | ErrorCategory::Connection)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Lookup,
    Aggregation,
    Join,
    Filter,
    Sort,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataSourceSummary {
    pub id: String,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanStep {
    pub step_number: u32,
    pub description: String,
    pub databases: Vec<String>,
    pub tables: Vec<String>,
    pub operation: Operation,
    #[serde(default)]
    pub depends_on_steps: Vec<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryPlan {
    pub summary: String,
    pub language: String,
    pub steps: Vec<PlanStep>,
}

impl QueryPlan {
    /// Step numbers must be 1..N contiguous and every dependency must point backward.
    pub fn validate_structure(&self) -> std::result::Result<(), String> {
        if self.steps.is_empty() {
            return Err("plan has no steps".to_string());
        }
        for (idx, step) in self.steps.iter().enumerate() {
            let expected = (idx + 1) as u32;
            if step.step_number != expected {
                return Err(format!(
                    "step numbers must be contiguous starting at 1, expected {expected} got {}",
                    step.step_number
                ));
            }
            if step.databases.is_empty() {
                return Err(format!("step {expected} lists no databases"));
            }
            for dep in &step.depends_on_steps {
                if *dep >= step.step_number {
                    return Err(format!(
                        "step {expected} depends_on_steps must reference a strictly lower step number, got {dep}"
                    ));
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepOutcome {
    Value { result_value: String },
    Rows { result_data: Vec<serde_json::Map<String, serde_json::Value>> },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    pub step_number: u32,
    pub success: bool,
    pub final_sql: String,
    pub outcome: Option<StepOutcome>,
    pub error: Option<String>,
    pub category: Option<ErrorCategory>,
    pub attempts: u32,
}

impl StepResult {
    pub fn succeeded(step_number: u32, final_sql: String, outcome: StepOutcome, attempts: u32) -> Self {
        Self {
            step_number,
            success: true,
            final_sql,
            outcome: Some(outcome),
            error: None,
            category: None,
            attempts,
        }
    }

    pub fn failed(
        step_number: u32,
        final_sql: String,
        error: String,
        category: ErrorCategory,
        attempts: u32,
    ) -> Self {
        Self {
            step_number,
            success: false,
            final_sql,
            outcome: None,
            error: Some(error),
            category: Some(category),
            attempts,
        }
    }
}

/// Per-thread token accounting. Aggregated across every LLM call that returned usage,
/// including retries inside the step executor.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
    pub call_count: u64,
}

impl TokenUsage {
    pub fn add(&mut self, input: u64, output: u64) {
        self.input_tokens += input;
        self.output_tokens += output;
        self.total_tokens += input + output;
        self.call_count += 1;
    }
}

/// Sorted, deduplicated set of database ids a thread has consulted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UsedDatabases(BTreeSet<String>);

impl UsedDatabases {
    pub fn union_in(&mut self, ids: impl IntoIterator<Item = String>) {
        self.0.extend(ids);
    }

    pub fn as_sorted_vec(&self) -> Vec<String> {
        self.0.iter().cloned().collect()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.0.contains(id)
    }
}
