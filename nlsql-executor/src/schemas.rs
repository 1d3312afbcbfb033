use nlsql_core::types::ErrorCategory;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct SqlGenerationResult {
    pub sql: String,
    pub target_db: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorAnalysisResult {
    pub category: ErrorCategory,
    pub recoverable: bool,
    pub reason: String,
    #[serde(default)]
    pub suggested_sql: Option<String>,
}
