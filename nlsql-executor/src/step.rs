use std::collections::HashMap;

use nlsql_core::schema::{PromptMode, SchemaCatalog};
use nlsql_core::types::{ErrorCategory, PlanStep, StepOutcome, StepResult};
use nlsql_datasources::DatasourceManager;
use nlsql_llm::{client::Usage, LlmClient};

use crate::formatting::format_prior_results;
use crate::schemas::{ErrorAnalysisResult, SqlGenerationResult};

pub const MAX_RETRY: u32 = 5;

#[derive(Debug, Clone)]
pub struct StepExecution {
    pub result: StepResult,
    pub usage: Usage,
}

fn scalar_to_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

struct FailedAttempt {
    sql: String,
}

/// Runs the generate → run → (analyze → retry)* loop for one plan step, bounded
/// at `MAX_RETRY` attempts. Only the immediately preceding failed attempt is
/// forwarded to the error analyzer — not the full retry history.
pub async fn execute_step(
    step: &PlanStep,
    question: &str,
    schema_catalog: &SchemaCatalog,
    prior_results: &[StepResult],
    llm: &LlmClient,
    datasources: &DatasourceManager,
) -> StepExecution {
    let mut usage_total = Usage::default();

    let target_db = match datasources.validate_scope(&step.databases) {
        Ok(db) => db.to_string(),
        Err(e) => {
            return StepExecution {
                result: StepResult::failed(step.step_number, String::new(), e.to_string(), ErrorCategory::Schema, 0),
                usage: usage_total,
            }
        }
    };

    let schema_text = match schema_catalog.format_for_prompt(&step.databases, PromptMode::Generation) {
        Ok(text) => text,
        Err(e) => {
            return StepExecution {
                result: StepResult::failed(step.step_number, String::new(), e.to_string(), ErrorCategory::Schema, 0),
                usage: usage_total,
            }
        }
    };

    let mut last_failed: Option<FailedAttempt> = None;
    let mut current_sql = String::new();

    for attempt in 1..=MAX_RETRY {
        current_sql = if attempt == 1 {
            let mut vars = HashMap::new();
            vars.insert("step".to_string(), format!("{step:?}"));
            vars.insert("schema".to_string(), schema_text.clone());
            vars.insert("prior_results".to_string(), format_prior_results(prior_results));
            match llm
                .complete_structured::<SqlGenerationResult>(nlsql_core::prompts::GENERATE_SQL, &vars)
                .await
            {
                Ok(completion) => {
                    usage_total.input_tokens += completion.usage.input_tokens;
                    usage_total.output_tokens += completion.usage.output_tokens;
                    completion.value.sql
                }
                Err(e) => {
                    return StepExecution {
                        result: StepResult::failed(
                            step.step_number,
                            String::new(),
                            format!("sql generation failed: {e}"),
                            ErrorCategory::Other,
                            attempt,
                        ),
                        usage: usage_total,
                    }
                }
            }
        } else {
            // `last_failed` is always populated before a second iteration begins.
            last_failed
                .as_ref()
                .map(|f| f.sql.clone())
                .unwrap_or_default()
        };

        let query = datasources.execute(&current_sql, &target_db).await;
        tracing::debug!(
            step = step.step_number,
            attempt,
            target_db = %target_db,
            elapsed_ms = query.elapsed_ms,
            ok = query.ok,
            "step attempt completed"
        );
        if query.ok {
            let outcome = if query.row_count == 1 && query.columns.len() == 1 {
                let value = query
                    .rows
                    .first()
                    .and_then(|row| row.values().next())
                    .map(scalar_to_string)
                    .unwrap_or_default();
                StepOutcome::Value { result_value: value }
            } else {
                StepOutcome::Rows { result_data: query.rows }
            };
            return StepExecution {
                result: StepResult::succeeded(step.step_number, current_sql, outcome, attempt),
                usage: usage_total,
            };
        }

        let error_text = query.error.clone().unwrap_or_else(|| "unknown error".to_string());

        if attempt == MAX_RETRY {
            let category = query.category.unwrap_or(ErrorCategory::Other);
            return StepExecution {
                result: StepResult::failed(step.step_number, current_sql, "exhausted retries".to_string(), category, attempt),
                usage: usage_total,
            };
        }

        let mut vars = HashMap::new();
        vars.insert("step".to_string(), format!("{step:?}"));
        vars.insert("question".to_string(), question.to_string());
        vars.insert("sql".to_string(), current_sql.clone());
        vars.insert("error".to_string(), error_text.clone());
        vars.insert("attempt".to_string(), attempt.to_string());

        let analysis = match llm
            .complete_structured::<ErrorAnalysisResult>(nlsql_core::prompts::ANALYZE_ERROR, &vars)
            .await
        {
            Ok(completion) => {
                usage_total.input_tokens += completion.usage.input_tokens;
                usage_total.output_tokens += completion.usage.output_tokens;
                completion.value
            }
            Err(e) => {
                return StepExecution {
                    result: StepResult::failed(
                        step.step_number,
                        current_sql,
                        format!("error analysis failed: {e}"),
                        ErrorCategory::Other,
                        attempt,
                    ),
                    usage: usage_total,
                }
            }
        };

        if !analysis.recoverable || analysis.category.is_inherently_unrecoverable() {
            return StepExecution {
                result: StepResult::failed(
                    step.step_number,
                    current_sql,
                    format!("non-recoverable ({:?}): {}", analysis.category, analysis.reason),
                    analysis.category,
                    attempt,
                ),
                usage: usage_total,
            };
        }

        let Some(suggested) = analysis.suggested_sql else {
            return StepExecution {
                result: StepResult::failed(
                    step.step_number,
                    current_sql,
                    format!("analyzer declared recoverable but suggested no correction: {}", analysis.reason),
                    analysis.category,
                    attempt,
                ),
                usage: usage_total,
            };
        };

        last_failed = Some(FailedAttempt { sql: suggested });
    }

    StepExecution {
        result: StepResult::failed(step.step_number, current_sql, "exhausted retries".to_string(), ErrorCategory::Other, MAX_RETRY),
        usage: usage_total,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nlsql_core::config::{LlmConfig, PoolConfig};
    use nlsql_core::prompts::PromptRegistry;
    use nlsql_core::types::Operation;
    use nlsql_datasources::{CatalogEntry, DatasourceCatalog, DatasourceSpec};
    use nlsql_llm::adapter::Adapter;
    use nlsql_llm::adapters::stub::StubAdapter;
    use std::sync::Arc;

    fn step() -> PlanStep {
        PlanStep {
            step_number: 1,
            description: "count customers".to_string(),
            databases: vec!["customer_db".to_string()],
            tables: vec!["customers".to_string()],
            operation: Operation::Aggregation,
            depends_on_steps: vec![],
        }
    }

    async fn datasources() -> DatasourceManager {
        let catalog = DatasourceCatalog::from_entries(vec![CatalogEntry {
            id: "customer_db".to_string(),
            name: "Customers".to_string(),
            description: "customer records".to_string(),
            datasource: DatasourceSpec { kind: "sqlite".to_string(), path: ":memory:".to_string() },
        }]);
        DatasourceManager::connect(&catalog, &PoolConfig::default()).await.unwrap()
    }

    fn schema_catalog() -> SchemaCatalog {
        use nlsql_core::schema::{Column, SchemaDefinition, Table};
        let mut catalog = SchemaCatalog::new();
        catalog.insert(SchemaDefinition {
            db_id: "customer_db".to_string(),
            tables: vec![Table {
                name: "customers".to_string(),
                description: "customers".to_string(),
                columns: vec![Column {
                    name: "id".to_string(),
                    sql_type: "INTEGER".to_string(),
                    nullable: false,
                    description: String::new(),
                    foreign_key: None,
                }],
            }],
        });
        catalog
    }

    #[tokio::test]
    async fn succeeds_on_first_attempt() {
        let datasources = datasources().await;
        let schema_catalog = schema_catalog();
        let adapter = Adapter::Stub(StubAdapter::single(r#"{"sql": "SELECT 1 AS n", "target_db": "customer_db"}"#));
        let registry = Arc::new(PromptRegistry::with_defaults());
        let llm = LlmClient::new(adapter, registry, LlmConfig::default());

        let execution = execute_step(&step(), "how many customers?", &schema_catalog, &[], &llm, &datasources).await;
        assert!(execution.result.success);
        assert_eq!(execution.result.attempts, 1);
    }

    #[tokio::test]
    async fn rejects_step_spanning_two_datasources() {
        let datasources = datasources().await;
        let schema_catalog = schema_catalog();
        let adapter = Adapter::Stub(StubAdapter::single("{}"));
        let registry = Arc::new(PromptRegistry::with_defaults());
        let llm = LlmClient::new(adapter, registry, LlmConfig::default());

        let mut bad_step = step();
        bad_step.databases = vec!["customer_db".to_string(), "accounts_db".to_string()];

        let execution = execute_step(&bad_step, "q", &schema_catalog, &[], &llm, &datasources).await;
        assert!(!execution.result.success);
        assert_eq!(execution.result.attempts, 0);
    }

    #[tokio::test]
    async fn recovers_from_a_schema_error_on_retry() {
        let datasources = datasources().await;
        let schema_catalog = schema_catalog();
        let responses = vec![
            r#"{"sql": "SELECT * FROM customerz", "target_db": "customer_db"}"#.to_string(),
            r#"{"category": "schema", "recoverable": true, "reason": "typo", "suggested_sql": "SELECT 1 AS n"}"#.to_string(),
        ];
        let adapter = Adapter::Stub(StubAdapter::new(responses));
        let registry = Arc::new(PromptRegistry::with_defaults());
        let llm = LlmClient::new(adapter, registry, LlmConfig::default());

        let execution = execute_step(&step(), "how many customers?", &schema_catalog, &[], &llm, &datasources).await;
        assert!(execution.result.success);
        assert_eq!(execution.result.attempts, 2);
    }
}
