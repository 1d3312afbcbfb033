use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use nlsql_core::schema::{PromptMode, SchemaCatalog};
use nlsql_core::types::{DataSourceSummary, QueryPlan, StepResult};
use nlsql_datasources::DatasourceManager;
use nlsql_executor::execute_step;
use nlsql_llm::LlmClient;
use nlsql_session::{Sender, SessionStore};
use uuid::Uuid;

use crate::error::OrchestratorError;
use crate::schemas::{DecisionAction, DecisionResult, SummaryResult, ValidationResult};
use crate::turn::TurnOutcome;

pub struct Orchestrator {
    llm: Arc<LlmClient>,
    schema_catalog: Arc<SchemaCatalog>,
    datasources: Arc<DatasourceManager>,
    catalog_summaries: Vec<DataSourceSummary>,
    session_store: Arc<dyn SessionStore>,
    history_window: usize,
    turn_deadline: Duration,
}

impl Orchestrator {
    pub fn new(
        llm: Arc<LlmClient>,
        schema_catalog: Arc<SchemaCatalog>,
        datasources: Arc<DatasourceManager>,
        session_store: Arc<dyn SessionStore>,
        history_window: usize,
        turn_deadline: Duration,
    ) -> Self {
        let catalog_summaries = datasources.list_sources().to_vec();
        Self { llm, schema_catalog, datasources, catalog_summaries, session_store, history_window, turn_deadline }
    }

    pub async fn handle_turn(&self, thread_id: Uuid, question: &str) -> Result<TurnOutcome, OrchestratorError> {
        let started = Instant::now();
        let deadline_passed = || started.elapsed() > self.turn_deadline;

        self.session_store.add_message(thread_id, Sender::User, question.to_string(), None).await?;

        let history = self.recent_history(thread_id).await?;
        let catalog_text = self.format_catalog();

        let mut vars = HashMap::new();
        vars.insert("catalog".to_string(), catalog_text);
        vars.insert("history".to_string(), history.clone());
        vars.insert("question".to_string(), question.to_string());

        let validation = self.llm.complete_structured::<ValidationResult>(nlsql_core::prompts::VALIDATE, &vars).await?;
        self.session_store.add_token_usage(thread_id, validation.usage.input_tokens, validation.usage.output_tokens).await?;

        if !validation.value.is_relevant {
            let outcome = TurnOutcome::Rejected {
                reason: validation.value.reason.unwrap_or_else(|| "question is not answerable from the available data".to_string()),
            };
            self.store_outcome(thread_id, &outcome).await?;
            return Ok(outcome);
        }

        let unknown: Vec<String> = validation
            .value
            .relevant_databases
            .iter()
            .filter(|id| !self.catalog_summaries.iter().any(|s| &s.id == *id))
            .cloned()
            .collect();
        if !unknown.is_empty() {
            let outcome = TurnOutcome::Rejected {
                reason: format!("validator returned unknown database id(s): {}", unknown.join(", ")),
            };
            self.store_outcome(thread_id, &outcome).await?;
            return Ok(outcome);
        }
        let known = validation.value.relevant_databases.clone();
        if let Err(e) = self.session_store.add_used_databases(thread_id, known.clone()).await {
            tracing::warn!(error = %e, "failed to record used databases; continuing turn");
        }

        let language = validation.value.language.clone().unwrap_or_else(|| "en".to_string());

        if deadline_passed() {
            let outcome = TurnOutcome::ExecutionError {
                failing_step: 0,
                error: "turn deadline exceeded before planning began".to_string(),
                plan: QueryPlan { summary: String::new(), language: String::new(), steps: vec![] },
                results: vec![],
            };
            self.store_outcome(thread_id, &outcome).await?;
            return Ok(outcome);
        }

        let mut decide_vars = HashMap::new();
        decide_vars.insert("question".to_string(), question.to_string());
        decide_vars.insert("relevant_databases".to_string(), known.join(", "));
        decide_vars.insert("history".to_string(), history);
        decide_vars.insert("language".to_string(), language.clone());

        let decision = self.llm.complete_structured::<DecisionResult>(nlsql_core::prompts::DECIDE, &decide_vars).await?;
        self.session_store.add_token_usage(thread_id, decision.usage.input_tokens, decision.usage.output_tokens).await?;

        let outcome = match decision.value.action {
            DecisionAction::AnswerDirectly => TurnOutcome::AnswerDirect {
                text: decision.value.message.unwrap_or_default(),
            },
            DecisionAction::AskClarification => TurnOutcome::Clarification {
                question: decision.value.message.unwrap_or_else(|| "could you clarify your question?".to_string()),
            },
            DecisionAction::Reject => TurnOutcome::Rejected {
                reason: decision.value.message.unwrap_or_else(|| "request was rejected".to_string()),
            },
            DecisionAction::CreatePlan => self.plan_and_execute(thread_id, question, &known, &language).await?,
        };

        self.store_outcome(thread_id, &outcome).await?;
        Ok(outcome)
    }

    async fn plan_and_execute(
        &self,
        thread_id: Uuid,
        question: &str,
        db_ids: &[String],
        language: &str,
    ) -> Result<TurnOutcome, OrchestratorError> {
        let schemas = match self.schema_catalog.format_for_prompt(db_ids, PromptMode::Planning) {
            Ok(text) => text,
            Err(e) => return Ok(TurnOutcome::PlanError { reason: e.to_string() }),
        };

        let mut vars = HashMap::new();
        vars.insert("question".to_string(), question.to_string());
        vars.insert("schemas".to_string(), schemas);
        vars.insert("language".to_string(), language.to_string());

        let plan_completion = self.llm.complete_structured::<QueryPlan>(nlsql_core::prompts::PLAN, &vars).await?;
        self.session_store
            .add_token_usage(thread_id, plan_completion.usage.input_tokens, plan_completion.usage.output_tokens)
            .await?;
        let plan = plan_completion.value;

        if let Err(reason) = plan.validate_structure() {
            return Ok(TurnOutcome::PlanError { reason });
        }
        if let Err(reason) = self.validate_plan_against_catalog(&plan) {
            return Ok(TurnOutcome::PlanError { reason });
        }

        let mut results: Vec<StepResult> = Vec::with_capacity(plan.steps.len());
        for step in &plan.steps {
            let execution = execute_step(step, question, &self.schema_catalog, &results, &self.llm, &self.datasources).await;
            self.session_store
                .add_token_usage(thread_id, execution.usage.input_tokens, execution.usage.output_tokens)
                .await?;
            let failed = !execution.result.success;
            let step_number = execution.result.step_number;
            let error = execution.result.error.clone();
            results.push(execution.result);
            if failed {
                return Ok(TurnOutcome::ExecutionError {
                    failing_step: step_number,
                    error: error.unwrap_or_else(|| "step failed".to_string()),
                    plan,
                    results,
                });
            }
        }

        let confirmed_language = if plan.language.is_empty() { language } else { plan.language.as_str() };
        self.summarize(thread_id, question, &plan, &results, confirmed_language).await
    }

    async fn summarize(
        &self,
        thread_id: Uuid,
        question: &str,
        plan: &QueryPlan,
        results: &[StepResult],
        language: &str,
    ) -> Result<TurnOutcome, OrchestratorError> {
        let mut vars = HashMap::new();
        vars.insert("question".to_string(), question.to_string());
        vars.insert("plan".to_string(), serde_json::to_string(plan).unwrap_or_default());
        vars.insert("results".to_string(), serde_json::to_string(results).unwrap_or_default());
        vars.insert("language".to_string(), language.to_string());

        let summary = self.llm.complete_structured::<SummaryResult>(nlsql_core::prompts::SUMMARIZE, &vars).await?;
        self.session_store
            .add_token_usage(thread_id, summary.usage.input_tokens, summary.usage.output_tokens)
            .await?;

        Ok(TurnOutcome::Answer {
            text: summary.value.answer,
            confidence: summary.value.confidence,
            data_sources_used: summary.value.data_sources_used,
        })
    }

    fn validate_plan_against_catalog(&self, plan: &QueryPlan) -> Result<(), String> {
        for step in &plan.steps {
            for db_id in &step.databases {
                if self.schema_catalog.schema_for(db_id).is_err() {
                    return Err(format!("step {} references unknown database {db_id}", step.step_number));
                }
            }
            for table in &step.tables {
                let known = step.databases.iter().any(|db| self.schema_catalog.has_table(db, table));
                if !known {
                    return Err(format!(
                        "step {} references table {table} not present in any of its databases",
                        step.step_number
                    ));
                }
            }
        }
        Ok(())
    }

    async fn recent_history(&self, thread_id: Uuid) -> Result<String, OrchestratorError> {
        let messages = self.session_store.get_messages(thread_id).await?;
        let tail: Vec<String> = messages
            .iter()
            .rev()
            .take(self.history_window)
            .rev()
            .map(|m| format!("{:?}: {}", m.sender, m.content))
            .collect();
        Ok(if tail.is_empty() { "none".to_string() } else { tail.join("\n") })
    }

    fn format_catalog(&self) -> String {
        self.catalog_summaries
            .iter()
            .map(|s| format!("{} - {}: {}", s.id, s.name, s.description))
            .collect::<Vec<_>>()
            .join("\n")
    }

    async fn store_outcome(&self, thread_id: Uuid, outcome: &TurnOutcome) -> Result<(), OrchestratorError> {
        let text = match outcome {
            TurnOutcome::Rejected { reason } => reason.clone(),
            TurnOutcome::Clarification { question } => question.clone(),
            TurnOutcome::AnswerDirect { text } => text.clone(),
            TurnOutcome::Answer { text, .. } => text.clone(),
            TurnOutcome::PlanError { reason } => reason.clone(),
            TurnOutcome::ExecutionError { error, .. } => error.clone(),
        };
        let metadata = serde_json::to_value(outcome).ok();
        self.session_store.add_message(thread_id, Sender::Server, text, metadata).await?;
        Ok(())
    }
}
