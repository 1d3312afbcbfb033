use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelTier {
    Weak,
    Planning,
    Developer,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptTemplate {
    pub name: String,
    pub model_tier: ModelTier,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    pub system_prompt: String,
    pub user_prompt: String,
}

fn default_temperature() -> f32 {
    0.2
}

impl PromptTemplate {
    /// Substitutes `${var}` placeholders against `vars`. Unknown placeholders are
    /// left untouched; missing required keys are a caller concern, not this method's.
    pub fn render(&self, vars: &HashMap<String, String>) -> (String, String) {
        (substitute(&self.system_prompt, vars), substitute(&self.user_prompt, vars))
    }
}

fn substitute(template: &str, vars: &HashMap<String, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let tail = &rest[start + 2..];
        if let Some(end) = tail.find('}') {
            let key = &tail[..end];
            match vars.get(key) {
                Some(value) => out.push_str(value),
                None => {
                    out.push_str("${");
                    out.push_str(key);
                    out.push('}');
                }
            }
            rest = &tail[end + 1..];
        } else {
            out.push_str("${");
            rest = tail;
        }
    }
    out.push_str(rest);
    out
}

/// Named prompt templates, one per orchestration stage. Loaded from a YAML file
/// at startup with a compiled-in default set used for any name the file omits.
#[derive(Debug, Clone, Default)]
pub struct PromptRegistry {
    templates: HashMap<String, PromptTemplate>,
}

pub const VALIDATE: &str = "validate";
pub const DECIDE: &str = "decide";
pub const PLAN: &str = "plan";
pub const GENERATE_SQL: &str = "generate_sql";
pub const ANALYZE_ERROR: &str = "analyze_error";
pub const SUMMARIZE: &str = "summarize";

impl PromptRegistry {
    pub fn with_defaults() -> Self {
        let mut registry = Self::default();
        for template in default_templates() {
            registry.templates.insert(template.name.clone(), template);
        }
        registry
    }

    /// Loads overrides from `path` (a YAML list of `PromptTemplate`) on top of the
    /// compiled-in defaults. Names absent from the file keep their default.
    pub fn load_with_overrides(path: &Path) -> Result<Self> {
        let mut registry = Self::with_defaults();
        if !path.exists() {
            return Ok(registry);
        }
        let contents = std::fs::read_to_string(path).map_err(|e| CoreError::DeclarativeLoad {
            path: path.display().to_string(),
            source: e.into(),
        })?;
        let overrides: Vec<PromptTemplate> =
            serde_yaml::from_str(&contents).map_err(|e| CoreError::DeclarativeLoad {
                path: path.display().to_string(),
                source: e.into(),
            })?;
        for template in overrides {
            registry.templates.insert(template.name.clone(), template);
        }
        Ok(registry)
    }

    pub fn get(&self, name: &str) -> Result<&PromptTemplate> {
        self.templates
            .get(name)
            .ok_or_else(|| CoreError::UnknownTemplate(name.to_string()))
    }
}

fn default_templates() -> Vec<PromptTemplate> {
    vec![
        PromptTemplate {
            name: VALIDATE.to_string(),
            model_tier: ModelTier::Weak,
            temperature: 0.0,
            system_prompt: "You decide whether a user question can be answered from the \
                given data sources. Respond only with the structured schema you are given."
                .to_string(),
            user_prompt: "Data sources:\n${catalog}\n\nRecent history:\n${history}\n\nQuestion: ${question}"
                .to_string(),
        },
        PromptTemplate {
            name: DECIDE.to_string(),
            model_tier: ModelTier::Planning,
            temperature: 0.2,
            system_prompt: "You choose how to respond to a data question: answer directly, \
                ask a clarifying question, create a query plan, or reject."
                .to_string(),
            user_prompt: "Question: ${question}\nRelevant databases: ${relevant_databases}\nHistory:\n${history}\nRespond in language: ${language}"
                .to_string(),
        },
        PromptTemplate {
            name: PLAN.to_string(),
            model_tier: ModelTier::Planning,
            temperature: 0.2,
            system_prompt: "You produce an ordered query plan over the given database ids and \
                their table schemas. Each step must reference only the listed database ids and \
                tables that exist within them."
                .to_string(),
            user_prompt: "Question: ${question}\nSchemas:\n${schemas}\nQuestion language: ${language}".to_string(),
        },
        PromptTemplate {
            name: GENERATE_SQL.to_string(),
            model_tier: ModelTier::Developer,
            temperature: 0.0,
            system_prompt: "You write a single read-only SQL statement (SELECT or WITH) for \
                the given step against the given schema. Never write INSERT, UPDATE, DELETE, or DDL."
                .to_string(),
            user_prompt: "Step: ${step}\nSchema:\n${schema}\nPrior results:\n${prior_results}"
                .to_string(),
        },
        PromptTemplate {
            name: ANALYZE_ERROR.to_string(),
            model_tier: ModelTier::Developer,
            temperature: 0.0,
            system_prompt: "A SQL statement failed. Categorize the failure and, if recoverable, \
                propose a corrected statement."
                .to_string(),
            user_prompt: "Step: ${step}\nQuestion: ${question}\nAttempted SQL: ${sql}\nDatabase error: ${error}\nAttempt: ${attempt}"
                .to_string(),
        },
        PromptTemplate {
            name: SUMMARIZE.to_string(),
            model_tier: ModelTier::Planning,
            temperature: 0.3,
            system_prompt: "You summarize query results into a natural-language answer in the \
                same language as the question, with a confidence level and the data sources used."
                .to_string(),
            user_prompt: "Question: ${question}\nPlan: ${plan}\nResults:\n${results}\nAnswer in language: ${language}".to_string(),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_known_variables_and_leaves_unknown() {
        let mut vars = HashMap::new();
        vars.insert("question".to_string(), "how many rows?".to_string());
        let template = PromptTemplate {
            name: "t".to_string(),
            model_tier: ModelTier::Weak,
            temperature: 0.0,
            system_prompt: "sys".to_string(),
            user_prompt: "Q: ${question} X: ${missing}".to_string(),
        };
        let (_, user) = template.render(&vars);
        assert_eq!(user, "Q: how many rows? X: ${missing}");
    }

    #[test]
    fn defaults_cover_every_stage_name() {
        let registry = PromptRegistry::with_defaults();
        for name in [VALIDATE, DECIDE, PLAN, GENERATE_SQL, ANALYZE_ERROR, SUMMARIZE] {
            assert!(registry.get(name).is_ok(), "missing default template: {name}");
        }
    }

    #[test]
    fn overrides_from_missing_file_keep_defaults() {
        let registry = PromptRegistry::load_with_overrides(Path::new("/nonexistent.yaml")).unwrap();
        assert!(registry.get(VALIDATE).is_ok());
    }
}
