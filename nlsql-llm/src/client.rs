use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use nlsql_core::config::LlmConfig;
use nlsql_core::prompts::PromptRegistry;
use serde::de::DeserializeOwned;

use crate::adapter::{Adapter, LlmAdapter};
use crate::error::LlmError;
use crate::structured::parse_structured;

#[derive(Debug, Clone, Copy, Default)]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// Full record of a single call, populated only when `debug_trace` is enabled.
/// Producing this never changes pipeline control flow.
#[derive(Debug, Clone)]
pub struct DebugTrace {
    pub model_id: String,
    pub system_prompt: String,
    pub user_prompt: String,
    pub response: String,
    pub usage: Usage,
    pub elapsed_ms: u128,
}

#[derive(Debug, Clone)]
pub struct Completion<T> {
    pub value: T,
    pub usage: Usage,
    pub trace: Option<DebugTrace>,
}

/// The single LLM entry point used by every orchestration stage. Wraps one
/// provider `Adapter`, the shared `PromptRegistry`, and the configured model
/// tier-to-id mapping.
pub struct LlmClient {
    adapter: Adapter,
    registry: Arc<PromptRegistry>,
    llm_config: LlmConfig,
}

impl LlmClient {
    pub fn new(adapter: Adapter, registry: Arc<PromptRegistry>, llm_config: LlmConfig) -> Self {
        Self { adapter, registry, llm_config }
    }

    async fn call(
        &self,
        template_name: &str,
        vars: &HashMap<String, String>,
    ) -> Result<(String, Usage, DebugTrace), LlmError> {
        let template = self
            .registry
            .get(template_name)
            .map_err(|e| LlmError::Provider(e.to_string()))?;
        let (system_prompt, user_prompt) = template.render(vars);
        let model = self.llm_config.model_for(template.model_tier).to_string();

        let start = Instant::now();
        let (response, usage) = self
            .adapter
            .complete(&system_prompt, &user_prompt, &model, template.temperature)
            .await?;
        let elapsed_ms = start.elapsed().as_millis();

        tracing::debug!(
            provider = self.adapter.provider_name(),
            template = template_name,
            model = %model,
            input_tokens = usage.input_tokens,
            output_tokens = usage.output_tokens,
            elapsed_ms,
            "llm call completed"
        );

        let trace = DebugTrace {
            model_id: model,
            system_prompt,
            user_prompt,
            response: response.clone(),
            usage,
            elapsed_ms,
        };
        Ok((response, usage, trace))
    }

    /// Free-form text completion. Rarely used; every pipeline stage prefers
    /// `complete_structured`.
    pub async fn complete(
        &self,
        template_name: &str,
        vars: &HashMap<String, String>,
    ) -> Result<Completion<String>, LlmError> {
        let (response, usage, trace) = self.call(template_name, vars).await?;
        Ok(Completion {
            value: response,
            usage,
            trace: self.llm_config.debug_trace.then_some(trace),
        })
    }

    /// Parses and validates the response against `T` before returning it. Callers
    /// never see malformed structured output — only a categorized `LlmError`.
    pub async fn complete_structured<T: DeserializeOwned>(
        &self,
        template_name: &str,
        vars: &HashMap<String, String>,
    ) -> Result<Completion<T>, LlmError> {
        let (response, usage, trace) = self.call(template_name, vars).await?;
        let value: T = parse_structured(&response)?;
        Ok(Completion {
            value,
            usage,
            trace: self.llm_config.debug_trace.then_some(trace),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::stub::StubAdapter;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Decision {
        answer: bool,
    }

    #[tokio::test]
    async fn complete_structured_parses_stub_response() {
        let adapter = Adapter::Stub(StubAdapter::single(r#"{"answer": true}"#));
        let registry = Arc::new(PromptRegistry::with_defaults());
        let client = LlmClient::new(adapter, registry, LlmConfig::default());
        let result: Completion<Decision> = client
            .complete_structured(nlsql_core::prompts::VALIDATE, &HashMap::new())
            .await
            .unwrap();
        assert!(result.value.answer);
        assert_eq!(result.usage.input_tokens, 10);
    }

    #[tokio::test]
    async fn unknown_template_is_an_error() {
        let adapter = Adapter::Stub(StubAdapter::single("{}"));
        let registry = Arc::new(PromptRegistry::with_defaults());
        let client = LlmClient::new(adapter, registry, LlmConfig::default());
        let result: Result<Completion<Decision>, _> =
            client.complete_structured("not_a_template", &HashMap::new()).await;
        assert!(result.is_err());
    }
}
