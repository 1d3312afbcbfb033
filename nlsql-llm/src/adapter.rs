use async_trait::async_trait;

use crate::adapters::{anthropic::AnthropicAdapter, openai::OpenAiAdapter, stub::StubAdapter};
use crate::client::Usage;
use crate::error::LlmError;

/// A single provider call: system + user prompt in, raw text + usage out.
/// Structured-output validation happens above this layer (`structured.rs`);
/// adapters only know how to talk to one wire protocol.
#[async_trait]
pub trait LlmAdapter: Send + Sync {
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        model: &str,
        temperature: f32,
    ) -> Result<(String, Usage), LlmError>;

    fn provider_name(&self) -> &'static str;
}

/// Enum dispatch over the supported providers. `LlmAdapter` itself is already
/// dyn-compatible (no generic methods), but the fleet is small and fixed, and an
/// enum keeps provider construction and config matching in one place rather than
/// scattering `Box<dyn LlmAdapter>` construction across call sites.
pub enum Adapter {
    OpenAi(OpenAiAdapter),
    Anthropic(AnthropicAdapter),
    Stub(StubAdapter),
}

#[async_trait]
impl LlmAdapter for Adapter {
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        model: &str,
        temperature: f32,
    ) -> Result<(String, Usage), LlmError> {
        match self {
            Adapter::OpenAi(a) => a.complete(system_prompt, user_prompt, model, temperature).await,
            Adapter::Anthropic(a) => a.complete(system_prompt, user_prompt, model, temperature).await,
            Adapter::Stub(a) => a.complete(system_prompt, user_prompt, model, temperature).await,
        }
    }

    fn provider_name(&self) -> &'static str {
        match self {
            Adapter::OpenAi(a) => a.provider_name(),
            Adapter::Anthropic(a) => a.provider_name(),
            Adapter::Stub(a) => a.provider_name(),
        }
    }
}
