use nlsql_core::config::LlmConfig;

use crate::adapter::Adapter;
use crate::adapters::{anthropic::AnthropicAdapter, openai::OpenAiAdapter, stub::StubAdapter};

pub fn build_adapter(config: &LlmConfig) -> Adapter {
    match config.provider.as_str() {
        "openai" => Adapter::OpenAi(OpenAiAdapter::new(
            config.api_key.clone(),
            config.base_url.clone(),
            config.timeout_seconds,
        )),
        "anthropic" => Adapter::Anthropic(AnthropicAdapter::new(
            config.api_key.clone(),
            config.base_url.clone(),
            config.timeout_seconds,
        )),
        _ => Adapter::Stub(StubAdapter::new(Vec::new())),
    }
}
