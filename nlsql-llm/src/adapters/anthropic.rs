use async_trait::async_trait;
use serde_json::json;

use crate::adapter::LlmAdapter;
use crate::client::Usage;
use crate::error::LlmError;

pub struct AnthropicAdapter {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl AnthropicAdapter {
    pub fn new(api_key: String, base_url: Option<String>, timeout_seconds: u64) -> Self {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_seconds))
            .build()
            .expect("reqwest client builds with default TLS backend");
        Self {
            http,
            base_url: base_url.unwrap_or_else(|| "https://api.anthropic.com/v1".to_string()),
            api_key,
        }
    }

    fn extract_content(body: &serde_json::Value) -> Result<String, LlmError> {
        body["content"][0]["text"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| LlmError::InvalidResponse(body.to_string()))
    }

    fn extract_usage(body: &serde_json::Value) -> Usage {
        Usage {
            input_tokens: body["usage"]["input_tokens"].as_u64().unwrap_or(0),
            output_tokens: body["usage"]["output_tokens"].as_u64().unwrap_or(0),
        }
    }
}

#[async_trait]
impl LlmAdapter for AnthropicAdapter {
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        model: &str,
        temperature: f32,
    ) -> Result<(String, Usage), LlmError> {
        let request = json!({
            "model": model,
            "max_tokens": 4096,
            "temperature": temperature,
            "system": system_prompt,
            "messages": [ { "role": "user", "content": user_prompt } ],
        });
        let response = self
            .http
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .json(&request)
            .send()
            .await?;
        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(LlmError::Provider(format!("anthropic {status}: {text}")));
        }
        let body: serde_json::Value = response.json().await?;
        let content = Self::extract_content(&body)?;
        let usage = Self::extract_usage(&body);
        Ok((content, usage))
    }

    fn provider_name(&self) -> &'static str {
        "anthropic"
    }
}
