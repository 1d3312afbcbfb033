use async_trait::async_trait;
use serde_json::json;

use crate::adapter::LlmAdapter;
use crate::client::Usage;
use crate::error::LlmError;

pub struct OpenAiAdapter {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl OpenAiAdapter {
    pub fn new(api_key: String, base_url: Option<String>, timeout_seconds: u64) -> Self {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_seconds))
            .build()
            .expect("reqwest client builds with default TLS backend");
        Self {
            http,
            base_url: base_url.unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
            api_key,
        }
    }

    fn build_request(&self, system_prompt: &str, user_prompt: &str, model: &str, temperature: f32) -> serde_json::Value {
        json!({
            "model": model,
            "temperature": temperature,
            "messages": [
                { "role": "system", "content": system_prompt },
                { "role": "user", "content": user_prompt },
            ],
        })
    }

    fn extract_content(body: &serde_json::Value) -> Result<String, LlmError> {
        body["choices"][0]["message"]["content"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| LlmError::InvalidResponse(body.to_string()))
    }

    fn extract_usage(body: &serde_json::Value) -> Usage {
        Usage {
            input_tokens: body["usage"]["prompt_tokens"].as_u64().unwrap_or(0),
            output_tokens: body["usage"]["completion_tokens"].as_u64().unwrap_or(0),
        }
    }
}

#[async_trait]
impl LlmAdapter for OpenAiAdapter {
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        model: &str,
        temperature: f32,
    ) -> Result<(String, Usage), LlmError> {
        let request = self.build_request(system_prompt, user_prompt, model, temperature);
        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;
        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(LlmError::Provider(format!("openai {status}: {text}")));
        }
        let body: serde_json::Value = response.json().await?;
        let content = Self::extract_content(&body)?;
        let usage = Self::extract_usage(&body);
        Ok((content, usage))
    }

    fn provider_name(&self) -> &'static str {
        "openai"
    }
}
