use std::sync::Mutex;

use async_trait::async_trait;

use crate::adapter::LlmAdapter;
use crate::client::Usage;
use crate::error::LlmError;

/// Deterministic adapter for tests and for running the agent without a real
/// provider key. Responses are consumed in order; once exhausted, the last
/// response is repeated so long-running test scenarios don't panic.
pub struct StubAdapter {
    responses: Mutex<Vec<String>>,
    cursor: Mutex<usize>,
}

impl StubAdapter {
    pub fn new(responses: Vec<String>) -> Self {
        Self {
            responses: Mutex::new(responses),
            cursor: Mutex::new(0),
        }
    }

    pub fn single(response: impl Into<String>) -> Self {
        Self::new(vec![response.into()])
    }
}

#[async_trait]
impl LlmAdapter for StubAdapter {
    async fn complete(
        &self,
        _system_prompt: &str,
        _user_prompt: &str,
        _model: &str,
        _temperature: f32,
    ) -> Result<(String, Usage), LlmError> {
        let responses = self.responses.lock().expect("stub mutex poisoned");
        if responses.is_empty() {
            return Err(LlmError::Provider("stub adapter has no responses configured".to_string()));
        }
        let mut cursor = self.cursor.lock().expect("stub mutex poisoned");
        let idx = (*cursor).min(responses.len() - 1);
        let response = responses[idx].clone();
        if *cursor < responses.len() - 1 {
            *cursor += 1;
        }
        Ok((response, Usage { input_tokens: 10, output_tokens: 10 }))
    }

    fn provider_name(&self) -> &'static str {
        "stub"
    }
}
