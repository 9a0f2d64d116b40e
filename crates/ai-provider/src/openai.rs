//! OpenAI chat completions provider.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::{env_api_key, role_content_messages, ChatProvider, Message, ProviderError};

/// Environment variable holding the OpenAI API key.
pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Adapter for `POST {base}/chat/completions`.
///
/// The bearer token is read from `OPENAI_API_KEY` when a call is made,
/// not when the adapter is constructed.
pub struct OpenAiChatCompletions {
    client: reqwest::Client,
    base_url: String,
}

impl Default for OpenAiChatCompletions {
    fn default() -> Self {
        Self::new()
    }
}

impl OpenAiChatCompletions {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Point the adapter at a different endpoint (proxies, tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl ChatProvider for OpenAiChatCompletions {
    fn name(&self) -> &str {
        "openai"
    }

    fn format_messages(&self, history: &[Message]) -> Value {
        role_content_messages(history)
    }

    async fn invoke(
        &self,
        formatted: &Value,
        model: &str,
        options: &Map<String, Value>,
    ) -> Result<Value, ProviderError> {
        let api_key = env_api_key(OPENAI_API_KEY)?;

        let mut body = Map::new();
        body.insert("model".into(), Value::String(model.to_string()));
        body.insert("messages".into(), formatted.clone());
        for (key, value) in options {
            body.insert(key.clone(), value.clone());
        }

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(api_key)
            .json(&Value::Object(body))
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(ProviderError::Provider(format!(
                "openai returned {}: {}",
                status, text
            )));
        }

        serde_json::from_str(&text)
            .map_err(|e| ProviderError::Provider(format!("openai returned invalid JSON: {}", e)))
    }

    fn extract(&self, raw: &Value) -> Result<String, ProviderError> {
        raw.pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                ProviderError::Extraction("no choices[0].message.content in response".into())
            })
    }
}
