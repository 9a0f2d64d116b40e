//! Google Gemini chat completions provider.

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use crate::{env_api_key, role_content_messages, ChatProvider, Message, ProviderError};

/// Environment variable holding the Gemini API key.
pub const GEMINI_API_KEY: &str = "GEMINI_API_KEY";

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Adapter for `POST {base}/models/{model}:generateContent`.
///
/// Each call opens a fresh chat and sends only the newest message from
/// the formatted history; earlier turns are not replayed to the backend.
pub struct GeminiChatCompletions {
    client: reqwest::Client,
    base_url: String,
}

impl Default for GeminiChatCompletions {
    fn default() -> Self {
        Self::new()
    }
}

impl GeminiChatCompletions {
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

    fn endpoint(&self, model: &str) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            model
        )
    }
}

#[async_trait]
impl ChatProvider for GeminiChatCompletions {
    fn name(&self) -> &str {
        "gemini"
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
        let api_key = env_api_key(GEMINI_API_KEY)?;

        let current = formatted
            .as_array()
            .and_then(|messages| messages.last())
            .and_then(|message| message.get("content"))
            .and_then(Value::as_str)
            .ok_or_else(|| {
                ProviderError::Provider("gemini invoke needs at least one formatted message".into())
            })?;

        let mut body = Map::new();
        body.insert(
            "contents".into(),
            json!([{ "role": "user", "parts": [{ "text": current }] }]),
        );
        for (key, value) in options {
            body.insert(key.clone(), value.clone());
        }

        let response = self
            .client
            .post(self.endpoint(model))
            .header("x-goog-api-key", api_key)
            .json(&Value::Object(body))
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(ProviderError::Provider(format!(
                "gemini returned {}: {}",
                status, text
            )));
        }

        serde_json::from_str(&text)
            .map_err(|e| ProviderError::Provider(format!("gemini returned invalid JSON: {}", e)))
    }

    fn extract(&self, raw: &Value) -> Result<String, ProviderError> {
        raw.pointer("/candidates/0/content/parts/0/text")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                ProviderError::Extraction(
                    "no candidates[0].content.parts[0].text in response".into(),
                )
            })
    }
}
