//! Anthropic Claude messages provider.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::{env_api_key, role_content_messages, ChatProvider, Message, ProviderError};

/// Environment variable holding the Anthropic API key.
pub const ANTHROPIC_API_KEY: &str = "ANTHROPIC_API_KEY";

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u64 = 1000;

/// Adapter for `POST {base}/messages`.
///
/// `max_tokens` is mandatory on this API; the adapter fills in a default
/// of 1000 unless the caller overrides it through the request options.
pub struct AnthropicChatCompletions {
    client: reqwest::Client,
    base_url: String,
}

impl Default for AnthropicChatCompletions {
    fn default() -> Self {
        Self::new()
    }
}

impl AnthropicChatCompletions {
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
        format!("{}/messages", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl ChatProvider for AnthropicChatCompletions {
    fn name(&self) -> &str {
        "anthropic"
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
        let api_key = env_api_key(ANTHROPIC_API_KEY)?;

        let mut body = Map::new();
        body.insert("model".into(), Value::String(model.to_string()));
        body.insert("max_tokens".into(), Value::from(DEFAULT_MAX_TOKENS));
        body.insert("messages".into(), formatted.clone());
        // options はデフォルトを上書きできる
        for (key, value) in options {
            body.insert(key.clone(), value.clone());
        }

        let response = self
            .client
            .post(self.endpoint())
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&Value::Object(body))
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(ProviderError::Provider(format!(
                "anthropic returned {}: {}",
                status, text
            )));
        }

        serde_json::from_str(&text)
            .map_err(|e| ProviderError::Provider(format!("anthropic returned invalid JSON: {}", e)))
    }

    fn extract(&self, raw: &Value) -> Result<String, ProviderError> {
        raw.pointer("/content/0/text")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| ProviderError::Extraction("no content[0].text in response".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extracts_first_content_block_text() {
        let provider = AnthropicChatCompletions::new();
        let raw = json!({
            "content": [ { "type": "text", "text": "Hi there." } ],
            "stop_reason": "end_turn"
        });

        assert_eq!(provider.extract(&raw).unwrap(), "Hi there.");
    }

    #[test]
    fn extract_fails_on_empty_content() {
        let provider = AnthropicChatCompletions::new();
        let err = provider.extract(&json!({ "content": [] })).unwrap_err();
        assert!(matches!(err, ProviderError::Extraction(_)));
    }

    #[test]
    fn formats_history_as_role_content_array() {
        let provider = AnthropicChatCompletions::new();
        let history = vec![Message::user("ping")];

        assert_eq!(
            provider.format_messages(&history),
            json!([{ "role": "user", "content": "ping" }])
        );
    }
}
