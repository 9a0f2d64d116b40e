//! Provider adapters for multiple AI chat backends.
//!
//! Every backend is exposed through the same four-operation capability:
//! construct a client (the adapter constructor), reformat the stored
//! message history into the provider's wire shape, invoke the backend,
//! and extract the assistant text from the raw response. Once you learn
//! one provider, you've learned them all.
//!
//! Adapters are looked up in a [`ProviderRegistry`] by spec strings of the
//! form `"<provider>:<capability>"` (e.g. `"openai:chat.completions"`).

use async_trait::async_trait;
use serde_json::{Map, Value};

pub mod anthropic;
pub mod error;
pub mod gemini;
pub mod openai;
pub mod registry;

pub use anthropic::AnthropicChatCompletions;
pub use chat_store::{Message, MessageRole};
pub use error::ProviderError;
pub use gemini::GeminiChatCompletions;
pub use openai::OpenAiChatCompletions;
pub use registry::ProviderRegistry;

/// Async trait implemented by provider adapters.
#[async_trait]
pub trait ChatProvider: Send + Sync + 'static {
    /// Human-readable provider name (e.g. "openai").
    fn name(&self) -> &str;

    /// Reformat the stored message history into whatever shape this
    /// provider's invoke operation expects.
    fn format_messages(&self, history: &[Message]) -> Value;

    /// Call the backend with formatted messages, a model identifier and
    /// free-form request options, returning the raw response value.
    async fn invoke(
        &self,
        formatted: &Value,
        model: &str,
        options: &Map<String, Value>,
    ) -> Result<Value, ProviderError>;

    /// Pull the assistant's textual content out of a raw response.
    fn extract(&self, raw: &Value) -> Result<String, ProviderError>;
}

/// Read an API key from the ambient environment.
///
/// Keys are resolved at invoke time so a registry can be built and
/// inspected without credentials present.
pub(crate) fn env_api_key(var: &'static str) -> Result<String, ProviderError> {
    std::env::var(var).map_err(|_| ProviderError::MissingCredentials(var))
}

/// Project history into the `[{role, content}]` shape shared by the chat
/// completion APIs. Extra message fields stay local and never go over
/// the wire.
pub(crate) fn role_content_messages(history: &[Message]) -> Value {
    Value::Array(
        history
            .iter()
            .map(|m| serde_json::json!({ "role": m.role, "content": m.content }))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn role_content_projection_drops_extra_fields() {
        let history = vec![
            Message::system("Be brief."),
            Message::user("hi").with_extra("client_ts", json!(1700000000)),
        ];

        let formatted = role_content_messages(&history);
        assert_eq!(
            formatted,
            json!([
                { "role": "system", "content": "Be brief." },
                { "role": "user", "content": "hi" }
            ])
        );
    }
}
