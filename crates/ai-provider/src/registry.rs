//! Runtime registry of provider adapters.
//!
//! Entries are keyed by `"<provider>:<capability>"` strings and looked up
//! exactly — no pattern matching, no fallback. The registry is
//! process-wide configuration state: populated at startup, optionally
//! extended during a session. Registering an already-present spec
//! replaces the adapter (last write wins); the interior lock keeps
//! concurrent registration during active turns safe.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::{
    AnthropicChatCompletions, ChatProvider, GeminiChatCompletions, OpenAiChatCompletions,
    ProviderError,
};

pub struct ProviderRegistry {
    providers: RwLock<HashMap<String, Arc<dyn ChatProvider>>>,
}

impl ProviderRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            providers: RwLock::new(HashMap::new()),
        }
    }

    /// Registry pre-populated with the built-in chat providers.
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        registry.register(
            "openai:chat.completions",
            Arc::new(OpenAiChatCompletions::new()),
        );
        registry.register(
            "gemini:chat.completions",
            Arc::new(GeminiChatCompletions::new()),
        );
        registry.register(
            "anthropic:chat.completions",
            Arc::new(AnthropicChatCompletions::new()),
        );
        registry
    }

    /// Register or replace the adapter for a provider spec.
    pub fn register(&self, spec: impl Into<String>, provider: Arc<dyn ChatProvider>) {
        let spec = spec.into();
        log::debug!("registering provider adapter for {}", spec);
        let mut guard = self
            .providers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        guard.insert(spec, provider);
    }

    /// Look up the adapter for a provider spec.
    pub fn get(&self, spec: &str) -> Result<Arc<dyn ChatProvider>, ProviderError> {
        let guard = self
            .providers
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        guard
            .get(spec)
            .cloned()
            .ok_or_else(|| ProviderError::UnknownProvider(spec.to_string()))
    }

    /// Registered provider specs, sorted for stable inspection output.
    pub fn specs(&self) -> Vec<String> {
        let guard = self
            .providers
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        let mut specs: Vec<String> = guard.keys().cloned().collect();
        specs.sort();
        specs
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::{Map, Value};

    struct StubProvider {
        name: &'static str,
    }

    #[async_trait]
    impl ChatProvider for StubProvider {
        fn name(&self) -> &str {
            self.name
        }

        fn format_messages(&self, _history: &[crate::Message]) -> Value {
            Value::Null
        }

        async fn invoke(
            &self,
            _formatted: &Value,
            _model: &str,
            _options: &Map<String, Value>,
        ) -> Result<Value, ProviderError> {
            Ok(Value::Null)
        }

        fn extract(&self, _raw: &Value) -> Result<String, ProviderError> {
            Ok(self.name.to_string())
        }
    }

    #[test]
    fn defaults_cover_the_three_chat_backends() {
        let registry = ProviderRegistry::with_defaults();
        assert_eq!(
            registry.specs(),
            vec![
                "anthropic:chat.completions",
                "gemini:chat.completions",
                "openai:chat.completions"
            ]
        );
    }

    #[test]
    fn unknown_spec_fails_fast() {
        let registry = ProviderRegistry::new();
        let err = registry.get("openai:tts").err().unwrap();
        assert!(matches!(err, ProviderError::UnknownProvider(spec) if spec == "openai:tts"));
    }

    #[test]
    fn registration_replaces_last_write_wins() {
        let registry = ProviderRegistry::new();
        registry.register("mock:chat", Arc::new(StubProvider { name: "first" }));
        registry.register("mock:chat", Arc::new(StubProvider { name: "second" }));

        let provider = registry.get("mock:chat").unwrap();
        assert_eq!(provider.name(), "second");
    }

    #[test]
    fn lookup_is_exact_no_fallback() {
        let registry = ProviderRegistry::with_defaults();
        assert!(registry.get("openai").is_err());
        assert!(registry.get("openai:chat").is_err());
        assert!(registry.get("openai:chat.completions").is_ok());
    }
}
