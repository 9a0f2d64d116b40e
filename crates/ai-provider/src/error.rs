use thiserror::Error;

/// Error type returned by provider adapters and the registry.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// No adapter registered for the requested provider spec.
    #[error("unknown provider spec: {0}")]
    UnknownProvider(String),

    /// Required API key is not present in the environment.
    #[error("missing credentials: {0} is not set")]
    MissingCredentials(&'static str),

    /// HTTP / transport errors.
    #[error("http error: {0}")]
    Http(String),

    /// The backend answered, but not with a usable response.
    #[error("provider error: {0}")]
    Provider(String),

    /// The assistant text could not be pulled out of a raw response.
    #[error("extraction error: {0}")]
    Extraction(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        ProviderError::Http(e.to_string())
    }
}
