use async_trait::async_trait;

/// Request to a model provider. Responses are non-streaming; the bot replies
/// in whole messages.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub system: String,
    pub user: String,
    pub max_tokens: u32,
}

#[derive(Debug, Clone)]
pub struct ChatResponse {
    pub content: String,
}

/// Common interface for the primary and backup model providers.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider name for logging and error messages.
    fn name(&self) -> &str;

    async fn send(&self, req: &ChatRequest) -> Result<ChatResponse, ProviderError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    #[error("quota exhausted")]
    QuotaExhausted,

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("request timed out")]
    Timeout,

    #[error("Provider unavailable: {0}")]
    Unavailable(String),
}
