use thiserror::Error;

#[derive(Debug, Error)]
pub enum AshError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid credentials: {0}")]
    Credentials(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Gateway error: {0}")]
    Gateway(String),

    #[error("AI provider error: {0}")]
    Provider(String),

    #[error("Metadata service error: {0}")]
    Metadata(String),

    #[error("Media source error: {0}")]
    Source(String),

    #[error("Permission denied: {reason}")]
    PermissionDenied { reason: String },

    #[error("{0}")]
    UserInput(String),

    #[error("Request timeout after {ms}ms")]
    Timeout { ms: u64 },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AshError {
    /// Process exit code for fatal startup errors.
    ///
    /// 0 is reserved for a normal shutdown; anything that reaches
    /// `std::process::exit` through this path is a startup failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            AshError::Config(_) => 1,
            AshError::Credentials(_) => 2,
            AshError::Provider(_) => 3,
            _ => 1,
        }
    }

    /// Short error code string used in structured log fields.
    pub fn code(&self) -> &'static str {
        match self {
            AshError::Config(_) => "CONFIG_ERROR",
            AshError::Credentials(_) => "CREDENTIALS_INVALID",
            AshError::Database(_) => "DATABASE_ERROR",
            AshError::Gateway(_) => "GATEWAY_ERROR",
            AshError::Provider(_) => "PROVIDER_ERROR",
            AshError::Metadata(_) => "METADATA_ERROR",
            AshError::Source(_) => "SOURCE_ERROR",
            AshError::PermissionDenied { .. } => "PERMISSION_DENIED",
            AshError::UserInput(_) => "USER_INPUT",
            AshError::Timeout { .. } => "TIMEOUT",
            AshError::Serialization(_) => "SERIALIZATION_ERROR",
            AshError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, AshError>;
