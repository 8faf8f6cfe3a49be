use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{what} not found: {id}")]
    NotFound { what: &'static str, id: String },

    #[error("strikes cannot be recorded against the streamer identity")]
    StrikeExempt,

    #[error("duplicate canonical name: {name}")]
    DuplicateName { name: String },
}

pub type Result<T> = std::result::Result<T, DbError>;
