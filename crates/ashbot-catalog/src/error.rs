use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Database error: {0}")]
    Db(#[from] ashbot_db::DbError),

    #[error("missing credentials: {0}")]
    MissingCredentials(&'static str),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("ingestion aborted: {failed} of {processed} records failed")]
    Aborted { failed: usize, processed: usize },
}

pub type Result<T> = std::result::Result<T, CatalogError>;
