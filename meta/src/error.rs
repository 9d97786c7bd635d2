use thiserror::Error;

/// Erros do cliente Graph API.
#[derive(Debug, Error)]
pub enum MetaError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Graph API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("missing field '{0}' in Graph API response")]
    MissingField(&'static str),
}

pub type MetaResult<T> = Result<T, MetaError>;
