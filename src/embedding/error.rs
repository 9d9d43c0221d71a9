use thiserror::Error;

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("embedding request failed: {reason}")]
    RequestFailed { reason: String },

    #[error("embedding endpoint returned {status}: {body}")]
    BadStatus { status: u16, body: String },

    #[error("malformed embedding response: {reason}")]
    InvalidResponse { reason: String },

    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("invalid embedding configuration: {reason}")]
    InvalidConfig { reason: String },
}

impl From<reqwest::Error> for EmbeddingError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            EmbeddingError::InvalidResponse {
                reason: err.to_string(),
            }
        } else {
            EmbeddingError::RequestFailed {
                reason: err.to_string(),
            }
        }
    }
}
