use thiserror::Error;

use crate::embedding::error::EmbeddingError;

#[derive(Debug, Error)]
pub enum RerankerError {
    #[error("reranker request failed: {reason}")]
    RequestFailed { reason: String },

    #[error("reranker endpoint returned {status}: {body}")]
    BadStatus { status: u16, body: String },

    #[error("malformed reranker response: {reason}")]
    InvalidResponse { reason: String },

    #[error("invalid reranker configuration: {reason}")]
    InvalidConfig { reason: String },
}

impl From<reqwest::Error> for RerankerError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            RerankerError::InvalidResponse {
                reason: err.to_string(),
            }
        } else {
            RerankerError::RequestFailed {
                reason: err.to_string(),
            }
        }
    }
}

impl From<EmbeddingError> for RerankerError {
    fn from(err: EmbeddingError) -> Self {
        match err {
            EmbeddingError::BadStatus { status, body } => RerankerError::BadStatus { status, body },
            EmbeddingError::InvalidConfig { reason } => RerankerError::InvalidConfig { reason },
            EmbeddingError::InvalidResponse { reason } => {
                RerankerError::InvalidResponse { reason }
            }
            _ => RerankerError::RequestFailed {
                reason: err.to_string(),
            },
        }
    }
}
