use serde::Serialize;

use crate::db::StoreError;

/// Request field a validation failure refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationField {
    Request,
    Player1Name,
    Player2Name,
    Surface,
    Tournament,
    Players,
    Size,
}

/// A malformed or contradictory request. Raised before any side effect.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ValidationError {
    pub field: ValidationField,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: ValidationField, message: impl Into<String>) -> Self {
        ValidationError {
            field,
            message: message.into(),
        }
    }
}

/// Failure of a single call to the scoring oracle. Every variant is treated
/// as transient by the retry policy.
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("scoring service request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("scoring service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("scoring service returned an invalid prediction: {0}")]
    InvalidResponse(String),
}

/// Errors surfaced by the prediction engine to its callers.
#[derive(Debug, thiserror::Error)]
pub enum PredictionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("prediction {id} not found")]
    NotFound { id: i64 },

    #[error("prediction storage failed: {0}")]
    Storage(#[from] StoreError),
}
