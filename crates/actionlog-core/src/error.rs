//! Error types for the action log.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ActionLogError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for ActionLogError {
    fn from(err: serde_json::Error) -> Self {
        ActionLogError::Serialization(err.to_string())
    }
}

pub type ActionLogResult<T> = Result<T, ActionLogError>;
