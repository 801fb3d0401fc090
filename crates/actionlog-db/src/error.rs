//! Database-specific error types and conversions.

use actionlog_core::error::ActionLogError;

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Invalid stored row: {0}")]
    InvalidRow(String),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },
}

impl From<DbError> for ActionLogError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ActionLogError::NotFound { entity, id },
            other => ActionLogError::Database(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_keeps_entity_and_id() {
        let err: ActionLogError = DbError::NotFound {
            entity: "log_entry".into(),
            id: "abc".into(),
        }
        .into();
        assert!(matches!(
            err,
            ActionLogError::NotFound { ref entity, ref id } if entity == "log_entry" && id == "abc"
        ));
    }

    #[test]
    fn other_errors_become_database_errors() {
        let err: ActionLogError = DbError::InvalidRow("bad uuid".into()).into();
        assert_eq!(err.to_string(), "Database error: Invalid stored row: bad uuid");
    }
}
