//! Repository trait definitions for data access abstraction.
//!
//! All repository operations are async. Read paths that receive an
//! unknown model type or an empty object set return an empty result
//! rather than an error.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::ActionLogResult;
use crate::models::{
    content_type::ContentType,
    log_entry::{CreateLogEntry, LogAction, LogEntry},
};
use crate::subject::{Model, ModelMeta};

/// Pagination parameters for list queries.
#[derive(Debug, Clone)]
pub struct Pagination {
    pub offset: u64,
    pub limit: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 50,
        }
    }
}

/// A paginated result set.
#[derive(Debug, Clone)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}

// ---------------------------------------------------------------------------
// Content types
// ---------------------------------------------------------------------------

pub trait ContentTypeRepository: Send + Sync {
    /// Get the content type for `meta`, registering it on first use.
    fn get_for_model(
        &self,
        meta: ModelMeta,
    ) -> impl Future<Output = ActionLogResult<ContentType>> + Send;
    /// Look up a registered content type without creating one.
    fn lookup(
        &self,
        meta: ModelMeta,
    ) -> impl Future<Output = ActionLogResult<Option<ContentType>>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = ActionLogResult<ContentType>> + Send;
    /// Delete a content type together with every log entry referencing it.
    fn delete(&self, id: Uuid) -> impl Future<Output = ActionLogResult<()>> + Send;
}

// ---------------------------------------------------------------------------
// Log entries
// ---------------------------------------------------------------------------

/// Query filters for log entries.
#[derive(Debug, Clone, Default)]
pub struct LogEntryFilter {
    pub content_type_id: Option<Uuid>,
    pub actor_id: Option<Uuid>,
    pub action: Option<LogAction>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

pub trait LogEntryRepository: Send + Sync {
    /// Record a new entry.
    ///
    /// Unset identity fields in `input` are derived from `subject`. For
    /// `Create` actions, entries left behind by an earlier object with the
    /// same content type and primary key are removed in the same
    /// transaction. Without a subject an unassociated entry is stored.
    fn create_log_entry(
        &self,
        subject: Option<&dyn Model>,
        input: CreateLogEntry,
    ) -> impl Future<Output = ActionLogResult<LogEntry>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = ActionLogResult<LogEntry>> + Send;
    /// All entries for objects of one type, newest first.
    fn get_for_model(
        &self,
        meta: ModelMeta,
    ) -> impl Future<Output = ActionLogResult<Vec<LogEntry>>> + Send;
    /// All entries for the given objects, newest first.
    fn get_for_objects<M: Model>(
        &self,
        objects: &[M],
    ) -> impl Future<Output = ActionLogResult<Vec<LogEntry>>> + Send;
    fn list(
        &self,
        filter: LogEntryFilter,
        pagination: Pagination,
    ) -> impl Future<Output = ActionLogResult<PaginatedResult<LogEntry>>> + Send;
    /// Clear the actor reference on every entry recorded by `actor_id`.
    /// Returns the number of entries updated.
    fn clear_actor(&self, actor_id: Uuid) -> impl Future<Output = ActionLogResult<u64>> + Send;
}
