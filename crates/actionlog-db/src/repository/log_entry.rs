//! SurrealDB implementation of [`LogEntryRepository`].
//!
//! Subjects are stored as a content type id plus both key forms:
//! `object_id` for numeric keys and `object_pk` (always set when a key was
//! resolved) for everything else. Lookups by object set filter on
//! `object_id` when every key is numeric and on `object_pk` otherwise.

use std::collections::HashSet;
use std::net::IpAddr;

use actionlog_core::error::{ActionLogError, ActionLogResult};
use actionlog_core::models::log_entry::{CreateLogEntry, LogAction, LogEntry};
use actionlog_core::repository::{
    ContentTypeRepository, LogEntryFilter, LogEntryRepository, PaginatedResult, Pagination,
};
use actionlog_core::subject::{Model, ModelMeta, SubjectKey, resolve_pk};
use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::debug;
use uuid::Uuid;

use super::SurrealContentTypeRepository;
use crate::error::DbError;

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct LogEntryRowWithId {
    record_id: String,
    content_type_id: Option<String>,
    object_id: Option<i64>,
    object_pk: Option<String>,
    object_repr: Option<String>,
    object_extra_info: Option<serde_json::Value>,
    actor_id: Option<String>,
    action: Option<i64>,
    action_info: Option<serde_json::Value>,
    changes: String,
    remote_ip: Option<String>,
    created_at: DateTime<Utc>,
}

fn parse_uuid(field: &str, raw: Option<String>) -> Result<Option<Uuid>, DbError> {
    raw.map(|s| Uuid::parse_str(&s))
        .transpose()
        .map_err(|e| DbError::InvalidRow(format!("invalid {field} UUID: {e}")))
}

fn parse_action(code: Option<i64>) -> Result<Option<LogAction>, DbError> {
    code.map(|c| {
        u16::try_from(c)
            .ok()
            .and_then(LogAction::from_code)
            .ok_or_else(|| DbError::InvalidRow(format!("unknown action code: {c}")))
    })
    .transpose()
}

impl LogEntryRowWithId {
    fn try_into_log_entry(self) -> Result<LogEntry, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::InvalidRow(format!("invalid UUID: {e}")))?;
        let remote_ip = self
            .remote_ip
            .map(|ip| ip.parse::<IpAddr>())
            .transpose()
            .map_err(|e| DbError::InvalidRow(format!("invalid remote IP: {e}")))?;
        Ok(LogEntry {
            id,
            content_type_id: parse_uuid("content type", self.content_type_id)?,
            object_id: self.object_id,
            object_pk: self.object_pk,
            object_repr: self.object_repr,
            object_extra_info: self.object_extra_info,
            actor_id: parse_uuid("actor", self.actor_id)?,
            action: parse_action(self.action)?,
            action_info: self.action_info,
            changes: self.changes,
            remote_ip,
            created_at: self.created_at,
        })
    }
}

/// Row struct for count queries.
#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

/// Structured columns must hold JSON objects.
fn ensure_object(field: &str, value: &Option<serde_json::Value>) -> ActionLogResult<()> {
    match value {
        Some(v) if !v.is_object() => Err(ActionLogError::Validation {
            message: format!("{field} must be a JSON object"),
        }),
        _ => Ok(()),
    }
}

/// Resolved keys of `objects`, de-duplicated in first-seen order. Objects
/// without a resolvable key are skipped.
fn resolve_keys<M: Model>(objects: &[M]) -> Vec<SubjectKey> {
    let mut seen = HashSet::new();
    objects
        .iter()
        .filter_map(|object| resolve_pk(object))
        .filter(|key| seen.insert(key.clone()))
        .collect()
}

const SELECT_ENTRIES: &str = "SELECT meta::id(id) AS record_id, * FROM log_entry";

/// SurrealDB implementation of the log entry repository.
#[derive(Clone)]
pub struct SurrealLogEntryRepository<C: Connection> {
    db: Surreal<C>,
    content_types: SurrealContentTypeRepository<C>,
}

impl<C: Connection> SurrealLogEntryRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        let content_types = SurrealContentTypeRepository::new(db.clone());
        Self { db, content_types }
    }

    pub fn content_types(&self) -> &SurrealContentTypeRepository<C> {
        &self.content_types
    }

    async fn fetch_for_content_type(
        &self,
        content_type_id: Uuid,
        key_filter: Option<KeyFilter>,
    ) -> Result<Vec<LogEntry>, DbError> {
        let condition = match &key_filter {
            None => "",
            Some(KeyFilter::Numeric(_)) => " AND object_id IN $keys",
            Some(KeyFilter::Text(_)) => " AND object_pk IN $keys",
        };
        let query = format!(
            "{SELECT_ENTRIES} WHERE content_type_id = $content_type_id{condition} \
             ORDER BY created_at DESC"
        );

        let mut builder = self
            .db
            .query(query)
            .bind(("content_type_id", content_type_id.to_string()));
        builder = match key_filter {
            None => builder,
            Some(KeyFilter::Numeric(ids)) => builder.bind(("keys", ids)),
            Some(KeyFilter::Text(pks)) => builder.bind(("keys", pks)),
        };

        let mut result = builder.await?;
        let rows: Vec<LogEntryRowWithId> = result.take(0)?;
        rows.into_iter()
            .map(LogEntryRowWithId::try_into_log_entry)
            .collect()
    }
}

enum KeyFilter {
    Numeric(Vec<i64>),
    Text(Vec<String>),
}

impl KeyFilter {
    fn from_keys(keys: Vec<SubjectKey>) -> Self {
        match keys.iter().map(SubjectKey::numeric).collect::<Option<Vec<_>>>() {
            Some(ids) => KeyFilter::Numeric(ids),
            None => KeyFilter::Text(keys.iter().map(SubjectKey::as_pk_string).collect()),
        }
    }
}

impl<C: Connection> LogEntryRepository for SurrealLogEntryRepository<C> {
    async fn create_log_entry(
        &self,
        subject: Option<&dyn Model>,
        mut input: CreateLogEntry,
    ) -> ActionLogResult<LogEntry> {
        if let Some(subject) = subject {
            let content_type = self
                .content_types
                .get_for_model(subject.model_meta())
                .await?;
            input.apply_subject_defaults(content_type.id, subject);
        }
        input.fill_key_fallback();

        ensure_object("object_extra_info", &input.object_extra_info)?;
        ensure_object("action_info", &input.action_info)?;

        let id = Uuid::new_v4();
        let changes = input.changes.as_ref().map(|c| c.to_json()).transpose()?;

        // Dedup-on-create: a reused primary key must not inherit the audit
        // history of the object that previously held it.
        let dedup = if !input.replaces_stale_entries() {
            ""
        } else if input.object_id.is_some() {
            "DELETE log_entry WHERE content_type_id = $content_type_id \
             AND object_id = $object_id;"
        } else {
            "DELETE log_entry WHERE content_type_id = $content_type_id \
             AND object_pk = $object_pk;"
        };
        if !dedup.is_empty() {
            debug!(
                content_type_id = ?input.content_type_id,
                object_pk = ?input.object_pk,
                "Removing stale entries for reused primary key"
            );
        }

        let query = format!(
            "BEGIN TRANSACTION; {dedup} \
             CREATE type::record('log_entry', $id) SET \
             content_type_id = $content_type_id, \
             object_id = $object_id, \
             object_pk = $object_pk, \
             object_repr = $object_repr, \
             object_extra_info = $object_extra_info, \
             actor_id = $actor_id, \
             action = $action, \
             action_info = $action_info, \
             changes = $changes, \
             remote_ip = $remote_ip; \
             COMMIT TRANSACTION;"
        );

        self.db
            .query(query)
            .bind(("id", id.to_string()))
            .bind(("content_type_id", input.content_type_id.map(|u| u.to_string())))
            .bind(("object_id", input.object_id))
            .bind(("object_pk", input.object_pk))
            .bind(("object_repr", input.object_repr))
            .bind(("object_extra_info", input.object_extra_info))
            .bind(("actor_id", input.actor_id.map(|u| u.to_string())))
            .bind(("action", input.action.map(|a| i64::from(a.code()))))
            .bind(("action_info", input.action_info))
            .bind(("changes", changes.unwrap_or_default()))
            .bind(("remote_ip", input.remote_ip.map(|ip| ip.to_string())))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        let entry = self.get_by_id(id).await?;
        debug!(
            id = %entry.id,
            action = ?entry.action,
            object_pk = ?entry.object_pk,
            "Recorded log entry"
        );
        Ok(entry)
    }

    async fn get_by_id(&self, id: Uuid) -> ActionLogResult<LogEntry> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * \
                 FROM type::record('log_entry', $id)",
            )
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<LogEntryRowWithId> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "log_entry".into(),
            id: id_str,
        })?;

        row.try_into_log_entry().map_err(Into::into)
    }

    async fn get_for_model(&self, meta: ModelMeta) -> ActionLogResult<Vec<LogEntry>> {
        let Some(content_type) = self.content_types.lookup(meta).await? else {
            debug!(model = %meta, "No content type registered, nothing logged");
            return Ok(Vec::new());
        };

        Ok(self.fetch_for_content_type(content_type.id, None).await?)
    }

    async fn get_for_objects<M: Model>(&self, objects: &[M]) -> ActionLogResult<Vec<LogEntry>> {
        let Some(first) = objects.first() else {
            return Ok(Vec::new());
        };
        let meta = first.model_meta();

        let keys = resolve_keys(objects);
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let Some(content_type) = self.content_types.lookup(meta).await? else {
            return Ok(Vec::new());
        };

        Ok(self
            .fetch_for_content_type(content_type.id, Some(KeyFilter::from_keys(keys)))
            .await?)
    }

    async fn list(
        &self,
        filter: LogEntryFilter,
        pagination: Pagination,
    ) -> ActionLogResult<PaginatedResult<LogEntry>> {
        let mut conditions = Vec::new();
        if filter.content_type_id.is_some() {
            conditions.push("content_type_id = $content_type_id");
        }
        if filter.actor_id.is_some() {
            conditions.push("actor_id = $actor_id");
        }
        if filter.action.is_some() {
            conditions.push("action IN $actions");
        }
        if filter.from.is_some() {
            conditions.push("created_at >= $from");
        }
        if filter.to.is_some() {
            conditions.push("created_at <= $to");
        }
        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", conditions.join(" AND "))
        };

        let query = format!(
            "SELECT count() AS total FROM log_entry{where_clause} GROUP ALL; \
             {SELECT_ENTRIES}{where_clause} \
             ORDER BY created_at DESC \
             LIMIT $limit START $offset"
        );

        let mut builder = self
            .db
            .query(query)
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset));
        if let Some(content_type_id) = filter.content_type_id {
            builder = builder.bind(("content_type_id", content_type_id.to_string()));
        }
        if let Some(actor_id) = filter.actor_id {
            builder = builder.bind(("actor_id", actor_id.to_string()));
        }
        if let Some(action) = filter.action {
            let codes: Vec<i64> = std::iter::once(action.code())
                .chain(action.legacy_code())
                .map(i64::from)
                .collect();
            builder = builder.bind(("actions", codes));
        }
        if let Some(from) = filter.from {
            builder = builder.bind(("from", from));
        }
        if let Some(to) = filter.to {
            builder = builder.bind(("to", to));
        }

        let mut result = builder.await.map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map_or(0, |r| r.total);

        let rows: Vec<LogEntryRowWithId> = result.take(1).map_err(DbError::from)?;
        let items = rows
            .into_iter()
            .map(LogEntryRowWithId::try_into_log_entry)
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }

    async fn clear_actor(&self, actor_id: Uuid) -> ActionLogResult<u64> {
        let mut result = self
            .db
            .query("UPDATE log_entry SET actor_id = NONE WHERE actor_id = $actor_id RETURN id")
            .bind(("actor_id", actor_id.to_string()))
            .await
            .map_err(DbError::from)?;
        let cleared: Vec<surrealdb_types::Value> = result.take(0).map_err(DbError::from)?;
        let total = cleared.len() as u64;

        debug!(%actor_id, cleared = total, "Cleared actor from log entries");
        Ok(total)
    }
}
