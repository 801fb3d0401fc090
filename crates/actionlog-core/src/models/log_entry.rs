//! Log entry domain model.
//!
//! One [`LogEntry`] is stored per audit event. The field-level diff is
//! kept as serialized JSON text and exposed through [`ChangeSet`].

use std::fmt;
use std::net::IpAddr;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::config::ChangeFormat;
use crate::error::ActionLogError;
use crate::subject::{Model, SubjectKey, resolve_pk};

/// Kind of action recorded, ordered by severity tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum LogAction {
    Create = 100,
    Success = 110,
    Activate = 130,
    Authorize = 150,
    View = 180,
    Update = 200,
    Suspend = 250,
    Unsuspend = 260,
    Delete = 300,
    Terminate = 500,
    Failed = 999,
    Error = 1000,
}

impl LogAction {
    pub const ALL: [LogAction; 12] = [
        LogAction::Create,
        LogAction::Success,
        LogAction::Activate,
        LogAction::Authorize,
        LogAction::View,
        LogAction::Update,
        LogAction::Suspend,
        LogAction::Unsuspend,
        LogAction::Delete,
        LogAction::Terminate,
        LogAction::Failed,
        LogAction::Error,
    ];

    pub fn code(self) -> u16 {
        self as u16
    }

    /// Map a stored code to an action. Codes from the older four-value
    /// table (`10`, `15`, `20`, `30`) are accepted as well.
    pub fn from_code(code: u16) -> Option<Self> {
        let action = match code {
            100 | 10 => LogAction::Create,
            110 => LogAction::Success,
            130 => LogAction::Activate,
            150 => LogAction::Authorize,
            180 | 15 => LogAction::View,
            200 | 20 => LogAction::Update,
            250 => LogAction::Suspend,
            260 => LogAction::Unsuspend,
            300 | 30 => LogAction::Delete,
            500 => LogAction::Terminate,
            999 => LogAction::Failed,
            1000 => LogAction::Error,
            _ => return None,
        };
        Some(action)
    }

    /// Code from the older four-value table, for actions that had one.
    pub fn legacy_code(self) -> Option<u16> {
        match self {
            LogAction::Create => Some(10),
            LogAction::View => Some(15),
            LogAction::Update => Some(20),
            LogAction::Delete => Some(30),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            LogAction::Create => "create",
            LogAction::Success => "success",
            LogAction::Activate => "activate",
            LogAction::Authorize => "authorize",
            LogAction::View => "view",
            LogAction::Update => "update",
            LogAction::Suspend => "suspend",
            LogAction::Unsuspend => "unsuspend",
            LogAction::Delete => "delete",
            LogAction::Terminate => "terminate",
            LogAction::Failed => "failed",
            LogAction::Error => "error",
        }
    }
}

impl fmt::Display for LogAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl From<LogAction> for u16 {
    fn from(action: LogAction) -> Self {
        action.code()
    }
}

impl TryFrom<u16> for LogAction {
    type Error = ActionLogError;

    fn try_from(code: u16) -> Result<Self, ActionLogError> {
        LogAction::from_code(code).ok_or_else(|| ActionLogError::Validation {
            message: format!("unknown action code: {code}"),
        })
    }
}

/// Ordered mapping of field name to `(old, new)` values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChangeSet(IndexMap<String, (String, String)>);

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a change; re-inserting a field keeps its original position.
    pub fn insert(
        &mut self,
        field: impl Into<String>,
        old: impl Into<String>,
        new: impl Into<String>,
    ) {
        self.0.insert(field.into(), (old.into(), new.into()));
    }

    pub fn get(&self, field: &str) -> Option<(&str, &str)> {
        self.0
            .get(field)
            .map(|(old, new)| (old.as_str(), new.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, &str)> {
        self.0
            .iter()
            .map(|(field, (old, new))| (field.as_str(), old.as_str(), new.as_str()))
    }

    /// Parse stored change text. Never fails: blank or malformed input
    /// yields an empty set. Non-string JSON values are kept in their JSON
    /// text form.
    pub fn parse(raw: &str) -> Self {
        if raw.trim().is_empty() {
            return Self::default();
        }

        match serde_json::from_str::<RawChanges>(raw) {
            Ok(map) => map
                .into_iter()
                .map(|(field, (old, new))| (field, value_text(old), value_text(new)))
                .collect(),
            Err(e) => {
                warn!(error = %e, "Discarding malformed stored change set");
                Self::default()
            }
        }
    }

    /// Serialize for storage. An empty set is stored as an empty string.
    pub fn to_json(&self) -> Result<String, ActionLogError> {
        if self.is_empty() {
            return Ok(String::new());
        }
        Ok(serde_json::to_string(&self.0)?)
    }

    /// Render as one line, e.g. `name: Alice → Bob; age: 30 → 31`.
    pub fn format(&self, format: &ChangeFormat) -> String {
        self.iter()
            .map(|(field, old, new)| {
                format!(
                    "{field}{colon}{old}{arrow}{new}",
                    colon = format.colon,
                    arrow = format.arrow,
                )
            })
            .collect::<Vec<_>>()
            .join(&format.separator)
    }
}

type RawChanges = IndexMap<String, (serde_json::Value, serde_json::Value)>;

fn value_text(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    }
}

impl<F, O, N> FromIterator<(F, O, N)> for ChangeSet
where
    F: Into<String>,
    O: Into<String>,
    N: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (F, O, N)>>(iter: I) -> Self {
        let mut changes = ChangeSet::new();
        for (field, old, new) in iter {
            changes.insert(field, old, new);
        }
        changes
    }
}

/// Polymorphic reference to the subject of a log entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubjectRef {
    pub content_type_id: Uuid,
    pub key: SubjectKey,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: Uuid,
    pub content_type_id: Option<Uuid>,
    /// Set only for subjects with a numeric primary key.
    pub object_id: Option<i64>,
    /// String form of the subject's primary key.
    pub object_pk: Option<String>,
    /// Snapshot of the subject's representation at log time.
    pub object_repr: Option<String>,
    pub object_extra_info: Option<serde_json::Value>,
    /// Cleared when the actor is removed; the entry itself is kept.
    pub actor_id: Option<Uuid>,
    pub action: Option<LogAction>,
    pub action_info: Option<serde_json::Value>,
    /// Serialized [`ChangeSet`]; empty when the action carries no diff.
    pub changes: String,
    pub remote_ip: Option<IpAddr>,
    pub created_at: DateTime<Utc>,
}

impl LogEntry {
    pub fn changes_dict(&self) -> ChangeSet {
        ChangeSet::parse(&self.changes)
    }

    pub fn changes_str(&self) -> String {
        self.changes_str_with(&ChangeFormat::default())
    }

    pub fn changes_str_with(&self, format: &ChangeFormat) -> String {
        self.changes_dict().format(format)
    }

    /// The subject this entry is associated with, if any. The numeric key
    /// takes precedence over the string key.
    pub fn subject(&self) -> Option<SubjectRef> {
        let content_type_id = self.content_type_id?;
        let key = match (self.object_id, &self.object_pk) {
            (Some(id), _) => SubjectKey::Numeric(id),
            (None, Some(pk)) => SubjectKey::Text(pk.clone()),
            (None, None) => return None,
        };
        Some(SubjectRef {
            content_type_id,
            key,
        })
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Logged {}", self.object_repr.as_deref().unwrap_or_default())
    }
}

/// Fields for a new log entry. Every field is an explicit override; fields
/// left as `None` may be derived from the subject on create.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateLogEntry {
    pub content_type_id: Option<Uuid>,
    pub object_id: Option<i64>,
    pub object_pk: Option<String>,
    pub object_repr: Option<String>,
    pub object_extra_info: Option<serde_json::Value>,
    pub actor_id: Option<Uuid>,
    pub action: Option<LogAction>,
    pub action_info: Option<serde_json::Value>,
    pub changes: Option<ChangeSet>,
    pub remote_ip: Option<IpAddr>,
}

impl CreateLogEntry {
    pub fn with_action(action: LogAction) -> Self {
        Self {
            action: Some(action),
            ..Default::default()
        }
    }

    /// Fill unset identity fields from `subject`. Explicit values always
    /// win. A subject whose key cannot be resolved leaves the key fields
    /// unset.
    pub fn apply_subject_defaults(&mut self, content_type_id: Uuid, subject: &dyn Model) {
        let key = resolve_pk(subject);
        if key.is_none() {
            warn!(
                model = %subject.model_meta(),
                "Could not resolve subject primary key"
            );
        }

        self.content_type_id.get_or_insert(content_type_id);
        if let Some(key) = &key {
            if self.object_pk.is_none() {
                self.object_pk = Some(key.as_pk_string());
            }
            if let (None, Some(id)) = (self.object_id, key.numeric()) {
                self.object_id = Some(id);
            }
        }
        if self.object_repr.is_none() {
            self.object_repr = Some(subject.to_string());
        }
        if self.object_extra_info.is_none() {
            self.object_extra_info = subject.as_extra_info().map(|info| info.extra_info());
        }
    }

    /// Mirror a numeric `object_id` into `object_pk` when no string key was
    /// given, so the string column is always usable as the join key.
    pub fn fill_key_fallback(&mut self) {
        if self.object_pk.is_none() {
            self.object_pk = self.object_id.map(|id| id.to_string());
        }
    }

    /// Whether this input triggers removal of stale entries for a reused
    /// primary key.
    pub fn replaces_stale_entries(&self) -> bool {
        self.action == Some(LogAction::Create)
            && self.content_type_id.is_some()
            && (self.object_id.is_some() || self.object_pk.is_some())
    }
}
