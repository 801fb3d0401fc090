//! Schema definitions and migration runner for SurrealDB.
//!
//! Tables are SCHEMAFULL. UUIDs are stored as strings, action kinds as
//! their integer codes guarded by an ASSERT that also admits the older
//! four-value codes carried by imported history. `log_entry.created_at` is
//! READONLY so the store assigns it exactly once.

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::{debug, info};

use crate::error::DbError;

// -----------------------------------------------------------------------
// Migration tracking
// -----------------------------------------------------------------------

const MIGRATION_TABLE_DDL: &str = "\
DEFINE TABLE IF NOT EXISTS _migration SCHEMAFULL;
DEFINE FIELD IF NOT EXISTS version ON TABLE _migration TYPE int;
DEFINE FIELD IF NOT EXISTS name ON TABLE _migration TYPE string;
DEFINE FIELD IF NOT EXISTS applied_at ON TABLE _migration TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX IF NOT EXISTS idx_migration_version ON TABLE _migration \
    COLUMNS version UNIQUE;
";

#[derive(Debug, SurrealValue)]
struct MigrationRecord {
    version: u32,
    #[allow(dead_code)]
    name: String,
}

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

static MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "initial_schema",
    sql: SCHEMA_V1,
}];

// -----------------------------------------------------------------------
// Schema v1 — initial table definitions
// -----------------------------------------------------------------------

const SCHEMA_V1: &str = "\
-- =======================================================================
-- Content types (stable identifiers of logged domain types)
-- =======================================================================
DEFINE TABLE content_type SCHEMAFULL;
DEFINE FIELD app_label ON TABLE content_type TYPE string;
DEFINE FIELD model ON TABLE content_type TYPE string;
DEFINE INDEX idx_content_type_model ON TABLE content_type \
    COLUMNS app_label, model UNIQUE;

-- =======================================================================
-- Log entries (one row per audit event)
-- =======================================================================
DEFINE TABLE log_entry SCHEMAFULL;
DEFINE FIELD content_type_id ON TABLE log_entry TYPE option<string>;
DEFINE FIELD object_id ON TABLE log_entry TYPE option<int>;
DEFINE FIELD object_pk ON TABLE log_entry TYPE option<string>;
DEFINE FIELD object_repr ON TABLE log_entry TYPE option<string>;
DEFINE FIELD object_extra_info ON TABLE log_entry \
    TYPE option<object> FLEXIBLE;
DEFINE FIELD actor_id ON TABLE log_entry TYPE option<string>;
DEFINE FIELD action ON TABLE log_entry TYPE option<int> \
    ASSERT $value = NONE OR $value IN \
    [10, 15, 20, 30, 100, 110, 130, 150, 180, 200, 250, 260, 300, 500, 999, 1000];
DEFINE FIELD action_info ON TABLE log_entry \
    TYPE option<object> FLEXIBLE;
DEFINE FIELD changes ON TABLE log_entry TYPE string DEFAULT '';
DEFINE FIELD remote_ip ON TABLE log_entry TYPE option<string>;
DEFINE FIELD created_at ON TABLE log_entry TYPE datetime \
    DEFAULT time::now() READONLY;
DEFINE INDEX idx_log_entry_created_at ON TABLE log_entry \
    COLUMNS created_at;
DEFINE INDEX idx_log_entry_object_id ON TABLE log_entry \
    COLUMNS content_type_id, object_id;
DEFINE INDEX idx_log_entry_object_pk ON TABLE log_entry \
    COLUMNS content_type_id, object_pk;
DEFINE INDEX idx_log_entry_actor ON TABLE log_entry \
    COLUMNS actor_id;
";

// -----------------------------------------------------------------------
// Public API
// -----------------------------------------------------------------------

/// Run all pending migrations against the given SurrealDB client.
///
/// The `_migration` table records applied versions; only migrations newer
/// than the highest recorded version run. Safe to call on every start.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<(), DbError> {
    db.query(MIGRATION_TABLE_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Migration(e.to_string()))?;

    let mut result = db
        .query("SELECT * FROM _migration ORDER BY version DESC LIMIT 1")
        .await?;
    let records: Vec<MigrationRecord> = result.take(0)?;
    let current_version = records.first().map_or(0, |m| m.version);

    let pending: Vec<&Migration> = MIGRATIONS
        .iter()
        .filter(|m| m.version > current_version)
        .collect();
    if pending.is_empty() {
        debug!(version = current_version, "Schema is up to date");
        return Ok(());
    }

    for migration in pending {
        info!(
            version = migration.version,
            name = migration.name,
            "Applying migration"
        );
        apply(db, migration).await?;
    }

    Ok(())
}

async fn apply<C: Connection>(db: &Surreal<C>, migration: &Migration) -> Result<(), DbError> {
    db.query(migration.sql).await?.check().map_err(|e| {
        DbError::Migration(format!(
            "v{} '{}' failed: {e}",
            migration.version, migration.name
        ))
    })?;

    db.query("CREATE _migration SET version = $version, name = $name")
        .bind(("version", migration.version))
        .bind(("name", migration.name))
        .await?
        .check()
        .map_err(|e| {
            DbError::Migration(format!(
                "could not record v{}: {e}",
                migration.version
            ))
        })?;

    Ok(())
}

/// Returns the raw schema DDL for version 1.
///
/// Exposed for testing with in-memory SurrealDB instances that
/// bypass the migration runner.
pub fn schema_v1() -> &'static str {
    SCHEMA_V1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_v1_is_nonempty() {
        assert!(!SCHEMA_V1.is_empty());
    }

    #[test]
    fn schema_v1_defines_log_tables() {
        assert!(SCHEMA_V1.contains("DEFINE TABLE content_type"));
        assert!(SCHEMA_V1.contains("DEFINE TABLE log_entry"));
        assert!(SCHEMA_V1.contains("READONLY"));
    }

    #[test]
    fn migrations_are_ordered() {
        for window in MIGRATIONS.windows(2) {
            assert!(
                window[0].version < window[1].version,
                "Migrations must be in ascending version order"
            );
        }
    }
}
