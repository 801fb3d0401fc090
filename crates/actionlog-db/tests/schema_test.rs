//! Integration tests for schema initialization using in-memory SurrealDB.

use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};

async fn migrated_db() -> Surreal<Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    actionlog_db::run_migrations(&db).await.unwrap();
    db
}

#[tokio::test]
async fn schema_migration_applies_successfully() {
    let db = migrated_db().await;

    let mut result = db.query("INFO FOR DB").await.unwrap();
    let info: Option<surrealdb_types::Value> = result.take(0).unwrap();
    let info = info.expect("INFO FOR DB should return a value");
    let info_str = format!("{:?}", info);

    assert!(info_str.contains("content_type"), "missing content_type table");
    assert!(info_str.contains("log_entry"), "missing log_entry table");
    assert!(info_str.contains("_migration"), "missing _migration table");
}

#[tokio::test]
async fn migration_is_idempotent() {
    let db = migrated_db().await;
    actionlog_db::run_migrations(&db).await.unwrap();

    let mut result = db.query("SELECT * FROM _migration").await.unwrap();
    let records: Vec<surrealdb_types::Value> = result.take(0).unwrap();
    assert_eq!(records.len(), 1, "expected exactly one migration record");
}

#[tokio::test]
async fn unique_index_prevents_duplicate_content_types() {
    let db = migrated_db().await;

    db.query("CREATE content_type SET app_label = 'shop', model = 'widget'")
        .await
        .unwrap()
        .check()
        .unwrap();

    let result = db
        .query("CREATE content_type SET app_label = 'shop', model = 'widget'")
        .await
        .unwrap()
        .check();

    assert!(result.is_err(), "duplicate content type should be rejected");
}

#[tokio::test]
async fn unknown_action_code_is_rejected() {
    let db = migrated_db().await;

    let result = db
        .query("CREATE log_entry SET action = 42")
        .await
        .unwrap()
        .check();
    assert!(result.is_err(), "action codes outside the table must fail");

    db.query("CREATE log_entry SET action = 250")
        .await
        .unwrap()
        .check()
        .unwrap();
}

#[tokio::test]
async fn legacy_action_codes_are_admitted() {
    let db = migrated_db().await;

    for code in [10, 15, 20, 30] {
        db.query("CREATE log_entry SET action = $code")
            .bind(("code", code))
            .await
            .unwrap()
            .check()
            .unwrap();
    }
}
