//! Integration tests for the ContentType repository using in-memory SurrealDB.

use std::fmt;

use actionlog_core::error::ActionLogError;
use actionlog_core::models::log_entry::{CreateLogEntry, LogAction};
use actionlog_core::repository::{
    ContentTypeRepository, LogEntryFilter, LogEntryRepository, Pagination,
};
use actionlog_core::subject::{Model, ModelMeta, PkValue};
use actionlog_db::repository::{SurrealContentTypeRepository, SurrealLogEntryRepository};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use uuid::Uuid;

const INVOICE: ModelMeta = ModelMeta::new("billing", "invoice");

struct Invoice(i64);

impl fmt::Display for Invoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "INV-{:05}", self.0)
    }
}

impl Model for Invoice {
    fn model_meta(&self) -> ModelMeta {
        INVOICE
    }

    fn pk(&self) -> Option<PkValue<'_>> {
        Some(PkValue::Int(self.0))
    }
}

/// Helper: spin up in-memory DB and run migrations.
async fn setup() -> Surreal<Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    actionlog_db::run_migrations(&db).await.unwrap();
    db
}

#[tokio::test]
async fn get_for_model_registers_once() {
    let db = setup().await;
    let repo = SurrealContentTypeRepository::new(db);

    assert!(repo.lookup(INVOICE).await.unwrap().is_none());

    let first = repo.get_for_model(INVOICE).await.unwrap();
    assert_eq!(first.app_label, "billing");
    assert_eq!(first.model, "invoice");
    assert!(first.matches(&INVOICE));

    let second = repo.get_for_model(INVOICE).await.unwrap();
    assert_eq!(first.id, second.id);

    let looked_up = repo.lookup(INVOICE).await.unwrap().unwrap();
    assert_eq!(looked_up, first);

    let by_id = repo.get_by_id(first.id).await.unwrap();
    assert_eq!(by_id, first);
}

#[tokio::test]
async fn distinct_models_get_distinct_ids() {
    let db = setup().await;
    let repo = SurrealContentTypeRepository::new(db);

    let invoice = repo.get_for_model(INVOICE).await.unwrap();
    let receipt = repo
        .get_for_model(ModelMeta::new("billing", "receipt"))
        .await
        .unwrap();
    assert_ne!(invoice.id, receipt.id);
}

#[tokio::test]
async fn get_missing_content_type_is_not_found() {
    let db = setup().await;
    let repo = SurrealContentTypeRepository::new(db);

    let result = repo.get_by_id(Uuid::new_v4()).await;
    assert!(matches!(result, Err(ActionLogError::NotFound { .. })));
}

#[tokio::test]
async fn delete_cascades_to_log_entries() {
    let db = setup().await;
    let log = SurrealLogEntryRepository::new(db.clone());

    for id in 1..=3 {
        log.create_log_entry(Some(&Invoice(id)), CreateLogEntry::with_action(LogAction::Create))
            .await
            .unwrap();
    }
    let unrelated = log
        .create_log_entry(None, CreateLogEntry::with_action(LogAction::Success))
        .await
        .unwrap();

    let content_type = log.content_types().lookup(INVOICE).await.unwrap().unwrap();
    log.content_types().delete(content_type.id).await.unwrap();

    assert!(log.content_types().lookup(INVOICE).await.unwrap().is_none());

    let remaining = log
        .list(LogEntryFilter::default(), Pagination::default())
        .await
        .unwrap();
    assert_eq!(remaining.total, 1);
    assert_eq!(remaining.items[0].id, unrelated.id);
}
