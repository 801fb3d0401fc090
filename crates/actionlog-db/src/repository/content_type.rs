//! SurrealDB implementation of [`ContentTypeRepository`].

use actionlog_core::error::ActionLogResult;
use actionlog_core::models::content_type::ContentType;
use actionlog_core::repository::ContentTypeRepository;
use actionlog_core::subject::ModelMeta;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::debug;
use uuid::Uuid;

use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct ContentTypeRow {
    app_label: String,
    model: String,
}

#[derive(Debug, SurrealValue)]
struct ContentTypeRowWithId {
    record_id: String,
    app_label: String,
    model: String,
}

impl ContentTypeRowWithId {
    fn try_into_content_type(self) -> Result<ContentType, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::InvalidRow(format!("invalid content type UUID: {e}")))?;
        Ok(ContentType {
            id,
            app_label: self.app_label,
            model: self.model,
        })
    }
}

/// SurrealDB implementation of the content type registry.
#[derive(Clone)]
pub struct SurrealContentTypeRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealContentTypeRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn find(&self, meta: ModelMeta) -> Result<Option<ContentType>, DbError> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM content_type \
                 WHERE app_label = $app_label AND model = $model LIMIT 1",
            )
            .bind(("app_label", meta.app_label))
            .bind(("model", meta.model))
            .await?;

        let rows: Vec<ContentTypeRowWithId> = result.take(0)?;
        rows.into_iter()
            .next()
            .map(ContentTypeRowWithId::try_into_content_type)
            .transpose()
    }
}

impl<C: Connection> ContentTypeRepository for SurrealContentTypeRepository<C> {
    async fn get_for_model(&self, meta: ModelMeta) -> ActionLogResult<ContentType> {
        if let Some(existing) = self.find(meta).await? {
            return Ok(existing);
        }

        let id = Uuid::new_v4();
        let created = self
            .db
            .query(
                "CREATE type::record('content_type', $id) SET \
                 app_label = $app_label, model = $model",
            )
            .bind(("id", id.to_string()))
            .bind(("app_label", meta.app_label))
            .bind(("model", meta.model))
            .await
            .map_err(DbError::from)?
            .check();

        match created {
            Ok(_) => {
                debug!(content_type = %meta, %id, "Registered content type");
                Ok(ContentType {
                    id,
                    app_label: meta.app_label.into(),
                    model: meta.model.into(),
                })
            }
            // Lost a registration race against the unique index; the
            // winner's row is the canonical one.
            Err(e) => self
                .find(meta)
                .await?
                .ok_or_else(|| DbError::Query(e.to_string()).into()),
        }
    }

    async fn lookup(&self, meta: ModelMeta) -> ActionLogResult<Option<ContentType>> {
        Ok(self.find(meta).await?)
    }

    async fn get_by_id(&self, id: Uuid) -> ActionLogResult<ContentType> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('content_type', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ContentTypeRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "content_type".into(),
            id: id_str,
        })?;

        Ok(ContentType {
            id,
            app_label: row.app_label,
            model: row.model,
        })
    }

    async fn delete(&self, id: Uuid) -> ActionLogResult<()> {
        self.db
            .query(
                "BEGIN TRANSACTION; \
                 DELETE log_entry WHERE content_type_id = $id; \
                 DELETE type::record('content_type', $id); \
                 COMMIT TRANSACTION;",
            )
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        debug!(%id, "Deleted content type and its log entries");
        Ok(())
    }
}
