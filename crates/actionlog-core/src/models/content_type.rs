//! Content type domain model.
//!
//! A content type is the stored, stable identifier of a domain type. Log
//! entries reference it as their polymorphic discriminator.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::subject::ModelMeta;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContentType {
    pub id: Uuid,
    pub app_label: String,
    pub model: String,
}

impl ContentType {
    pub fn matches(&self, meta: &ModelMeta) -> bool {
        self.app_label == meta.app_label && self.model == meta.model
    }
}
