//! actionlog core — domain model, subject resolution and repository
//! traits for the action log.
//!
//! Storage backends implement the traits in [`repository`]; see the
//! `actionlog-db` crate for the SurrealDB implementation.

pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod subject;

pub use config::ChangeFormat;
pub use error::{ActionLogError, ActionLogResult};
pub use subject::{HasExtraInfo, Model, ModelMeta, PkValue};
