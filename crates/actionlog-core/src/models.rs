//! Domain models for the action log.

pub mod content_type;
pub mod log_entry;
