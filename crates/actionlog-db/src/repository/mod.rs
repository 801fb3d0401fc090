//! SurrealDB repository implementations.

mod content_type;
mod log_entry;

pub use content_type::SurrealContentTypeRepository;
pub use log_entry::SurrealLogEntryRepository;
