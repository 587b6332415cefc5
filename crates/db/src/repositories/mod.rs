use chrono::{DateTime, SecondsFormat, Utc};
use thiserror::Error;

use budtender_core::errors::UpstreamError;

pub mod catalog;
pub mod conversation;
pub mod memory;
pub mod profile;
pub mod semantic_cache;

pub use catalog::SqlCatalogStore;
pub use conversation::SqlConversationStore;
pub use memory::{InMemoryCatalogStore, InMemoryConversationStore, InMemoryProfileStore};
pub use profile::SqlProfileStore;
pub use semantic_cache::SqlVectorIndex;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

impl RepositoryError {
    /// Collaborator traits report persistence failures as upstream errors so
    /// decision code can degrade on them.
    pub fn into_upstream(self, service: &'static str) -> UpstreamError {
        match self {
            Self::Database(error) => UpstreamError::unavailable(service, error.to_string()),
            Self::Decode(message) => UpstreamError::decode(service, message),
        }
    }
}

/// Fixed-width RFC 3339 so stored timestamps compare correctly as text.
pub(crate) fn timestamp(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_timestamp(column: &str, value: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Decode(format!("{column}: {e}")))
}

pub(crate) fn decode<E: std::fmt::Display>(error: E) -> RepositoryError {
    RepositoryError::Decode(error.to_string())
}
