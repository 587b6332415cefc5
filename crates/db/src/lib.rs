pub mod connection;
pub mod fixtures;
pub mod migrations;
pub mod repositories;

pub use connection::{connect, connect_with_settings, DbPool};
pub use fixtures::{parse_catalog_json, CatalogSeedDataset, SeedResult, VerificationResult};
pub use repositories::{
    InMemoryCatalogStore, InMemoryConversationStore, InMemoryProfileStore, RepositoryError,
    SqlCatalogStore, SqlConversationStore, SqlProfileStore, SqlVectorIndex,
};
