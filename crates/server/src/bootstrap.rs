use std::sync::Arc;
use std::time::Duration;

use budtender_agent::{AgentRuntime, LlmClient, RuntimeDeps, RuntimeSettings};
use budtender_core::cache::{DisabledEmbeddings, EmbeddingService, InMemoryExactCache};
use budtender_core::catalog::CatalogCache;
use budtender_core::clock::{Clock, SystemClock};
use budtender_core::config::{AppConfig, ConfigError, LoadOptions};
use budtender_core::notification::{LogRelay, NotificationRelay};
use budtender_core::{SemanticCache, SemanticCacheSettings};
use budtender_db::{
    connect_with_settings, migrations, DbPool, SqlCatalogStore, SqlConversationStore,
    SqlProfileStore, SqlVectorIndex,
};
use thiserror::Error;
use tracing::info;

use crate::upstream::{HttpEmbeddingService, HttpLlmClient, WebhookRelay};

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub catalog: Arc<CatalogCache>,
    pub runtime: Arc<AgentRuntime>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("http client setup failed: {0}")]
    HttpClient(#[source] reqwest::Error),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(event_name = "system.bootstrap.start", "starting application bootstrap");

    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(event_name = "system.bootstrap.database_connected", "database connection established");

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(event_name = "system.bootstrap.migrations_applied", "database migrations applied");

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let catalog = Arc::new(
        CatalogCache::new(
            Arc::new(SqlCatalogStore::new(db_pool.clone())),
            Arc::clone(&clock),
            config.cache.catalog_ttl(),
        )
        .with_fetch_timeout(Duration::from_secs(config.database.timeout_secs.max(1))),
    );

    let llm: Arc<dyn LlmClient> =
        Arc::new(HttpLlmClient::from_config(&config.llm).map_err(BootstrapError::HttpClient)?);
    let cache = Arc::new(semantic_cache(&config, &db_pool, &clock)?);
    let relay: Arc<dyn NotificationRelay> =
        match WebhookRelay::from_config(&config.relay).map_err(BootstrapError::HttpClient)? {
            Some(relay) => Arc::new(relay),
            None => Arc::new(LogRelay),
        };

    info!(
        event_name = "system.bootstrap.collaborators_ready",
        llm_provider = ?config.llm.provider,
        llm_model = %config.llm.model,
        semantic_cache = config.embedding.enabled,
        webhook_relay = config.relay.enabled && config.relay.webhook_url.is_some(),
        "agent collaborators wired"
    );

    let runtime = Arc::new(AgentRuntime::new(
        RuntimeDeps {
            catalog: Arc::clone(&catalog),
            llm,
            cache,
            relay,
            profiles: Arc::new(SqlProfileStore::new(db_pool.clone())),
            conversations: Arc::new(SqlConversationStore::new(db_pool.clone())),
            clock,
        },
        RuntimeSettings {
            llm_timeout: Duration::from_secs(config.llm.timeout_secs.max(1)),
            relay_timeout: Duration::from_secs(config.relay.timeout_secs.max(1)),
            store_timeout: Duration::from_secs(config.database.timeout_secs.max(1)),
        },
    ));

    Ok(Application { config, db_pool, catalog, runtime })
}

fn semantic_cache(
    config: &AppConfig,
    db_pool: &DbPool,
    clock: &Arc<dyn Clock>,
) -> Result<SemanticCache, BootstrapError> {
    let embeddings: Arc<dyn EmbeddingService> = if config.embedding.enabled {
        Arc::new(HttpEmbeddingService::from_config(&config.embedding).map_err(BootstrapError::HttpClient)?)
    } else {
        Arc::new(DisabledEmbeddings)
    };

    let cache = SemanticCache::new(
        Arc::new(InMemoryExactCache::new(Arc::clone(clock), config.cache.exact_ttl())),
        embeddings,
        Arc::new(SqlVectorIndex::new(db_pool.clone())),
        Arc::clone(clock),
        SemanticCacheSettings {
            similarity_threshold: config.cache.similarity_threshold,
            promotion_threshold: config.cache.promotion_threshold,
            upstream_timeout: config.cache.upstream_timeout(),
        },
    );

    Ok(if config.embedding.enabled { cache } else { cache.without_semantic_tier() })
}
