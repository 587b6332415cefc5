use std::sync::Arc;

use budtender_core::cache::{DisabledEmbeddings, InMemoryExactCache};
use budtender_core::clock::{Clock, SystemClock};
use budtender_core::config::AppConfig;
use budtender_core::{SemanticCache, SemanticCacheSettings};
use budtender_db::{migrations, DbPool, SqlVectorIndex};
use serde_json::json;
use uuid::Uuid;

use crate::commands::{
    block_on, connect, load_config, CommandResult, Failure, EXIT_EXECUTION, EXIT_INPUT,
};

/// Replaces the stored response of one cache entry.
pub fn update(entry_id: &str, response: &str) -> CommandResult {
    if response.trim().is_empty() {
        return CommandResult::failure(
            "cache update",
            "cache_response",
            "replacement response must not be empty",
            EXIT_INPUT,
        );
    }
    administer("cache update", entry_id, Some(response))
}

/// Stops one cache entry from matching again.
pub fn deactivate(entry_id: &str) -> CommandResult {
    administer("cache deactivate", entry_id, None)
}

fn administer(command: &str, entry_id: &str, response: Option<&str>) -> CommandResult {
    let result = parse_entry_id(entry_id).and_then(|id| {
        let config = load_config()?;
        block_on(async {
            let pool = connect(&config).await?;
            migrations::run_pending(&pool)
                .await
                .map_err(|error| ("migration", error.to_string(), EXIT_EXECUTION))?;

            let cache = admin_cache(&config, &pool);
            let found = match response {
                Some(text) => cache.update_response(id, text).await,
                None => cache.deactivate(id).await,
            }
            .map_err(|error| ("cache_admin", error.to_string(), EXIT_EXECUTION))?;
            pool.close().await;

            Ok::<(Uuid, bool), Failure>((id, found))
        })
    });

    match result {
        Ok((id, true)) => CommandResult::success_with_data(
            command,
            success_message(id, response.is_some()),
            Some(json!({ "entry_id": id.to_string() })),
        ),
        Ok((id, false)) => CommandResult::failure(
            command,
            "cache_entry_not_found",
            format!("no cache entry with id {id}"),
            EXIT_INPUT,
        ),
        Err(failure) => CommandResult::from_failure(command, failure),
    }
}

/// Admin operations act on the persisted semantic tier. Servers drop or
/// refresh their exact-tier copies on the next hit.
fn admin_cache(config: &AppConfig, pool: &DbPool) -> SemanticCache {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    SemanticCache::new(
        Arc::new(InMemoryExactCache::new(Arc::clone(&clock), None)),
        Arc::new(DisabledEmbeddings),
        Arc::new(SqlVectorIndex::new(pool.clone())),
        clock,
        SemanticCacheSettings {
            similarity_threshold: config.cache.similarity_threshold,
            promotion_threshold: config.cache.promotion_threshold,
            upstream_timeout: config.cache.upstream_timeout(),
        },
    )
}

fn parse_entry_id(raw: &str) -> Result<Uuid, Failure> {
    Uuid::parse_str(raw.trim()).map_err(|error| {
        ("cache_entry_id", format!("`{raw}` is not a cache entry id: {error}"), EXIT_INPUT)
    })
}

fn success_message(id: Uuid, updated: bool) -> String {
    if updated {
        format!("cache entry {id} updated")
    } else {
        format!("cache entry {id} deactivated")
    }
}

#[cfg(test)]
mod tests {
    use super::{parse_entry_id, update};

    #[test]
    fn entry_ids_must_be_uuids() {
        assert!(parse_entry_id(" 67e55044-10b1-426f-9247-bb680e5fe0c8 ").is_ok());

        let (class, _, exit_code) = parse_entry_id("entry-7").expect_err("not a uuid");
        assert_eq!((class, exit_code), ("cache_entry_id", 4));
    }

    #[test]
    fn blank_replacement_is_rejected_before_connecting() {
        let result = update("67e55044-10b1-426f-9247-bb680e5fe0c8", "   ");

        assert_eq!(result.exit_code, 4);
        assert!(result.output.contains("cache_response"));
    }
}
