use std::fs;
use std::path::Path;

use budtender_core::domain::catalog::CatalogItem;
use budtender_db::{migrations, parse_catalog_json, CatalogSeedDataset, SeedResult};

use crate::commands::{
    block_on, connect, load_config, CommandResult, Failure, EXIT_EXECUTION, EXIT_INPUT,
    EXIT_VERIFICATION,
};

/// Loads catalog rows from `catalog` (a JSON array of items), or the demo
/// stock when no file is given.
pub fn run(catalog: Option<&Path>) -> CommandResult {
    let result = load_items(catalog).and_then(|items| {
        let config = load_config()?;
        block_on(async {
            let pool = connect(&config).await?;
            migrations::run_pending(&pool)
                .await
                .map_err(|error| ("migration", error.to_string(), EXIT_EXECUTION))?;

            let seeded = CatalogSeedDataset::load(&pool, &items)
                .await
                .map_err(|error| ("seed_execution", error.to_string(), EXIT_EXECUTION))?;
            let verification = CatalogSeedDataset::verify(&pool, &items)
                .await
                .map_err(|error| ("seed_verification", error.to_string(), EXIT_VERIFICATION))?;
            pool.close().await;

            if !verification.all_present {
                let missing = verification
                    .checks
                    .iter()
                    .filter_map(|(name, present)| (!present).then_some(name.as_str()))
                    .collect::<Vec<_>>();
                return Err(("seed_verification", verification_message(&missing), EXIT_VERIFICATION));
            }
            Ok::<SeedResult, Failure>(seeded)
        })
    });

    match result {
        Ok(seeded) => CommandResult::success("seed", summary(&seeded)),
        Err(failure) => CommandResult::from_failure("seed", failure),
    }
}

fn load_items(catalog: Option<&Path>) -> Result<Vec<CatalogItem>, Failure> {
    let Some(path) = catalog else {
        return CatalogSeedDataset::items()
            .map_err(|error| ("catalog_parse", error.to_string(), EXIT_INPUT));
    };
    let raw = fs::read_to_string(path).map_err(|error| {
        ("catalog_read", format!("could not read `{}`: {error}", path.display()), EXIT_INPUT)
    })?;
    parse_catalog_json(&raw).map_err(|error| ("catalog_parse", error.to_string(), EXIT_INPUT))
}

fn summary(seeded: &SeedResult) -> String {
    format!(
        "catalog loaded: {} inserted, {} updated, {} skipped",
        seeded.inserted, seeded.updated, seeded.skipped
    )
}

fn verification_message(missing: &[&str]) -> String {
    if missing.is_empty() {
        "some catalog rows failed to load".to_string()
    } else {
        format!("catalog rows missing after seed: {}", missing.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use budtender_db::SeedResult;

    use super::{summary, verification_message};

    #[test]
    fn verification_message_names_missing_rows() {
        assert_eq!(
            verification_message(&["Gelato", "Temple Ball"]),
            "catalog rows missing after seed: Gelato, Temple Ball"
        );
        assert_eq!(verification_message(&[]), "some catalog rows failed to load");
    }

    #[test]
    fn summary_reports_each_outcome() {
        let seeded = SeedResult { inserted: 3, updated: 1, skipped: 1 };
        assert_eq!(summary(&seeded), "catalog loaded: 3 inserted, 1 updated, 1 skipped");
    }
}
