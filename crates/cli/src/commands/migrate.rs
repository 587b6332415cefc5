use budtender_db::migrations;

use crate::commands::{block_on, connect, load_config, CommandResult, Failure, EXIT_EXECUTION};

pub fn run() -> CommandResult {
    let result = load_config().and_then(|config| {
        block_on(async {
            let pool = connect(&config).await?;
            migrations::run_pending(&pool)
                .await
                .map_err(|error| ("migration", error.to_string(), EXIT_EXECUTION))?;
            pool.close().await;
            Ok::<(), Failure>(())
        })
    });

    match result {
        Ok(()) => CommandResult::success("migrate", "applied pending migrations"),
        Err(failure) => CommandResult::from_failure("migrate", failure),
    }
}
