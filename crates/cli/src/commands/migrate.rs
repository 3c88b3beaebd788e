use skillbot_db::migrations;
use tracing::info;

use crate::commands::{connect, load_config, runtime, CommandResult};

pub fn run() -> CommandResult {
    let config = match load_config("migrate") {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let runtime = match runtime("migrate") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let result = runtime.block_on(async {
        let pool = connect("migrate", &config).await?;
        let applied = migrations::run_pending(&pool).await.map_err(|error| {
            CommandResult::failure("migrate", "migration", error.to_string(), 5)
        });
        pool.close().await;
        applied
    });

    match result {
        Ok(()) => {
            info!(
                event_name = "cli.migrate.applied",
                database_url = %config.database.url,
                "applied pending migrations"
            );
            CommandResult::success("migrate", "applied pending migrations")
        }
        Err(failure) => failure,
    }
}
