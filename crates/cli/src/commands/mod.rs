pub mod config;
pub mod doctor;
pub mod migrate;
pub mod patterns;
pub mod route;

use std::sync::Arc;

use serde::Serialize;
use skillbot_core::config::{AppConfig, LoadOptions};
use skillbot_core::errors::RouteError;
use skillbot_core::routing::{BuiltinRegistry, Router};
use skillbot_db::{
    connect_with_settings, DbPool, SqlAliasRepository, SqlConversationTracker,
    SqlPatternRepository, SqlSkillRepository,
};
use tokio::runtime::Runtime;
use tokio_util::sync::CancellationToken;

pub use patterns::PatternArgs;
pub use route::RouteArgs;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
        };
        Self { exit_code, output: serialize_payload(payload) }
    }

    /// Successful command whose payload is a structured report.
    pub(crate) fn report<T: Serialize>(command: &str, report: &T) -> Self {
        match serde_json::to_string(report) {
            Ok(output) => Self { exit_code: 0, output },
            Err(error) => Self::failure(command, "serialization", error.to_string(), 1),
        }
    }
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

pub(crate) fn load_config(command: &str) -> Result<AppConfig, CommandResult> {
    AppConfig::load(LoadOptions::default()).map_err(|error| {
        CommandResult::failure(
            command,
            "config_validation",
            format!("configuration issue: {error}"),
            2,
        )
    })
}

pub(crate) fn runtime(command: &str) -> Result<Runtime, CommandResult> {
    tokio::runtime::Builder::new_current_thread().enable_all().build().map_err(|error| {
        CommandResult::failure(
            command,
            "runtime_init",
            format!("failed to initialize async runtime: {error}"),
            3,
        )
    })
}

pub(crate) async fn connect(command: &str, config: &AppConfig) -> Result<DbPool, CommandResult> {
    connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(|error| CommandResult::failure(command, "db_connectivity", error.to_string(), 4))
}

/// The production router wiring over the SQL repositories.
pub(crate) fn sql_router(pool: &DbPool, config: &AppConfig) -> Router {
    Router::new(
        BuiltinRegistry::with_defaults(),
        Arc::new(SqlSkillRepository::new(pool.clone())),
        Arc::new(SqlAliasRepository::new(pool.clone())),
        Arc::new(SqlPatternRepository::new(pool.clone())),
    )
    .with_conversation_tracker(Arc::new(SqlConversationTracker::new(pool.clone())))
    .with_default_prefix(config.routing.default_prefix)
}

/// Token tripped by Ctrl-C. Must be called from inside the runtime.
pub(crate) fn interrupt_token() -> CancellationToken {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            trigger.cancel();
        }
    });
    cancel
}

pub(crate) fn route_failure(command: &str, error: &RouteError) -> CommandResult {
    let exit_code = if error.is_cancelled() { 130 } else { 6 };
    CommandResult::failure(command, error.error_class(), error.to_string(), exit_code)
}
