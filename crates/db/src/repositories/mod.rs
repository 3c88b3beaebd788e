//! Read-only adapters behind the routing ports of `skillbot-core`.

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use skillbot_core::errors::RepositoryError;

pub mod alias;
pub mod conversation;
pub mod memory;
pub mod pattern;
pub mod skill;

pub use alias::SqlAliasRepository;
pub use conversation::SqlConversationTracker;
pub use memory::{
    InMemoryAliasRepository, InMemoryConversationTracker, InMemoryPatternRepository,
    InMemorySkillRepository,
};
pub use pattern::SqlPatternRepository;
pub use skill::SqlSkillRepository;

pub(crate) fn database_error(error: sqlx::Error) -> RepositoryError {
    RepositoryError::Unavailable(error.to_string())
}

pub(crate) fn column<'r, T>(row: &'r SqliteRow, name: &str) -> Result<T, RepositoryError>
where
    T: sqlx::Decode<'r, sqlx::Sqlite> + sqlx::Type<sqlx::Sqlite>,
{
    row.try_get(name).map_err(|e| RepositoryError::Decode(e.to_string()))
}

pub(crate) fn parse_timestamp(field: &str, value: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Decode(format!("{field}: {e}")))
}
