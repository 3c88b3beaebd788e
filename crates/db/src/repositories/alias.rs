use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;

use skillbot_core::domain::event::OrganizationId;
use skillbot_core::domain::skill::Alias;
use skillbot_core::errors::RepositoryError;
use skillbot_core::repositories::AliasRepository;

use super::{column, database_error};
use crate::DbPool;

pub struct SqlAliasRepository {
    pool: DbPool,
}

impl SqlAliasRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_alias(row: &SqliteRow) -> Result<Alias, RepositoryError> {
    Ok(Alias {
        name: column(row, "name")?,
        target_skill: column(row, "target_skill")?,
        arguments: column(row, "arguments")?,
        organization_id: OrganizationId(column(row, "organization_id")?),
    })
}

#[async_trait]
impl AliasRepository for SqlAliasRepository {
    async fn lookup_alias(
        &self,
        name: &str,
        organization_id: &OrganizationId,
    ) -> Result<Option<Alias>, RepositoryError> {
        let row = sqlx::query(
            "SELECT organization_id, name, target_skill, arguments
             FROM aliases
             WHERE organization_id = ? AND name = ? COLLATE NOCASE",
        )
        .bind(&organization_id.0)
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(database_error)?;

        row.as_ref().map(row_to_alias).transpose()
    }
}
