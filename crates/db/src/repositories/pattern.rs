use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;

use skillbot_core::domain::event::OrganizationId;
use skillbot_core::domain::skill::{PatternId, PatternKind, SkillId, SkillPattern};
use skillbot_core::errors::RepositoryError;
use skillbot_core::repositories::PatternRepository;

use super::{column, database_error, parse_timestamp};
use crate::DbPool;

pub struct SqlPatternRepository {
    pool: DbPool,
}

impl SqlPatternRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_pattern(row: &SqliteRow) -> Result<SkillPattern, RepositoryError> {
    let kind: String = column(row, "kind")?;
    let created_at: String = column(row, "created_at")?;

    Ok(SkillPattern {
        id: PatternId(column(row, "id")?),
        name: column(row, "name")?,
        skill_id: SkillId(column(row, "skill_id")?),
        skill_name: column(row, "skill_name")?,
        organization_id: OrganizationId(column(row, "organization_id")?),
        pattern: column(row, "pattern")?,
        kind: PatternKind::parse(&kind)
            .ok_or_else(|| RepositoryError::Decode(format!("unknown pattern kind `{kind}`")))?,
        case_sensitive: column(row, "case_sensitive")?,
        allow_external_callers: column(row, "allow_external_callers")?,
        enabled: column(row, "enabled")?,
        created_at: parse_timestamp("created_at", &created_at)?,
    })
}

#[async_trait]
impl PatternRepository for SqlPatternRepository {
    /// Every pattern of the organization, including disabled ones.
    async fn list_patterns(
        &self,
        organization_id: &OrganizationId,
    ) -> Result<Vec<SkillPattern>, RepositoryError> {
        let rows: Vec<SqliteRow> = sqlx::query(
            "SELECT p.id, p.name, p.skill_id, s.name AS skill_name, p.organization_id,
                    p.pattern, p.kind, p.case_sensitive, p.allow_external_callers,
                    p.enabled, p.created_at
             FROM skill_patterns p
             JOIN skills s ON s.id = p.skill_id
             WHERE p.organization_id = ?
             ORDER BY p.created_at ASC, p.id ASC",
        )
        .bind(&organization_id.0)
        .fetch_all(&self.pool)
        .await
        .map_err(database_error)?;

        rows.iter().map(row_to_pattern).collect::<Result<Vec<_>, _>>()
    }
}
