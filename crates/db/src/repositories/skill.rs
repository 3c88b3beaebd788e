use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;

use skillbot_core::domain::event::OrganizationId;
use skillbot_core::domain::skill::{CustomSkill, SkillId};
use skillbot_core::errors::RepositoryError;
use skillbot_core::repositories::SkillRepository;

use super::{column, database_error};
use crate::DbPool;

pub struct SqlSkillRepository {
    pool: DbPool,
}

impl SqlSkillRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_skill(row: &SqliteRow) -> Result<CustomSkill, RepositoryError> {
    Ok(CustomSkill {
        id: SkillId(column(row, "id")?),
        name: column(row, "name")?,
        organization_id: OrganizationId(column(row, "organization_id")?),
        language: column(row, "language")?,
    })
}

#[async_trait]
impl SkillRepository for SqlSkillRepository {
    async fn lookup_custom_skill(
        &self,
        name: &str,
        organization_id: &OrganizationId,
    ) -> Result<Option<CustomSkill>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, organization_id, name, language
             FROM skills
             WHERE organization_id = ? AND name = ? COLLATE NOCASE",
        )
        .bind(&organization_id.0)
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(database_error)?;

        row.as_ref().map(row_to_skill).transpose()
    }
}

#[cfg(test)]
mod tests {
    use skillbot_core::domain::event::OrganizationId;
    use skillbot_core::errors::RepositoryError;
    use skillbot_core::repositories::SkillRepository;

    use super::SqlSkillRepository;
    use crate::repositories::test_support::{insert_skill, migrated_pool};

    #[tokio::test]
    async fn finds_skills_owned_by_the_organization() {
        let pool = migrated_pool().await;
        insert_skill(&pool, "sk-1", "T1", "deploy").await;
        insert_skill(&pool, "sk-2", "T2", "deploy").await;
        let repo = SqlSkillRepository::new(pool);

        let skill = repo
            .lookup_custom_skill("deploy", &OrganizationId("T2".to_string()))
            .await
            .expect("lookup")
            .expect("skill exists");
        let missing = repo
            .lookup_custom_skill("rollback", &OrganizationId("T1".to_string()))
            .await
            .expect("lookup");

        assert_eq!(skill.id.0, "sk-2");
        assert_eq!(skill.language, "python");
        assert_eq!(missing, None);
    }

    #[tokio::test]
    async fn closed_pool_reports_unavailable() {
        let pool = migrated_pool().await;
        pool.close().await;
        let repo = SqlSkillRepository::new(pool);

        let error = repo
            .lookup_custom_skill("deploy", &OrganizationId("T1".to_string()))
            .await
            .expect_err("closed pool");

        assert!(matches!(error, RepositoryError::Unavailable(_)));
    }
}
