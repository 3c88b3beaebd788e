use async_trait::async_trait;

use skillbot_core::domain::event::OrganizationId;
use skillbot_core::domain::skill::ConversationRef;
use skillbot_core::errors::RepositoryError;
use skillbot_core::repositories::ConversationTracker;

use super::{column, database_error};
use crate::DbPool;

/// Finds the newest conversation on a thread that is not closed.
pub struct SqlConversationTracker {
    pool: DbPool,
}

impl SqlConversationTracker {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ConversationTracker for SqlConversationTracker {
    async fn try_attach_conversation(
        &self,
        thread_id: &str,
        organization_id: &OrganizationId,
    ) -> Result<Option<ConversationRef>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, thread_id
             FROM conversations
             WHERE organization_id = ? AND thread_id = ? AND state != 'closed'
             ORDER BY created_at DESC
             LIMIT 1",
        )
        .bind(&organization_id.0)
        .bind(thread_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(database_error)?;

        match row {
            Some(ref r) => Ok(Some(ConversationRef {
                id: column(r, "id")?,
                thread_id: column(r, "thread_id")?,
            })),
            None => Ok(None),
        }
    }
}
