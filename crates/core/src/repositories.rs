//! Read-only ports consumed by the routing core.
//!
//! Implementations live outside this crate (`skillbot-db` ships SQL and
//! in-memory versions). Routing never writes through these traits.

use async_trait::async_trait;

use crate::domain::event::OrganizationId;
use crate::domain::skill::{Alias, ConversationRef, CustomSkill, SkillPattern};
use crate::errors::RepositoryError;

#[async_trait]
pub trait AliasRepository: Send + Sync {
    async fn lookup_alias(
        &self,
        name: &str,
        organization_id: &OrganizationId,
    ) -> Result<Option<Alias>, RepositoryError>;
}

#[async_trait]
pub trait PatternRepository: Send + Sync {
    async fn list_patterns(
        &self,
        organization_id: &OrganizationId,
    ) -> Result<Vec<SkillPattern>, RepositoryError>;
}

#[async_trait]
pub trait SkillRepository: Send + Sync {
    async fn lookup_custom_skill(
        &self,
        name: &str,
        organization_id: &OrganizationId,
    ) -> Result<Option<CustomSkill>, RepositoryError>;
}

/// Owned by the conversation-state tracker; attaching is an idempotent read.
#[async_trait]
pub trait ConversationTracker: Send + Sync {
    async fn try_attach_conversation(
        &self,
        thread_id: &str,
        organization_id: &OrganizationId,
    ) -> Result<Option<ConversationRef>, RepositoryError>;
}

/// Tracker used when no conversation tracking is wired in.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopConversationTracker;

#[async_trait]
impl ConversationTracker for NoopConversationTracker {
    async fn try_attach_conversation(
        &self,
        _thread_id: &str,
        _organization_id: &OrganizationId,
    ) -> Result<Option<ConversationRef>, RepositoryError> {
        Ok(None)
    }
}
