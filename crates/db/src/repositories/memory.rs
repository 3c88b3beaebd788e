use std::collections::HashMap;

use tokio::sync::RwLock;

use skillbot_core::domain::event::OrganizationId;
use skillbot_core::domain::skill::{Alias, ConversationRef, CustomSkill, SkillPattern};
use skillbot_core::errors::RepositoryError;
use skillbot_core::repositories::{
    AliasRepository, ConversationTracker, PatternRepository, SkillRepository,
};

/// Names are keyed by organization plus lowercase name.
fn key(organization_id: &OrganizationId, name: &str) -> (String, String) {
    (organization_id.0.clone(), name.to_lowercase())
}

#[derive(Default)]
pub struct InMemoryAliasRepository {
    aliases: RwLock<HashMap<(String, String), Alias>>,
}

impl InMemoryAliasRepository {
    pub async fn insert(&self, alias: Alias) {
        let mut aliases = self.aliases.write().await;
        aliases.insert(key(&alias.organization_id, &alias.name), alias);
    }
}

#[async_trait::async_trait]
impl AliasRepository for InMemoryAliasRepository {
    async fn lookup_alias(
        &self,
        name: &str,
        organization_id: &OrganizationId,
    ) -> Result<Option<Alias>, RepositoryError> {
        let aliases = self.aliases.read().await;
        Ok(aliases.get(&key(organization_id, name)).cloned())
    }
}

#[derive(Default)]
pub struct InMemorySkillRepository {
    skills: RwLock<HashMap<(String, String), CustomSkill>>,
}

impl InMemorySkillRepository {
    pub async fn insert(&self, skill: CustomSkill) {
        let mut skills = self.skills.write().await;
        skills.insert(key(&skill.organization_id, &skill.name), skill);
    }
}

#[async_trait::async_trait]
impl SkillRepository for InMemorySkillRepository {
    async fn lookup_custom_skill(
        &self,
        name: &str,
        organization_id: &OrganizationId,
    ) -> Result<Option<CustomSkill>, RepositoryError> {
        let skills = self.skills.read().await;
        Ok(skills.get(&key(organization_id, name)).cloned())
    }
}

#[derive(Default)]
pub struct InMemoryPatternRepository {
    patterns: RwLock<Vec<SkillPattern>>,
}

impl InMemoryPatternRepository {
    /// Replaces any pattern with the same id.
    pub async fn insert(&self, pattern: SkillPattern) {
        let mut patterns = self.patterns.write().await;
        patterns.retain(|existing| existing.id != pattern.id);
        patterns.push(pattern);
    }
}

#[async_trait::async_trait]
impl PatternRepository for InMemoryPatternRepository {
    async fn list_patterns(
        &self,
        organization_id: &OrganizationId,
    ) -> Result<Vec<SkillPattern>, RepositoryError> {
        let patterns = self.patterns.read().await;
        Ok(patterns
            .iter()
            .filter(|pattern| &pattern.organization_id == organization_id)
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub struct InMemoryConversationTracker {
    conversations: RwLock<HashMap<(String, String), ConversationRef>>,
}

impl InMemoryConversationTracker {
    pub async fn insert(&self, organization_id: &OrganizationId, conversation: ConversationRef) {
        let mut conversations = self.conversations.write().await;
        conversations
            .insert((organization_id.0.clone(), conversation.thread_id.clone()), conversation);
    }
}

#[async_trait::async_trait]
impl ConversationTracker for InMemoryConversationTracker {
    async fn try_attach_conversation(
        &self,
        thread_id: &str,
        organization_id: &OrganizationId,
    ) -> Result<Option<ConversationRef>, RepositoryError> {
        let conversations = self.conversations.read().await;
        Ok(conversations.get(&(organization_id.0.clone(), thread_id.to_string())).cloned())
    }
}
