//! Skill name resolution over an ordered chain of sources.
//!
//! Built-ins are looked up first, then the organization's custom skills. A
//! custom skill is never invoked directly; it is wrapped in [`RemoteDispatch`]
//! so the execution layer runs it remotely.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::domain::event::OrganizationId;
use crate::domain::skill::{CustomSkill, SkillId, SkillPattern};
use crate::errors::{RepositoryError, RouteError};
use crate::repositories::SkillRepository;
use crate::routing::interaction::InteractionHandler;
use crate::routing::until_cancelled;

/// Name reported for units that run user code through the remote dispatcher.
pub const REMOTE_DISPATCH: &str = "remote";

pub trait BuiltinSkill: Send + Sync {
    fn name(&self) -> &str;
    fn usage(&self) -> &str;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StaticBuiltin {
    pub name: &'static str,
    pub usage: &'static str,
}

impl BuiltinSkill for StaticBuiltin {
    fn name(&self) -> &str {
        self.name
    }

    fn usage(&self) -> &str {
        self.usage
    }
}

pub fn default_builtins() -> Vec<Arc<dyn BuiltinSkill>> {
    const CATALOG: &[StaticBuiltin] = &[
        StaticBuiltin { name: "help", usage: "help [skill]" },
        StaticBuiltin { name: "who", usage: "<@user> is <description>" },
        StaticBuiltin { name: "can", usage: "<@user> can [not] <skill>" },
        StaticBuiltin { name: "alias", usage: "alias {list|create|remove} [name] [target]" },
        StaticBuiltin { name: "pattern", usage: "pattern {list|create|remove} [name]" },
        StaticBuiltin { name: "skill", usage: "skill {list|info} [name]" },
        StaticBuiltin { name: "ping", usage: "ping [message]" },
    ];

    CATALOG
        .iter()
        .cloned()
        .map(|builtin| Arc::new(builtin) as Arc<dyn BuiltinSkill>)
        .collect()
}

/// Immutable lowercase-keyed registry, built once at startup.
#[derive(Clone, Default)]
pub struct BuiltinRegistry {
    skills: HashMap<String, Arc<dyn BuiltinSkill>>,
}

impl BuiltinRegistry {
    /// Later entries with the same lowercase name replace earlier ones.
    pub fn new(skills: impl IntoIterator<Item = Arc<dyn BuiltinSkill>>) -> Self {
        let skills =
            skills.into_iter().map(|skill| (skill.name().to_ascii_lowercase(), skill)).collect();
        Self { skills }
    }

    pub fn with_defaults() -> Self {
        Self::new(default_builtins())
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn BuiltinSkill>> {
        self.skills.get(&name.to_ascii_lowercase()).cloned()
    }

    /// Builtins sorted by name.
    pub fn list(&self) -> Vec<Arc<dyn BuiltinSkill>> {
        let mut skills: Vec<_> = self.skills.values().cloned().collect();
        skills.sort_by(|left, right| left.name().cmp(right.name()));
        skills
    }

    pub fn len(&self) -> usize {
        self.skills.len()
    }

    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
    }
}

impl fmt::Debug for BuiltinRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.skills.keys().collect();
        names.sort();
        f.debug_struct("BuiltinRegistry").field("skills", &names).finish()
    }
}

/// The fixed unit that ships a custom skill off to the execution layer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteDispatch {
    pub skill_id: SkillId,
    pub skill_name: String,
    pub organization_id: OrganizationId,
}

impl RemoteDispatch {
    pub fn for_skill(skill: &CustomSkill) -> Self {
        Self {
            skill_id: skill.id.clone(),
            skill_name: skill.name.clone(),
            organization_id: skill.organization_id.clone(),
        }
    }

    /// Dispatch to the skill owning a matched pattern.
    pub fn for_pattern(pattern: &SkillPattern) -> Self {
        Self {
            skill_id: pattern.skill_id.clone(),
            skill_name: pattern.skill_name.clone(),
            organization_id: pattern.organization_id.clone(),
        }
    }
}

#[derive(Clone)]
pub enum SkillUnit {
    Builtin(Arc<dyn BuiltinSkill>),
    Remote(RemoteDispatch),
    Handler(Arc<dyn InteractionHandler>),
}

impl SkillUnit {
    /// Name of the unit that will run: the builtin's name, [`REMOTE_DISPATCH`],
    /// or the interaction handler id.
    pub fn name(&self) -> &str {
        match self {
            Self::Builtin(skill) => skill.name(),
            Self::Remote(_) => REMOTE_DISPATCH,
            Self::Handler(handler) => handler.id(),
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote(_))
    }

    pub fn remote(&self) -> Option<&RemoteDispatch> {
        match self {
            Self::Remote(dispatch) => Some(dispatch),
            _ => None,
        }
    }
}

impl fmt::Debug for SkillUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Builtin(skill) => f.debug_tuple("Builtin").field(&skill.name()).finish(),
            Self::Remote(dispatch) => f.debug_tuple("Remote").field(&dispatch.skill_name).finish(),
            Self::Handler(handler) => f.debug_tuple("Handler").field(&handler.id()).finish(),
        }
    }
}

impl PartialEq for SkillUnit {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Builtin(left), Self::Builtin(right)) => left.name() == right.name(),
            (Self::Remote(left), Self::Remote(right)) => left == right,
            (Self::Handler(left), Self::Handler(right)) => left.id() == right.id(),
            _ => false,
        }
    }
}

/// One link in the resolution chain.
#[async_trait]
pub trait SkillSource: Send + Sync {
    async fn find(
        &self,
        name: &str,
        organization_id: &OrganizationId,
    ) -> Result<Option<SkillUnit>, RepositoryError>;
}

#[async_trait]
impl SkillSource for BuiltinRegistry {
    async fn find(
        &self,
        name: &str,
        _organization_id: &OrganizationId,
    ) -> Result<Option<SkillUnit>, RepositoryError> {
        Ok(self.get(name).map(SkillUnit::Builtin))
    }
}

pub struct CustomSkillSource {
    repository: Arc<dyn SkillRepository>,
}

impl CustomSkillSource {
    pub fn new(repository: Arc<dyn SkillRepository>) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl SkillSource for CustomSkillSource {
    async fn find(
        &self,
        name: &str,
        organization_id: &OrganizationId,
    ) -> Result<Option<SkillUnit>, RepositoryError> {
        let skill = self.repository.lookup_custom_skill(name, organization_id).await?;
        Ok(skill.map(|skill| SkillUnit::Remote(RemoteDispatch::for_skill(&skill))))
    }
}

pub struct SkillResolver {
    chain: Vec<Arc<dyn SkillSource>>,
}

impl SkillResolver {
    pub fn new(builtins: BuiltinRegistry, skills: Arc<dyn SkillRepository>) -> Self {
        Self::from_chain(vec![Arc::new(builtins), Arc::new(CustomSkillSource::new(skills))])
    }

    pub fn from_chain(chain: Vec<Arc<dyn SkillSource>>) -> Self {
        Self { chain }
    }

    /// First source with a hit wins. `Ok(None)` means no skill has this name.
    pub async fn resolve(
        &self,
        name: &str,
        organization_id: &OrganizationId,
        cancel: &CancellationToken,
    ) -> Result<Option<SkillUnit>, RouteError> {
        let name = name.to_lowercase();
        if name.is_empty() {
            return Ok(None);
        }

        for source in &self.chain {
            let found = until_cancelled(cancel, source.find(&name, organization_id)).await?;
            if let Some(unit) = found {
                debug!(
                    event_name = "routing.skill.resolved",
                    organization_id = %organization_id.0,
                    skill = %name,
                    unit = %unit.name(),
                    "skill resolved"
                );
                return Ok(Some(unit));
            }
        }
        Ok(None)
    }
}
