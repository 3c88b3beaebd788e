use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::domain::event::OrganizationId;
use crate::domain::skill::Alias;
use crate::errors::RouteError;
use crate::repositories::AliasRepository;
use crate::routing::until_cancelled;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AliasResolution {
    pub skill_name: String,
    pub arguments: Vec<String>,
    /// The alias that was applied, if any.
    pub alias: Option<Alias>,
}

/// Replaces the skill name with the alias target and prepends the alias's
/// argument words, in order, ahead of the parsed arguments.
pub fn apply_alias(alias: &Alias, arguments: Vec<String>) -> (String, Vec<String>) {
    let mut expanded: Vec<String> =
        alias.arguments.split_whitespace().map(ToOwned::to_owned).collect();
    expanded.extend(arguments);
    (alias.target_skill.clone(), expanded)
}

pub struct AliasResolver {
    repository: Arc<dyn AliasRepository>,
}

impl AliasResolver {
    pub fn new(repository: Arc<dyn AliasRepository>) -> Self {
        Self { repository }
    }

    /// Single-step lookup; an alias whose target is itself an alias is not followed.
    pub async fn resolve(
        &self,
        skill_name: &str,
        arguments: Vec<String>,
        organization_id: &OrganizationId,
        cancel: &CancellationToken,
    ) -> Result<AliasResolution, RouteError> {
        let alias =
            until_cancelled(cancel, self.repository.lookup_alias(skill_name, organization_id))
                .await?;

        let Some(alias) = alias else {
            return Ok(AliasResolution {
                skill_name: skill_name.to_owned(),
                arguments,
                alias: None,
            });
        };

        let (target, arguments) = apply_alias(&alias, arguments);
        debug!(
            event_name = "routing.alias.applied",
            organization_id = %organization_id.0,
            alias = %alias.name,
            skill = %target,
            "alias expanded"
        );
        Ok(AliasResolution { skill_name: target, arguments, alias: Some(alias) })
    }
}
