use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

use skillbot_core::domain::event::{InboundEvent, MemberId, Organization};
use skillbot_core::errors::{RepositoryError, RouteError};
use skillbot_core::routing::{RouteOutcome, Router};

use crate::events::{NormalizeError, SlackInteractionPayload, SlackMessageEvent};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventContext {
    pub correlation_id: String,
}

impl EventContext {
    /// Fresh context for an inbound payload that carries no correlation id.
    pub fn generate() -> Self {
        Self { correlation_id: Uuid::new_v4().to_string() }
    }
}

impl Default for EventContext {
    fn default() -> Self {
        Self { correlation_id: "unknown-correlation-id".to_owned() }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error(transparent)]
    Normalize(#[from] NormalizeError),
    #[error("no organization registered for slack team `{0}`")]
    UnknownOrganization(String),
    #[error(transparent)]
    Directory(RepositoryError),
    #[error(transparent)]
    Route(#[from] RouteError),
}

/// Maps the Slack team that owns a room to its organization settings.
#[async_trait]
pub trait OrganizationDirectory: Send + Sync {
    async fn organization(&self, team_id: &str) -> Result<Option<Organization>, RepositoryError>;
}

#[derive(Default)]
pub struct InMemoryOrganizationDirectory {
    organizations: RwLock<HashMap<String, Organization>>,
}

impl InMemoryOrganizationDirectory {
    pub async fn insert(&self, organization: Organization) {
        let mut organizations = self.organizations.write().await;
        organizations.insert(organization.id.0.clone(), organization);
    }
}

#[async_trait]
impl OrganizationDirectory for InMemoryOrganizationDirectory {
    async fn organization(&self, team_id: &str) -> Result<Option<Organization>, RepositoryError> {
        let organizations = self.organizations.read().await;
        Ok(organizations.get(team_id).cloned())
    }
}

/// Feeds normalized Slack payloads through the [`Router`].
pub struct SlackEventRouter {
    router: Arc<Router>,
    directory: Arc<dyn OrganizationDirectory>,
    bot_user_id: MemberId,
}

impl SlackEventRouter {
    pub fn new(
        router: Arc<Router>,
        directory: Arc<dyn OrganizationDirectory>,
        bot_user_id: MemberId,
    ) -> Self {
        Self { router, directory, bot_user_id }
    }

    /// `team_id` is the team owning the room, taken from the event envelope.
    pub async fn handle_message(
        &self,
        team_id: &str,
        event: SlackMessageEvent,
        ctx: &EventContext,
        cancel: &CancellationToken,
    ) -> Result<RouteOutcome, DispatchError> {
        let organization = self.organization(team_id).await?;
        let inbound = event.into_inbound(organization, &self.bot_user_id)?;
        self.route(inbound, ctx, cancel).await
    }

    pub async fn handle_interaction(
        &self,
        team_id: &str,
        payload: SlackInteractionPayload,
        ctx: &EventContext,
        cancel: &CancellationToken,
    ) -> Result<RouteOutcome, DispatchError> {
        let organization = self.organization(team_id).await?;
        let inbound = payload.into_inbound(organization, &self.bot_user_id)?;
        self.route(inbound, ctx, cancel).await
    }

    async fn organization(&self, team_id: &str) -> Result<Organization, DispatchError> {
        self.directory
            .organization(team_id)
            .await
            .map_err(DispatchError::Directory)?
            .ok_or_else(|| DispatchError::UnknownOrganization(team_id.to_owned()))
    }

    async fn route(
        &self,
        inbound: InboundEvent,
        ctx: &EventContext,
        cancel: &CancellationToken,
    ) -> Result<RouteOutcome, DispatchError> {
        let outcome = self.router.route(&inbound, cancel).await?;
        match outcome.result() {
            Some(result) => info!(
                event_name = "slack.event.routed",
                correlation_id = %ctx.correlation_id,
                organization_id = %inbound.organization.id.0,
                event_kind = ?inbound.kind(),
                skill = %result.skill_name,
                resolved = result.is_resolved(),
                "slack event routed"
            ),
            None => debug!(
                event_name = "slack.event.ignored",
                correlation_id = %ctx.correlation_id,
                organization_id = %inbound.organization.id.0,
                event_kind = ?inbound.kind(),
                "slack event ignored"
            ),
        }
        Ok(outcome)
    }
}
