use serde::Deserialize;
use thiserror::Error;

use skillbot_core::domain::event::{
    InboundEvent, InteractionKind, InteractionPayload, Member, MemberId, Organization,
    OrganizationId,
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("invalid slack payload: {0}")]
    Json(String),
    #[error("slack payload is missing `{0}`")]
    MissingField(&'static str),
    #[error("unsupported slack interaction type")]
    UnsupportedInteraction,
}

impl From<serde_json::Error> for NormalizeError {
    fn from(error: serde_json::Error) -> Self {
        Self::Json(error.to_string())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct SlackBotProfile {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub is_workflow_bot: bool,
}

/// The `event` object of a Slack `message` callback.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct SlackMessageEvent {
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub bot_id: Option<String>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub channel_type: Option<String>,
    #[serde(default)]
    pub team: Option<String>,
    /// Team of the author; differs from `team` in shared channels.
    #[serde(default)]
    pub user_team: Option<String>,
    #[serde(default)]
    pub ts: Option<String>,
    #[serde(default)]
    pub thread_ts: Option<String>,
    #[serde(default)]
    pub bot_profile: Option<SlackBotProfile>,
}

impl SlackMessageEvent {
    pub fn from_json(raw: &str) -> Result<Self, NormalizeError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn is_direct_message(&self) -> bool {
        self.channel_type.as_deref() == Some("im")
    }

    pub fn is_workflow_message(&self) -> bool {
        self.bot_profile.as_ref().is_some_and(|profile| profile.is_workflow_bot)
    }

    pub fn sender_id(&self) -> Option<&str> {
        self.user
            .as_deref()
            .or(self.bot_id.as_deref())
            .or_else(|| self.bot_profile.as_ref().and_then(|profile| profile.id.as_deref()))
            .filter(|id| !id.trim().is_empty())
    }

    pub fn sender_organization(&self) -> Option<&str> {
        non_empty(self.user_team.as_deref()).or_else(|| non_empty(self.team.as_deref()))
    }

    /// Builds the routing event for a message posted in a room owned by `organization`.
    pub fn into_inbound(
        self,
        organization: Organization,
        bot_user_id: &MemberId,
    ) -> Result<InboundEvent, NormalizeError> {
        let sender = Member {
            id: MemberId(self.sender_id().ok_or(NormalizeError::MissingField("user"))?.to_owned()),
            organization_id: OrganizationId(
                self.sender_organization().ok_or(NormalizeError::MissingField("team"))?.to_owned(),
            ),
        };
        let is_direct_message = self.is_direct_message();
        let is_workflow_message = self.is_workflow_message();

        let mut event = InboundEvent::message(organization, sender, bot_user_id.clone(), self.text);
        if is_direct_message {
            event = event.direct();
        }
        if is_workflow_message {
            event = event.workflow();
        }
        if let Some(thread_ts) = non_empty(self.thread_ts.as_deref()) {
            event = event.in_thread(thread_ts);
        }
        Ok(event)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct SlackUser {
    pub id: String,
    #[serde(default)]
    pub team_id: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct SlackTeam {
    pub id: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct SlackAction {
    pub action_id: String,
    #[serde(default)]
    pub block_id: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct SlackMessageRef {
    #[serde(default)]
    pub ts: Option<String>,
    #[serde(default)]
    pub thread_ts: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct SlackView {
    #[serde(default)]
    pub callback_id: String,
    #[serde(default)]
    pub private_metadata: Option<String>,
}

/// Body of a Slack `interactive` request.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SlackInteractionPayload {
    BlockActions {
        user: SlackUser,
        #[serde(default)]
        team: Option<SlackTeam>,
        #[serde(default)]
        actions: Vec<SlackAction>,
        #[serde(default)]
        message: Option<SlackMessageRef>,
    },
    ViewSubmission {
        user: SlackUser,
        #[serde(default)]
        team: Option<SlackTeam>,
        view: SlackView,
    },
    ViewClosed {
        user: SlackUser,
        #[serde(default)]
        team: Option<SlackTeam>,
        view: SlackView,
    },
    #[serde(other)]
    Unsupported,
}

impl SlackInteractionPayload {
    pub fn from_json(raw: &str) -> Result<Self, NormalizeError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn kind(&self) -> Option<InteractionKind> {
        match self {
            Self::BlockActions { .. } => Some(InteractionKind::ButtonClick),
            Self::ViewSubmission { .. } => Some(InteractionKind::ViewSubmission),
            Self::ViewClosed { .. } => Some(InteractionKind::ViewClosed),
            Self::Unsupported => None,
        }
    }

    fn parties(&self) -> Option<(&SlackUser, Option<&SlackTeam>)> {
        match self {
            Self::BlockActions { user, team, .. }
            | Self::ViewSubmission { user, team, .. }
            | Self::ViewClosed { user, team, .. } => Some((user, team.as_ref())),
            Self::Unsupported => None,
        }
    }

    /// Token and value as emitted with the UI element.
    ///
    /// A missing `block_id` yields an empty token, which routing ignores.
    fn callback(&self) -> Result<(String, Option<String>), NormalizeError> {
        match self {
            Self::BlockActions { actions, .. } => {
                let action = actions.first().ok_or(NormalizeError::MissingField("actions"))?;
                Ok((action.block_id.clone().unwrap_or_default(), action.value.clone()))
            }
            Self::ViewSubmission { view, .. } | Self::ViewClosed { view, .. } => Ok((
                view.callback_id.clone(),
                non_empty(view.private_metadata.as_deref()).map(str::to_owned),
            )),
            Self::Unsupported => Err(NormalizeError::UnsupportedInteraction),
        }
    }

    fn thread_ts(&self) -> Option<&str> {
        match self {
            Self::BlockActions { message: Some(message), .. } => {
                non_empty(message.thread_ts.as_deref())
            }
            _ => None,
        }
    }

    pub fn into_inbound(
        self,
        organization: Organization,
        bot_user_id: &MemberId,
    ) -> Result<InboundEvent, NormalizeError> {
        let kind = self.kind().ok_or(NormalizeError::UnsupportedInteraction)?;
        let (user, team) = self.parties().ok_or(NormalizeError::UnsupportedInteraction)?;
        let sender_organization = non_empty(user.team_id.as_deref())
            .or_else(|| team.map(|team| team.id.as_str()))
            .ok_or(NormalizeError::MissingField("team"))?;
        let sender = Member {
            id: MemberId(user.id.clone()),
            organization_id: OrganizationId(sender_organization.to_owned()),
        };
        let (callback_token, value) = self.callback()?;

        let mut event = InboundEvent::message(organization, sender, bot_user_id.clone(), "")
            .with_interaction(InteractionPayload { kind, callback_token, value });
        if let Some(thread_ts) = self.thread_ts() {
            event = event.in_thread(thread_ts);
        }
        Ok(event)
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}
