use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrganizationId(pub String);

/// Platform user id, e.g. `U012ABCDEF` on Slack.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemberId(pub String);

impl MemberId {
    /// The normalized mention token for this user: `<@ID>`.
    pub fn mention_token(&self) -> String {
        format!("<@{}>", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    pub id: OrganizationId,
    pub name: String,
    /// Invocation prefix configured by the organization, if any.
    pub invocation_prefix: Option<char>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: MemberId,
    pub organization_id: OrganizationId,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
    ButtonClick,
    ViewSubmission,
    ViewClosed,
}

impl InteractionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ButtonClick => "button_click",
            Self::ViewSubmission => "view_submission",
            Self::ViewClosed => "view_closed",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionPayload {
    pub kind: InteractionKind,
    /// Opaque token embedded in the UI element at emission time.
    pub callback_token: String,
    /// Value attached to the clicked element, when the platform reports one.
    pub value: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    PlainMessage,
    DirectMessage,
    WorkflowMessage,
    Interaction,
}

/// Normalized inbound event handed over by the platform translation layer.
///
/// Built once per event and never mutated afterwards; the builder methods
/// consume `self` so an event is fully described before routing sees it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundEvent {
    pub text: String,
    pub sender: Member,
    /// Organization that owns the room (and the skills addressed in it).
    pub organization: Organization,
    /// The bot's own platform user id; its mention token is derived from it.
    pub bot_user_id: MemberId,
    pub is_direct_message: bool,
    pub is_workflow_message: bool,
    pub interaction: Option<InteractionPayload>,
    pub thread_id: Option<String>,
}

impl InboundEvent {
    pub fn message(
        organization: Organization,
        sender: Member,
        bot_user_id: MemberId,
        text: impl Into<String>,
    ) -> Self {
        Self {
            text: text.into(),
            sender,
            organization,
            bot_user_id,
            is_direct_message: false,
            is_workflow_message: false,
            interaction: None,
            thread_id: None,
        }
    }

    pub fn direct(mut self) -> Self {
        self.is_direct_message = true;
        self
    }

    pub fn workflow(mut self) -> Self {
        self.is_workflow_message = true;
        self
    }

    pub fn in_thread(mut self, thread_id: impl Into<String>) -> Self {
        self.thread_id = Some(thread_id.into());
        self
    }

    pub fn with_interaction(mut self, payload: InteractionPayload) -> Self {
        self.interaction = Some(payload);
        self
    }

    pub fn kind(&self) -> EventKind {
        if self.interaction.is_some() {
            EventKind::Interaction
        } else if self.is_workflow_message {
            EventKind::WorkflowMessage
        } else if self.is_direct_message {
            EventKind::DirectMessage
        } else {
            EventKind::PlainMessage
        }
    }

    /// True when the sender belongs to the organization that owns the room.
    pub fn is_from_member(&self) -> bool {
        self.sender.organization_id == self.organization.id
    }

    pub fn bot_mention_token(&self) -> String {
        self.bot_user_id.mention_token()
    }
}
