//! Slack integration for skillbot.
//!
//! - **Events** (`events`) - Slack message and interaction payloads normalized
//!   into [`skillbot_core::domain::event::InboundEvent`]
//! - **Dispatch** (`dispatch`) - feeds normalized events through the core router
//! - **Block Kit** (`blocks`) - message builders whose action blocks carry
//!   callback tokens, so clicks route back to the handler that emitted them
//!
//! # Architecture
//!
//! ```text
//! Slack payload → events::into_inbound → SlackEventRouter → Router → RouteOutcome
//!                                                               ↓
//!                     Block Kit UI (callback token in block_id) ← skill
//! ```

pub mod blocks;
pub mod dispatch;
pub mod events;

pub use dispatch::{
    DispatchError, EventContext, InMemoryOrganizationDirectory, OrganizationDirectory,
    SlackEventRouter,
};
pub use events::{NormalizeError, SlackInteractionPayload, SlackMessageEvent};
