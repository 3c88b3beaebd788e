pub mod config;
pub mod domain;
pub mod errors;
pub mod repositories;
pub mod routing;

pub use config::{AppConfig, ConfigError, LoadOptions, LogFormat};
pub use domain::event::{
    EventKind, InboundEvent, InteractionKind, InteractionPayload, Member, MemberId, Organization,
    OrganizationId,
};
pub use domain::skill::{
    Alias, ConversationRef, CustomSkill, PatternId, PatternKind, SkillId, SkillPattern,
};
pub use errors::{CallbackTokenError, RepositoryError, RouteError};
pub use repositories::{
    AliasRepository, ConversationTracker, NoopConversationTracker, PatternRepository,
    SkillRepository,
};
pub use routing::{
    CallbackTarget, CallbackToken, InteractionHandler, InteractionRegistry,
    InteractionRouteResult, RouteOutcome, RouteResult, Router, SkillUnit,
};
