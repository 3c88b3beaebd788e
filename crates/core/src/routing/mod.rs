//! Message routing: decides whether a message is addressed to the bot, which
//! unit of code handles it, and what arguments that unit receives.
//!
//! ```text
//! InboundEvent → tokenizer → alias / verb sugar → skill resolver ─┐
//!        └──────────────→ pattern matcher (fallback) ────────────┴→ Router → RouteOutcome
//! ```

pub mod alias;
pub mod interaction;
pub mod patterns;
pub mod router;
pub mod skills;
pub mod tokenizer;
pub mod verb_sugar;

use std::future::Future;

use tokio_util::sync::CancellationToken;

use crate::errors::{RepositoryError, RouteError};

pub use alias::{AliasResolution, AliasResolver};
pub use interaction::{
    CallbackTarget, CallbackToken, InteractionHandler, InteractionInvocation,
    InteractionRegistry, InteractionRouteResult,
};
pub use patterns::{PatternMatcher, RegexCache};
pub use router::{RouteOutcome, RouteResult, Router};
pub use skills::{
    BuiltinRegistry, BuiltinSkill, RemoteDispatch, SkillResolver, SkillSource, SkillUnit,
    StaticBuiltin,
};
pub use tokenizer::{ParsedMessage, SkillCandidate, TokenizerInput, DEFAULT_INVOCATION_PREFIX};

/// Runs a repository call unless `cancel` fires first.
///
/// Nothing is persisted during routing, so dropping the in-flight lookup
/// leaves no partial state behind.
pub(crate) async fn until_cancelled<T, F>(
    cancel: &CancellationToken,
    lookup: F,
) -> Result<T, RouteError>
where
    F: Future<Output = Result<T, RepositoryError>>,
{
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(RouteError::Cancelled),
        result = lookup => result.map_err(RouteError::from),
    }
}
