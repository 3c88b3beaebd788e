use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::domain::event::{InboundEvent, Member, OrganizationId};
use crate::domain::skill::{ConversationRef, SkillPattern};
use crate::errors::RouteError;
use crate::repositories::{
    AliasRepository, ConversationTracker, NoopConversationTracker, PatternRepository,
    SkillRepository,
};
use crate::routing::alias::AliasResolver;
use crate::routing::interaction::{
    parse_callback_token, CallbackTarget, InteractionInvocation, InteractionRegistry,
    InteractionRouteResult,
};
use crate::routing::patterns::PatternMatcher;
use crate::routing::skills::{BuiltinRegistry, RemoteDispatch, SkillResolver, SkillUnit};
use crate::routing::tokenizer::{
    parse_message, ParsedMessage, SkillCandidate, TokenizerInput, DEFAULT_INVOCATION_PREFIX,
};
use crate::routing::until_cancelled;

/// A routing decision. `unit == None` means no skill matched, which is a
/// normal outcome and keeps the attempted name and arguments for help text.
#[derive(Clone, Debug, PartialEq)]
pub struct RouteResult {
    pub unit: Option<SkillUnit>,
    pub skill_name: String,
    pub arguments: String,
    pub directed_at_bot: bool,
    /// Set when the route came from the pattern fallback.
    pub pattern: Option<SkillPattern>,
    pub conversation: Option<ConversationRef>,
}

impl RouteResult {
    fn unmatched(parsed: &ParsedMessage, skill_name: String, arguments: String) -> Self {
        Self {
            unit: None,
            skill_name,
            arguments,
            directed_at_bot: parsed.directed_at_bot,
            pattern: None,
            conversation: None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.unit.is_some()
    }

    pub fn matched_via_pattern(&self) -> bool {
        self.pattern.is_some()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum RouteOutcome {
    /// Produce no response at all. Not an error.
    Ignore,
    Routed(RouteResult),
}

impl RouteOutcome {
    pub fn is_ignore(&self) -> bool {
        matches!(self, Self::Ignore)
    }

    pub fn result(&self) -> Option<&RouteResult> {
        match self {
            Self::Routed(result) => Some(result),
            Self::Ignore => None,
        }
    }

    pub fn into_result(self) -> Option<RouteResult> {
        match self {
            Self::Routed(result) => Some(result),
            Self::Ignore => None,
        }
    }
}

pub struct Router {
    skills: SkillResolver,
    aliases: AliasResolver,
    patterns: PatternMatcher,
    interactions: InteractionRegistry,
    conversations: Arc<dyn ConversationTracker>,
    default_prefix: char,
}

impl Router {
    pub fn new(
        builtins: BuiltinRegistry,
        skills: Arc<dyn SkillRepository>,
        aliases: Arc<dyn AliasRepository>,
        patterns: Arc<dyn PatternRepository>,
    ) -> Self {
        Self {
            skills: SkillResolver::new(builtins, skills),
            aliases: AliasResolver::new(aliases),
            patterns: PatternMatcher::new(patterns),
            interactions: InteractionRegistry::default(),
            conversations: Arc::new(NoopConversationTracker),
            default_prefix: DEFAULT_INVOCATION_PREFIX,
        }
    }

    pub fn with_interactions(mut self, interactions: InteractionRegistry) -> Self {
        self.interactions = interactions;
        self
    }

    pub fn with_conversation_tracker(mut self, tracker: Arc<dyn ConversationTracker>) -> Self {
        self.conversations = tracker;
        self
    }

    /// Prefix used when the organization has not configured its own.
    pub fn with_default_prefix(mut self, prefix: char) -> Self {
        self.default_prefix = prefix;
        self
    }

    pub async fn route(
        &self,
        event: &InboundEvent,
        cancel: &CancellationToken,
    ) -> Result<RouteOutcome, RouteError> {
        if event.interaction.is_some() {
            return Ok(match self.route_interaction(event, cancel).await? {
                InteractionRouteResult::Invoke(invocation) => {
                    RouteOutcome::Routed(interaction_route(invocation))
                }
                InteractionRouteResult::Ignore => RouteOutcome::Ignore,
            });
        }

        let organization_id = &event.organization.id;
        let invocation_prefix = event.organization.invocation_prefix.unwrap_or(self.default_prefix);
        let parsed = parse_message(&TokenizerInput {
            text: &event.text,
            bot_user_id: &event.bot_user_id.0,
            invocation_prefix,
            is_direct_message: event.is_direct_message,
            is_workflow_message: event.is_workflow_message,
        });

        let is_member = event.is_from_member();
        if !is_member && parsed.directed_at_bot {
            debug!(
                event_name = "routing.route.ignored",
                organization_id = %organization_id.0,
                sender_organization_id = %event.sender.organization_id.0,
                "ignoring message from foreign sender directed at bot"
            );
            return Ok(RouteOutcome::Ignore);
        }

        let unmatched = if is_member {
            match self.resolve_named(event, &parsed, cancel).await? {
                NamedResolution::Resolved(result) => {
                    log_route(organization_id, &result);
                    return Ok(RouteOutcome::Routed(result));
                }
                NamedResolution::Unmatched(result) => result,
            }
        } else {
            RouteResult::unmatched(&parsed, String::new(), String::new())
        };

        if !event.is_direct_message && !event.is_workflow_message {
            let matches = self
                .patterns
                .match_patterns(&event.text, &event.sender, organization_id, cancel)
                .await?;
            if let Some(pattern) = matches.into_iter().next() {
                let result = RouteResult {
                    unit: Some(SkillUnit::Remote(RemoteDispatch::for_pattern(&pattern))),
                    skill_name: pattern.skill_name.clone(),
                    arguments: event.text.clone(),
                    directed_at_bot: parsed.directed_at_bot,
                    pattern: Some(pattern),
                    conversation: None,
                };
                log_route(organization_id, &result);
                return Ok(RouteOutcome::Routed(result));
            }
        }

        log_route(organization_id, &unmatched);
        Ok(RouteOutcome::Routed(unmatched))
    }

    /// Routes a UI callback. Membership is never checked for interactions.
    pub async fn route_interaction(
        &self,
        event: &InboundEvent,
        cancel: &CancellationToken,
    ) -> Result<InteractionRouteResult, RouteError> {
        let Some(payload) = &event.interaction else {
            return Ok(InteractionRouteResult::Ignore);
        };
        let Some(token) = parse_callback_token(&payload.callback_token) else {
            return Ok(InteractionRouteResult::Ignore);
        };

        let unit = match &token.target {
            CallbackTarget::Handler(id) => self.interactions.get(id).map(SkillUnit::Handler),
            CallbackTarget::Skill(name) => {
                self.skills.resolve(name, &event.organization.id, cancel).await?
            }
        };

        let Some(unit) = unit else {
            debug!(
                event_name = "routing.interaction.unknown_target",
                organization_id = %event.organization.id.0,
                target = ?token.target,
                "ignoring interaction for unknown target"
            );
            return Ok(InteractionRouteResult::Ignore);
        };

        info!(
            event_name = "routing.interaction.resolved",
            organization_id = %event.organization.id.0,
            kind = payload.kind.as_str(),
            unit = %unit.name(),
            "interaction routed"
        );
        Ok(InteractionRouteResult::Invoke(InteractionInvocation {
            unit,
            kind: payload.kind,
            target: token.target,
            context: token.context,
            value: payload.value.clone(),
        }))
    }

    /// Patterns that would fire for `text`, for preview tooling.
    pub async fn match_patterns(
        &self,
        text: &str,
        sender: &Member,
        organization_id: &OrganizationId,
        cancel: &CancellationToken,
    ) -> Result<Vec<SkillPattern>, RouteError> {
        self.patterns.match_patterns(text, sender, organization_id, cancel).await
    }

    async fn resolve_named(
        &self,
        event: &InboundEvent,
        parsed: &ParsedMessage,
        cancel: &CancellationToken,
    ) -> Result<NamedResolution, RouteError> {
        let organization_id = &event.organization.id;
        let (skill_name, arguments) = match &parsed.candidate {
            SkillCandidate::None => {
                return Ok(NamedResolution::Unmatched(RouteResult::unmatched(
                    parsed,
                    String::new(),
                    parsed.argument_text(),
                )));
            }
            SkillCandidate::Unresolvable(mention) => {
                return Ok(NamedResolution::Unmatched(RouteResult::unmatched(
                    parsed,
                    mention.clone(),
                    parsed.argument_text(),
                )));
            }
            SkillCandidate::Sugar(skill) => ((*skill).to_owned(), parsed.arguments.clone()),
            SkillCandidate::Named(name) => {
                let name = name.to_lowercase();
                let arguments = parsed.arguments.clone();
                let resolution =
                    self.aliases.resolve(&name, arguments, organization_id, cancel).await?;
                (resolution.skill_name, resolution.arguments)
            }
        };

        let arguments = arguments.join(" ");
        let Some(unit) = self.skills.resolve(&skill_name, organization_id, cancel).await? else {
            return Ok(NamedResolution::Unmatched(RouteResult::unmatched(
                parsed, skill_name, arguments,
            )));
        };

        let conversation = match &event.thread_id {
            Some(thread_id) => {
                until_cancelled(
                    cancel,
                    self.conversations.try_attach_conversation(thread_id, organization_id),
                )
                .await?
            }
            None => None,
        };

        Ok(NamedResolution::Resolved(RouteResult {
            unit: Some(unit),
            skill_name,
            arguments,
            directed_at_bot: parsed.directed_at_bot,
            pattern: None,
            conversation,
        }))
    }
}

enum NamedResolution {
    Resolved(RouteResult),
    Unmatched(RouteResult),
}

fn interaction_route(invocation: InteractionInvocation) -> RouteResult {
    let skill_name = match &invocation.target {
        CallbackTarget::Handler(id) => id.clone(),
        CallbackTarget::Skill(name) => name.to_lowercase(),
    };
    RouteResult {
        unit: Some(invocation.unit),
        skill_name,
        arguments: invocation.value.unwrap_or_default(),
        directed_at_bot: true,
        pattern: None,
        conversation: None,
    }
}

fn log_route(organization_id: &OrganizationId, result: &RouteResult) {
    let conversation_id = result.conversation.as_ref().map_or("none", |c| c.id.as_str());
    info!(
        event_name = "routing.route.decided",
        organization_id = %organization_id.0,
        skill = %result.skill_name,
        unit = result.unit.as_ref().map_or("none", SkillUnit::name),
        directed_at_bot = result.directed_at_bot,
        via_pattern = result.matched_via_pattern(),
        conversation_id,
        "message routed"
    );
}
