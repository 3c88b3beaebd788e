use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use tokio_util::sync::CancellationToken;

use skillbot_core::domain::event::{
    InboundEvent, InteractionKind, InteractionPayload, Member, MemberId, Organization,
    OrganizationId,
};
use skillbot_core::domain::skill::{
    Alias, CustomSkill, PatternId, PatternKind, SkillId, SkillPattern,
};
use skillbot_core::errors::RepositoryError;
use skillbot_core::repositories::{AliasRepository, PatternRepository, SkillRepository};
use skillbot_core::routing::{
    BuiltinRegistry, CallbackToken, InteractionHandler, InteractionRegistry, RouteOutcome,
    RouteResult, Router, SkillUnit,
};

const ORG: &str = "T1";
const FOREIGN_ORG: &str = "T2";
const BOT: &str = "BOT";

/// Organization-scoped fixtures keyed by lowercase name.
#[derive(Default)]
struct Store {
    aliases: HashMap<String, Alias>,
    skills: HashMap<String, CustomSkill>,
    patterns: Vec<SkillPattern>,
}

impl Store {
    fn skill(mut self, id: &str, name: &str) -> Self {
        self.skills.insert(
            name.to_lowercase(),
            CustomSkill {
                id: SkillId(id.to_owned()),
                name: name.to_owned(),
                organization_id: org_id(ORG),
                language: "python".to_owned(),
            },
        );
        self
    }

    fn alias(mut self, name: &str, target: &str, arguments: &str) -> Self {
        self.aliases.insert(
            name.to_lowercase(),
            Alias {
                name: name.to_owned(),
                target_skill: target.to_owned(),
                arguments: arguments.to_owned(),
                organization_id: org_id(ORG),
            },
        );
        self
    }

    fn pattern(mut self, pattern: SkillPattern) -> Self {
        self.patterns.push(pattern);
        self
    }
}

#[async_trait]
impl AliasRepository for Store {
    async fn lookup_alias(
        &self,
        name: &str,
        organization_id: &OrganizationId,
    ) -> Result<Option<Alias>, RepositoryError> {
        Ok(self
            .aliases
            .get(&name.to_lowercase())
            .filter(|alias| &alias.organization_id == organization_id)
            .cloned())
    }
}

#[async_trait]
impl SkillRepository for Store {
    async fn lookup_custom_skill(
        &self,
        name: &str,
        organization_id: &OrganizationId,
    ) -> Result<Option<CustomSkill>, RepositoryError> {
        Ok(self
            .skills
            .get(&name.to_lowercase())
            .filter(|skill| &skill.organization_id == organization_id)
            .cloned())
    }
}

#[async_trait]
impl PatternRepository for Store {
    async fn list_patterns(
        &self,
        organization_id: &OrganizationId,
    ) -> Result<Vec<SkillPattern>, RepositoryError> {
        Ok(self
            .patterns
            .iter()
            .filter(|pattern| &pattern.organization_id == organization_id)
            .cloned()
            .collect())
    }
}

struct SurveyHandler;

impl InteractionHandler for SurveyHandler {
    fn id(&self) -> &str {
        "survey.answer"
    }
}

fn org_id(id: &str) -> OrganizationId {
    OrganizationId(id.to_owned())
}

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).single().expect("timestamp")
}

fn pattern(id: &str, skill_id: &str, text: &str, kind: PatternKind) -> SkillPattern {
    SkillPattern {
        id: PatternId(id.to_owned()),
        name: id.to_owned(),
        skill_id: SkillId(skill_id.to_owned()),
        skill_name: format!("skill-{skill_id}"),
        organization_id: org_id(ORG),
        pattern: text.to_owned(),
        kind,
        case_sensitive: false,
        allow_external_callers: false,
        enabled: true,
        created_at: t0(),
    }
}

fn router(store: Store) -> Router {
    let store = Arc::new(store);
    let handler: Arc<dyn InteractionHandler> = Arc::new(SurveyHandler);
    Router::new(BuiltinRegistry::with_defaults(), store.clone(), store.clone(), store)
        .with_interactions(InteractionRegistry::new([handler]))
}

fn message(sender_org: &str, text: &str) -> InboundEvent {
    InboundEvent::message(
        Organization { id: org_id(ORG), name: "Acme".to_owned(), invocation_prefix: None },
        Member { id: MemberId("U9".to_owned()), organization_id: org_id(sender_org) },
        MemberId(BOT.to_owned()),
        text,
    )
}

fn click(sender_org: &str, token: &str, value: Option<&str>) -> InboundEvent {
    message(sender_org, "").with_interaction(InteractionPayload {
        kind: InteractionKind::ButtonClick,
        callback_token: token.to_owned(),
        value: value.map(str::to_owned),
    })
}

async fn routed(router: &Router, event: &InboundEvent) -> RouteResult {
    match router.route(event, &CancellationToken::new()).await.expect("route") {
        RouteOutcome::Routed(result) => result,
        RouteOutcome::Ignore => panic!("expected a routed outcome for `{}`", event.text),
    }
}

#[tokio::test]
async fn bot_mention_anywhere_directs_the_message_and_is_stripped() {
    let router = router(Store::default().skill("sk-deploy", "deploy"));

    for text in [
        "<@BOT> deploy web",
        "deploy <@BOT> web",
        "deploy web <@BOT>",
        "<@BOT|skillbot> deploy web",
        "  deploy\t<@BOT>\nweb ",
    ] {
        let result = routed(&router, &message(ORG, text)).await;

        assert!(result.directed_at_bot, "`{text}` should be directed");
        assert_eq!(result.skill_name, "deploy", "skill for `{text}`");
        assert_eq!(result.arguments, "web", "arguments for `{text}`");
        assert!(!result.arguments.contains("<@BOT"));
    }
}

#[tokio::test]
async fn punctuation_around_the_bot_mention_still_addresses_it() {
    let router = router(Store::default().skill("sk-deploy", "deploy"));

    for text in ["<@BOT>: deploy web", "<@BOT>, deploy web", "(<@BOT>) deploy web"] {
        let result = routed(&router, &message(ORG, text)).await;

        assert!(result.directed_at_bot, "`{text}` should be directed");
        assert_eq!(result.skill_name, "deploy", "skill for `{text}`");
        assert_eq!(result.arguments, "web", "arguments for `{text}`");
        assert!(result.is_resolved());
    }

    let thanks = routed(&router, &message(ORG, "thanks <@BOT>!")).await;
    assert!(thanks.directed_at_bot);
    assert_eq!(thanks.skill_name, "thanks");
    assert!(!thanks.is_resolved());
}

#[tokio::test]
async fn foreign_sender_mentioning_the_bot_with_punctuation_is_ignored() {
    let mut open = pattern("open", "sk-greeter", "deploy", PatternKind::Contains);
    open.allow_external_callers = true;
    let router = router(Store::default().skill("sk-deploy", "deploy").pattern(open));

    for text in ["<@BOT>, deploy", "<@BOT>: deploy web", "deploy please <@BOT>!"] {
        let outcome = router
            .route(&message(FOREIGN_ORG, text), &CancellationToken::new())
            .await
            .expect("route");

        assert_eq!(outcome, RouteOutcome::Ignore, "`{text}` from a foreign sender");
    }
}

#[tokio::test]
async fn alias_expansion_matches_typing_the_target_directly() {
    let router = router(
        Store::default().skill("sk-deploy", "deploy").alias("ship", "deploy", "--env production"),
    );

    let via_alias = routed(&router, &message(ORG, "<@BOT> ship web now")).await;
    let direct = routed(&router, &message(ORG, "<@BOT> deploy --env production web now")).await;

    assert_eq!(via_alias.skill_name, direct.skill_name);
    assert_eq!(via_alias.arguments, direct.arguments);
    assert_eq!(via_alias.arguments, "--env production web now");
    assert_eq!(via_alias.unit, direct.unit);
}

#[tokio::test]
async fn who_sugar_moves_the_verb_ahead_of_the_mention() {
    let router = router(Store::default());

    let result = routed(&router, &message(ORG, "<@BOT> <@U1> is a decent person")).await;

    assert_eq!(result.skill_name, "who");
    assert_eq!(result.arguments, "is <@U1> a decent person");
    assert!(matches!(result.unit, Some(SkillUnit::Builtin(_))));
}

#[tokio::test]
async fn can_sugar_keeps_the_negation_first() {
    let router = router(Store::default());

    let result = routed(&router, &message(ORG, "<@BOT> <@U1> can not ball")).await;

    assert_eq!(result.skill_name, "can");
    assert_eq!(result.arguments, "not <@U1> ball");
}

#[tokio::test]
async fn direct_message_without_mention_names_a_skill_but_is_not_directed() {
    let router = router(Store::default().skill("sk-1", "skill1"));

    let result = routed(&router, &message(ORG, "skill1 arg").direct()).await;

    assert_eq!(result.skill_name, "skill1");
    assert_eq!(result.arguments, "arg");
    assert!(!result.directed_at_bot);
    assert!(result.is_resolved());
}

#[tokio::test]
async fn hello_world_matches_come_back_in_creation_order() {
    let mut p1 = pattern("P1", "sk-any", ".*", PatternKind::RegularExpression);
    p1.created_at = t0();
    let mut p2 = pattern("P2", "sk-caps", "[A-Z]+", PatternKind::RegularExpression);
    p2.case_sensitive = true;
    p2.created_at = t0() - Duration::days(1);
    let router = router(Store::default().pattern(p1).pattern(p2));

    let matches = router
        .match_patterns("HELLO WORLD", &member(ORG), &org_id(ORG), &CancellationToken::new())
        .await
        .expect("match patterns");

    let ids: Vec<&str> = matches.iter().map(|pattern| pattern.id.0.as_str()).collect();
    assert_eq!(ids, vec!["P2", "P1"]);
}

#[tokio::test]
async fn one_match_per_skill_keeps_the_earliest_pattern() {
    let mut late = pattern("late", "sk-greeter", "hello", PatternKind::Contains);
    late.created_at = t0() + Duration::hours(2);
    let mut early = pattern("early", "sk-greeter", "HELLO", PatternKind::StartsWith);
    early.created_at = t0();
    let mut other = pattern("other", "sk-echo", "there", PatternKind::EndsWith);
    other.created_at = t0() + Duration::hours(1);
    let router = router(Store::default().pattern(late).pattern(other).pattern(early));

    let matches = router
        .match_patterns("hello there", &member(ORG), &org_id(ORG), &CancellationToken::new())
        .await
        .expect("match patterns");

    let ids: Vec<&str> = matches.iter().map(|pattern| pattern.id.0.as_str()).collect();
    assert_eq!(ids, vec!["early", "other"]);
    assert!(matches.windows(2).all(|pair| pair[0].created_at <= pair[1].created_at));
}

#[tokio::test]
async fn foreign_sender_outcomes_depend_on_addressing_the_bot() {
    let mut internal = pattern("internal", "sk-greeter", "hello", PatternKind::Contains);
    internal.allow_external_callers = false;
    let router = router(Store::default().skill("sk-deploy", "deploy").pattern(internal));

    let mention = router
        .route(&message(FOREIGN_ORG, "<@BOT> deploy"), &CancellationToken::new())
        .await
        .expect("route");
    let prefixed = router
        .route(&message(FOREIGN_ORG, ".deploy"), &CancellationToken::new())
        .await
        .expect("route");
    let chatter = routed(&router, &message(FOREIGN_ORG, "hello everyone")).await;

    assert_eq!(mention, RouteOutcome::Ignore);
    assert_eq!(prefixed, RouteOutcome::Ignore);
    assert!(!chatter.is_resolved());
    assert!(!chatter.directed_at_bot);
}

#[tokio::test]
async fn foreign_sender_still_triggers_external_patterns() {
    let mut open = pattern("open", "sk-greeter", "hello", PatternKind::Contains);
    open.allow_external_callers = true;
    let router = router(Store::default().pattern(open));

    let result = routed(&router, &message(FOREIGN_ORG, "hello everyone")).await;

    assert_eq!(result.pattern.map(|pattern| pattern.id.0), Some("open".to_owned()));
    assert_eq!(result.arguments, "hello everyone");
}

#[tokio::test]
async fn interactions_bypass_membership_for_registered_handlers() {
    let router = router(Store::default());
    let token = SurveyHandler.callback_token().with_context("poll-3");

    let result = routed(&router, &click(FOREIGN_ORG, &token.encode(), Some("yes"))).await;

    assert!(matches!(
        &result.unit,
        Some(SkillUnit::Handler(handler)) if handler.id() == "survey.answer"
    ));
    assert_eq!(result.skill_name, "survey.answer");
    assert_eq!(result.arguments, "yes");
    assert!(result.directed_at_bot);
}

#[tokio::test]
async fn skill_callbacks_reach_custom_skills_for_any_sender() {
    let router = router(Store::default().skill("sk-deploy", "deploy"));
    let token = CallbackToken::for_skill("Deploy").encode();

    let result = routed(&router, &click(FOREIGN_ORG, &token, None)).await;

    assert_eq!(result.skill_name, "deploy");
    let skill_id = result.unit.as_ref().and_then(SkillUnit::remote).map(|remote| &remote.skill_id);
    assert_eq!(skill_id, Some(&SkillId("sk-deploy".to_owned())));
}

#[tokio::test]
async fn stale_or_malformed_callbacks_are_ignored() {
    let router = router(Store::default());

    for token in ["", "v=1;handler=retired.handler", "v=2;handler=survey.answer", "garbage"] {
        let outcome = router
            .route(&click(ORG, token, Some("yes")), &CancellationToken::new())
            .await
            .expect("route");

        assert_eq!(outcome, RouteOutcome::Ignore, "token `{token}` should be ignored");
    }
}

fn member(organization: &str) -> Member {
    Member { id: MemberId("U9".to_owned()), organization_id: org_id(organization) }
}
