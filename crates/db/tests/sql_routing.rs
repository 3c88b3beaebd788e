use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use skillbot_core::domain::event::{InboundEvent, Member, MemberId, Organization, OrganizationId};
use skillbot_core::routing::skills::BuiltinRegistry;
use skillbot_core::routing::{RouteOutcome, Router};
use skillbot_db::{
    connect_with_settings, migrations, DbPool, SqlAliasRepository, SqlConversationTracker,
    SqlPatternRepository, SqlSkillRepository,
};

async fn seeded_pool() -> DbPool {
    let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
    migrations::run_pending(&pool).await.expect("migrations");

    for statement in [
        "INSERT INTO skills (id, organization_id, name, language, created_at) VALUES
            ('sk-deploy', 'T1', 'deploy', 'python', '2026-01-01T00:00:00Z'),
            ('sk-echo', 'T1', 'echo', 'javascript', '2026-01-01T00:00:00Z'),
            ('sk-shout', 'T1', 'shout', 'javascript', '2026-01-01T00:00:00Z')",
        "INSERT INTO skill_patterns (id, skill_id, organization_id, name, pattern, kind,
                                     case_sensitive, allow_external_callers, enabled, created_at)
         VALUES
            ('P1', 'sk-echo', 'T1', 'anything', '.*', 'regular_expression', 0, 0, 1,
             '2026-03-02T00:00:00Z'),
            ('P2', 'sk-shout', 'T1', 'caps', '[A-Z]+', 'regular_expression', 1, 1, 1,
             '2026-03-01T00:00:00Z')",
        "INSERT INTO aliases (organization_id, name, target_skill, arguments, created_at)
         VALUES ('T1', 'ship', 'deploy', '--env production', '2026-01-01T00:00:00Z')",
        "INSERT INTO conversations (id, organization_id, thread_id, state, created_at)
         VALUES ('conv-1', 'T1', '1700.0001', 'open', '2026-01-01T00:00:00Z')",
    ] {
        sqlx::query(statement).execute(&pool).await.expect("seed");
    }

    pool
}

fn router(pool: &DbPool) -> Router {
    Router::new(
        BuiltinRegistry::with_defaults(),
        Arc::new(SqlSkillRepository::new(pool.clone())),
        Arc::new(SqlAliasRepository::new(pool.clone())),
        Arc::new(SqlPatternRepository::new(pool.clone())),
    )
    .with_conversation_tracker(Arc::new(SqlConversationTracker::new(pool.clone())))
}

fn message(sender_org: &str, text: &str) -> InboundEvent {
    InboundEvent::message(
        Organization {
            id: OrganizationId("T1".to_string()),
            name: "Acme".to_string(),
            invocation_prefix: None,
        },
        Member {
            id: MemberId("U1".to_string()),
            organization_id: OrganizationId(sender_org.to_string()),
        },
        MemberId("BOT".to_string()),
        text,
    )
}

#[tokio::test]
async fn alias_resolves_to_custom_skill_and_attaches_thread() {
    let pool = seeded_pool().await;
    let router = router(&pool);

    let event = message("T1", "<@BOT> ship web").in_thread("1700.0001");
    let outcome = router.route(&event, &CancellationToken::new()).await.expect("route");
    let result = outcome.into_result().expect("routed");

    assert_eq!(result.skill_name, "deploy");
    assert_eq!(result.arguments, "--env production web");
    let remote = result.unit.as_ref().and_then(|unit| unit.remote());
    assert_eq!(remote.map(|remote| remote.skill_id.0.as_str()), Some("sk-deploy"));
    assert_eq!(
        result.conversation.map(|conversation| conversation.id),
        Some("conv-1".to_string())
    );
}

#[tokio::test]
async fn stored_patterns_are_returned_oldest_first() {
    let pool = seeded_pool().await;
    let router = router(&pool);
    let organization_id = OrganizationId("T1".to_string());
    let sender = Member { id: MemberId("U1".to_string()), organization_id: organization_id.clone() };

    let matches = router
        .match_patterns("HELLO WORLD", &sender, &organization_id, &CancellationToken::new())
        .await
        .expect("match");

    let ids: Vec<&str> = matches.iter().map(|pattern| pattern.id.0.as_str()).collect();
    assert_eq!(ids, vec!["P2", "P1"]);
}

#[tokio::test]
async fn foreign_senders_only_reach_external_patterns() {
    let pool = seeded_pool().await;
    let router = router(&pool);

    let cancel = CancellationToken::new();
    let outcome = router.route(&message("T9", "hello world"), &cancel).await.expect("route");
    let result = outcome.into_result().expect("routed");
    assert!(!result.is_resolved(), "lowercase text only matches the member-only pattern");

    let outcome = router.route(&message("T9", "HELLO"), &cancel).await.expect("route");
    let result = outcome.into_result().expect("routed");
    assert_eq!(result.skill_name, "shout");
    assert!(result.matched_via_pattern());

    let outcome = router.route(&message("T9", "<@BOT> deploy"), &cancel).await.expect("route");
    assert_eq!(outcome, RouteOutcome::Ignore);
}
