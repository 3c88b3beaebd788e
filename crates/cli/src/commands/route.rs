use clap::Args;
use serde::Serialize;
use skillbot_core::domain::event::{InboundEvent, Member, MemberId, Organization, OrganizationId};
use skillbot_core::routing::{RouteOutcome, RouteResult, SkillUnit};

use crate::commands::{
    connect, interrupt_token, load_config, route_failure, runtime, sql_router, CommandResult,
};

#[derive(Clone, Debug, Args)]
pub struct RouteArgs {
    #[arg(long, help = "Organization that owns the room")]
    pub org: String,
    #[arg(long, help = "Organization the sender belongs to")]
    pub sender_org: String,
    #[arg(long, default_value = "U0PREVIEW", help = "Platform user id of the sender")]
    pub sender: String,
    #[arg(long, help = "Raw message text, including any mention or prefix")]
    pub text: String,
    #[arg(long, help = "Treat the message as a direct message to the bot")]
    pub dm: bool,
    #[arg(long, help = "Treat the message as posted by a workflow")]
    pub workflow: bool,
    #[arg(long, help = "Thread id the message was posted in")]
    pub thread: Option<String>,
    #[arg(long, help = "Invocation prefix configured by the organization")]
    pub prefix: Option<char>,
}

#[derive(Debug, Serialize)]
struct RouteReport {
    command: &'static str,
    status: &'static str,
    outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    decision: Option<RouteDecision>,
}

#[derive(Debug, Serialize)]
struct RouteDecision {
    skill_name: String,
    arguments: String,
    directed_at_bot: bool,
    unit: Option<UnitReport>,
    pattern_id: Option<String>,
    conversation_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct UnitReport {
    kind: &'static str,
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    skill_id: Option<String>,
}

impl From<&SkillUnit> for UnitReport {
    fn from(unit: &SkillUnit) -> Self {
        let kind = match unit {
            SkillUnit::Builtin(_) => "builtin",
            SkillUnit::Remote(_) => "remote",
            SkillUnit::Handler(_) => "handler",
        };
        Self {
            kind,
            name: unit.name().to_string(),
            skill_id: unit.remote().map(|dispatch| dispatch.skill_id.0.clone()),
        }
    }
}

impl From<RouteResult> for RouteDecision {
    fn from(result: RouteResult) -> Self {
        Self {
            unit: result.unit.as_ref().map(UnitReport::from),
            skill_name: result.skill_name,
            arguments: result.arguments,
            directed_at_bot: result.directed_at_bot,
            pattern_id: result.pattern.map(|pattern| pattern.id.0),
            conversation_id: result.conversation.map(|conversation| conversation.id),
        }
    }
}

pub fn run(args: &RouteArgs) -> CommandResult {
    let config = match load_config("route") {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let bot_user_id = config.slack.bot_user_id.trim().to_string();
    if bot_user_id.is_empty() {
        return CommandResult::failure(
            "route",
            "missing_bot_user_id",
            "slack.bot_user_id must be set (SKILLBOT_SLACK_BOT_USER_ID) to recognize mentions",
            2,
        );
    }
    let runtime = match runtime("route") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let event = inbound_event(args, MemberId(bot_user_id));
    let result = runtime.block_on(async {
        let pool = connect("route", &config).await?;
        let router = sql_router(&pool, &config);
        let cancel = interrupt_token();
        let outcome = router.route(&event, &cancel).await;
        pool.close().await;
        outcome.map_err(|error| route_failure("route", &error))
    });

    match result {
        Ok(RouteOutcome::Ignore) => CommandResult::report(
            "route",
            &RouteReport { command: "route", status: "ok", outcome: "ignore", decision: None },
        ),
        Ok(RouteOutcome::Routed(result)) => CommandResult::report(
            "route",
            &RouteReport {
                command: "route",
                status: "ok",
                outcome: "routed",
                decision: Some(RouteDecision::from(result)),
            },
        ),
        Err(failure) => failure,
    }
}

fn inbound_event(args: &RouteArgs, bot_user_id: MemberId) -> InboundEvent {
    let organization = Organization {
        id: OrganizationId(args.org.clone()),
        name: args.org.clone(),
        invocation_prefix: args.prefix,
    };
    let sender = Member {
        id: MemberId(args.sender.clone()),
        organization_id: OrganizationId(args.sender_org.clone()),
    };

    let mut event = InboundEvent::message(organization, sender, bot_user_id, args.text.clone());
    if args.dm {
        event = event.direct();
    }
    if args.workflow {
        event = event.workflow();
    }
    if let Some(thread) = &args.thread {
        event = event.in_thread(thread.clone());
    }
    event
}

#[cfg(test)]
mod tests {
    use skillbot_core::domain::event::{EventKind, MemberId};

    use super::{inbound_event, RouteArgs};

    fn args(text: &str) -> RouteArgs {
        RouteArgs {
            org: "T1".to_string(),
            sender_org: "T2".to_string(),
            sender: "U1".to_string(),
            text: text.to_string(),
            dm: false,
            workflow: false,
            thread: None,
            prefix: Some('!'),
        }
    }

    #[test]
    fn flags_shape_the_inbound_event() {
        let mut direct = args("deploy");
        direct.dm = true;
        direct.thread = Some("1700.1".to_string());
        let mut workflow = args("!deploy");
        workflow.workflow = true;

        let direct = inbound_event(&direct, MemberId("UBOT".to_string()));
        let workflow = inbound_event(&workflow, MemberId("UBOT".to_string()));
        let plain = inbound_event(&args("hello"), MemberId("UBOT".to_string()));

        assert_eq!(direct.kind(), EventKind::DirectMessage);
        assert_eq!(direct.thread_id.as_deref(), Some("1700.1"));
        assert_eq!(workflow.kind(), EventKind::WorkflowMessage);
        assert_eq!(plain.kind(), EventKind::PlainMessage);
        assert!(!plain.is_from_member());
        assert_eq!(plain.organization.invocation_prefix, Some('!'));
    }
}
