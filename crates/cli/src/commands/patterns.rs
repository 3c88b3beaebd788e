use clap::Args;
use serde::Serialize;
use skillbot_core::domain::event::{Member, MemberId, OrganizationId};
use skillbot_core::domain::skill::SkillPattern;

use crate::commands::{
    connect, interrupt_token, load_config, route_failure, runtime, sql_router, CommandResult,
};

#[derive(Clone, Debug, Args)]
pub struct PatternArgs {
    #[arg(long, help = "Organization whose patterns are evaluated")]
    pub org: String,
    #[arg(long, help = "Organization the sender belongs to")]
    pub sender_org: String,
    #[arg(long, default_value = "U0PREVIEW", help = "Platform user id of the sender")]
    pub sender: String,
    #[arg(long, help = "Message text to test")]
    pub text: String,
}

#[derive(Debug, Serialize)]
struct PatternReport {
    command: &'static str,
    status: &'static str,
    sender_is_member: bool,
    matches: Vec<SkillPattern>,
}

/// Lists matching patterns in firing order; the first entry is the one routing would pick.
pub fn run(args: &PatternArgs) -> CommandResult {
    let config = match load_config("patterns") {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let runtime = match runtime("patterns") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let organization_id = OrganizationId(args.org.clone());
    let sender = Member {
        id: MemberId(args.sender.clone()),
        organization_id: OrganizationId(args.sender_org.clone()),
    };
    let result = runtime.block_on(async {
        let pool = connect("patterns", &config).await?;
        let router = sql_router(&pool, &config);
        let cancel = interrupt_token();
        let matches = router.match_patterns(&args.text, &sender, &organization_id, &cancel).await;
        pool.close().await;
        matches.map_err(|error| route_failure("patterns", &error))
    });

    match result {
        Ok(matches) => CommandResult::report(
            "patterns",
            &PatternReport {
                command: "patterns",
                status: "ok",
                sender_is_member: sender.organization_id == organization_id,
                matches,
            },
        ),
        Err(failure) => failure,
    }
}
