pub mod commands;

use std::process::ExitCode;

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use skillbot_core::config::{AppConfig, LoadOptions, LogFormat};
use tracing::Level;

use crate::commands::{PatternArgs, RouteArgs};

#[derive(Debug, Parser)]
#[command(
    name = "skillbot",
    about = "Skillbot operator CLI",
    long_about = "Inspect configuration, check readiness, apply migrations, and preview routing decisions.",
    after_help = "Examples:\n  skillbot doctor --json\n  skillbot route --org T1 --sender-org T1 --text '<@U0BOT> deploy web'\n  skillbot patterns --org T1 --sender-org T2 --text 'hello world'"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, Slack identity, DB connectivity, and routing schema")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Preview the routing decision for a message against the configured database")]
    Route(RouteArgs),
    #[command(about = "List the patterns that would fire for a message, in firing order")]
    Patterns(PatternArgs),
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    if let Ok(config) = AppConfig::load(LoadOptions::default()) {
        if let Err(error) = init_logging(&config) {
            eprintln!("logging disabled: {error:#}");
        }
    }

    let result = match cli.command {
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
        Command::Migrate => commands::migrate::run(),
        Command::Route(args) => commands::route::run(&args),
        Command::Patterns(args) => commands::patterns::run(&args),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

/// Installs the stderr subscriber; stdout stays reserved for command payloads.
fn init_logging(config: &AppConfig) -> anyhow::Result<()> {
    let level = config
        .logging
        .level
        .parse::<Level>()
        .with_context(|| format!("invalid log level `{}`", config.logging.level))?;
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(level)
        .with_writer(std::io::stderr);

    match config.logging.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    }
    .map_err(|error| anyhow!("failed to install tracing subscriber: {error}"))
}
