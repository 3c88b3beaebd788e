use secrecy::ExposeSecret;
use serde::Serialize;
use skillbot_core::config::{AppConfig, LoadOptions};
use skillbot_db::{connect_with_settings, migrations, DbPool};

/// Tables the router reads from; they must exist before routing can run.
const ROUTING_TABLES: &[&str] = &["skills", "skill_patterns", "aliases", "conversations"];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

impl DoctorCheck {
    fn skipped(name: &'static str, reason: &str) -> Self {
        Self { name, status: CheckStatus::Skipped, details: format!("skipped because {reason}") }
    }
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(json_output: bool) -> String {
    let report = build_report();

    if json_output {
        return serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        });
    }

    render_human(&report)
}

fn build_report() -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(check_slack_identity(&config));
            checks.extend(check_database(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            for name in ["slack_identity", "database_connectivity", "routing_schema"] {
                checks.push(DoctorCheck::skipped(name, "configuration did not load"));
            }
        }
    }

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

/// Mentions are only recognized once the bot knows its own user id.
fn check_slack_identity(config: &AppConfig) -> DoctorCheck {
    let has_user_id = !config.slack.bot_user_id.trim().is_empty();
    let has_token = !config.slack.bot_token.expose_secret().trim().is_empty();

    match (has_user_id, has_token) {
        (true, true) => DoctorCheck {
            name: "slack_identity",
            status: CheckStatus::Pass,
            details: format!("bot user `{}` with bot token configured", config.slack.bot_user_id),
        },
        (true, false) => DoctorCheck {
            name: "slack_identity",
            status: CheckStatus::Pass,
            details: "bot user id configured; no bot token (preview only)".to_string(),
        },
        (false, _) => DoctorCheck {
            name: "slack_identity",
            status: CheckStatus::Fail,
            details: "slack.bot_user_id is unset; mentions of the bot cannot be recognized"
                .to_string(),
        },
    }
}

fn check_database(config: &AppConfig) -> Vec<DoctorCheck> {
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return vec![
                DoctorCheck {
                    name: "database_connectivity",
                    status: CheckStatus::Fail,
                    details: format!("failed to initialize async runtime: {error}"),
                },
                DoctorCheck::skipped("routing_schema", "the async runtime did not start"),
            ];
        }
    };

    runtime.block_on(async {
        let pool = match connect_with_settings(
            &config.database.url,
            config.database.max_connections,
            config.database.timeout_secs,
        )
        .await
        {
            Ok(pool) => pool,
            Err(error) => {
                return vec![
                    DoctorCheck {
                        name: "database_connectivity",
                        status: CheckStatus::Fail,
                        details: format!("failed to connect to database: {error}"),
                    },
                    DoctorCheck::skipped("routing_schema", "the database is unreachable"),
                ];
            }
        };

        let schema = check_routing_schema(&pool).await;
        pool.close().await;
        vec![
            DoctorCheck {
                name: "database_connectivity",
                status: CheckStatus::Pass,
                details: format!("connected using `{}`", config.database.url),
            },
            schema,
        ]
    })
}

async fn check_routing_schema(pool: &DbPool) -> DoctorCheck {
    let mut missing = Vec::new();
    for table in ROUTING_TABLES {
        match migrations::table_exists(pool, table).await {
            Ok(true) => {}
            Ok(false) => missing.push(*table),
            Err(error) => {
                return DoctorCheck {
                    name: "routing_schema",
                    status: CheckStatus::Fail,
                    details: format!("failed to inspect schema: {error}"),
                };
            }
        }
    }

    if missing.is_empty() {
        DoctorCheck {
            name: "routing_schema",
            status: CheckStatus::Pass,
            details: "routing tables present".to_string(),
        }
    } else {
        DoctorCheck {
            name: "routing_schema",
            status: CheckStatus::Fail,
            details: format!("missing tables: {} (run `skillbot migrate`)", missing.join(", ")),
        }
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
