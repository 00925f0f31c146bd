use harvestdesk_core::config::{AppConfig, LoadOptions};
use harvestdesk_core::{DeletionRequestGateway, GatewayError};
use harvestdesk_gateway::HttpDeletionRequestGateway;
use serde::Serialize;

use super::CommandResult;

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

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(options: LoadOptions, json_output: bool) -> CommandResult {
    let report = build_report(options);
    let exit_code = if report.overall_status == CheckStatus::Pass { 0 } else { 1 };

    let output = if json_output {
        serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\
                 \"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        })
    } else {
        render_human(&report)
    };

    CommandResult { exit_code, output }
}

fn build_report(options: LoadOptions) -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(options) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(check_session(&config));
            checks.push(check_backend_reachability(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            for name in ["session_identity", "backend_reachability"] {
                checks.push(DoctorCheck {
                    name,
                    status: CheckStatus::Skipped,
                    details: "skipped because configuration did not load".to_string(),
                });
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

fn check_session(config: &AppConfig) -> DoctorCheck {
    match config.session.context() {
        Some(session) if session.is_admin() => DoctorCheck {
            name: "session_identity",
            status: CheckStatus::Pass,
            details: format!("admin session for `{}`", session.user_id),
        },
        Some(session) => match &session.partner_id {
            Some(partner_id) => DoctorCheck {
                name: "session_identity",
                status: CheckStatus::Pass,
                details: format!(
                    "partner session for `{}` (partner `{partner_id}`)",
                    session.user_id
                ),
            },
            None => DoctorCheck {
                name: "session_identity",
                status: CheckStatus::Fail,
                details: "partner session has no partner id; set HARVESTDESK_SESSION_PARTNER_ID"
                    .to_string(),
            },
        },
        None => DoctorCheck {
            name: "session_identity",
            status: CheckStatus::Fail,
            details: "no session user configured; set HARVESTDESK_SESSION_USER_ID".to_string(),
        },
    }
}

/// Any HTTP response counts as reachable; only transport failures fail.
fn check_backend_reachability(config: &AppConfig) -> DoctorCheck {
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return DoctorCheck {
                name: "backend_reachability",
                status: CheckStatus::Fail,
                details: format!("failed to initialize async runtime: {error}"),
            };
        }
    };

    let gateway = match HttpDeletionRequestGateway::from_config(&config.backend) {
        Ok(gateway) => gateway,
        Err(error) => {
            return DoctorCheck {
                name: "backend_reachability",
                status: CheckStatus::Fail,
                details: error.to_string(),
            };
        }
    };

    let outcome = runtime.block_on(gateway.list_all());
    let base_url = &config.backend.base_url;
    match outcome {
        Ok(requests) => DoctorCheck {
            name: "backend_reachability",
            status: CheckStatus::Pass,
            details: format!("`{base_url}` responded with {} request(s)", requests.len()),
        },
        Err(GatewayError::Api { status, .. }) => DoctorCheck {
            name: "backend_reachability",
            status: CheckStatus::Pass,
            details: format!("`{base_url}` responded with HTTP {status}"),
        },
        Err(error) => DoctorCheck {
            name: "backend_reachability",
            status: CheckStatus::Fail,
            details: format!("`{base_url}` is not reachable: {error}"),
        },
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
