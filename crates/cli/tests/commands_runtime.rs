use std::env;
use std::sync::{Arc, Mutex, OnceLock};

use chrono::{Duration, TimeZone, Utc};
use harvestdesk_cli::commands::requests::{self, RequestAction};
use harvestdesk_cli::commands::{config, doctor};
use harvestdesk_core::config::LoadOptions;
use harvestdesk_core::{
    ControllerSettings, DeletionWorkflowController, FixedClock, Locale, SessionContext,
    WindowPolicy,
};
use harvestdesk_gateway::InMemoryDeletionRequestGateway;
use serde_json::Value;

#[test]
fn requests_return_config_failure_for_invalid_base_url() {
    with_env(&[("HARVESTDESK_BACKEND_BASE_URL", "ftp://backend.internal")], || {
        let result = requests::run(LoadOptions::default(), list_action());
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "requests.list");
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn requests_require_a_session_user() {
    with_env(&[], || {
        let result = requests::run(LoadOptions::default(), list_action());
        assert_eq!(result.exit_code, 2);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["error_class"], "session_missing");
    });
}

#[test]
fn revoke_without_id_is_rejected_before_any_request() {
    with_env(
        &[
            ("HARVESTDESK_SESSION_USER_ID", "user-1"),
            ("HARVESTDESK_SESSION_PARTNER_ID", "partner-1"),
            ("HARVESTDESK_BACKEND_BASE_URL", "http://127.0.0.1:9"),
            ("HARVESTDESK_LOCALE", "en"),
        ],
        || {
            let result = requests::run(
                LoadOptions::default(),
                RequestAction::Revoke { id: None, note: Some("changed plans".to_string()) },
            );
            assert_eq!(result.exit_code, 1);

            let payload = parse_payload(&result.output);
            assert_eq!(payload["command"], "requests.revoke");
            assert_eq!(payload["error_class"], "validation");
            assert_eq!(payload["message"], "A deletion request id is required");
        },
    );
}

#[test]
fn unknown_status_filter_is_a_validation_failure() {
    with_env(
        &[
            ("HARVESTDESK_SESSION_USER_ID", "user-1"),
            ("HARVESTDESK_SESSION_PARTNER_ID", "partner-1"),
        ],
        || {
            let result = requests::run(
                LoadOptions::default(),
                RequestAction::List {
                    partner_id: None,
                    status: Some("archived".to_string()),
                    all: false,
                },
            );
            assert_eq!(result.exit_code, 1);

            let payload = parse_payload(&result.output);
            assert_eq!(payload["error_class"], "validation");
            let message = payload["message"].as_str().unwrap_or_default();
            assert!(message.contains("archived"));
            assert!(message.contains("pending|approved|rejected|cancelled|completed"));
        },
    );
}

#[test]
fn config_redacts_token_and_attributes_env_source() {
    with_env(&[("HARVESTDESK_BACKEND_API_TOKEN", "hdsk_live_0123456789abcdef")], || {
        let output = config::run(LoadOptions::default());

        assert!(!output.contains("0123456789abcdef"));
        assert!(output.contains(
            "- backend.api_token = hdsk*** (source: env (HARVESTDESK_BACKEND_API_TOKEN))"
        ));
        assert!(output.contains("- workflow.cancellable_window_days = 7 (source: default)"));
    });
}

#[test]
fn doctor_reports_unreachable_backend() {
    let closed_port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind probe port");
        listener.local_addr().expect("probe address").port()
    };
    let base_url = format!("http://127.0.0.1:{closed_port}");

    with_env(
        &[
            ("HARVESTDESK_BACKEND_BASE_URL", base_url.as_str()),
            ("HARVESTDESK_BACKEND_TIMEOUT_SECS", "2"),
            ("HARVESTDESK_SESSION_USER_ID", "admin-1"),
            ("HARVESTDESK_SESSION_ROLE", "admin"),
        ],
        || {
            let result = doctor::run(LoadOptions::default(), true);
            assert_eq!(result.exit_code, 1);

            let payload = parse_payload(&result.output);
            assert_eq!(payload["overall_status"], "fail");
            let checks = payload["checks"].as_array().cloned().unwrap_or_default();
            let status_of = |name: &str| {
                checks
                    .iter()
                    .find(|check| check["name"] == name)
                    .map(|check| check["status"].clone())
                    .unwrap_or(Value::Null)
            };
            assert_eq!(status_of("config_validation"), "pass");
            assert_eq!(status_of("session_identity"), "pass");
            assert_eq!(status_of("backend_reachability"), "fail");
        },
    );
}

#[test]
fn doctor_skips_dependent_checks_when_config_is_invalid() {
    with_env(&[("HARVESTDESK_WORKFLOW_WIND_DOWN_DAYS", "0")], || {
        let result = doctor::run(LoadOptions::default(), false);
        assert_eq!(result.exit_code, 1);
        assert!(result.output.contains("- [fail] config_validation"));
        assert!(result.output.contains("- [skip] backend_reachability"));
    });
}

#[tokio::test]
async fn create_then_show_renders_window_and_label() {
    let now = Utc.with_ymd_and_hms(2025, 6, 2, 9, 0, 0).single().expect("valid timestamp");
    let clock = Arc::new(FixedClock::new(now));
    let gateway =
        Arc::new(InMemoryDeletionRequestGateway::new(clock.clone(), WindowPolicy::default()));
    let controller = DeletionWorkflowController::new(
        gateway,
        clock,
        ControllerSettings { locale: Locale::En, ..ControllerSettings::default() },
    );
    let session = SessionContext::partner("user-1", "partner-1");

    let created = requests::execute(
        &controller,
        &session,
        RequestAction::Create { explanation: "farm sold".to_string() },
    )
    .await;
    assert_eq!(created.exit_code, 0);
    let created = parse_payload(&created.output);
    let id = created["data"]["request_id"].as_str().unwrap_or_default().to_string();
    assert!(!id.is_empty());

    let shown =
        requests::execute(&controller, &session, RequestAction::Show { id: id.clone() }).await;
    assert_eq!(shown.exit_code, 0);
    let shown = parse_payload(&shown.output);
    assert_eq!(shown["message"], "Pending");
    assert_eq!(shown["data"]["status"], "pending");
    assert_eq!(shown["data"]["status_color"], "orange");
    assert_eq!(shown["data"]["window"]["stage"], "revocable_window");
    assert_eq!(shown["data"]["window"]["days_remaining"], 7);

    let missing = requests::execute(
        &controller,
        &session,
        RequestAction::Show { id: "does-not-exist".to_string() },
    )
    .await;
    assert_eq!(missing.exit_code, 1);
    assert_eq!(parse_payload(&missing.output)["error_class"], "not_found");
}

#[tokio::test]
async fn revoke_in_a_fresh_process_is_blocked_after_the_deadline() {
    let now = Utc.with_ymd_and_hms(2025, 6, 2, 9, 0, 0).single().expect("valid timestamp");
    let clock = Arc::new(FixedClock::new(now));
    let gateway =
        Arc::new(InMemoryDeletionRequestGateway::new(clock.clone(), WindowPolicy::default()));
    let settings = ControllerSettings { locale: Locale::En, ..ControllerSettings::default() };
    let session = SessionContext::partner("user-1", "partner-1");

    let submitting =
        DeletionWorkflowController::new(gateway.clone(), clock.clone(), settings.clone());
    let created = requests::execute(
        &submitting,
        &session,
        RequestAction::Create { explanation: "farm sold".to_string() },
    )
    .await;
    let id = parse_payload(&created.output)["data"]["request_id"]
        .as_str()
        .unwrap_or_default()
        .to_string();
    assert!(!id.is_empty());

    clock.advance(Duration::days(8));
    let calls_before = gateway.call_count();
    let revoking = DeletionWorkflowController::new(gateway.clone(), clock, settings);
    let revoked = requests::execute(
        &revoking,
        &session,
        RequestAction::Revoke { id: Some(id), note: None },
    )
    .await;

    assert_eq!(revoked.exit_code, 1);
    assert_eq!(parse_payload(&revoked.output)["error_class"], "window_closed");
    assert_eq!(gateway.call_count(), calls_before + 1, "only the listing reaches the backend");
    assert!(gateway.snapshot().await[0].status.is_pending());
}

fn list_action() -> RequestAction {
    RequestAction::List { partner_id: None, status: None, all: false }
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "HARVESTDESK_BACKEND_BASE_URL",
        "HARVESTDESK_BACKEND_API_TOKEN",
        "HARVESTDESK_BACKEND_TIMEOUT_SECS",
        "HARVESTDESK_WORKFLOW_CANCELLABLE_WINDOW_DAYS",
        "HARVESTDESK_WORKFLOW_WIND_DOWN_DAYS",
        "HARVESTDESK_WORKFLOW_LOCAL_PRECONDITION_CHECKS",
        "HARVESTDESK_SESSION_USER_ID",
        "HARVESTDESK_SESSION_DISPLAY_NAME",
        "HARVESTDESK_SESSION_ROLE",
        "HARVESTDESK_SESSION_PARTNER_ID",
        "HARVESTDESK_LOCALE",
        "HARVESTDESK_LOGGING_LEVEL",
        "HARVESTDESK_LOGGING_FORMAT",
        "HARVESTDESK_LOG_LEVEL",
        "HARVESTDESK_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
