use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use harvestdesk_core::config::{AppConfig, LoadOptions};
use harvestdesk_core::Locale;
use secrecy::ExposeSecret;
use toml::Value;

struct Field {
    key: &'static str,
    value: String,
    env_keys: &'static [&'static str],
    overridden: bool,
}

pub fn run(options: LoadOptions) -> String {
    let explicit_path = options.config_path.clone();
    let overrides = options.overrides.clone();
    let config = match AppConfig::load(options) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path(explicit_path);
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let backend = &config.backend;
    let endpoints = &backend.endpoints;
    let session = &config.session;
    let fields = vec![
        Field {
            key: "backend.base_url",
            value: backend.base_url.clone(),
            env_keys: &["HARVESTDESK_BACKEND_BASE_URL"],
            overridden: overrides.backend_base_url.is_some(),
        },
        Field {
            key: "backend.api_token",
            value: redact_token(backend.api_token.as_ref().map(|token| token.expose_secret())),
            env_keys: &["HARVESTDESK_BACKEND_API_TOKEN"],
            overridden: false,
        },
        Field {
            key: "backend.timeout_secs",
            value: backend.timeout_secs.to_string(),
            env_keys: &["HARVESTDESK_BACKEND_TIMEOUT_SECS"],
            overridden: false,
        },
        Field {
            key: "backend.endpoints.partner_list",
            value: endpoints.partner_list.clone(),
            env_keys: &[],
            overridden: false,
        },
        Field {
            key: "backend.endpoints.list_all",
            value: endpoints.list_all.clone(),
            env_keys: &[],
            overridden: false,
        },
        Field {
            key: "backend.endpoints.create",
            value: endpoints.create.clone(),
            env_keys: &[],
            overridden: false,
        },
        Field {
            key: "backend.endpoints.revoke",
            value: endpoints.revoke.clone(),
            env_keys: &[],
            overridden: false,
        },
        Field {
            key: "backend.endpoints.process",
            value: endpoints.process.clone(),
            env_keys: &[],
            overridden: false,
        },
        Field {
            key: "workflow.cancellable_window_days",
            value: config.workflow.cancellable_window_days.to_string(),
            env_keys: &["HARVESTDESK_WORKFLOW_CANCELLABLE_WINDOW_DAYS"],
            overridden: false,
        },
        Field {
            key: "workflow.wind_down_days",
            value: config.workflow.wind_down_days.to_string(),
            env_keys: &["HARVESTDESK_WORKFLOW_WIND_DOWN_DAYS"],
            overridden: false,
        },
        Field {
            key: "workflow.local_precondition_checks",
            value: config.workflow.local_precondition_checks.to_string(),
            env_keys: &["HARVESTDESK_WORKFLOW_LOCAL_PRECONDITION_CHECKS"],
            overridden: false,
        },
        Field {
            key: "session.user_id",
            value: session.user_id.clone().unwrap_or_else(|| "<unset>".to_string()),
            env_keys: &["HARVESTDESK_SESSION_USER_ID"],
            overridden: overrides.session_user_id.is_some(),
        },
        Field {
            key: "session.display_name",
            value: session.display_name.clone().unwrap_or_else(|| "<unset>".to_string()),
            env_keys: &["HARVESTDESK_SESSION_DISPLAY_NAME"],
            overridden: false,
        },
        Field {
            key: "session.role",
            value: format!("{:?}", session.role),
            env_keys: &["HARVESTDESK_SESSION_ROLE"],
            overridden: overrides.session_role.is_some(),
        },
        Field {
            key: "session.partner_id",
            value: session.partner_id.clone().unwrap_or_else(|| "<unset>".to_string()),
            env_keys: &["HARVESTDESK_SESSION_PARTNER_ID"],
            overridden: overrides.session_partner_id.is_some(),
        },
        Field {
            key: "locale",
            value: locale_code(config.locale).to_string(),
            env_keys: &["HARVESTDESK_LOCALE"],
            overridden: overrides.locale.is_some(),
        },
        Field {
            key: "logging.level",
            value: config.logging.level.clone(),
            env_keys: &["HARVESTDESK_LOGGING_LEVEL", "HARVESTDESK_LOG_LEVEL"],
            overridden: overrides.log_level.is_some(),
        },
        Field {
            key: "logging.format",
            value: format!("{:?}", config.logging.format),
            env_keys: &["HARVESTDESK_LOGGING_FORMAT", "HARVESTDESK_LOG_FORMAT"],
            overridden: false,
        },
    ];

    let mut lines =
        vec!["effective config (source precedence: flag > env > file > default):".to_string()];
    for field in fields {
        let source = field_source(
            &field,
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        lines.push(render_line(field.key, &field.value, source));
    }

    lines.join("\n")
}

fn detect_config_path(explicit_path: Option<PathBuf>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path);
    }

    let root = PathBuf::from("harvestdesk.toml");
    if root.exists() {
        return Some(root);
    }

    let nested = PathBuf::from("config/harvestdesk.toml");
    if nested.exists() {
        return Some(nested);
    }

    None
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    field: &Field,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if field.overridden {
        return "flag".to_string();
    }

    if let Some(env_key) = field.env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, field.key) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn locale_code(locale: Locale) -> &'static str {
    match locale {
        Locale::Vi => "vi",
        Locale::En => "en",
    }
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

fn redact_token(token: Option<&str>) -> String {
    let Some(token) = token else {
        return "<unset>".to_string();
    };
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    let prefix: String = trimmed.chars().take(4).collect();
    if trimmed.chars().count() > 12 {
        return format!("{prefix}***");
    }

    "<redacted>".to_string()
}
