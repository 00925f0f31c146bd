use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::deletion::PartnerId;
use crate::domain::session::{SessionContext, SessionRole};
use crate::i18n::Locale;
use crate::workflow::controller::ControllerSettings;
use crate::workflow::window::{WindowPolicy, CANCELLABLE_WINDOW_DAYS, WIND_DOWN_DAYS};

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub backend: BackendConfig,
    pub workflow: WorkflowConfig,
    pub session: SessionConfig,
    pub locale: Locale,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct BackendConfig {
    pub base_url: String,
    pub api_token: Option<SecretString>,
    pub timeout_secs: u64,
    pub endpoints: EndpointConfig,
}

/// Path templates of the deletion-request endpoints. The partner listing
/// path must contain a `{partner_id}` placeholder.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EndpointConfig {
    pub partner_list: String,
    pub list_all: String,
    pub create: String,
    pub revoke: String,
    pub process: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkflowConfig {
    pub cancellable_window_days: i64,
    pub wind_down_days: i64,
    pub local_precondition_checks: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionConfig {
    pub user_id: Option<String>,
    pub display_name: Option<String>,
    pub role: SessionRole,
    pub partner_id: Option<String>,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub backend_base_url: Option<String>,
    pub log_level: Option<String>,
    pub locale: Option<Locale>,
    pub session_user_id: Option<String>,
    pub session_role: Option<SessionRole>,
    pub session_partner_id: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            partner_list: "/api/v1/partners/{partner_id}/deletion-requests".to_string(),
            list_all: "/api/v1/admin/deletion-requests".to_string(),
            create: "/api/v1/partners/deletion-requests".to_string(),
            revoke: "/api/v1/partners/deletion-requests/revoke".to_string(),
            process: "/api/v1/admin/deletion-requests/process".to_string(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend: BackendConfig {
                base_url: "http://localhost:8080".to_string(),
                api_token: None,
                timeout_secs: 30,
                endpoints: EndpointConfig::default(),
            },
            workflow: WorkflowConfig {
                cancellable_window_days: CANCELLABLE_WINDOW_DAYS,
                wind_down_days: WIND_DOWN_DAYS,
                local_precondition_checks: true,
            },
            session: SessionConfig {
                user_id: None,
                display_name: None,
                role: SessionRole::Partner,
                partner_id: None,
            },
            locale: Locale::Vi,
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl SessionConfig {
    /// Session used by operator tooling; `None` until a user id is configured.
    pub fn context(&self) -> Option<SessionContext> {
        let user_id = self.user_id.clone().filter(|value| !value.trim().is_empty())?;
        Some(SessionContext {
            user_id,
            display_name: self.display_name.clone(),
            role: self.role,
            partner_id: self.partner_id.clone().map(PartnerId),
        })
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from("harvestdesk.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    pub fn window_policy(&self) -> WindowPolicy {
        WindowPolicy {
            cancellable_window_days: self.workflow.cancellable_window_days,
            wind_down_days: self.workflow.wind_down_days,
        }
    }

    pub fn controller_settings(&self) -> ControllerSettings {
        ControllerSettings {
            locale: self.locale,
            policy: self.window_policy(),
            local_precondition_checks: self.workflow.local_precondition_checks,
        }
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(backend) = patch.backend {
            if let Some(base_url) = backend.base_url {
                self.backend.base_url = base_url;
            }
            if let Some(api_token_value) = backend.api_token {
                self.backend.api_token = Some(secret_value(api_token_value));
            }
            if let Some(timeout_secs) = backend.timeout_secs {
                self.backend.timeout_secs = timeout_secs;
            }
            if let Some(endpoints) = backend.endpoints {
                let target = &mut self.backend.endpoints;
                if let Some(partner_list) = endpoints.partner_list {
                    target.partner_list = partner_list;
                }
                if let Some(list_all) = endpoints.list_all {
                    target.list_all = list_all;
                }
                if let Some(create) = endpoints.create {
                    target.create = create;
                }
                if let Some(revoke) = endpoints.revoke {
                    target.revoke = revoke;
                }
                if let Some(process) = endpoints.process {
                    target.process = process;
                }
            }
        }

        if let Some(workflow) = patch.workflow {
            if let Some(days) = workflow.cancellable_window_days {
                self.workflow.cancellable_window_days = days;
            }
            if let Some(days) = workflow.wind_down_days {
                self.workflow.wind_down_days = days;
            }
            if let Some(enabled) = workflow.local_precondition_checks {
                self.workflow.local_precondition_checks = enabled;
            }
        }

        if let Some(session) = patch.session {
            if let Some(user_id) = session.user_id {
                self.session.user_id = Some(user_id);
            }
            if let Some(display_name) = session.display_name {
                self.session.display_name = Some(display_name);
            }
            if let Some(role) = session.role {
                self.session.role = role;
            }
            if let Some(partner_id) = session.partner_id {
                self.session.partner_id = Some(partner_id);
            }
        }

        if let Some(locale) = patch.locale {
            self.locale = locale;
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("HARVESTDESK_BACKEND_BASE_URL") {
            self.backend.base_url = value;
        }
        if let Some(value) = read_env("HARVESTDESK_BACKEND_API_TOKEN") {
            self.backend.api_token = Some(secret_value(value));
        }
        if let Some(value) = read_env("HARVESTDESK_BACKEND_TIMEOUT_SECS") {
            self.backend.timeout_secs = parse_u64("HARVESTDESK_BACKEND_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("HARVESTDESK_WORKFLOW_CANCELLABLE_WINDOW_DAYS") {
            self.workflow.cancellable_window_days =
                parse_i64("HARVESTDESK_WORKFLOW_CANCELLABLE_WINDOW_DAYS", &value)?;
        }
        if let Some(value) = read_env("HARVESTDESK_WORKFLOW_WIND_DOWN_DAYS") {
            self.workflow.wind_down_days =
                parse_i64("HARVESTDESK_WORKFLOW_WIND_DOWN_DAYS", &value)?;
        }
        if let Some(value) = read_env("HARVESTDESK_WORKFLOW_LOCAL_PRECONDITION_CHECKS") {
            self.workflow.local_precondition_checks =
                parse_bool("HARVESTDESK_WORKFLOW_LOCAL_PRECONDITION_CHECKS", &value)?;
        }

        if let Some(value) = read_env("HARVESTDESK_SESSION_USER_ID") {
            self.session.user_id = Some(value);
        }
        if let Some(value) = read_env("HARVESTDESK_SESSION_DISPLAY_NAME") {
            self.session.display_name = Some(value);
        }
        if let Some(value) = read_env("HARVESTDESK_SESSION_ROLE") {
            self.session.role = value.parse().map_err(|_| ConfigError::InvalidEnvOverride {
                key: "HARVESTDESK_SESSION_ROLE".to_string(),
                value: value.clone(),
            })?;
        }
        if let Some(value) = read_env("HARVESTDESK_SESSION_PARTNER_ID") {
            self.session.partner_id = Some(value);
        }

        if let Some(value) = read_env("HARVESTDESK_LOCALE") {
            self.locale = value.parse().map_err(|_| ConfigError::InvalidEnvOverride {
                key: "HARVESTDESK_LOCALE".to_string(),
                value: value.clone(),
            })?;
        }

        let log_level =
            read_env("HARVESTDESK_LOGGING_LEVEL").or_else(|| read_env("HARVESTDESK_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("HARVESTDESK_LOGGING_FORMAT").or_else(|| read_env("HARVESTDESK_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(base_url) = overrides.backend_base_url {
            self.backend.base_url = base_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(locale) = overrides.locale {
            self.locale = locale;
        }
        if let Some(user_id) = overrides.session_user_id {
            self.session.user_id = Some(user_id);
        }
        if let Some(role) = overrides.session_role {
            self.session.role = role;
        }
        if let Some(partner_id) = overrides.session_partner_id {
            self.session.partner_id = Some(partner_id);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_backend(&self.backend)?;
        validate_workflow(&self.workflow)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("harvestdesk.toml"), PathBuf::from("config/harvestdesk.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_backend(backend: &BackendConfig) -> Result<(), ConfigError> {
    let base_url = backend.base_url.trim();
    if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
        return Err(ConfigError::Validation(
            "backend.base_url must start with http:// or https://".to_string(),
        ));
    }

    if backend.timeout_secs == 0 || backend.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "backend.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    if let Some(token) = &backend.api_token {
        if token.expose_secret().trim().is_empty() {
            return Err(ConfigError::Validation(
                "backend.api_token must not be blank when set".to_string(),
            ));
        }
    }

    let endpoints = &backend.endpoints;
    let paths = [
        ("backend.endpoints.partner_list", &endpoints.partner_list),
        ("backend.endpoints.list_all", &endpoints.list_all),
        ("backend.endpoints.create", &endpoints.create),
        ("backend.endpoints.revoke", &endpoints.revoke),
        ("backend.endpoints.process", &endpoints.process),
    ];
    for (key, path) in paths {
        if !path.starts_with('/') {
            return Err(ConfigError::Validation(format!("{key} must start with `/`")));
        }
    }
    if !endpoints.partner_list.contains("{partner_id}") {
        return Err(ConfigError::Validation(
            "backend.endpoints.partner_list must contain a `{partner_id}` placeholder".to_string(),
        ));
    }

    Ok(())
}

fn validate_workflow(workflow: &WorkflowConfig) -> Result<(), ConfigError> {
    if workflow.cancellable_window_days <= 0 {
        return Err(ConfigError::Validation(
            "workflow.cancellable_window_days must be greater than zero".to_string(),
        ));
    }
    if workflow.wind_down_days <= 0 {
        return Err(ConfigError::Validation(
            "workflow.wind_down_days must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_i64(key: &str, value: &str) -> Result<i64, ConfigError> {
    value.parse::<i64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.parse::<bool>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    backend: Option<BackendPatch>,
    workflow: Option<WorkflowPatch>,
    session: Option<SessionPatch>,
    locale: Option<Locale>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct BackendPatch {
    base_url: Option<String>,
    api_token: Option<String>,
    timeout_secs: Option<u64>,
    endpoints: Option<EndpointPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct EndpointPatch {
    partner_list: Option<String>,
    list_all: Option<String>,
    create: Option<String>,
    revoke: Option<String>,
    process: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct WorkflowPatch {
    cancellable_window_days: Option<i64>,
    wind_down_days: Option<i64>,
    local_precondition_checks: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct SessionPatch {
    user_id: Option<String>,
    display_name: Option<String>,
    role: Option<SessionRole>,
    partner_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
