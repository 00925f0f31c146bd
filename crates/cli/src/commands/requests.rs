use std::sync::Arc;

use anyhow::Context;
use clap::Subcommand;
use harvestdesk_core::config::{AppConfig, LoadOptions};
use harvestdesk_core::i18n::message;
use harvestdesk_core::{
    DeletionRequest, DeletionStatus, DeletionWindow, DeletionWorkflowController, MessageKey,
    OperationResult, PartnerId, SessionContext, SystemClock,
};
use harvestdesk_gateway::HttpDeletionRequestGateway;
use serde::Serialize;
use serde_json::Value;
use tokio::runtime::Runtime;

use super::CommandResult;

#[derive(Debug, Clone, Subcommand)]
pub enum RequestAction {
    #[command(about = "List deletion requests for a partner, or all requests with --all")]
    List {
        #[arg(long, help = "Partner to list; defaults to the session partner")]
        partner_id: Option<String>,
        #[arg(long, help = "Status filter (pending|approved|rejected|cancelled|completed)")]
        status: Option<String>,
        #[arg(
            long,
            conflicts_with_all = ["partner_id", "status"],
            help = "List every request (admin)"
        )]
        all: bool,
    },
    #[command(about = "Submit a deletion request for the session partner")]
    Create {
        #[arg(long, help = "Detailed explanation for the request")]
        explanation: String,
    },
    #[command(about = "Revoke a pending request inside its cancellable window")]
    Revoke {
        #[arg(long)]
        id: Option<String>,
        #[arg(long)]
        note: Option<String>,
    },
    #[command(about = "Approve or reject a pending request after its window closed (admin)")]
    Process {
        #[arg(long)]
        id: Option<String>,
        #[arg(long, help = "approved|rejected")]
        decision: String,
        #[arg(long)]
        note: Option<String>,
    },
    #[command(about = "Show one request with its window and progress stage")]
    Show {
        #[arg(long)]
        id: String,
    },
}

impl RequestAction {
    pub fn command_name(&self) -> &'static str {
        match self {
            Self::List { .. } => "requests.list",
            Self::Create { .. } => "requests.create",
            Self::Revoke { .. } => "requests.revoke",
            Self::Process { .. } => "requests.process",
            Self::Show { .. } => "requests.show",
        }
    }
}

#[derive(Debug, Serialize)]
struct RequestView {
    #[serde(flatten)]
    request: DeletionRequest,
    status_label: String,
    status_color: &'static str,
    window: DeletionWindow,
}

pub fn run(options: LoadOptions, action: RequestAction) -> CommandResult {
    let command = action.command_name();

    let config = match AppConfig::load(options) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(command, "config_validation", error.to_string(), 2);
        }
    };
    let Some(session) = config.session.context() else {
        return CommandResult::failure(
            command,
            "session_missing",
            "no session user configured; set HARVESTDESK_SESSION_USER_ID or pass --user-id",
            2,
        );
    };

    let (runtime, controller) = match bootstrap(&config) {
        Ok(parts) => parts,
        Err(error) => return CommandResult::failure(command, "bootstrap", format!("{error:#}"), 2),
    };

    runtime.block_on(execute(&controller, &session, action))
}

fn bootstrap(config: &AppConfig) -> anyhow::Result<(Runtime, DeletionWorkflowController)> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to initialize async runtime")?;
    let gateway = HttpDeletionRequestGateway::from_config(&config.backend)
        .context("failed to build backend client")?;

    let controller = DeletionWorkflowController::new(
        Arc::new(gateway),
        Arc::new(SystemClock),
        config.controller_settings(),
    );
    Ok((runtime, controller))
}

pub async fn execute(
    controller: &DeletionWorkflowController,
    session: &SessionContext,
    action: RequestAction,
) -> CommandResult {
    let command = action.command_name();

    match action {
        RequestAction::List { partner_id, status, all } => {
            let result = if all {
                controller.fetch_all_requests().await
            } else {
                let status = match status.as_deref().map(parse_status_filter).transpose() {
                    Ok(status) => status,
                    Err(error) => return CommandResult::failure(command, "validation", error, 1),
                };
                let partner_id = partner_id.map(PartnerId);
                controller.fetch_requests_for_partner(session, partner_id.as_ref(), status).await
            };
            listing_outcome(command, controller, result)
        }
        RequestAction::Create { explanation } => {
            let result = controller.create_request(session, &explanation).await;
            mutation_outcome(command, controller, result)
        }
        RequestAction::Revoke { id, note } => {
            let result = controller.revoke_request(session, id.as_deref(), note.as_deref()).await;
            mutation_outcome(command, controller, result)
        }
        RequestAction::Process { id, decision, note } => {
            let result = controller
                .admin_process_request(session, id.as_deref(), &decision, note.as_deref())
                .await;
            mutation_outcome(command, controller, result)
        }
        RequestAction::Show { id } => {
            let result = if session.is_admin() {
                controller.fetch_all_requests().await
            } else {
                controller.fetch_requests_for_partner(session, None, None).await
            };
            if !result.success {
                return failure_from(command, &result);
            }

            let wanted = id.trim();
            let found = result
                .data
                .unwrap_or_default()
                .into_iter()
                .find(|request| request.request_id.0 == wanted);
            match found {
                Some(request) => {
                    let shown = view(controller, request);
                    CommandResult::success_with_data(
                        command,
                        shown.status_label.clone(),
                        serde_json::to_value(&shown).ok(),
                    )
                }
                None => CommandResult::failure(
                    command,
                    "not_found",
                    message(controller.settings().locale, MessageKey::RequestNotFound),
                    1,
                ),
            }
        }
    }
}

fn parse_status_filter(raw: &str) -> Result<DeletionStatus, String> {
    DeletionStatus::parse_known(raw).ok_or_else(|| {
        let known = DeletionStatus::KNOWN.map(|status| status.as_str().to_string()).join("|");
        format!("unsupported status filter `{}` (expected {known})", raw.trim())
    })
}

fn view(controller: &DeletionWorkflowController, request: DeletionRequest) -> RequestView {
    RequestView {
        status_label: controller.status_label(&request.status),
        status_color: controller.status_color(&request.status),
        window: controller.window(&request),
        request,
    }
}

fn listing_outcome(
    command: &str,
    controller: &DeletionWorkflowController,
    result: OperationResult<Vec<DeletionRequest>>,
) -> CommandResult {
    if !result.success {
        return failure_from(command, &result);
    }

    let views: Vec<RequestView> = result
        .data
        .unwrap_or_default()
        .into_iter()
        .map(|request| view(controller, request))
        .collect();
    let summary = format!("{} deletion request(s)", views.len());
    CommandResult::success_with_data(command, summary, serde_json::to_value(&views).ok())
}

fn mutation_outcome(
    command: &str,
    controller: &DeletionWorkflowController,
    result: OperationResult<Option<DeletionRequest>>,
) -> CommandResult {
    if !result.success {
        return failure_from(command, &result);
    }

    let data = result
        .data
        .flatten()
        .map(|request| view(controller, request))
        .and_then(|view| serde_json::to_value(&view).ok())
        .unwrap_or(Value::Null);
    CommandResult::success_with_data(command, result.message.unwrap_or_default(), Some(data))
}

fn failure_from<T>(command: &str, result: &OperationResult<T>) -> CommandResult {
    let error_class = result.error.as_ref().map_or("workflow", |error| error.error_class());
    CommandResult::failure(command, error_class, result.message.clone().unwrap_or_default(), 1)
}
