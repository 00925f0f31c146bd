//! Deletion workflow controller.
//!
//! Mediates between presentation surfaces and the backend gateway. The
//! controller keeps a read-only snapshot of the last listing; every mutation
//! is followed by a full re-fetch so the snapshot always reflects server
//! state. Listings carry a generation ticket and a response is applied only
//! if no newer listing was started after it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::domain::deletion::{
    DeletionRequest, DeletionRequestId, DeletionStatus, PartnerId, ReviewDecision,
};
use crate::domain::session::SessionContext;
use crate::errors::{
    classify_gateway_failure, PermissionIssue, ValidationIssue, WorkflowError, WorkflowOperation,
};
use crate::i18n::{message, Locale, MessageKey};
use crate::workflow::gateway::{
    CreateDeletionRequest, DeletionRequestGateway, ProcessDeletionRequest, RevokeDeletionRequest,
};
use crate::workflow::presentation::{status_color, status_label};
use crate::workflow::window::{self, DeletionWindow, WindowPolicy};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ControllerSettings {
    pub locale: Locale,
    pub policy: WindowPolicy,
    /// Reject revoke/process locally when the cached request shows the
    /// action cannot succeed, instead of waiting for the backend to refuse.
    pub local_precondition_checks: bool,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            locale: Locale::default(),
            policy: WindowPolicy::default(),
            local_precondition_checks: true,
        }
    }
}

/// Uniform outcome of every public controller operation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct OperationResult<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip)]
    pub error: Option<WorkflowError>,
}

impl<T> OperationResult<T> {
    fn succeeded(data: T, message: Option<String>) -> Self {
        Self { success: true, message, data: Some(data), error: None }
    }

    fn failed(error: WorkflowError, locale: Locale) -> Self {
        Self {
            success: false,
            message: Some(error.user_message(locale)),
            data: None,
            error: Some(error),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DeletionRequestListState {
    pub requests: Vec<DeletionRequest>,
    pub error: Option<String>,
    pub generation: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum ListScope {
    Partner { partner_id: PartnerId, status: Option<DeletionStatus> },
    All,
}

pub struct DeletionWorkflowController {
    gateway: Arc<dyn DeletionRequestGateway>,
    clock: Arc<dyn Clock>,
    settings: ControllerSettings,
    state: RwLock<DeletionRequestListState>,
    scope: RwLock<Option<ListScope>>,
    generation: AtomicU64,
}

impl DeletionWorkflowController {
    pub fn new(
        gateway: Arc<dyn DeletionRequestGateway>,
        clock: Arc<dyn Clock>,
        settings: ControllerSettings,
    ) -> Self {
        Self {
            gateway,
            clock,
            settings,
            state: RwLock::new(DeletionRequestListState::default()),
            scope: RwLock::new(None),
            generation: AtomicU64::new(0),
        }
    }

    pub fn settings(&self) -> &ControllerSettings {
        &self.settings
    }

    pub async fn state(&self) -> DeletionRequestListState {
        self.state.read().await.clone()
    }

    /// Lists requests of one partner. Without an explicit partner id the
    /// session's partner is used; with neither, the result is an empty list.
    pub async fn fetch_requests_for_partner(
        &self,
        session: &SessionContext,
        partner_id: Option<&PartnerId>,
        status: Option<DeletionStatus>,
    ) -> OperationResult<Vec<DeletionRequest>> {
        let resolved = partner_id
            .filter(|id| !id.0.trim().is_empty())
            .or(session.partner_id.as_ref().filter(|id| !id.0.trim().is_empty()))
            .cloned();

        let Some(partner_id) = resolved else {
            debug!(
                event_name = "workflow.fetch.no_partner",
                user_id = %session.user_id,
                "no partner resolved for listing; returning empty list"
            );
            return OperationResult::succeeded(Vec::new(), None);
        };

        self.load(ListScope::Partner { partner_id, status }).await
    }

    pub async fn fetch_all_requests(&self) -> OperationResult<Vec<DeletionRequest>> {
        self.load(ListScope::All).await
    }

    pub async fn create_request(
        &self,
        session: &SessionContext,
        explanation: &str,
    ) -> OperationResult<Option<DeletionRequest>> {
        let locale = self.settings.locale;
        let explanation = explanation.trim();
        if explanation.is_empty() {
            return OperationResult::failed(
                WorkflowError::Validation(ValidationIssue::MissingExplanation),
                locale,
            );
        }
        let Some(partner_id) = session.partner_id.clone() else {
            return OperationResult::failed(
                WorkflowError::Validation(ValidationIssue::MissingPartner),
                locale,
            );
        };

        let payload = CreateDeletionRequest { detailed_explanation: explanation.to_string() };
        match self.gateway.create(session, payload).await {
            Ok(created) => {
                info!(
                    event_name = "workflow.create.succeeded",
                    partner_id = %partner_id,
                    user_id = %session.user_id,
                    "deletion request created"
                );
                self.refresh_after_mutation(session).await;
                OperationResult::succeeded(
                    created,
                    Some(message(locale, MessageKey::CreateSucceeded).to_string()),
                )
            }
            Err(error) => {
                let classified = classify_gateway_failure(WorkflowOperation::Create, None, &error);
                warn!(
                    event_name = "workflow.create.failed",
                    partner_id = %partner_id,
                    error_class = classified.error_class(),
                    error = %error,
                    "deletion request creation failed"
                );
                OperationResult::failed(classified, locale)
            }
        }
    }

    pub async fn revoke_request(
        &self,
        session: &SessionContext,
        request_id: Option<&str>,
        note: Option<&str>,
    ) -> OperationResult<Option<DeletionRequest>> {
        let locale = self.settings.locale;
        let Some(request_id) = non_blank_request_id(request_id) else {
            return OperationResult::failed(
                WorkflowError::Validation(ValidationIssue::MissingRequestId),
                locale,
            );
        };

        if self.settings.local_precondition_checks {
            if let Some(current) = self.current(session, &request_id).await {
                if let Err(error) = self.check_revocable(session, &current) {
                    info!(
                        event_name = "workflow.revoke.blocked",
                        request_id = %request_id,
                        error_class = error.error_class(),
                        "revoke rejected by local precondition"
                    );
                    return OperationResult::failed(error, locale);
                }
            }
        }

        let payload = RevokeDeletionRequest {
            request_id: request_id.clone(),
            review_note: note.unwrap_or_default().trim().to_string(),
        };
        match self.gateway.revoke(session, payload).await {
            Ok(updated) => {
                info!(
                    event_name = "workflow.revoke.succeeded",
                    request_id = %request_id,
                    user_id = %session.user_id,
                    "deletion request revoked"
                );
                self.refresh_after_mutation(session).await;
                OperationResult::succeeded(
                    updated,
                    Some(message(locale, MessageKey::RevokeSucceeded).to_string()),
                )
            }
            Err(error) => {
                let classified =
                    classify_gateway_failure(WorkflowOperation::Revoke, Some(&request_id), &error);
                warn!(
                    event_name = "workflow.revoke.failed",
                    request_id = %request_id,
                    error_class = classified.error_class(),
                    error = %error,
                    "deletion request revoke failed"
                );
                OperationResult::failed(classified, locale)
            }
        }
    }

    pub async fn admin_process_request(
        &self,
        session: &SessionContext,
        request_id: Option<&str>,
        decision: &str,
        note: Option<&str>,
    ) -> OperationResult<Option<DeletionRequest>> {
        let locale = self.settings.locale;
        let Some(request_id) = non_blank_request_id(request_id) else {
            return OperationResult::failed(
                WorkflowError::Validation(ValidationIssue::MissingRequestId),
                locale,
            );
        };
        let Some(decision) = ReviewDecision::parse(decision) else {
            return OperationResult::failed(
                WorkflowError::Validation(ValidationIssue::InvalidDecision(decision.to_string())),
                locale,
            );
        };
        if !session.is_admin() {
            return OperationResult::failed(
                WorkflowError::Permission(PermissionIssue::AdminOnly),
                locale,
            );
        }

        if self.settings.local_precondition_checks {
            if let Some(current) = self.current(session, &request_id).await {
                if let Err(error) = self.check_processable(&current) {
                    info!(
                        event_name = "workflow.process.blocked",
                        request_id = %request_id,
                        error_class = error.error_class(),
                        "process rejected by local precondition"
                    );
                    return OperationResult::failed(error, locale);
                }
            }
        }

        let payload = ProcessDeletionRequest {
            request_id: request_id.clone(),
            status: decision,
            review_note: note.unwrap_or_default().trim().to_string(),
        };
        match self.gateway.process(session, payload).await {
            Ok(updated) => {
                info!(
                    event_name = "workflow.process.succeeded",
                    request_id = %request_id,
                    decision = decision.as_str(),
                    reviewer = %session.user_id,
                    "deletion request processed"
                );
                self.refresh_after_mutation(session).await;
                let key = match decision {
                    ReviewDecision::Approved => MessageKey::ApproveSucceeded,
                    ReviewDecision::Rejected => MessageKey::RejectSucceeded,
                };
                OperationResult::succeeded(updated, Some(message(locale, key).to_string()))
            }
            Err(error) => {
                let classified =
                    classify_gateway_failure(WorkflowOperation::Process, Some(&request_id), &error);
                warn!(
                    event_name = "workflow.process.failed",
                    request_id = %request_id,
                    error_class = classified.error_class(),
                    error = %error,
                    "deletion request processing failed"
                );
                OperationResult::failed(classified, locale)
            }
        }
    }

    pub fn can_revoke(&self, request: &DeletionRequest) -> bool {
        window::can_revoke(request, self.clock.now())
    }

    pub fn can_process(&self, request: &DeletionRequest) -> bool {
        window::can_process(request, self.clock.now())
    }

    pub fn days_remaining(&self, request: &DeletionRequest) -> u32 {
        window::days_remaining(request, self.clock.now())
    }

    pub fn window(&self, request: &DeletionRequest) -> DeletionWindow {
        DeletionWindow::evaluate(request, self.clock.now(), &self.settings.policy)
    }

    pub fn status_label(&self, status: &DeletionStatus) -> String {
        status_label(status, self.settings.locale)
    }

    pub fn status_color(&self, status: &DeletionStatus) -> &'static str {
        status_color(status)
    }

    fn check_revocable(
        &self,
        session: &SessionContext,
        request: &DeletionRequest,
    ) -> Result<(), WorkflowError> {
        if !request.status.is_pending() {
            return Err(WorkflowError::NotPending(request.request_id.clone()));
        }
        if !request.is_requested_by(&session.user_id) {
            return Err(WorkflowError::Permission(PermissionIssue::NotRequester));
        }
        if !self.can_revoke(request) {
            return Err(WorkflowError::WindowClosed {
                request_id: Some(request.request_id.clone()),
            });
        }
        Ok(())
    }

    fn check_processable(&self, request: &DeletionRequest) -> Result<(), WorkflowError> {
        if !request.status.is_pending() {
            return Err(WorkflowError::NotPending(request.request_id.clone()));
        }
        if !self.can_process(request) {
            return Err(WorkflowError::WindowNotYetClosed {
                request_id: Some(request.request_id.clone()),
            });
        }
        Ok(())
    }

    async fn cached(&self, request_id: &DeletionRequestId) -> Option<DeletionRequest> {
        let state = self.state.read().await;
        state.requests.iter().find(|request| &request.request_id == request_id).cloned()
    }

    /// Request as the backend last reported it. A request missing from the
    /// snapshot triggers one re-fetch of the working scope before giving up.
    async fn current(
        &self,
        session: &SessionContext,
        request_id: &DeletionRequestId,
    ) -> Option<DeletionRequest> {
        if let Some(cached) = self.cached(request_id).await {
            return Some(cached);
        }

        let scope = self.working_scope(session).await?;
        debug!(
            event_name = "workflow.precondition.refetch",
            request_id = %request_id,
            "request not in snapshot; refreshing before local checks"
        );
        let _ = self.load(scope).await;
        self.cached(request_id).await
    }

    /// Last listed scope, else the session's natural scope.
    async fn working_scope(&self, session: &SessionContext) -> Option<ListScope> {
        let last_scope = self.scope.read().await.clone();
        match last_scope {
            Some(scope) => Some(scope),
            None if session.is_admin() => Some(ListScope::All),
            None => session
                .partner_id
                .clone()
                .map(|partner_id| ListScope::Partner { partner_id, status: None }),
        }
    }

    async fn refresh_after_mutation(&self, session: &SessionContext) {
        if let Some(scope) = self.working_scope(session).await {
            let _ = self.load(scope).await;
        }
    }

    async fn load(&self, scope: ListScope) -> OperationResult<Vec<DeletionRequest>> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        *self.scope.write().await = Some(scope.clone());

        let (operation, outcome) = match &scope {
            ListScope::Partner { partner_id, status } => (
                WorkflowOperation::FetchForPartner,
                self.gateway.list_for_partner(partner_id, status.as_ref()).await,
            ),
            ListScope::All => (WorkflowOperation::FetchAll, self.gateway.list_all().await),
        };

        let locale = self.settings.locale;
        match outcome {
            Ok(requests) => {
                self.apply(generation, requests.clone(), None).await;
                OperationResult::succeeded(requests, None)
            }
            Err(error) => match classify_gateway_failure(operation, None, &error) {
                WorkflowError::NotFound => {
                    self.apply(generation, Vec::new(), None).await;
                    OperationResult::succeeded(Vec::new(), None)
                }
                classified => {
                    warn!(
                        event_name = "workflow.fetch.failed",
                        operation = operation.as_str(),
                        error_class = classified.error_class(),
                        error = %error,
                        "deletion request listing failed"
                    );
                    let mut result = OperationResult::failed(classified, locale);
                    let shown = message(locale, MessageKey::FetchFailed).to_string();
                    let detail = result.message.take().unwrap_or_default();
                    let combined = format!("{shown}: {detail}");
                    self.apply(generation, Vec::new(), Some(combined.clone())).await;
                    result.message = Some(combined);
                    result
                }
            },
        }
    }

    async fn apply(&self, generation: u64, requests: Vec<DeletionRequest>, error: Option<String>) {
        let mut state = self.state.write().await;
        let latest = self.generation.load(Ordering::SeqCst);
        if generation != latest {
            debug!(
                event_name = "workflow.fetch.stale_discarded",
                generation,
                latest,
                "discarding listing superseded by a newer fetch"
            );
            return;
        }
        *state = DeletionRequestListState { requests, error, generation };
    }
}

fn non_blank_request_id(raw: Option<&str>) -> Option<DeletionRequestId> {
    raw.map(str::trim).filter(|id| !id.is_empty()).map(|id| DeletionRequestId(id.to_string()))
}
