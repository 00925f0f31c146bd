use thiserror::Error;

use crate::domain::deletion::DeletionRequestId;
use crate::i18n::{http_failure, message, Locale, MessageKey};

/// Transport-level failure reported by a gateway adapter.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum GatewayError {
    #[error("no response from backend: {0}")]
    Network(String),
    #[error("backend responded with HTTP {status}")]
    Api { status: u16, code: Option<String>, message: Option<String> },
    #[error("could not decode backend response: {0}")]
    Decode(String),
    #[error("gateway misconfigured: {0}")]
    Configuration(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorkflowOperation {
    FetchForPartner,
    FetchAll,
    Create,
    Revoke,
    Process,
}

impl WorkflowOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FetchForPartner => "fetch_for_partner",
            Self::FetchAll => "fetch_all",
            Self::Create => "create",
            Self::Revoke => "revoke",
            Self::Process => "process",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ValidationIssue {
    MissingRequestId,
    InvalidDecision(String),
    MissingExplanation,
    MissingPartner,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum WorkflowError {
    #[error("validation failed: {0:?}")]
    Validation(ValidationIssue),
    #[error("a pending deletion request already exists")]
    Conflict,
    #[error("revocation window still open for request {request_id:?}")]
    WindowNotYetClosed { request_id: Option<DeletionRequestId> },
    #[error("revocation window closed for request {request_id:?}")]
    WindowClosed { request_id: Option<DeletionRequestId> },
    #[error("permission denied: {0:?}")]
    Permission(PermissionIssue),
    #[error("session is not authenticated")]
    Unauthorized,
    #[error("resource not found")]
    NotFound,
    #[error("request {0} is no longer pending")]
    NotPending(DeletionRequestId),
    #[error("backend rejected the submitted data")]
    BadRequest,
    #[error("network failure: {0}")]
    Network(String),
    #[error("backend failure with HTTP {status}")]
    Server { status: u16 },
    #[error("unexpected backend response: {0}")]
    UnexpectedResponse(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PermissionIssue {
    NotRequester,
    AdminOnly,
    Denied,
}

impl WorkflowError {
    pub fn error_class(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Conflict => "conflict",
            Self::WindowNotYetClosed { .. } => "window_not_yet_closed",
            Self::WindowClosed { .. } => "window_closed",
            Self::Permission(_) | Self::Unauthorized => "permission",
            Self::NotFound => "not_found",
            Self::NotPending(_) => "not_pending",
            Self::BadRequest => "bad_request",
            Self::Network(_) => "network",
            Self::Server { .. } => "server",
            Self::UnexpectedResponse(_) => "unexpected_response",
        }
    }

    /// User-facing text. Backend detail never leaks through here.
    pub fn user_message(&self, locale: Locale) -> String {
        let key = match self {
            Self::Validation(ValidationIssue::MissingRequestId) => MessageKey::MissingRequestId,
            Self::Validation(ValidationIssue::InvalidDecision(_)) => MessageKey::InvalidDecision,
            Self::Validation(ValidationIssue::MissingExplanation) => MessageKey::MissingExplanation,
            Self::Validation(ValidationIssue::MissingPartner) => MessageKey::MissingPartner,
            Self::Conflict => MessageKey::PendingRequestExists,
            Self::WindowNotYetClosed { .. } => MessageKey::ReviewWindowOpen,
            Self::WindowClosed { .. } => MessageKey::RevokeWindowClosed,
            Self::Permission(PermissionIssue::NotRequester) => MessageKey::NotRequester,
            Self::Permission(PermissionIssue::AdminOnly) => MessageKey::AdminOnly,
            Self::Permission(PermissionIssue::Denied) => MessageKey::PermissionDenied,
            Self::Unauthorized => MessageKey::SessionExpired,
            Self::NotFound => MessageKey::RequestNotFound,
            Self::NotPending(_) => MessageKey::RequestNotPending,
            Self::BadRequest => MessageKey::InvalidRequestData,
            Self::Network(_) => MessageKey::NetworkUnavailable,
            Self::UnexpectedResponse(_) => MessageKey::UnexpectedResponse,
            Self::Server { status } => return http_failure(locale, *status),
        };
        message(locale, key).to_string()
    }
}

const CONFLICT_HINTS: [&str; 4] =
    ["đã có yêu cầu", "đã tồn tại", "already has a pending", "already exists"];
const WINDOW_OPEN_HINTS: [&str; 3] =
    ["chưa hết thời hạn", "chưa thể xử lý", "window is still open"];
const WINDOW_CLOSED_HINTS: [&str; 3] = ["đã hết thời hạn", "quá thời hạn", "window has closed"];
const PERMISSION_HINTS: [&str; 2] = ["không có quyền", "not allowed"];
const NOT_PENDING_HINTS: [&str; 2] = ["không còn ở trạng thái chờ", "no longer pending"];

/// Maps a gateway failure onto the workflow taxonomy.
///
/// Precedence: a `CONFLICT` code or HTTP 409, then well-known message
/// fragments, then 401/403/404 by status, then the remaining error codes,
/// then the bare HTTP status.
pub fn classify_gateway_failure(
    operation: WorkflowOperation,
    request_id: Option<&DeletionRequestId>,
    error: &GatewayError,
) -> WorkflowError {
    let (status, code, text) = match error {
        GatewayError::Network(detail) => return WorkflowError::Network(detail.clone()),
        GatewayError::Decode(detail) | GatewayError::Configuration(detail) => {
            return WorkflowError::UnexpectedResponse(detail.clone());
        }
        GatewayError::Api { status, code, message } => (
            *status,
            code.as_deref().map(str::to_ascii_uppercase).unwrap_or_default(),
            message.as_deref().map(str::to_lowercase).unwrap_or_default(),
        ),
    };
    let request_id = request_id.cloned();

    if code == "CONFLICT" || status == 409 {
        return WorkflowError::Conflict;
    }

    let mentions = |hints: &[&str]| hints.iter().any(|hint| text.contains(hint));
    if mentions(&CONFLICT_HINTS) {
        return WorkflowError::Conflict;
    }
    if mentions(&WINDOW_OPEN_HINTS) {
        return WorkflowError::WindowNotYetClosed { request_id };
    }
    if mentions(&WINDOW_CLOSED_HINTS) {
        return WorkflowError::WindowClosed { request_id };
    }
    if mentions(&PERMISSION_HINTS) {
        return WorkflowError::Permission(PermissionIssue::Denied);
    }
    if mentions(&NOT_PENDING_HINTS) {
        if let Some(request_id) = &request_id {
            return WorkflowError::NotPending(request_id.clone());
        }
    }

    // These statuses are unambiguous; backend-specific codes must not mask them.
    let code = match status {
        401 | 403 | 404 => status_code_name(status).unwrap_or_default(),
        _ if code.is_empty() => status_code_name(status).unwrap_or_default(),
        _ => code,
    };
    match code.as_str() {
        "UNPROCESSABLE_ENTITY" => match operation {
            WorkflowOperation::Revoke => WorkflowError::WindowClosed { request_id },
            WorkflowOperation::Process => WorkflowError::WindowNotYetClosed { request_id },
            _ => WorkflowError::BadRequest,
        },
        "NOT_FOUND" => WorkflowError::NotFound,
        "UNAUTHORIZED" => WorkflowError::Unauthorized,
        "FORBIDDEN" => WorkflowError::Permission(PermissionIssue::Denied),
        "BAD_REQUEST" => WorkflowError::BadRequest,
        _ => WorkflowError::Server { status },
    }
}

fn status_code_name(status: u16) -> Option<String> {
    let name = match status {
        400 => "BAD_REQUEST",
        401 => "UNAUTHORIZED",
        403 => "FORBIDDEN",
        404 => "NOT_FOUND",
        409 => "CONFLICT",
        422 => "UNPROCESSABLE_ENTITY",
        _ => return None,
    };
    Some(name.to_string())
}

#[cfg(test)]
mod tests {
    use crate::domain::deletion::DeletionRequestId;
    use crate::i18n::{message, Locale, MessageKey};

    use super::{
        classify_gateway_failure, GatewayError, PermissionIssue, ValidationIssue, WorkflowError,
        WorkflowOperation,
    };

    fn api(status: u16, code: Option<&str>, message: Option<&str>) -> GatewayError {
        GatewayError::Api {
            status,
            code: code.map(str::to_string),
            message: message.map(str::to_string),
        }
    }

    #[test]
    fn missing_response_maps_to_network_message() {
        let error = classify_gateway_failure(
            WorkflowOperation::FetchAll,
            None,
            &GatewayError::Network("connection refused".to_string()),
        );

        assert!(matches!(error, WorkflowError::Network(_)));
        assert_eq!(
            error.user_message(Locale::En),
            message(Locale::En, MessageKey::NetworkUnavailable)
        );
        assert!(!error.user_message(Locale::En).contains("connection refused"));
    }

    #[test]
    fn conflict_code_wins_over_other_hints() {
        let error = classify_gateway_failure(
            WorkflowOperation::Create,
            None,
            &api(409, Some("CONFLICT"), Some("đã hết thời hạn")),
        );
        assert_eq!(error, WorkflowError::Conflict);
    }

    #[test]
    fn vietnamese_message_fragments_are_recognized() {
        let error = classify_gateway_failure(
            WorkflowOperation::Create,
            None,
            &api(400, Some("BAD_REQUEST"), Some("Đối tác Đã Có Yêu Cầu hủy đang chờ xử lý")),
        );
        assert_eq!(error, WorkflowError::Conflict);

        let id = DeletionRequestId("req-9".to_string());
        let error = classify_gateway_failure(
            WorkflowOperation::Process,
            Some(&id),
            &api(400, Some("BAD_REQUEST"), Some("Chưa hết thời hạn thu hồi")),
        );
        assert_eq!(error, WorkflowError::WindowNotYetClosed { request_id: Some(id) });

        let error = classify_gateway_failure(
            WorkflowOperation::Revoke,
            None,
            &api(403, None, Some("Bạn không có quyền thu hồi")),
        );
        assert_eq!(error, WorkflowError::Permission(PermissionIssue::Denied));
    }

    #[test]
    fn unprocessable_entity_depends_on_operation() {
        let failure = api(422, Some("UNPROCESSABLE_ENTITY"), None);

        assert!(matches!(
            classify_gateway_failure(WorkflowOperation::Process, None, &failure),
            WorkflowError::WindowNotYetClosed { .. }
        ));
        assert!(matches!(
            classify_gateway_failure(WorkflowOperation::Revoke, None, &failure),
            WorkflowError::WindowClosed { .. }
        ));
        assert_eq!(
            classify_gateway_failure(WorkflowOperation::Create, None, &failure),
            WorkflowError::BadRequest
        );
    }

    #[test]
    fn bare_status_codes_are_mapped_when_code_is_missing() {
        let cases = [
            (401, WorkflowError::Unauthorized),
            (403, WorkflowError::Permission(PermissionIssue::Denied)),
            (404, WorkflowError::NotFound),
            (400, WorkflowError::BadRequest),
            (409, WorkflowError::Conflict),
        ];

        for (status, expected) in cases {
            let error =
                classify_gateway_failure(WorkflowOperation::Create, None, &api(status, None, None));
            assert_eq!(error, expected, "status {status}");
        }
    }

    #[test]
    fn unambiguous_statuses_win_over_backend_specific_codes() {
        let error = classify_gateway_failure(
            WorkflowOperation::Create,
            None,
            &api(409, Some("DUPLICATE_REQUEST"), None),
        );
        assert_eq!(error, WorkflowError::Conflict);

        let error = classify_gateway_failure(
            WorkflowOperation::FetchForPartner,
            None,
            &api(404, Some("DELETION_REQUEST_NOT_FOUND"), Some("no requests")),
        );
        assert_eq!(error, WorkflowError::NotFound);

        let error = classify_gateway_failure(
            WorkflowOperation::Revoke,
            None,
            &api(403, Some("ACCESS_DENIED"), None),
        );
        assert_eq!(error, WorkflowError::Permission(PermissionIssue::Denied));
    }

    #[test]
    fn no_longer_pending_message_maps_to_not_pending() {
        let id = DeletionRequestId("req-4".to_string());
        let failure =
            api(400, Some("BAD_REQUEST"), Some("Yêu cầu không còn ở trạng thái chờ xử lý"));

        assert_eq!(
            classify_gateway_failure(WorkflowOperation::Revoke, Some(&id), &failure),
            WorkflowError::NotPending(id.clone())
        );
        assert_eq!(
            classify_gateway_failure(WorkflowOperation::Create, None, &failure),
            WorkflowError::BadRequest
        );
    }

    #[test]
    fn unmapped_status_falls_back_to_generic_http_message() {
        let error = classify_gateway_failure(
            WorkflowOperation::FetchAll,
            None,
            &api(503, Some("SERVICE_UNAVAILABLE"), Some("upstream down")),
        );

        assert_eq!(error, WorkflowError::Server { status: 503 });
        assert!(error.user_message(Locale::En).contains("HTTP 503"));
        assert!(!error.user_message(Locale::En).contains("upstream"));
    }

    #[test]
    fn every_error_has_a_non_empty_message() {
        let errors = [
            WorkflowError::Validation(ValidationIssue::MissingRequestId),
            WorkflowError::Validation(ValidationIssue::InvalidDecision("maybe".to_string())),
            WorkflowError::Validation(ValidationIssue::MissingExplanation),
            WorkflowError::Validation(ValidationIssue::MissingPartner),
            WorkflowError::Conflict,
            WorkflowError::WindowNotYetClosed { request_id: None },
            WorkflowError::WindowClosed { request_id: None },
            WorkflowError::Permission(PermissionIssue::NotRequester),
            WorkflowError::Permission(PermissionIssue::AdminOnly),
            WorkflowError::Unauthorized,
            WorkflowError::NotFound,
            WorkflowError::NotPending(DeletionRequestId("req-1".to_string())),
            WorkflowError::BadRequest,
            WorkflowError::Network("timeout".to_string()),
            WorkflowError::Server { status: 500 },
            WorkflowError::UnexpectedResponse("eof".to_string()),
        ];

        for error in errors {
            for locale in [Locale::Vi, Locale::En] {
                assert!(!error.user_message(locale).is_empty(), "{error:?} in {locale:?}");
            }
        }
    }
}
