pub mod clock;
pub mod config;
pub mod domain;
pub mod errors;
pub mod i18n;
pub mod workflow;

pub use clock::{Clock, FixedClock, SystemClock};
pub use domain::deletion::{
    DeletionRequest, DeletionRequestId, DeletionStatus, PartnerId, ReviewDecision,
};
pub use domain::session::{SessionContext, SessionRole};
pub use errors::{
    classify_gateway_failure, GatewayError, PermissionIssue, ValidationIssue, WorkflowError,
    WorkflowOperation,
};
pub use i18n::{Locale, MessageKey};
pub use workflow::{
    ControllerSettings, DeletionRequestGateway, DeletionRequestListState, DeletionWindow,
    DeletionWorkflowController, OperationResult, WindowPolicy, WorkflowStage,
};
