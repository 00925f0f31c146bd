pub mod controller;
pub mod gateway;
pub mod presentation;
pub mod window;

pub use controller::{
    ControllerSettings, DeletionRequestListState, DeletionWorkflowController, OperationResult,
};
pub use gateway::{
    CreateDeletionRequest, DeletionRequestGateway, ProcessDeletionRequest, RevokeDeletionRequest,
};
pub use presentation::{status_color, status_label};
pub use window::{
    can_process, can_revoke, days_remaining, DeletionWindow, WindowPolicy, WorkflowStage,
};
