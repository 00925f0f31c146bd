use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::deletion::{
    DeletionRequest, DeletionRequestId, DeletionStatus, PartnerId, ReviewDecision,
};
use crate::domain::session::SessionContext;
use crate::errors::GatewayError;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateDeletionRequest {
    pub detailed_explanation: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevokeDeletionRequest {
    pub request_id: DeletionRequestId,
    pub review_note: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessDeletionRequest {
    pub request_id: DeletionRequestId,
    pub status: ReviewDecision,
    pub review_note: String,
}

/// Backend endpoints for deletion requests. The backend owns every state
/// transition; implementations only carry requests and responses.
///
/// Mutations return the updated request when the backend echoes one.
#[async_trait]
pub trait DeletionRequestGateway: Send + Sync {
    async fn list_for_partner(
        &self,
        partner_id: &PartnerId,
        status: Option<&DeletionStatus>,
    ) -> Result<Vec<DeletionRequest>, GatewayError>;

    async fn list_all(&self) -> Result<Vec<DeletionRequest>, GatewayError>;

    async fn create(
        &self,
        session: &SessionContext,
        payload: CreateDeletionRequest,
    ) -> Result<Option<DeletionRequest>, GatewayError>;

    async fn revoke(
        &self,
        session: &SessionContext,
        payload: RevokeDeletionRequest,
    ) -> Result<Option<DeletionRequest>, GatewayError>;

    async fn process(
        &self,
        session: &SessionContext,
        payload: ProcessDeletionRequest,
    ) -> Result<Option<DeletionRequest>, GatewayError>;
}
