use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::RwLock;
use uuid::Uuid;

use harvestdesk_core::workflow::gateway::{
    CreateDeletionRequest, DeletionRequestGateway, ProcessDeletionRequest, RevokeDeletionRequest,
};
use harvestdesk_core::{
    Clock, DeletionRequest, DeletionRequestId, DeletionStatus, GatewayError, PartnerId,
    SessionContext, WindowPolicy,
};

/// Backend stand-in that enforces the server-side rules of the deletion
/// workflow: one pending request per partner, requester-only revocation
/// before the deadline, admin-only processing from the deadline on.
pub struct InMemoryDeletionRequestGateway {
    requests: RwLock<Vec<DeletionRequest>>,
    clock: Arc<dyn Clock>,
    policy: WindowPolicy,
    calls: AtomicUsize,
    injected_failure: Mutex<Option<GatewayError>>,
}

fn rejection(status: u16, code: &str, message: &str) -> GatewayError {
    GatewayError::Api { status, code: Some(code.to_string()), message: Some(message.to_string()) }
}

fn not_found() -> GatewayError {
    rejection(404, "NOT_FOUND", "Không tìm thấy yêu cầu hủy tài khoản")
}

impl InMemoryDeletionRequestGateway {
    pub fn new(clock: Arc<dyn Clock>, policy: WindowPolicy) -> Self {
        Self {
            requests: RwLock::new(Vec::new()),
            clock,
            policy,
            calls: AtomicUsize::new(0),
            injected_failure: Mutex::new(None),
        }
    }

    pub async fn seed(&self, request: DeletionRequest) {
        self.requests.write().await.push(request);
    }

    pub async fn snapshot(&self) -> Vec<DeletionRequest> {
        self.requests.read().await.clone()
    }

    /// Number of gateway calls received, including failed ones.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Makes the next call fail with `error` without touching stored state.
    pub fn fail_next(&self, error: GatewayError) {
        let mut slot =
            self.injected_failure.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *slot = Some(error);
    }

    /// Marks approved requests whose wind-down has elapsed as completed.
    pub async fn complete_elapsed_wind_downs(&self) -> usize {
        let now = self.clock.now();
        let mut requests = self.requests.write().await;
        let mut completed = 0;
        for request in requests.iter_mut() {
            let elapsed =
                self.policy.wind_down_ends_at(request).is_some_and(|ends_at| now >= ends_at);
            if elapsed {
                request.status = DeletionStatus::Completed;
                completed += 1;
            }
        }
        completed
    }

    fn begin_call(&self) -> Result<(), GatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut slot =
            self.injected_failure.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        match slot.take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

fn newest_first(mut requests: Vec<DeletionRequest>) -> Vec<DeletionRequest> {
    requests.sort_by(|left, right| right.requested_at.cmp(&left.requested_at));
    requests
}

#[async_trait::async_trait]
impl DeletionRequestGateway for InMemoryDeletionRequestGateway {
    async fn list_for_partner(
        &self,
        partner_id: &PartnerId,
        status: Option<&DeletionStatus>,
    ) -> Result<Vec<DeletionRequest>, GatewayError> {
        self.begin_call()?;
        let requests = self.requests.read().await;
        let for_partner: Vec<DeletionRequest> = requests
            .iter()
            .filter(|request| &request.partner_id == partner_id)
            .cloned()
            .collect();
        if for_partner.is_empty() {
            return Err(not_found());
        }

        let filtered = for_partner
            .into_iter()
            .filter(|request| status.map_or(true, |status| &request.status == status))
            .collect();
        Ok(newest_first(filtered))
    }

    async fn list_all(&self) -> Result<Vec<DeletionRequest>, GatewayError> {
        self.begin_call()?;
        let requests = self.requests.read().await;
        if requests.is_empty() {
            return Err(not_found());
        }
        Ok(newest_first(requests.clone()))
    }

    async fn create(
        &self,
        session: &SessionContext,
        payload: CreateDeletionRequest,
    ) -> Result<Option<DeletionRequest>, GatewayError> {
        self.begin_call()?;
        let Some(partner_id) = session.partner_id.clone() else {
            return Err(rejection(400, "BAD_REQUEST", "Tài khoản không thuộc đối tác nào"));
        };

        let mut requests = self.requests.write().await;
        let has_pending = requests
            .iter()
            .any(|request| request.partner_id == partner_id && request.status.is_pending());
        if has_pending {
            return Err(rejection(
                409,
                "CONFLICT",
                "Đối tác đã có yêu cầu hủy tài khoản đang chờ xử lý",
            ));
        }

        let now = self.clock.now();
        let request = DeletionRequest {
            request_id: DeletionRequestId(Uuid::new_v4().to_string()),
            partner_id,
            requested_by: session.user_id.clone(),
            requested_by_name: session.display_name.clone(),
            requested_at: now,
            cancellable_until: self.policy.cancellable_until(now),
            status: DeletionStatus::Pending,
            detailed_explanation: payload.detailed_explanation,
            reviewed_by: None,
            reviewed_by_name: None,
            reviewed_at: None,
            review_note: None,
        };
        requests.push(request.clone());
        Ok(Some(request))
    }

    async fn revoke(
        &self,
        session: &SessionContext,
        payload: RevokeDeletionRequest,
    ) -> Result<Option<DeletionRequest>, GatewayError> {
        self.begin_call()?;
        let now = self.clock.now();
        let mut requests = self.requests.write().await;
        let request = requests
            .iter_mut()
            .find(|request| request.request_id == payload.request_id)
            .ok_or_else(not_found)?;

        if !request.status.is_pending() {
            return Err(rejection(
                400,
                "BAD_REQUEST",
                "Yêu cầu không còn ở trạng thái chờ xử lý",
            ));
        }
        if !request.is_requested_by(&session.user_id) {
            return Err(rejection(403, "FORBIDDEN", "Bạn không có quyền thu hồi yêu cầu này"));
        }
        if now > request.cancellable_until {
            return Err(rejection(
                422,
                "UNPROCESSABLE_ENTITY",
                "Đã hết thời hạn thu hồi yêu cầu hủy tài khoản",
            ));
        }

        request.status = DeletionStatus::Cancelled;
        request.reviewed_by = Some(session.user_id.clone());
        request.reviewed_by_name = session.display_name.clone();
        request.reviewed_at = Some(now);
        request.review_note = Some(payload.review_note);
        Ok(Some(request.clone()))
    }

    async fn process(
        &self,
        session: &SessionContext,
        payload: ProcessDeletionRequest,
    ) -> Result<Option<DeletionRequest>, GatewayError> {
        self.begin_call()?;
        if !session.is_admin() {
            return Err(rejection(403, "FORBIDDEN", "Bạn không có quyền xử lý yêu cầu này"));
        }

        let now = self.clock.now();
        let mut requests = self.requests.write().await;
        let request = requests
            .iter_mut()
            .find(|request| request.request_id == payload.request_id)
            .ok_or_else(not_found)?;

        if !request.status.is_pending() {
            return Err(rejection(
                400,
                "BAD_REQUEST",
                "Yêu cầu không còn ở trạng thái chờ xử lý",
            ));
        }
        if now < request.cancellable_until {
            return Err(rejection(
                422,
                "UNPROCESSABLE_ENTITY",
                "Chưa hết thời hạn 7 ngày, chưa thể xử lý yêu cầu",
            ));
        }

        request.status = payload.status.resulting_status();
        request.reviewed_by = Some(session.user_id.clone());
        request.reviewed_by_name = session.display_name.clone();
        request.reviewed_at = Some(now);
        request.review_note = Some(payload.review_note);
        Ok(Some(request.clone()))
    }
}
