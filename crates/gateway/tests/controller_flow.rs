use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};

use harvestdesk_core::i18n::message;
use harvestdesk_core::{
    ControllerSettings, DeletionStatus, DeletionWorkflowController, FixedClock, GatewayError,
    Locale, MessageKey, PartnerId, SessionContext, WindowPolicy, WorkflowError, WorkflowStage,
};
use harvestdesk_gateway::InMemoryDeletionRequestGateway;

struct Harness {
    gateway: Arc<InMemoryDeletionRequestGateway>,
    clock: Arc<FixedClock>,
    controller: DeletionWorkflowController,
}

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 8, 30, 0).single().expect("valid timestamp")
}

fn harness() -> Harness {
    let clock = Arc::new(FixedClock::new(start()));
    let gateway =
        Arc::new(InMemoryDeletionRequestGateway::new(clock.clone(), WindowPolicy::default()));
    let controller = DeletionWorkflowController::new(
        gateway.clone(),
        clock.clone(),
        ControllerSettings { locale: Locale::En, ..ControllerSettings::default() },
    );
    Harness { gateway, clock, controller }
}

fn owner() -> SessionContext {
    SessionContext::partner("user-1", "partner-1")
}

#[tokio::test]
async fn created_request_is_listed_as_pending_with_seven_day_window() {
    let harness = harness();

    let created = harness.controller.create_request(&owner(), "  selling the business  ").await;
    assert!(created.success);
    assert_eq!(created.message.as_deref(), Some(message(Locale::En, MessageKey::CreateSucceeded)));

    let listed = harness.controller.fetch_requests_for_partner(&owner(), None, None).await;
    let requests = listed.data.expect("listing data");
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(request.status, DeletionStatus::Pending);
    assert_eq!(request.detailed_explanation, "selling the business");
    assert_eq!(request.cancellable_until, request.requested_at + Duration::days(7));
    assert_eq!(harness.controller.state().await.requests, requests);
}

#[tokio::test]
async fn second_request_while_pending_is_a_conflict() {
    let harness = harness();
    assert!(harness.controller.create_request(&owner(), "first").await.success);

    let second = harness.controller.create_request(&owner(), "second").await;

    assert!(!second.success);
    assert_eq!(second.error, Some(WorkflowError::Conflict));
    assert_eq!(
        second.message.as_deref(),
        Some(message(Locale::En, MessageKey::PendingRequestExists))
    );
    let pending = harness
        .controller
        .state()
        .await
        .requests
        .into_iter()
        .filter(|request| request.status.is_pending())
        .count();
    assert_eq!(pending, 1);
}

#[tokio::test]
async fn partner_without_requests_gets_an_empty_success() {
    let harness = harness();

    let result = harness
        .controller
        .fetch_requests_for_partner(&owner(), Some(&PartnerId("partner-404".to_string())), None)
        .await;

    assert!(result.success);
    assert_eq!(result.data, Some(Vec::new()));
    assert!(result.message.is_none());
    assert_eq!(harness.gateway.call_count(), 1);
}

#[tokio::test]
async fn revoke_without_id_never_reaches_the_backend() {
    let harness = harness();

    let result = harness.controller.revoke_request(&owner(), None, Some("no longer needed")).await;

    assert!(!result.success);
    assert_eq!(result.message.as_deref(), Some(message(Locale::En, MessageKey::MissingRequestId)));
    assert_eq!(harness.gateway.call_count(), 0);
}

#[tokio::test]
async fn window_gates_follow_the_clock() {
    let harness = harness();
    harness.controller.create_request(&owner(), "closing").await;
    let request = harness.controller.state().await.requests[0].clone();

    harness.clock.advance(Duration::days(3));
    assert!(harness.controller.can_revoke(&request));
    assert!(!harness.controller.can_process(&request));
    assert_eq!(harness.controller.days_remaining(&request), 4);
    assert_eq!(harness.controller.window(&request).stage, WorkflowStage::RevocableWindow);

    harness.clock.set(request.cancellable_until + Duration::seconds(1));
    assert!(!harness.controller.can_revoke(&request));
    assert!(harness.controller.can_process(&request));
    assert_eq!(harness.controller.days_remaining(&request), 0);
    assert_eq!(harness.controller.window(&request).stage, WorkflowStage::AwaitingReview);
}

#[tokio::test]
async fn owner_revokes_inside_the_window() {
    let harness = harness();
    harness.controller.create_request(&owner(), "closing").await;
    let id = harness.controller.state().await.requests[0].request_id.0.clone();

    harness.clock.advance(Duration::days(2));
    let result = harness.controller.revoke_request(&owner(), Some(&id), Some("resolved")).await;

    assert!(result.success);
    let state = harness.controller.state().await;
    assert_eq!(state.requests[0].status, DeletionStatus::Cancelled);
    assert_eq!(state.requests[0].review_note.as_deref(), Some("resolved"));
    assert_eq!(harness.controller.status_color(&state.requests[0].status), "default");
}

#[tokio::test]
async fn admin_approves_after_the_window_and_wind_down_follows() {
    let harness = harness();
    let admin = SessionContext::admin("admin-1");
    harness.controller.create_request(&owner(), "closing").await;

    harness.clock.advance(Duration::days(8));
    let listing = harness.controller.fetch_all_requests().await;
    let id = listing.data.expect("listing")[0].request_id.0.clone();

    let approved = harness
        .controller
        .admin_process_request(&admin, Some(&id), "approved", Some("verified"))
        .await;
    assert!(approved.success);
    assert_eq!(
        approved.message.as_deref(),
        Some(message(Locale::En, MessageKey::ApproveSucceeded))
    );

    let request = harness.controller.state().await.requests[0].clone();
    assert_eq!(request.status, DeletionStatus::Approved);
    assert_eq!(request.reviewed_by.as_deref(), Some("admin-1"));
    let window = harness.controller.window(&request);
    assert_eq!(window.stage, WorkflowStage::WindDown);
    assert_eq!(window.wind_down_days_remaining, Some(30));

    let again = harness.controller.admin_process_request(&admin, Some(&id), "rejected", None).await;
    assert!(matches!(again.error, Some(WorkflowError::NotPending(_))));

    harness.clock.advance(Duration::days(30));
    assert_eq!(harness.gateway.complete_elapsed_wind_downs().await, 1);
    harness.controller.fetch_all_requests().await;
    let completed = harness.controller.state().await.requests[0].clone();
    assert_eq!(completed.status, DeletionStatus::Completed);
    assert_eq!(harness.controller.window(&completed).stage, WorkflowStage::Closed);
}

#[tokio::test]
async fn backend_outage_clears_the_listing() {
    let harness = harness();
    harness.controller.create_request(&owner(), "closing").await;
    assert_eq!(harness.controller.state().await.requests.len(), 1);

    harness.gateway.fail_next(GatewayError::Network("connection refused".to_string()));
    let result = harness.controller.fetch_requests_for_partner(&owner(), None, None).await;

    assert!(!result.success);
    assert!(matches!(result.error, Some(WorkflowError::Network(_))));
    let state = harness.controller.state().await;
    assert!(state.requests.is_empty());
    assert!(state
        .error
        .as_deref()
        .is_some_and(|text| text.starts_with(message(Locale::En, MessageKey::FetchFailed))));
}
