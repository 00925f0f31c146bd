//! Time-window rules of the deletion-request lifecycle.
//!
//! A pending request first sits in its revocable window
//! `[requested_at, cancellable_until]`, during which only the filing partner
//! may revoke it. From `cancellable_until` on, only an admin may approve or
//! reject it. Both gates are open at the exact instant
//! `now == cancellable_until`; the backend arbitrates that tie.
//!
//! Nothing here is stored: every value is re-derived from the clock.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::deletion::{DeletionRequest, DeletionStatus};

pub const CANCELLABLE_WINDOW_DAYS: i64 = 7;
pub const WIND_DOWN_DAYS: i64 = 30;

const DAY_MILLIS: i64 = 24 * 60 * 60 * 1000;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowPolicy {
    pub cancellable_window_days: i64,
    pub wind_down_days: i64,
}

impl Default for WindowPolicy {
    fn default() -> Self {
        Self { cancellable_window_days: CANCELLABLE_WINDOW_DAYS, wind_down_days: WIND_DOWN_DAYS }
    }
}

impl WindowPolicy {
    pub fn cancellable_until(&self, requested_at: DateTime<Utc>) -> DateTime<Utc> {
        requested_at + Duration::days(self.cancellable_window_days)
    }

    pub fn wind_down_ends_at(&self, request: &DeletionRequest) -> Option<DateTime<Utc>> {
        match (&request.status, request.reviewed_at) {
            (DeletionStatus::Approved, Some(reviewed_at)) => {
                Some(reviewed_at + Duration::days(self.wind_down_days))
            }
            _ => None,
        }
    }
}

pub fn can_revoke(request: &DeletionRequest, now: DateTime<Utc>) -> bool {
    request.status.is_pending() && now <= request.cancellable_until
}

pub fn can_process(request: &DeletionRequest, now: DateTime<Utc>) -> bool {
    request.status.is_pending() && now >= request.cancellable_until
}

/// Whole days left in the revocable window, rounded up. Display only.
pub fn days_remaining(request: &DeletionRequest, now: DateTime<Utc>) -> u32 {
    ceil_days_between(now, request.cancellable_until)
}

fn ceil_days_between(now: DateTime<Utc>, until: DateTime<Utc>) -> u32 {
    let millis = (until - now).num_milliseconds();
    if millis <= 0 {
        return 0;
    }
    let days = (millis + DAY_MILLIS - 1) / DAY_MILLIS;
    u32::try_from(days).unwrap_or(u32::MAX)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStage {
    RevocableWindow,
    AwaitingReview,
    WindDown,
    Closed,
}

impl WorkflowStage {
    pub fn of(request: &DeletionRequest, now: DateTime<Utc>, policy: &WindowPolicy) -> Self {
        match request.status {
            DeletionStatus::Pending if now < request.cancellable_until => Self::RevocableWindow,
            DeletionStatus::Pending => Self::AwaitingReview,
            DeletionStatus::Approved => match policy.wind_down_ends_at(request) {
                Some(ends_at) if now < ends_at => Self::WindDown,
                Some(_) => Self::Closed,
                None => Self::WindDown,
            },
            _ => Self::Closed,
        }
    }

    /// Position on the four-step progress display.
    pub fn step_index(&self) -> usize {
        match self {
            Self::RevocableWindow => 0,
            Self::AwaitingReview => 1,
            Self::WindDown => 2,
            Self::Closed => 3,
        }
    }
}

/// Presentation-ready view of where a request stands right now.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DeletionWindow {
    pub stage: WorkflowStage,
    pub step_index: usize,
    pub can_revoke: bool,
    pub can_process: bool,
    pub days_remaining: u32,
    pub wind_down_ends_at: Option<DateTime<Utc>>,
    pub wind_down_days_remaining: Option<u32>,
}

impl DeletionWindow {
    pub fn evaluate(request: &DeletionRequest, now: DateTime<Utc>, policy: &WindowPolicy) -> Self {
        let stage = WorkflowStage::of(request, now, policy);
        let wind_down_ends_at = policy.wind_down_ends_at(request);

        Self {
            stage,
            step_index: stage.step_index(),
            can_revoke: can_revoke(request, now),
            can_process: can_process(request, now),
            days_remaining: days_remaining(request, now),
            wind_down_ends_at,
            wind_down_days_remaining: wind_down_ends_at
                .map(|ends_at| ceil_days_between(now, ends_at)),
        }
    }
}
