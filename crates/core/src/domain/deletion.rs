use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeletionRequestId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PartnerId(pub String);

impl fmt::Display for DeletionRequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for PartnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle state of a deletion request as reported by the backend.
///
/// Values the backend adds later are kept verbatim in `Unrecognized` so that
/// listings never fail to decode because of a new status.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DeletionStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
    Completed,
    Unrecognized(String),
}

impl DeletionStatus {
    pub const KNOWN: [DeletionStatus; 5] = [
        DeletionStatus::Pending,
        DeletionStatus::Approved,
        DeletionStatus::Rejected,
        DeletionStatus::Cancelled,
        DeletionStatus::Completed,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Cancelled => "cancelled",
            Self::Completed => "completed",
            Self::Unrecognized(raw) => raw.as_str(),
        }
    }

    /// Parses a status filter. Only the five lifecycle states are accepted.
    pub fn parse_known(raw: &str) -> Option<Self> {
        match Self::from(raw.trim().to_ascii_lowercase()) {
            Self::Unrecognized(_) => None,
            known => Some(known),
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }
}

impl From<String> for DeletionStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "pending" => Self::Pending,
            "approved" => Self::Approved,
            "rejected" => Self::Rejected,
            "cancelled" => Self::Cancelled,
            "completed" => Self::Completed,
            _ => Self::Unrecognized(value),
        }
    }
}

impl From<DeletionStatus> for String {
    fn from(value: DeletionStatus) -> Self {
        match value {
            DeletionStatus::Unrecognized(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for DeletionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome an admin may record on a pending request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewDecision {
    Approved,
    Rejected,
}

impl ReviewDecision {
    /// Exact match only: `approved` or `rejected`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    pub fn resulting_status(&self) -> DeletionStatus {
        match self {
            Self::Approved => DeletionStatus::Approved,
            Self::Rejected => DeletionStatus::Rejected,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletionRequest {
    pub request_id: DeletionRequestId,
    pub partner_id: PartnerId,
    pub requested_by: String,
    #[serde(default)]
    pub requested_by_name: Option<String>,
    pub requested_at: DateTime<Utc>,
    pub cancellable_until: DateTime<Utc>,
    pub status: DeletionStatus,
    #[serde(default)]
    pub detailed_explanation: String,
    #[serde(default)]
    pub reviewed_by: Option<String>,
    #[serde(default)]
    pub reviewed_by_name: Option<String>,
    #[serde(default)]
    pub reviewed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub review_note: Option<String>,
}

impl DeletionRequest {
    pub fn is_requested_by(&self, user_id: &str) -> bool {
        self.requested_by == user_id
    }
}
