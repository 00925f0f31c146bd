use crate::domain::deletion::DeletionStatus;
use crate::i18n::{message, Locale, MessageKey};

pub const DEFAULT_STATUS_COLOR: &str = "default";

pub fn status_label(status: &DeletionStatus, locale: Locale) -> String {
    let key = match status {
        DeletionStatus::Pending => MessageKey::StatusPending,
        DeletionStatus::Approved => MessageKey::StatusApproved,
        DeletionStatus::Rejected => MessageKey::StatusRejected,
        DeletionStatus::Cancelled => MessageKey::StatusCancelled,
        DeletionStatus::Completed => MessageKey::StatusCompleted,
        DeletionStatus::Unrecognized(raw) => return raw.clone(),
    };
    message(locale, key).to_string()
}

pub fn status_color(status: &DeletionStatus) -> &'static str {
    match status {
        DeletionStatus::Pending => "orange",
        DeletionStatus::Approved => "green",
        DeletionStatus::Rejected => "red",
        DeletionStatus::Cancelled => DEFAULT_STATUS_COLOR,
        DeletionStatus::Completed => "blue",
        DeletionStatus::Unrecognized(_) => DEFAULT_STATUS_COLOR,
    }
}
