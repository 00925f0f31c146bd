use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Locale {
    #[default]
    Vi,
    En,
}

impl std::str::FromStr for Locale {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "vi" | "vi-vn" => Ok(Self::Vi),
            "en" | "en-us" => Ok(Self::En),
            other => Err(format!("unsupported locale `{other}` (expected vi|en)")),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MessageKey {
    StatusPending,
    StatusApproved,
    StatusRejected,
    StatusCancelled,
    StatusCompleted,
    FetchFailed,
    CreateSucceeded,
    RevokeSucceeded,
    ApproveSucceeded,
    RejectSucceeded,
    MissingRequestId,
    InvalidDecision,
    MissingExplanation,
    MissingPartner,
    PendingRequestExists,
    RevokeWindowClosed,
    ReviewWindowOpen,
    NotRequester,
    AdminOnly,
    PermissionDenied,
    SessionExpired,
    RequestNotFound,
    RequestNotPending,
    InvalidRequestData,
    NetworkUnavailable,
    UnexpectedResponse,
}

pub fn message(locale: Locale, key: MessageKey) -> &'static str {
    match locale {
        Locale::Vi => vi(key),
        Locale::En => en(key),
    }
}

/// Fallback for server failures no specific message covers.
pub fn http_failure(locale: Locale, status: u16) -> String {
    match locale {
        Locale::Vi => format!("Đã xảy ra lỗi khi xử lý yêu cầu (HTTP {status})"),
        Locale::En => format!("The request failed (HTTP {status})"),
    }
}

fn vi(key: MessageKey) -> &'static str {
    use MessageKey::*;
    match key {
        StatusPending => "Đang chờ xử lý",
        StatusApproved => "Đã chấp thuận",
        StatusRejected => "Đã từ chối",
        StatusCancelled => "Đã thu hồi",
        StatusCompleted => "Hoàn tất",
        FetchFailed => "Không thể tải danh sách yêu cầu hủy tài khoản",
        CreateSucceeded => "Đã gửi yêu cầu hủy tài khoản đối tác",
        RevokeSucceeded => "Đã thu hồi yêu cầu hủy tài khoản",
        ApproveSucceeded => {
            "Đã chấp thuận yêu cầu hủy tài khoản, đối tác có 30 ngày để hoàn tất nghĩa vụ"
        }
        RejectSucceeded => "Đã từ chối yêu cầu hủy tài khoản",
        MissingRequestId => "Thiếu mã yêu cầu hủy tài khoản",
        InvalidDecision => "Quyết định không hợp lệ, chỉ chấp nhận approved hoặc rejected",
        MissingExplanation => "Vui lòng nhập lý do hủy tài khoản",
        MissingPartner => "Không xác định được đối tác của phiên đăng nhập hiện tại",
        PendingRequestExists => "Đối tác đã có một yêu cầu hủy tài khoản đang chờ xử lý",
        RevokeWindowClosed => "Đã hết thời hạn 7 ngày để thu hồi yêu cầu",
        ReviewWindowOpen => "Chưa hết thời hạn 7 ngày, chưa thể xử lý yêu cầu",
        NotRequester => "Chỉ người tạo yêu cầu mới có thể thu hồi yêu cầu này",
        AdminOnly => "Chỉ quản trị viên mới có thể xử lý yêu cầu hủy tài khoản",
        PermissionDenied => "Bạn không có quyền thực hiện thao tác này",
        SessionExpired => "Phiên đăng nhập đã hết hạn, vui lòng đăng nhập lại",
        RequestNotFound => "Không tìm thấy yêu cầu hủy tài khoản",
        RequestNotPending => "Yêu cầu không còn ở trạng thái chờ xử lý",
        InvalidRequestData => "Dữ liệu gửi lên không hợp lệ",
        NetworkUnavailable => "Không thể kết nối tới máy chủ, vui lòng kiểm tra kết nối mạng",
        UnexpectedResponse => "Phản hồi từ máy chủ không hợp lệ",
    }
}

fn en(key: MessageKey) -> &'static str {
    use MessageKey::*;
    match key {
        StatusPending => "Pending",
        StatusApproved => "Approved",
        StatusRejected => "Rejected",
        StatusCancelled => "Cancelled",
        StatusCompleted => "Completed",
        FetchFailed => "Could not load partner deletion requests",
        CreateSucceeded => "Partner deletion request submitted",
        RevokeSucceeded => "Deletion request revoked",
        ApproveSucceeded => {
            "Deletion request approved; the partner has 30 days to settle outstanding obligations"
        }
        RejectSucceeded => "Deletion request rejected",
        MissingRequestId => "A deletion request id is required",
        InvalidDecision => "Invalid decision; only approved or rejected are accepted",
        MissingExplanation => "Please provide a reason for the deletion request",
        MissingPartner => "The current session is not associated with a partner",
        PendingRequestExists => "This partner already has a pending deletion request",
        RevokeWindowClosed => "The 7-day revocation window has closed",
        ReviewWindowOpen => {
            "The 7-day revocation window is still open; the request cannot be processed yet"
        }
        NotRequester => "Only the partner who filed this request can revoke it",
        AdminOnly => "Only administrators can process deletion requests",
        PermissionDenied => "You do not have permission to perform this action",
        SessionExpired => "Your session has expired, please sign in again",
        RequestNotFound => "Deletion request not found",
        RequestNotPending => "The request is no longer pending",
        InvalidRequestData => "The submitted data is invalid",
        NetworkUnavailable => "Cannot reach the server, please check your network connection",
        UnexpectedResponse => "The server returned an unexpected response",
    }
}
