use axum::Json;
use axum::http::StatusCode;
use serde::Serialize;
use uuid::Uuid;

use crate::toast::Toast;

/// Canonical JSON payload for error responses. The client shows it as a toast.
#[derive(Debug, Serialize, Clone)]
pub struct ApiMessage {
    pub title: String,
    pub message: String,
}

impl ApiMessage {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
        }
    }
}

impl From<Toast> for ApiMessage {
    fn from(toast: Toast) -> Self {
        Self::new(toast.title, toast.description)
    }
}

/// Returned when a verification flow is opened.
#[derive(Debug, Serialize, Clone)]
pub struct FlowSubmission {
    pub flow_id: Uuid,
    pub status_url: String,
}

impl FlowSubmission {
    pub fn new(flow_id: Uuid) -> Self {
        Self {
            flow_id,
            status_url: format!("/api/verifications/{flow_id}"),
        }
    }
}

/// Helper for controllers that need to return `(StatusCode, Json<ApiMessage>)`.
pub fn json_error(
    status: StatusCode,
    title: impl Into<String>,
    message: impl Into<String>,
) -> (StatusCode, Json<ApiMessage>) {
    (status, Json(ApiMessage::new(title, message)))
}

pub fn json_toast(status: StatusCode, toast: Toast) -> (StatusCode, Json<ApiMessage>) {
    (status, Json(ApiMessage::from(toast)))
}
