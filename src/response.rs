use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

/// ApiResponse
///
/// Success envelope shared by every handler: `{status, data}` for payloads and
/// `{status, message}` for plain acknowledgements. Failures use the matching
/// `{status, error}` shape produced by `AppError`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    /// 200 with a payload.
    pub fn ok(data: T) -> Self {
        Self {
            status: StatusCode::OK.as_u16(),
            data: Some(data),
            message: None,
        }
    }

    /// 201 with the newly created resource.
    pub fn created(data: T) -> Self {
        Self {
            status: StatusCode::CREATED.as_u16(),
            data: Some(data),
            message: None,
        }
    }

    /// 200 with both a payload and an acknowledgement.
    pub fn with_message(data: T, msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::OK.as_u16(),
            data: Some(data),
            message: Some(msg.into()),
        }
    }

    /// Unwraps the payload, mainly for handler tests.
    pub fn into_data(self) -> Option<T> {
        self.data
    }
}

impl ApiResponse<()> {
    /// 200 with a human readable acknowledgement and no payload.
    pub fn message(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::OK.as_u16(),
            data: None,
            message: Some(msg.into()),
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::OK);
        (status, Json(self)).into_response()
    }
}
