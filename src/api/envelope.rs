//! Response envelope for the `/api/v1` surface.
//!
//! Success: `{ "data": T, "meta": { "timestamp", "version", "sessionId"? } }`.
//! Failure: `{ "error": { "code", "message" }, "meta": { ... } }`.
//!
//! Responses about a single session carry its id in `meta.sessionId`, and
//! failures use a closed set of [`ErrorCode`]s so dashboards can branch on
//! the code instead of the message.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::pipeline::RegistryError;
use crate::types::SessionId;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMeta {
    pub timestamp: DateTime<Utc>,
    pub version: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<SessionId>,
}

impl ResponseMeta {
    fn now(session_id: Option<SessionId>) -> Self {
        Self {
            timestamp: Utc::now(),
            version: env!("CARGO_PKG_VERSION"),
            session_id,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

impl<T: Serialize> ApiResponse<T> {
    fn build(status: StatusCode, session_id: Option<SessionId>, data: T) -> Response {
        let body = Self {
            data,
            meta: ResponseMeta::now(session_id),
        };
        (status, axum::Json(body)).into_response()
    }

    pub fn ok(data: T) -> Response {
        Self::build(StatusCode::OK, None, data)
    }

    /// 200 with the session named in `meta`.
    pub fn for_session(session_id: SessionId, data: T) -> Response {
        Self::build(StatusCode::OK, Some(session_id), data)
    }

    /// 201 for a newly started session, with a `Location` pointing at it.
    pub fn created(session_id: SessionId, data: T) -> Response {
        let mut response = Self::build(StatusCode::CREATED, Some(session_id), data);
        if let Ok(location) = HeaderValue::from_str(&format!("/api/v1/sessions/{session_id}")) {
            response.headers_mut().insert(header::LOCATION, location);
        }
        response
    }
}

/// Machine-readable failure kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    BadRequest,
    InvalidSessionId,
    SessionNotFound,
    ConnectionLimit,
    ShuttingDown,
    Internal,
}

impl ErrorCode {
    pub fn status(self) -> StatusCode {
        match self {
            ErrorCode::BadRequest | ErrorCode::InvalidSessionId => StatusCode::BAD_REQUEST,
            ErrorCode::SessionNotFound => StatusCode::NOT_FOUND,
            ErrorCode::ConnectionLimit | ErrorCode::ShuttingDown => StatusCode::SERVICE_UNAVAILABLE,
            ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorDetail {
    code: ErrorCode,
    message: String,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: ErrorDetail,
    meta: ResponseMeta,
}

/// A failed API call. Handlers return `Result<Response, ApiError>`.
#[derive(Debug)]
pub struct ApiError {
    code: ErrorCode,
    message: String,
    session_id: Option<SessionId>,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            session_id: None,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadRequest, message)
    }

    pub fn invalid_session_id(raw: &str) -> Self {
        Self::new(ErrorCode::InvalidSessionId, format!("Invalid session id: {raw}"))
    }

    pub fn session_not_found(session_id: SessionId) -> Self {
        Self {
            session_id: Some(session_id),
            ..Self::new(ErrorCode::SessionNotFound, format!("Session {session_id} not found"))
        }
    }

    pub fn connection_limit(max: usize) -> Self {
        Self::new(ErrorCode::ConnectionLimit, format!("Connection limit of {max} reached"))
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }
}

impl From<RegistryError> for ApiError {
    fn from(e: RegistryError) -> Self {
        match e {
            RegistryError::NotFound(id) => Self::session_not_found(id),
            RegistryError::ShuttingDown => Self::new(ErrorCode::ShuttingDown, "Server is shutting down"),
            other => Self::new(ErrorCode::Internal, other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
            meta: ResponseMeta::now(self.session_id),
        };
        (self.code.status(), axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body(resp: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_ok_response_has_no_session_meta() {
        let resp = ApiResponse::ok(serde_json::json!({"threshold": 0.7}));
        assert_eq!(resp.status(), StatusCode::OK);

        let v = body(resp).await;
        assert_eq!(v["data"]["threshold"], 0.7);
        assert_eq!(v["meta"]["version"], env!("CARGO_PKG_VERSION"));
        assert!(v["meta"].get("sessionId").is_none());
    }

    #[tokio::test]
    async fn test_created_points_at_session() {
        let id = SessionId::new();
        let resp = ApiResponse::created(id, "started");
        assert_eq!(resp.status(), StatusCode::CREATED);
        assert_eq!(
            resp.headers()[header::LOCATION].to_str().unwrap(),
            format!("/api/v1/sessions/{id}")
        );
        assert_eq!(body(resp).await["meta"]["sessionId"], id.to_string());
    }

    #[tokio::test]
    async fn test_registry_errors_map_to_codes() {
        let id = SessionId::new();
        let resp = ApiError::from(RegistryError::NotFound(id)).into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let v = body(resp).await;
        assert_eq!(v["error"]["code"], "SESSION_NOT_FOUND");
        assert_eq!(v["meta"]["sessionId"], id.to_string());

        let shutting_down = ApiError::from(RegistryError::ShuttingDown);
        assert_eq!(shutting_down.code(), ErrorCode::ShuttingDown);
        assert_eq!(shutting_down.into_response().status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_codes_map_to_status() {
        assert_eq!(ErrorCode::InvalidSessionId.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::ConnectionLimit.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(ErrorCode::Internal.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
