use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

use interface::BrokerError;

use crate::record::RecordError;

/// API 핸들러 에러
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Broker error: {0}")]
    Broker(#[from] BrokerError),

    #[error("Record error: {0}")]
    Record(#[from] RecordError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Broker(_) => StatusCode::BAD_GATEWAY,
            ApiError::Record(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        error!("API 요청 실패 ({}): {}", status, self);

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
