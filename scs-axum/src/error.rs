use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use scs_core::errors::MissionError;
use serde_json::json;

#[derive(Debug)]
pub struct ApiError {
    pub error: anyhow::Error,
    /// Echoed in the body so clients can quote it when reporting a failure.
    pub request_id: Option<String>,
}

impl ApiError {
    pub fn with_request_id(mut self, request_id: Option<String>) -> Self {
        self.request_id = request_id;
        self
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(error: anyhow::Error) -> Self {
        Self {
            error,
            request_id: None,
        }
    }
}

impl From<MissionError> for ApiError {
    fn from(e: MissionError) -> Self {
        e.into_anyhow().into()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = MissionError::kind_of(&self.error);
        let request_id = self.request_id.as_deref().unwrap_or_default();
        if kind.status_code() >= 500 {
            tracing::error!(
                error = %format!("{:#}", self.error),
                kind = kind.name(),
                request_id,
                "request failed"
            );
        } else {
            tracing::debug!(error = %self.error, kind = kind.name(), request_id, "request rejected");
        }

        // Structured errors keep their kind even behind anyhow context layers;
        // anything else becomes an InternalError. Sources never leave the server.
        let safe = MissionError::normalize(self.error).sanitize_for_client();
        let status =
            StatusCode::from_u16(safe.code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let mut body = json!({
            "error": safe.to_json(),
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });
        if let Some(request_id) = self.request_id {
            body["request_id"] = json!(request_id);
        }
        (status, Json(body)).into_response()
    }
}
