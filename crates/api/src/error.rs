use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use subforge_transcription::JobError;
use tracing::error;

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Internal(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "internal", msg),
        };

        let body = ErrorResponse {
            error: error_type.to_string(),
            message,
        };

        (status, Json(body)).into_response()
    }
}

impl From<JobError> for ApiError {
    fn from(err: JobError) -> Self {
        match err {
            JobError::NoValidFiles => ApiError::BadRequest(err.to_string()),
            JobError::InvalidInput(msg) => ApiError::BadRequest(msg),
            JobError::SessionNotFound => ApiError::NotFound(err.to_string()),
            JobError::Configuration(msg) => ApiError::Internal(msg),
            JobError::Engine(e) => {
                error!(error = ?e, "Engine failure");
                ApiError::Internal(e.to_string())
            }
            JobError::Io(e) => ApiError::Internal(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_errors_map_to_status_codes() {
        let status = |err: JobError| ApiError::from(err).into_response().status();
        assert_eq!(status(JobError::NoValidFiles), StatusCode::BAD_REQUEST);
        assert_eq!(status(JobError::InvalidInput("bad".into())), StatusCode::BAD_REQUEST);
        assert_eq!(status(JobError::SessionNotFound), StatusCode::NOT_FOUND);
        assert_eq!(
            status(JobError::Configuration("FFmpeg not found in PATH".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status(JobError::Engine(anyhow::anyhow!("decoder crashed"))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
