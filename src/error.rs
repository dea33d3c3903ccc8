use axum::{http::StatusCode, response::{IntoResponse, Response}, Json};
use serde::Serialize;
use thiserror::Error;

/// Failures of a single faculty or student action. None of them are fatal;
/// the caller reports them and the service keeps accepting requests.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExamError {
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("invalid exam code")]
    InvalidCode,
    #[error("exam session already started")]
    AlreadyStarted,
    #[error("exam is not in progress")]
    NotInProgress,
    #[error("exam session not found")]
    SessionNotFound,
    #[error("question {index} is out of range (exam has {total})")]
    QuestionOutOfRange { index: usize, total: usize },
    #[error("exam duration must be between {min} and {max} minutes")]
    InvalidTimer { min: u32, max: u32 },
}

impl ExamError {
    pub fn status(&self) -> StatusCode {
        match self {
            ExamError::InvalidCredentials | ExamError::InvalidCode => StatusCode::UNAUTHORIZED,
            ExamError::AlreadyStarted | ExamError::NotInProgress => StatusCode::CONFLICT,
            ExamError::SessionNotFound => StatusCode::NOT_FOUND,
            ExamError::QuestionOutOfRange { .. } | ExamError::InvalidTimer { .. } => StatusCode::BAD_REQUEST,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ExamError::InvalidCredentials => "INVALID_CREDENTIALS",
            ExamError::InvalidCode => "INVALID_EXAM_CODE",
            ExamError::AlreadyStarted => "ALREADY_STARTED",
            ExamError::NotInProgress => "EXAM_NOT_IN_PROGRESS",
            ExamError::SessionNotFound => "NOT_FOUND",
            ExamError::QuestionOutOfRange { .. } | ExamError::InvalidTimer { .. } => "VALIDATION_ERROR",
        }
    }

    pub fn into_app_error(self, request_id: impl Into<String>) -> AppError {
        AppError::new(self.status(), self.code(), self.to_string(), request_id)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorDetail {
    pub field: String,
    pub issue: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub error: ErrorPayload,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorPayload {
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<ErrorDetail>,
    pub request_id: String,
}

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
    pub details: Vec<ErrorDetail>,
    pub request_id: String,
}

impl AppError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>, request_id: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            details: Vec::new(),
            request_id: request_id.into(),
        }
    }

    pub fn with_details(mut self, details: Vec<ErrorDetail>) -> Self {
        self.details = details;
        self
    }

    pub fn validation(errors: validator::ValidationErrors, request_id: impl Into<String>) -> Self {
        let details = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| ErrorDetail {
                    field: field.to_string(),
                    issue: e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| e.code.to_string()),
                })
            })
            .collect();
        Self::new(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", "request validation failed", request_id)
            .with_details(details)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let payload = ErrorBody {
            error: ErrorPayload {
                code: self.code,
                message: self.message,
                details: self.details,
                request_id: self.request_id,
            },
        };
        (self.status, Json(payload)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exam_errors_map_to_statuses() {
        let err = ExamError::InvalidCode.into_app_error("req-1");
        assert_eq!(err.status, StatusCode::UNAUTHORIZED);
        assert_eq!(err.code, "INVALID_EXAM_CODE");
        assert_eq!(err.request_id, "req-1");
        assert_eq!(ExamError::NotInProgress.status(), StatusCode::CONFLICT);
        assert_eq!(
            ExamError::QuestionOutOfRange { index: 4, total: 2 }.to_string(),
            "question 4 is out of range (exam has 2)"
        );
    }
}
