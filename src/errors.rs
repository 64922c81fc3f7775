use axum::{http::StatusCode, Json};
use serde::Serialize;

/// Rejected user input. The attempted mutation is discarded in full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("please fill in every field")]
    MissingFields,
    #[error("invalid numeric value")]
    InvalidNumber,
    #[error("invalid time")]
    InvalidTime,
    #[error("a reminder already exists at this time")]
    DuplicateTime,
    #[error("invalid profile")]
    InvalidProfile,
    #[error("this profile no longer exists")]
    UnknownProfile,
    #[error("this reminder no longer exists")]
    UnknownReminder,
}

/// Closed set of toast categories shown at the bottom of the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ToastKind {
    Updated,
    MissingFields,
    InvalidNumber,
    InvalidTime,
    DuplicateTime,
    InvalidProfile,
}

impl ValidationError {
    pub fn toast_kind(self) -> ToastKind {
        match self {
            ValidationError::MissingFields => ToastKind::MissingFields,
            ValidationError::InvalidNumber => ToastKind::InvalidNumber,
            ValidationError::InvalidTime => ToastKind::InvalidTime,
            ValidationError::DuplicateTime => ToastKind::DuplicateTime,
            ValidationError::InvalidProfile
            | ValidationError::UnknownProfile
            | ValidationError::UnknownReminder => ToastKind::InvalidProfile,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Toast {
    pub kind: ToastKind,
    pub message: String,
}

impl Toast {
    pub fn updated() -> Self {
        Self {
            kind: ToastKind::Updated,
            message: "saved".to_string(),
        }
    }
}

impl From<ValidationError> for Toast {
    fn from(err: ValidationError) -> Self {
        Self {
            kind: err.toast_kind(),
            message: err.to_string(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("{status}: {message}")]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
    pub toast: Option<Toast>,
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
            toast: None,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
            toast: None,
        }
    }

    pub fn internal(err: impl std::error::Error) -> Self {
        Self::internal_message(err.to_string())
    }

    pub fn internal_message(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
            toast: None,
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::internal(err)
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        tracing::debug!(%err, "input rejected");
        let status = match err {
            ValidationError::UnknownProfile | ValidationError::UnknownReminder => {
                StatusCode::NOT_FOUND
            }
            _ => StatusCode::BAD_REQUEST,
        };
        Self {
            status,
            message: err.to_string(),
            toast: Some(err.into()),
        }
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        match self.toast {
            Some(toast) => (self.status, Json(toast)).into_response(),
            None => (self.status, self.message).into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_map_to_toasts() {
        let toast: Toast = ValidationError::DuplicateTime.into();
        assert_eq!(toast.kind, ToastKind::DuplicateTime);
        assert_eq!(toast.message, "a reminder already exists at this time");
    }

    #[test]
    fn missing_entities_are_not_found() {
        let err: AppError = ValidationError::UnknownReminder.into();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
        assert!(err.toast.is_some());
    }
}
