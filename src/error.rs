use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")] Database(#[from] sea_orm::DbErr),

    #[error("{message}")] Validation {
        field: Option<String>,
        message: String,
    },

    #[error("{0}")] Provider(String),

    #[error("{0}")] NotFound(String),

    #[error("{0}")] Unauthorized(String),

    #[error("Configuration error: {0}")] Config(String),

    #[error("Internal error: {0}")] Internal(String),
}

impl AppError {
    /// Validation failure attributed to a single request field.
    pub fn invalid_field(field: &str, message: impl Into<String>) -> Self {
        AppError::Validation {
            field: Some(field.to_string()),
            message: message.into(),
        }
    }

    /// Validation failure not tied to a single field.
    pub fn invalid(message: impl Into<String>) -> Self {
        AppError::Validation {
            field: None,
            message: message.into(),
        }
    }
}

#[derive(serde::Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(serde::Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl AppError {
    pub fn to_error_response(&self) -> ErrorResponse {
        let (code, message, field) = match self {
            // Never leak driver messages to clients
            AppError::Database(_) => ("DATABASE_ERROR", "A database error occurred".to_string(), None),
            AppError::Validation { field, message } =>
                ("VALIDATION_ERROR", message.clone(), field.clone()),
            AppError::Provider(msg) => ("PROVIDER_ERROR", msg.clone(), None),
            AppError::NotFound(msg) => ("NOT_FOUND", msg.clone(), None),
            AppError::Unauthorized(msg) => ("UNAUTHORIZED", msg.clone(), None),
            AppError::Config(msg) => ("CONFIG_ERROR", msg.clone(), None),
            AppError::Internal(_) => ("INTERNAL_ERROR", "Internal server error".to_string(), None),
        };

        ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                field,
            },
        }
    }

    pub fn status_code(&self) -> axum::http::StatusCode {
        match self {
            AppError::Validation { .. } | AppError::Provider(_) => {
                axum::http::StatusCode::BAD_REQUEST
            }
            AppError::NotFound(_) => axum::http::StatusCode::NOT_FOUND,
            AppError::Unauthorized(_) => axum::http::StatusCode::UNAUTHORIZED,
            AppError::Database(_) | AppError::Config(_) | AppError::Internal(_) => {
                axum::http::StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        }

        let response = self.to_error_response();
        (status, axum::Json(response)).into_response()
    }
}

impl From<axum::extract::rejection::JsonRejection> for AppError {
    fn from(rejection: axum::extract::rejection::JsonRejection) -> Self {
        use axum::extract::rejection::JsonRejection;

        match rejection {
            JsonRejection::JsonDataError(e) => data_error(&e.body_text()),
            JsonRejection::JsonSyntaxError(_) => AppError::invalid("Request body is not valid JSON"),
            JsonRejection::MissingJsonContentType(_) => {
                AppError::invalid("Expected request with `Content-Type: application/json`")
            }
            other => AppError::invalid(other.body_text()),
        }
    }
}

/// Serde reports the failing path as `field: reason`; keep the field when there is one.
fn data_error(text: &str) -> AppError {
    let detail = text
        .strip_prefix("Failed to deserialize the JSON body into the target type: ")
        .unwrap_or(text);

    match detail.split_once(": ") {
        Some((path, reason)) if is_field_path(path) => AppError::invalid_field(path, reason),
        _ => AppError::invalid(detail),
    }
}

fn is_field_path(path: &str) -> bool {
    !path.is_empty() &&
        path.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '[' | ']'))
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_data_error_keeps_field_path() {
        let err = data_error(
            "Failed to deserialize the JSON body into the target type: address: invalid type: integer `5`, expected a string at line 1 column 13"
        );
        match err {
            AppError::Validation { field, message } => {
                assert_eq!(field.as_deref(), Some("address"));
                assert!(message.starts_with("invalid type"));
            }
            other => panic!("unexpected error: {:?}", other),
        }

        let err = data_error("Failed to deserialize the JSON body into the target type: invalid type: map, expected a string");
        assert!(matches!(err, AppError::Validation { field: None, .. }));
    }

    #[test]
    fn test_validation_error_carries_field() {
        let err = AppError::invalid_field("address", "Ensure this field has at least 26 characters.");
        let body = err.to_error_response();

        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(body.error.code, "VALIDATION_ERROR");
        assert_eq!(body.error.field.as_deref(), Some("address"));
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(AppError::Provider("boom".into()).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::NotFound("gone".into()).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::Unauthorized("no".into()).status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AppError::Internal("oops".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_internal_message_is_hidden() {
        let body = AppError::Internal("secret detail".into()).to_error_response();
        assert_eq!(body.error.message, "Internal server error");
    }
}
