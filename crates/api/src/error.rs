use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use domain::services::{CalendarSyncError, EmailError, SubsidyError};
use serde::Serialize;
use thiserror::Error;

use crate::services::google::GoogleApiError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// No usable provider credentials for the user.
    #[error("Authentication required: {0}")]
    AuthRequired(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation error: {0}")]
    Validation(String),

    /// Request body failed field validation.
    #[error("Validation error: {message}")]
    InvalidFields {
        message: String,
        details: Vec<ValidationDetail>,
    },

    /// An external provider failed or returned an error.
    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Vec<ValidationDetail>>,
}

#[derive(Debug, Serialize)]
pub struct ValidationDetail {
    pub field: String,
    pub message: String,
}

impl ApiError {
    fn parts(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "unauthorized"),
            ApiError::AuthRequired(_) => (StatusCode::UNAUTHORIZED, "auth_required"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            ApiError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
            ApiError::Validation(_) | ApiError::InvalidFields { .. } => {
                (StatusCode::BAD_REQUEST, "validation_error")
            }
            ApiError::Provider(_) => (StatusCode::BAD_GATEWAY, "provider_error"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code) = self.parts();
        let (message, details) = match self {
            ApiError::InvalidFields { message, details } => (message, Some(details)),
            other => (other.into_message(), None),
        };

        let body = ErrorBody {
            error: error_code.into(),
            message,
            details,
        };

        (status, Json(body)).into_response()
    }
}

impl ApiError {
    fn into_message(self) -> String {
        match self {
            ApiError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                "An internal error occurred".to_string()
            }
            ApiError::Provider(msg) => {
                tracing::warn!("Provider error: {}", msg);
                msg
            }
            ApiError::Unauthorized(msg)
            | ApiError::AuthRequired(msg)
            | ApiError::NotFound(msg)
            | ApiError::Conflict(msg)
            | ApiError::Validation(msg) => msg,
            ApiError::InvalidFields { message, .. } => message,
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => ApiError::NotFound("Resource not found".into()),
            sqlx::Error::Database(db_err) => {
                if db_err.is_foreign_key_violation() {
                    ApiError::Conflict("Referenced resource is missing or still in use".into())
                } else if db_err.is_unique_violation() {
                    ApiError::Conflict("Resource already exists".into())
                } else {
                    ApiError::Internal(format!("Database error: {}", db_err))
                }
            }
            _ => ApiError::Internal(format!("Database error: {}", err)),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let details: Vec<ValidationDetail> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |e| ValidationDetail {
                    field: field.to_string(),
                    message: e.message.clone().map(|m| m.to_string()).unwrap_or_default(),
                })
            })
            .collect();

        let message = match details.as_slice() {
            [] => "Invalid request".to_string(),
            [only] => only.message.clone(),
            many => format!("{} validation errors", many.len()),
        };

        ApiError::InvalidFields { message, details }
    }
}

impl From<GoogleApiError> for ApiError {
    fn from(err: GoogleApiError) -> Self {
        match err {
            GoogleApiError::NotConnected | GoogleApiError::TokenRejected => {
                ApiError::AuthRequired(err.to_string())
            }
            GoogleApiError::NotFound(_) => ApiError::NotFound(err.to_string()),
            GoogleApiError::InvalidRequest(msg) => ApiError::Validation(msg),
            GoogleApiError::Store(e) => e.into(),
            GoogleApiError::Http(_)
            | GoogleApiError::Status { .. }
            | GoogleApiError::InvalidResponse(_) => ApiError::Provider(err.to_string()),
        }
    }
}

impl From<EmailError> for ApiError {
    fn from(err: EmailError) -> Self {
        ApiError::Provider(err.to_string())
    }
}

impl From<SubsidyError> for ApiError {
    fn from(err: SubsidyError) -> Self {
        ApiError::Validation(err.to_string())
    }
}

impl From<CalendarSyncError> for ApiError {
    fn from(err: CalendarSyncError) -> Self {
        ApiError::Validation(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::models::subsidy_application::ApplicationStatus;

    #[test]
    fn test_status_codes() {
        let cases = [
            (ApiError::Unauthorized("x".into()), StatusCode::UNAUTHORIZED),
            (ApiError::AuthRequired("x".into()), StatusCode::UNAUTHORIZED),
            (ApiError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (ApiError::Conflict("x".into()), StatusCode::CONFLICT),
            (ApiError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (ApiError::Provider("x".into()), StatusCode::BAD_GATEWAY),
            (ApiError::Internal("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (error, status) in cases {
            assert_eq!(error.into_response().status(), status);
        }
    }

    #[test]
    fn test_api_error_display() {
        assert_eq!(
            format!("{}", ApiError::Conflict("test".to_string())),
            "Conflict: test"
        );
        assert_eq!(
            format!("{}", ApiError::AuthRequired("test".to_string())),
            "Authentication required: test"
        );
    }

    #[test]
    fn test_from_sqlx_row_not_found() {
        let error: ApiError = sqlx::Error::RowNotFound.into();
        match error {
            ApiError::NotFound(msg) => assert_eq!(msg, "Resource not found"),
            _ => panic!("Expected NotFound error"),
        }
    }

    #[test]
    fn test_from_google_errors() {
        assert!(matches!(
            ApiError::from(GoogleApiError::NotConnected),
            ApiError::AuthRequired(_)
        ));
        assert!(matches!(
            ApiError::from(GoogleApiError::TokenRejected),
            ApiError::AuthRequired(_)
        ));
        assert!(matches!(
            ApiError::from(GoogleApiError::Status {
                status: 500,
                body: "boom".into()
            }),
            ApiError::Provider(_)
        ));
    }

    #[tokio::test]
    async fn test_field_errors_listed_in_body() {
        use validator::Validate;

        #[derive(Validate)]
        struct Contact {
            #[validate(email(message = "Invalid email address"))]
            email: String,
        }

        let errors = Contact {
            email: "not-an-email".into(),
        }
        .validate()
        .unwrap_err();
        let response = ApiError::from(errors).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "validation_error");
        assert_eq!(body["message"], "Invalid email address");
        assert_eq!(body["details"][0]["field"], "email");
        assert_eq!(body["details"][0]["message"], "Invalid email address");
    }

    #[test]
    fn test_from_subsidy_error() {
        let error: ApiError = SubsidyError::IrregularTransition {
            from: ApplicationStatus::Received,
            to: ApplicationStatus::Planning,
            reason: "application is already closed",
        }
        .into();
        assert!(matches!(error, ApiError::Validation(_)));
    }
}
