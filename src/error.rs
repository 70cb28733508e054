use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;
use std::fmt;

use crate::notebook::stoichiometry::StoichiometryError;

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Unauthorized(String),
    Forbidden(String),
    InternalServerError(String),
    ValidationError(String),
    DatabaseError(sqlx::Error),
}

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    message: String,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad Request: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not Found: {}", msg),
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            ApiError::InternalServerError(msg) => write!(f, "Internal Server Error: {}", msg),
            ApiError::ValidationError(msg) => write!(f, "Validation Error: {}", msg),
            ApiError::DatabaseError(err) => write!(f, "Database Error: {}", err),
        }
    }
}

impl std::error::Error for ApiError {}

impl ResponseError for ApiError {
    fn error_response(&self) -> HttpResponse {
        let error_response = ErrorResponse {
            success: false,
            message: self.to_string(),
        };

        match self {
            ApiError::BadRequest(_) => HttpResponse::BadRequest().json(error_response),
            ApiError::NotFound(_) => HttpResponse::NotFound().json(error_response),
            ApiError::Unauthorized(_) => HttpResponse::Unauthorized().json(error_response),
            ApiError::Forbidden(_) => HttpResponse::Forbidden().json(error_response),
            ApiError::ValidationError(_) => HttpResponse::UnprocessableEntity().json(error_response),
            ApiError::DatabaseError(_) => HttpResponse::InternalServerError().json(error_response),
            ApiError::InternalServerError(_) => HttpResponse::InternalServerError().json(error_response),
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        ApiError::DatabaseError(err)
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(err: validator::ValidationErrors) -> Self {
        ApiError::ValidationError(err.to_string())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::InternalServerError(format!("Failed to (de)serialize notebook data: {}", err))
    }
}

impl From<StoichiometryError> for ApiError {
    fn from(err: StoichiometryError) -> Self {
        ApiError::ValidationError(err.to_string())
    }
}

// Notebook and session specific errors
impl ApiError {
    pub fn entry_not_found(id: &str) -> Self {
        ApiError::NotFound(format!("Lab entry with ID '{}' not found", id))
    }

    pub fn user_not_found(id: &str) -> Self {
        ApiError::NotFound(format!("User with ID '{}' not found", id))
    }

    pub fn insufficient_permissions() -> Self {
        ApiError::Forbidden("Insufficient permissions".to_string())
    }

    pub fn not_authenticated() -> Self {
        ApiError::Unauthorized("No user information found".to_string())
    }

    pub fn validation_failed(field: &str, reason: &str) -> Self {
        ApiError::ValidationError(format!("{}: {}", field, reason))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;

    #[test]
    fn test_status_codes() {
        assert_eq!(ApiError::entry_not_found("x").error_response().status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::insufficient_permissions().error_response().status(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::not_authenticated().error_response().status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ApiError::validation_failed("title", "required").error_response().status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn test_stoichiometry_error_becomes_validation_error() {
        let err: ApiError = StoichiometryError::NoReagents.into();
        assert!(matches!(err, ApiError::ValidationError(_)));
        assert!(err.to_string().contains("at least one reagent"));
    }
}
