/// Error handling for the API server
///
/// Handlers return `ApiResult<T>`; every error becomes a JSON body of the
/// form `{"error": code, "message": text, "details"?: [...]}`.
///
/// # Example
///
/// ```
/// use marketdesk_api::error::{ApiError, ApiResult};
/// use axum::Json;
/// use serde_json::{json, Value};
///
/// async fn handler(found: bool) -> ApiResult<Json<Value>> {
///     if !found {
///         return Err(ApiError::NotFound("Record not found".to_string()));
///     }
///     Ok(Json(json!({ "ok": true })))
/// }
/// ```

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use marketdesk_shared::auth::middleware::AccessDenied;
use marketdesk_shared::auth::provider::AuthError;
use marketdesk_shared::models::master_data::MasterDataError;
use serde::{Deserialize, Serialize};
use std::fmt;
use validator::{ValidationErrors, ValidationErrorsKind};

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

/// Message returned for every credential failure
pub const BAD_CREDENTIALS_MESSAGE: &str = "Invalid login ID or password";

/// Unified API error type
#[derive(Debug)]
pub enum ApiError {
    /// Bad request (400)
    BadRequest(String),

    /// Unauthorized (401)
    Unauthorized(String),

    /// Forbidden (403) with a specific error code
    Forbidden { code: &'static str, message: String },

    /// Not found (404)
    NotFound(String),

    /// Conflict (409)
    Conflict(String),

    /// Unprocessable entity (422)
    ValidationError(Vec<ValidationErrorDetail>),

    /// Internal server error (500); the message is only logged
    InternalError(String),

    /// Service unavailable (503)
    ServiceUnavailable(String),
}

impl ApiError {
    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden {
            code: "forbidden",
            message: message.into(),
        }
    }

    /// Single-field validation failure
    pub fn invalid_field(field: &str, message: impl Into<String>) -> Self {
        ApiError::ValidationError(vec![ValidationErrorDetail {
            field: field.to_string(),
            message: message.into(),
        }])
    }
}

/// Validation error detail
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationErrorDetail {
    /// Field that failed validation (`__all__` for cross-field rules)
    pub field: String,

    /// Error message
    pub message: String,
}

/// Error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code (e.g., "bad_request", "unauthorized")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// Validation errors, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<ValidationErrorDetail>>,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::Forbidden { message, .. } => write!(f, "Forbidden: {}", message),
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            ApiError::ValidationError(errors) => {
                write!(f, "Validation failed: {} errors", errors.len())
            }
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
            ApiError::ServiceUnavailable(msg) => write!(f, "Service unavailable: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message, details) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg, None),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg, None),
            ApiError::Forbidden { code, message } => (StatusCode::FORBIDDEN, code, message, None),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg, None),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg, None),
            ApiError::ValidationError(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "validation_error",
                "Request validation failed".to_string(),
                Some(errors),
            ),
            ApiError::InternalError(msg) => {
                // Log internal errors but don't expose details to clients
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
            ApiError::ServiceUnavailable(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "service_unavailable",
                msg,
                None,
            ),
        };

        let body = Json(ErrorResponse {
            error: error_code.to_string(),
            message,
            details,
        });

        (status, body).into_response()
    }
}

/// Convert sqlx errors to API errors
impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => ApiError::NotFound("Resource not found".to_string()),
            sqlx::Error::Database(db_err) => {
                match db_err.constraint() {
                    Some("accounts_class_login_id_key") => {
                        ApiError::Conflict("Login ID is already taken".to_string())
                    }
                    Some("master_data_kind_name_key") => {
                        ApiError::Conflict("A record with this name already exists".to_string())
                    }
                    Some("master_data_kind_code_key") => {
                        ApiError::Conflict("A record with this code already exists".to_string())
                    }
                    Some(constraint) if db_err.is_unique_violation() => {
                        ApiError::Conflict(format!("Constraint violation: {}", constraint))
                    }
                    // Check constraints reject values the validators let through
                    Some(constraint) if db_err.is_check_violation() => {
                        ApiError::BadRequest(format!("Constraint violation: {}", constraint))
                    }
                    _ => ApiError::InternalError(format!("Database error: {}", db_err)),
                }
            }
            sqlx::Error::PoolTimedOut => {
                ApiError::ServiceUnavailable("Database is unavailable".to_string())
            }
            _ => ApiError::InternalError(format!("Database error: {}", err)),
        }
    }
}

/// Convert validator errors to field details
impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        let mut details = Vec::new();
        collect_validation_errors("", &errors, &mut details);
        details.sort_by(|a, b| a.field.cmp(&b.field));
        ApiError::ValidationError(details)
    }
}

fn collect_validation_errors(
    prefix: &str,
    errors: &ValidationErrors,
    details: &mut Vec<ValidationErrorDetail>,
) {
    for (field, kind) in errors.errors() {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{}.{}", prefix, field)
        };

        match kind {
            ValidationErrorsKind::Field(field_errors) => {
                for error in field_errors {
                    details.push(ValidationErrorDetail {
                        field: path.clone(),
                        message: error
                            .message
                            .as_ref()
                            .map(|m| m.to_string())
                            .unwrap_or_else(|| format!("Invalid value ({})", error.code)),
                    });
                }
            }
            ValidationErrorsKind::Struct(nested) => collect_validation_errors(&path, nested, details),
            ValidationErrorsKind::List(items) => {
                for (index, nested) in items {
                    collect_validation_errors(&format!("{}[{}]", path, index), nested, details);
                }
            }
        }
    }
}

/// Convert authentication errors to API errors
///
/// Unknown accounts and wrong passwords produce the same response.
impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::AccountNotFound | AuthError::InvalidPassword => {
                ApiError::Unauthorized(BAD_CREDENTIALS_MESSAGE.to_string())
            }
            AuthError::AccountPending | AuthError::AccountInactive | AuthError::AccountRejected => {
                let message = match err {
                    AuthError::AccountPending => "Account is waiting for administrator approval",
                    AuthError::AccountInactive => "Account has been deactivated",
                    _ => "Account registration was rejected",
                };
                ApiError::Forbidden {
                    code: err.code(),
                    message: message.to_string(),
                }
            }
            AuthError::RegistrationClosed(class) => ApiError::Forbidden {
                code: "registration_closed",
                message: format!("{} accounts cannot self-register", class.as_str()),
            },
            AuthError::LoginIdTaken => ApiError::Conflict("Login ID is already taken".to_string()),
            AuthError::InvalidAccount(errors) => errors.into(),
            AuthError::SessionNotFound => {
                ApiError::Unauthorized("Session not found or logged out".to_string())
            }
            AuthError::SessionExpired => ApiError::Unauthorized("Session expired".to_string()),
            AuthError::InvalidToken(_) => ApiError::Unauthorized("Invalid session token".to_string()),
            AuthError::Password(e) => ApiError::InternalError(format!("Password operation failed: {}", e)),
            AuthError::Database(e) => e.into(),
        }
    }
}

/// Convert access checks to API errors
impl From<AccessDenied> for ApiError {
    fn from(err: AccessDenied) -> Self {
        ApiError::forbidden(err.to_string())
    }
}

/// Convert master data errors to API errors
impl From<MasterDataError> for ApiError {
    fn from(err: MasterDataError) -> Self {
        match err {
            MasterDataError::MissingCode(_) => ApiError::invalid_field("code", err.to_string()),
            MasterDataError::AttributesNotObject => {
                ApiError::invalid_field("attributes", err.to_string())
            }
            MasterDataError::InvalidAttribute { ref name, .. } => {
                let field = if name == "parent_id" {
                    "parent_id".to_string()
                } else {
                    format!("attributes.{}", name)
                };
                ApiError::invalid_field(&field, err.to_string())
            }
            MasterDataError::ParentNotFound(_) => ApiError::invalid_field("parent_id", err.to_string()),
            MasterDataError::Database(e) => e.into(),
        }
    }
}
