use std::collections::BTreeMap;

use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;

use crate::auth::AuthError;
use crate::policy::PermissionDenied;
use crate::repo::RepoError;

/// Field name -> messages, the body of a 400.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<FieldErrors>,
}

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("not found")] NotFound,
    #[error("validation failed")] Validation(FieldErrors),
    #[error("{0}")] Forbidden(String),
    #[error("{0}")] Unauthorized(String),
    #[error("conflict")] Conflict,
    #[error("bad request")] BadRequest,
    #[error("too many requests")] TooManyRequests,
    #[error("payload too large")] PayloadTooLarge,
    #[error("unsupported media type")] UnsupportedMediaType,
    #[error("internal error")] Internal,
}

impl ApiError {
    /// Single-field validation failure.
    pub fn field(name: &str, msg: &str) -> Self {
        let mut fields = FieldErrors::new();
        fields.insert(name.to_string(), vec![msg.to_string()]);
        ApiError::Validation(fields)
    }

    /// `Ok` when nothing was collected.
    pub fn check(fields: FieldErrors) -> Result<(), ApiError> {
        if fields.is_empty() { Ok(()) } else { Err(ApiError::Validation(fields)) }
    }
}

/// Append `msg` under `name`.
pub fn push_field(fields: &mut FieldErrors, name: &str, msg: &str) {
    fields.entry(name.to_string()).or_default().push(msg.to_string());
}

/// Flatten derive-level validation failures into the wire shape.
pub fn collect_field_errors(e: &validator::ValidationErrors) -> FieldErrors {
    e.field_errors()
        .into_iter()
        .map(|(name, errs)| {
            let msgs = errs
                .iter()
                .map(|err| err.message.as_ref().map(|m| m.to_string()).unwrap_or_else(|| err.code.to_string()))
                .collect();
            (name.to_string(), msgs)
        })
        .collect()
}

impl From<RepoError> for ApiError {
    fn from(e: RepoError) -> Self {
        match e {
            RepoError::NotFound => ApiError::NotFound,
            RepoError::Conflict => ApiError::Conflict,
            RepoError::SelfFollow => ApiError::field("username", "You cannot follow yourself."),
            RepoError::AlreadyFollowing => ApiError::field("username", "You are already following this user."),
            RepoError::NotFollowing => ApiError::field("username", "You are not following this user."),
            RepoError::Internal(msg) => {
                log::error!("repository failure: {msg}");
                ApiError::Internal
            }
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::InvalidToken(_) | AuthError::WrongTokenType | AuthError::BadSubject => {
                ApiError::Unauthorized("Token is invalid or expired".into())
            }
            AuthError::MissingSecret | AuthError::Hash(_) => {
                log::error!("auth failure: {e}");
                ApiError::Internal
            }
        }
    }
}

impl From<PermissionDenied> for ApiError {
    fn from(e: PermissionDenied) -> Self {
        ApiError::Forbidden(e.0.to_string())
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(e: validator::ValidationErrors) -> Self {
        ApiError::Validation(collect_field_errors(&e))
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> actix_web::http::StatusCode {
        use actix_web::http::StatusCode;
        match self {
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Validation(_) | ApiError::BadRequest => StatusCode::BAD_REQUEST,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Conflict => StatusCode::CONFLICT,
            ApiError::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            ApiError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::UnsupportedMediaType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let fields = match self {
            ApiError::Validation(f) => Some(f.clone()),
            _ => None,
        };
        HttpResponse::build(self.status_code()).json(ApiErrorBody { error: self.to_string(), fields })
    }
}
