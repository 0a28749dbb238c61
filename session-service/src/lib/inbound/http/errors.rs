use auth::JwtError;
use axum::extract::State;
use axum::http::header;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::Json;
use serde::Serialize;

use crate::domain::session::errors::SessionError;
use crate::validation::ValidationFailure;
use crate::validation::ValidationIssue;

/// Machine-readable discriminator carried in every error envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    ValidationError,
    RefreshTokenMissing,
    AuthenticationError,
    TokenExpired,
    TokenInvalid,
    InvalidTokenPayload,
    AuthorizationHeaderMissing,
    InvalidAuthorizationHeaderFormat,
    ForbiddenInsufficientRole,
    NotFound,
    Conflict,
    TooManyRequests,
    LogoutError,
    InternalServerError,
}

impl ErrorKind {
    pub fn status(&self) -> StatusCode {
        match self {
            ErrorKind::ValidationError | ErrorKind::RefreshTokenMissing => StatusCode::BAD_REQUEST,
            ErrorKind::AuthenticationError
            | ErrorKind::TokenExpired
            | ErrorKind::TokenInvalid
            | ErrorKind::InvalidTokenPayload
            | ErrorKind::AuthorizationHeaderMissing
            | ErrorKind::InvalidAuthorizationHeaderFormat => StatusCode::UNAUTHORIZED,
            ErrorKind::ForbiddenInsufficientRole => StatusCode::FORBIDDEN,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            ErrorKind::LogoutError | ErrorKind::InternalServerError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// A failure on its way to the client.
///
/// Built where the failure is detected and returned unchanged up to axum,
/// which renders it as the error envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub kind: ErrorKind,
    pub message: String,
    pub details: Vec<ValidationIssue>,
    /// Internal cause, logged and only shown outside production.
    pub diagnostic: Option<String>,
}

impl ApiError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            details: Vec::new(),
            diagnostic: None,
        }
    }

    pub fn with_detail(mut self, field: impl Into<String>, message: impl Into<String>) -> Self {
        self.details.push(ValidationIssue::new(field, message));
        self
    }

    pub fn internal(diagnostic: impl Into<String>) -> Self {
        Self {
            diagnostic: Some(diagnostic.into()),
            ..Self::new(ErrorKind::InternalServerError, "Internal Server Error")
        }
    }

    pub fn invalid_credentials() -> Self {
        Self::new(ErrorKind::AuthenticationError, "Invalid email or password")
            .with_detail("credentials", "Invalid email or password")
    }

    pub fn too_many_requests() -> Self {
        Self::new(
            ErrorKind::TooManyRequests,
            "Too Many Requests - Please try again later",
        )
    }

    pub fn route_not_found(uri: &str) -> Self {
        Self::new(ErrorKind::NotFound, "Not Found")
            .with_detail("route", format!("The route {} does not exist", uri))
    }

    pub fn status(&self) -> StatusCode {
        self.kind.status()
    }

    /// Render the wire envelope.
    ///
    /// With `expose` set, the diagnostic of a failure is appended to
    /// `details`; otherwise it never leaves the process.
    pub fn into_envelope(self, expose: bool) -> ErrorEnvelope {
        let mut details = self.details;
        if expose {
            if let Some(diagnostic) = self.diagnostic {
                details.push(ValidationIssue::new("internal", diagnostic));
            }
        }

        ErrorEnvelope {
            success: false,
            status_code: self.kind.status().as_u16(),
            message: self.message,
            error: ErrorBody {
                kind: self.kind,
                details,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            tracing::error!(
                kind = ?self.kind,
                diagnostic = self.diagnostic.as_deref().unwrap_or("none"),
                "Request failed"
            );
        } else {
            tracing::debug!(kind = ?self.kind, message = %self.message, "Request rejected");
        }

        let mut response = (status, Json(self.clone().into_envelope(false))).into_response();
        if self.diagnostic.is_some() {
            response.extensions_mut().insert(RenderedError(self));
        }
        response
    }
}

/// Error behind a rendered response, kept so [`expose_diagnostics`] can
/// re-render it with its diagnostic.
#[derive(Debug, Clone)]
struct RenderedError(ApiError);

/// Response mapper that re-renders error envelopes with their internal
/// diagnostic attached when `expose` is set.
///
/// Status and headers of the original response are kept.
pub async fn expose_diagnostics(State(expose): State<bool>, mut response: Response) -> Response {
    let Some(RenderedError(error)) = response.extensions_mut().remove::<RenderedError>() else {
        return response;
    };
    if !expose {
        return response;
    }

    let (mut parts, _) = response.into_parts();
    parts.headers.remove(header::CONTENT_LENGTH);
    let body = Json(error.into_envelope(true)).into_response().into_body();
    Response::from_parts(parts, body)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEnvelope {
    pub success: bool,
    pub status_code: u16,
    pub message: String,
    pub error: ErrorBody,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub kind: ErrorKind,
    pub details: Vec<ValidationIssue>,
}

impl From<JwtError> for ApiError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::InvalidToken(ref reason) => {
                ApiError::new(ErrorKind::TokenInvalid, "Authentication failed. Invalid token provided.")
                    .with_detail("token", reason.clone())
            }
            JwtError::TokenExpired => {
                ApiError::new(ErrorKind::TokenExpired, "Authentication failed. Token has expired.")
                    .with_detail("token", "The token has expired")
            }
            JwtError::InvalidPayload(ref reason) => {
                ApiError::new(ErrorKind::InvalidTokenPayload, "Invalid token payload")
                    .with_detail("token", reason.clone())
            }
            JwtError::EncodingFailed(_) => ApiError::internal(err.to_string()),
        }
    }
}

impl From<ValidationFailure> for ApiError {
    fn from(failure: ValidationFailure) -> Self {
        ApiError {
            details: failure.issues,
            ..ApiError::new(ErrorKind::ValidationError, "Validation Error")
        }
    }
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Token(e) => e.into(),
            SessionError::InvalidUsername(ref e) => {
                ApiError::new(ErrorKind::ValidationError, "Validation Error")
                    .with_detail("username", e.to_string())
            }
            SessionError::InvalidEmail(ref e) => {
                ApiError::new(ErrorKind::ValidationError, "Validation Error")
                    .with_detail("email", e.to_string())
            }
            SessionError::InvalidUserId(ref e) => {
                ApiError::new(ErrorKind::InvalidTokenPayload, "Invalid token payload")
                    .with_detail("token", e.to_string())
            }
            SessionError::EmailAlreadyExists(_) => {
                ApiError::new(ErrorKind::Conflict, "Email already in use")
                    .with_detail("email", "A user with this email already exists")
            }
            SessionError::InvalidCredentials => ApiError::invalid_credentials(),
            SessionError::RefreshTokenMissing => {
                ApiError::new(ErrorKind::RefreshTokenMissing, "Refresh token missing")
                    .with_detail("refreshToken", "Refresh token is required for logout")
            }
            SessionError::RefreshTokenNotFound => {
                ApiError::new(ErrorKind::LogoutError, "Failed to logout user")
                    .with_detail("refreshToken", "No active session for this refresh token")
            }
            SessionError::Password(_) | SessionError::DatabaseError(_) => {
                ApiError::internal(err.to_string())
            }
        }
    }
}
