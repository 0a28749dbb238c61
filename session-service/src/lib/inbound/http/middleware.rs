use std::sync::Arc;

use auth::TokenCodec;
use axum::extract::Request;
use axum::extract::State;
use axum::http::header;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;

use super::errors::ApiError;
use super::errors::ErrorKind;
use crate::domain::session::models::Role;
use crate::domain::session::models::UserId;

/// Extension type to store the authenticated caller in request extensions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: UserId,
    pub role: Role,
}

/// Middleware state: access-token verifier plus the roles a route admits.
#[derive(Clone)]
pub struct AuthGuard {
    token_codec: Arc<TokenCodec>,
    allowed_roles: Arc<[Role]>,
}

impl AuthGuard {
    /// Guard admitting any authenticated role.
    pub fn new(token_codec: Arc<TokenCodec>) -> Self {
        Self {
            token_codec,
            allowed_roles: Arc::from(Vec::new()),
        }
    }

    /// Restrict the guarded routes to `roles`. An empty list admits every role.
    pub fn allow(mut self, roles: &[Role]) -> Self {
        self.allowed_roles = Arc::from(roles);
        self
    }

    fn admits(&self, role: Role) -> bool {
        self.allowed_roles.is_empty() || self.allowed_roles.contains(&role)
    }
}

/// Middleware that validates the bearer access token and adds the caller to
/// request extensions
pub async fn authenticate(
    State(guard): State<AuthGuard>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_token_from_header(req.headers())?;

    let claims = guard.token_codec.verify_access(token).map_err(|e| {
        tracing::warn!(error = %e, "Access token rejected");
        ApiError::from(e).with_detail("authorization", "The access token is not valid")
    })?;

    let user_id = UserId::from_string(&claims.user_id).map_err(|e| {
        tracing::warn!(error = %e, "Access token subject is not a user id");
        ApiError::new(ErrorKind::InvalidTokenPayload, "Invalid token payload")
            .with_detail("authorization", "Invalid token payload")
    })?;

    if !guard.admits(claims.role) {
        tracing::warn!(user_id = %user_id, role = %claims.role, "Insufficient role for this resource");
        return Err(ApiError::new(
            ErrorKind::ForbiddenInsufficientRole,
            "Forbidden - Insufficient role",
        )
        .with_detail("authorization", "Insufficient role for this resource"));
    }

    req.extensions_mut().insert(AuthenticatedUser {
        user_id,
        role: claims.role,
    });

    Ok(next.run(req).await)
}

fn extract_token_from_header(headers: &HeaderMap) -> Result<&str, ApiError> {
    let auth_header = headers.get(header::AUTHORIZATION).ok_or_else(|| {
        ApiError::new(
            ErrorKind::AuthorizationHeaderMissing,
            "Authorization header missing",
        )
        .with_detail("authorization", "Authorization header is required")
    })?;

    let invalid_format = || {
        ApiError::new(
            ErrorKind::InvalidAuthorizationHeaderFormat,
            "Invalid authorization header format",
        )
        .with_detail("authorization", "Expected format: 'Bearer <token>'")
    };

    let auth_str = auth_header.to_str().map_err(|_| invalid_format())?;

    match auth_str.split_once(' ') {
        Some(("Bearer", token)) if !token.is_empty() && !token.contains(' ') => Ok(token),
        _ => Err(invalid_format()),
    }
}
