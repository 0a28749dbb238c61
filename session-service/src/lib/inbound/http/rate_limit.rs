use std::sync::Arc;
use std::time::Duration;

use axum::extract::Request;
use axum::extract::State;
use axum::http::header;
use axum::http::HeaderMap;
use axum::http::HeaderName;
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::IntoResponse;
use axum::response::Response;
use chrono::Utc;

use super::client::remote_ip;
use super::errors::ApiError;
use super::middleware::AuthenticatedUser;
use crate::domain::session::models::Role;
use crate::rate_limit::RateLimitKey;
use crate::rate_limit::RateLimiter;

pub const X_RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
pub const X_RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
pub const X_RATELIMIT_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");

/// Middleware charging one point per request.
///
/// Authenticated callers are charged against their role budget keyed by user
/// id. Anyone else uses the `user` budget keyed by remote address.
pub async fn rate_limit(
    State(limiter): State<Arc<RateLimiter>>,
    req: Request,
    next: Next,
) -> Response {
    let (role, key) = match req.extensions().get::<AuthenticatedUser>() {
        Some(user) => (user.role, RateLimitKey::User(user.user_id.to_string())),
        None => (Role::User, RateLimitKey::Ip(remote_ip(req.extensions()))),
    };

    match limiter.consume(role, &key) {
        Ok(grant) => {
            let mut response = next.run(req).await;
            set_budget_headers(
                response.headers_mut(),
                grant.limit,
                grant.remaining,
                grant.reset_after,
            );
            response
        }
        Err(rejection) => {
            tracing::warn!(
                key = %key,
                role = %role,
                limit = rejection.limit,
                retry_after_secs = rejection.retry_after_secs(),
                "Rate limit exceeded"
            );

            let mut response = ApiError::too_many_requests().into_response();
            let headers = response.headers_mut();
            set_budget_headers(headers, rejection.limit, 0, rejection.retry_after);
            headers.insert(
                header::RETRY_AFTER,
                HeaderValue::from(rejection.retry_after_secs()),
            );
            response
        }
    }
}

fn set_budget_headers(headers: &mut HeaderMap, limit: u32, remaining: u32, reset_after: Duration) {
    headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(limit));
    headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(remaining));
    if let Ok(reset) = HeaderValue::from_str(&http_date_after(reset_after)) {
        headers.insert(X_RATELIMIT_RESET, reset);
    }
}

/// IMF-fixdate of now + `after`.
fn http_date_after(after: Duration) -> String {
    let after = chrono::Duration::from_std(after).unwrap_or_else(|_| chrono::Duration::zero());
    (Utc::now() + after)
        .format("%a, %d %b %Y %H:%M:%S GMT")
        .to_string()
}
