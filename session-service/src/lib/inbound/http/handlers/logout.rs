use axum::extract::State;
use axum::http::StatusCode;
use axum::Extension;
use axum_extra::extract::cookie::CookieJar;

use super::ApiSuccess;
use super::Empty;
use crate::inbound::http::cookies;
use crate::inbound::http::errors::ApiError;
use crate::inbound::http::middleware::AuthenticatedUser;
use crate::inbound::http::router::AppState;

pub async fn logout(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    jar: CookieJar,
) -> Result<(CookieJar, ApiSuccess<Empty>), ApiError> {
    state
        .session_service
        .logout(cookies::refresh_token(&jar))
        .await?;

    tracing::info!(user_id = %user.user_id, "User logged out");

    Ok((
        state.cookies.clear_refresh_token(jar),
        ApiSuccess::new(StatusCode::OK, "Logged out successfully", Empty {}),
    ))
}
