use axum::extract::State;
use axum::http::StatusCode;
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;

use super::ApiSuccess;
use super::SessionData;
use crate::domain::session::errors::SessionError;
use crate::domain::session::models::EmailAddress;
use crate::domain::session::models::LoginCommand;
use crate::inbound::http::client::Client;
use crate::inbound::http::errors::ApiError;
use crate::inbound::http::router::AppState;
use crate::inbound::http::validation::Valid;

pub async fn login(
    State(state): State<AppState>,
    Client(client): Client,
    jar: CookieJar,
    Valid(body): Valid<LoginRequestBody>,
) -> Result<(CookieJar, ApiSuccess<SessionData>), ApiError> {
    let session = state
        .session_service
        .login(body.try_into_command()?, client)
        .await?;

    let jar = jar.add(state.cookies.refresh_token(session.refresh_token.clone()));

    Ok((
        jar,
        ApiSuccess::new(StatusCode::OK, "Login successful", SessionData::from(&session)),
    ))
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoginRequestBody {
    email: String,
    password: String,
}

impl LoginRequestBody {
    fn try_into_command(self) -> Result<LoginCommand, SessionError> {
        Ok(LoginCommand::new(EmailAddress::new(self.email)?, self.password))
    }
}
