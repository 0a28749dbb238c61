use axum::extract::State;
use axum::http::StatusCode;
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;

use super::ApiSuccess;
use super::SessionData;
use crate::domain::session::errors::SessionError;
use crate::domain::session::models::EmailAddress;
use crate::domain::session::models::SignupCommand;
use crate::domain::session::models::Username;
use crate::inbound::http::client::Client;
use crate::inbound::http::errors::ApiError;
use crate::inbound::http::router::AppState;
use crate::inbound::http::validation::Valid;

pub async fn sign_up(
    State(state): State<AppState>,
    Client(client): Client,
    jar: CookieJar,
    Valid(body): Valid<SignUpRequestBody>,
) -> Result<(CookieJar, ApiSuccess<SessionData>), ApiError> {
    let session = state
        .session_service
        .signup(body.try_into_command()?, client)
        .await?;

    let jar = jar.add(state.cookies.refresh_token(session.refresh_token.clone()));

    Ok((
        jar,
        ApiSuccess::new(
            StatusCode::CREATED,
            "User signed up successfully",
            SessionData::from(&session),
        ),
    ))
}

/// HTTP request body for signing up (already schema-checked)
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SignUpRequestBody {
    username: String,
    email: String,
    password: String,
}

impl SignUpRequestBody {
    fn try_into_command(self) -> Result<SignupCommand, SessionError> {
        let username = Username::new(self.username)?;
        let email = EmailAddress::new(self.email)?;
        Ok(SignupCommand::new(username, email, self.password))
    }
}
