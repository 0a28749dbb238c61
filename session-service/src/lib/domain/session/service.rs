use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use auth::Role;
use auth::TokenCodec;
use chrono::Utc;

use crate::domain::session::errors::SessionError;
use crate::domain::session::models::ClientMetadata;
use crate::domain::session::models::EmailAddress;
use crate::domain::session::models::LoginCommand;
use crate::domain::session::models::RefreshTokenId;
use crate::domain::session::models::RefreshTokenRecord;
use crate::domain::session::models::Session;
use crate::domain::session::models::SignupCommand;
use crate::domain::session::models::User;
use crate::domain::session::models::UserCredentials;
use crate::domain::session::models::UserId;
use crate::domain::session::ports::RefreshTokenRepository;
use crate::domain::session::ports::SessionServicePort;
use crate::domain::session::ports::UserRepository;

/// Domain service implementation for the session lifecycle.
///
/// Concrete implementation of SessionServicePort with dependency injection.
pub struct SessionService<UR, TR>
where
    UR: UserRepository,
    TR: RefreshTokenRepository,
{
    users: Arc<UR>,
    refresh_tokens: Arc<TR>,
    token_codec: Arc<TokenCodec>,
    admin_emails: HashSet<String>,
}

impl<UR, TR> SessionService<UR, TR>
where
    UR: UserRepository,
    TR: RefreshTokenRepository,
{
    /// Create a new session service with injected dependencies.
    ///
    /// # Arguments
    /// * `users` - User persistence implementation
    /// * `refresh_tokens` - Refresh-token persistence implementation
    /// * `token_codec` - Access/refresh token signer
    /// * `admin_emails` - Addresses that receive the admin role at signup
    pub fn new(
        users: Arc<UR>,
        refresh_tokens: Arc<TR>,
        token_codec: Arc<TokenCodec>,
        admin_emails: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            users,
            refresh_tokens,
            token_codec,
            admin_emails: admin_emails
                .into_iter()
                .map(|email| email.trim().to_lowercase())
                .collect(),
        }
    }

    fn role_for(&self, email: &EmailAddress) -> Role {
        if self.admin_emails.contains(email.as_str()) {
            Role::Admin
        } else {
            Role::User
        }
    }

    /// Issue a token pair for `user` and persist its refresh-token record.
    async fn open_session(
        &self,
        user: User,
        client: ClientMetadata,
    ) -> Result<Session, SessionError> {
        let pair = self.token_codec.issue_pair(user.id, user.role)?;

        let record = RefreshTokenRecord {
            id: RefreshTokenId::new(),
            user_id: user.id,
            token: pair.refresh_token.clone(),
            user_agent: client.user_agent,
            ip: client.ip,
            expires_at: pair.refresh_expires_at,
            created_at: Utc::now(),
        };

        let record = self.refresh_tokens.create(record).await?;
        tracing::debug!(
            user_id = %user.id,
            session_id = %record.id,
            expires_at = %record.expires_at,
            "Session opened"
        );

        Ok(Session {
            user,
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            refresh_expires_at: pair.refresh_expires_at,
        })
    }
}

#[async_trait]
impl<UR, TR> SessionServicePort for SessionService<UR, TR>
where
    UR: UserRepository,
    TR: RefreshTokenRepository,
{
    async fn signup(
        &self,
        command: SignupCommand,
        client: ClientMetadata,
    ) -> Result<Session, SessionError> {
        if self.users.exists_by_email(&command.email).await? {
            tracing::warn!(email = %command.email, "Signup attempt with existing email");
            return Err(SessionError::EmailAlreadyExists(command.email.to_string()));
        }

        let role = self.role_for(&command.email);
        let password_hash = auth::hash_password(&command.password)?;
        let now = Utc::now();

        let user = self
            .users
            .create(UserCredentials {
                user: User {
                    id: UserId::new(),
                    username: command.username,
                    email: command.email,
                    role,
                    created_at: now,
                    updated_at: now,
                },
                password_hash,
            })
            .await?;

        tracing::info!(user_id = %user.id, role = %user.role, "User registered");

        self.open_session(user, client).await
    }

    async fn login(
        &self,
        command: LoginCommand,
        client: ClientMetadata,
    ) -> Result<Session, SessionError> {
        let Some(credentials) = self.users.find_by_email(&command.email).await? else {
            tracing::warn!(email = %command.email, "Login attempt with unknown email");
            return Err(SessionError::InvalidCredentials);
        };

        if !auth::verify_password(&command.password, &credentials.password_hash)? {
            tracing::warn!(
                user_id = %credentials.user.id,
                "Login attempt with wrong password"
            );
            return Err(SessionError::InvalidCredentials);
        }

        tracing::info!(user_id = %credentials.user.id, "User logged in");

        self.open_session(credentials.user, client).await
    }

    async fn logout(&self, refresh_token: Option<String>) -> Result<(), SessionError> {
        let token = refresh_token
            .filter(|token| !token.is_empty())
            .ok_or(SessionError::RefreshTokenMissing)?;

        // Revocation is keyed by the stored value; verification only names the actor.
        match self.token_codec.verify_refresh(&token) {
            Ok(claims) => tracing::debug!(user_id = %claims.user_id, "Revoking refresh token"),
            Err(e) => tracing::warn!(error = %e, "Revoking refresh token that failed verification"),
        }

        if !self.refresh_tokens.delete_by_token(&token).await? {
            tracing::warn!("Logout with a refresh token that has no active session");
            return Err(SessionError::RefreshTokenNotFound);
        }

        tracing::info!("Session revoked");
        Ok(())
    }
}
