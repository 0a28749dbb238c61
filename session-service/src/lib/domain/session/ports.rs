use async_trait::async_trait;

use crate::domain::session::errors::SessionError;
use crate::domain::session::models::ClientMetadata;
use crate::domain::session::models::EmailAddress;
use crate::domain::session::models::LoginCommand;
use crate::domain::session::models::RefreshTokenRecord;
use crate::domain::session::models::Session;
use crate::domain::session::models::SignupCommand;
use crate::domain::session::models::User;
use crate::domain::session::models::UserCredentials;

/// Port for session lifecycle operations.
#[async_trait]
pub trait SessionServicePort: Send + Sync + 'static {
    /// Register an account and open its first session.
    ///
    /// # Arguments
    /// * `command` - Validated username, email and plaintext password
    /// * `client` - Request origin stored on the refresh-token record
    ///
    /// # Returns
    /// Public user projection plus a fresh access/refresh token pair
    ///
    /// # Errors
    /// * `EmailAlreadyExists` - Email is already registered
    /// * `DatabaseError` - Persisting the user or its session failed
    async fn signup(
        &self,
        command: SignupCommand,
        client: ClientMetadata,
    ) -> Result<Session, SessionError>;

    /// Verify credentials and open an additional session.
    ///
    /// # Errors
    /// * `InvalidCredentials` - Unknown email or wrong password (not distinguished)
    /// * `DatabaseError` - Lookup or session persistence failed
    async fn login(
        &self,
        command: LoginCommand,
        client: ClientMetadata,
    ) -> Result<Session, SessionError>;

    /// Revoke the session identified by `refresh_token`.
    ///
    /// # Errors
    /// * `RefreshTokenMissing` - No token supplied
    /// * `RefreshTokenNotFound` - No live record holds this token
    /// * `DatabaseError` - Deletion failed
    async fn logout(&self, refresh_token: Option<String>) -> Result<(), SessionError>;
}

/// Persistence operations for user records.
#[async_trait]
pub trait UserRepository: Send + Sync + 'static {
    /// Persist a new user.
    ///
    /// # Returns
    /// Public projection of the stored user
    ///
    /// # Errors
    /// * `EmailAlreadyExists` - Email uniqueness violated
    /// * `DatabaseError` - Database operation failed
    async fn create(&self, credentials: UserCredentials) -> Result<User, SessionError>;

    /// Check whether an account uses this email.
    ///
    /// # Errors
    /// * `DatabaseError` - Database operation failed
    async fn exists_by_email(&self, email: &EmailAddress) -> Result<bool, SessionError>;

    /// Retrieve a user with its password hash by email.
    ///
    /// # Returns
    /// Optional credentials (None if not found)
    ///
    /// # Errors
    /// * `DatabaseError` - Database operation failed
    async fn find_by_email(
        &self,
        email: &EmailAddress,
    ) -> Result<Option<UserCredentials>, SessionError>;
}

/// Persistence operations for refresh-token records.
#[async_trait]
pub trait RefreshTokenRepository: Send + Sync + 'static {
    /// Persist a new refresh-token record.
    ///
    /// # Errors
    /// * `DatabaseError` - Database operation failed
    async fn create(&self, record: RefreshTokenRecord)
        -> Result<RefreshTokenRecord, SessionError>;

    /// Delete the record holding `token`.
    ///
    /// # Returns
    /// `true` when a record was removed, `false` when none matched
    ///
    /// # Errors
    /// * `DatabaseError` - Database operation failed
    async fn delete_by_token(&self, token: &str) -> Result<bool, SessionError>;
}
