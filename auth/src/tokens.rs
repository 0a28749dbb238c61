use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;

use crate::jwt::Claims;
use crate::jwt::JwtError;
use crate::jwt::JwtHandler;
use crate::role::Role;

/// Which of the two signing keys a token belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Secret and lifetime for one token kind.
#[derive(Clone)]
pub struct TokenSettings {
    pub secret: Vec<u8>,
    pub ttl: Duration,
}

impl TokenSettings {
    pub fn new(secret: impl AsRef<[u8]>, ttl: Duration) -> Self {
        Self {
            secret: secret.as_ref().to_vec(),
            ttl,
        }
    }
}

/// Access and refresh tokens issued together for one session.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub refresh_expires_at: DateTime<Utc>,
}

/// Signs and verifies session tokens with independent access and refresh keys.
///
/// A token signed for one kind never verifies as the other because each kind
/// has its own secret.
pub struct TokenCodec {
    access: JwtHandler,
    access_ttl: Duration,
    refresh: JwtHandler,
    refresh_ttl: Duration,
}

impl TokenCodec {
    pub fn new(access: TokenSettings, refresh: TokenSettings) -> Self {
        Self {
            access: JwtHandler::new(&access.secret),
            access_ttl: access.ttl,
            refresh: JwtHandler::new(&refresh.secret),
            refresh_ttl: refresh.ttl,
        }
    }

    pub fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }

    /// Sign a fresh token of `kind` for the given subject.
    ///
    /// # Returns
    /// The compact token together with the claims embedded in it
    ///
    /// # Errors
    /// * `EncodingFailed` - Token encoding failed
    pub fn sign(
        &self,
        kind: TokenKind,
        user_id: impl ToString,
        role: Role,
    ) -> Result<(String, Claims), JwtError> {
        let claims = Claims::new(user_id, role, self.ttl(kind));
        let token = self.handler(kind).encode(&claims)?;
        Ok((token, claims))
    }

    /// Issue an access/refresh pair bound to the same subject.
    pub fn issue_pair(&self, user_id: impl ToString, role: Role) -> Result<TokenPair, JwtError> {
        let user_id = user_id.to_string();
        let (access_token, _) = self.sign(TokenKind::Access, &user_id, role)?;
        let (refresh_token, refresh_claims) = self.sign(TokenKind::Refresh, &user_id, role)?;

        Ok(TokenPair {
            access_token,
            refresh_token,
            refresh_expires_at: refresh_claims.expires_at(),
        })
    }

    /// Verify a token against the key of `kind`.
    ///
    /// # Errors
    /// * `TokenExpired` - Token lifetime elapsed
    /// * `InvalidToken` - Wrong key, bad signature or malformed token
    /// * `InvalidPayload` - Payload lacks `userId` or `role`
    pub fn verify(&self, kind: TokenKind, token: &str) -> Result<Claims, JwtError> {
        self.handler(kind).decode(token)
    }

    pub fn verify_access(&self, token: &str) -> Result<Claims, JwtError> {
        self.verify(TokenKind::Access, token)
    }

    pub fn verify_refresh(&self, token: &str) -> Result<Claims, JwtError> {
        self.verify(TokenKind::Refresh, token)
    }

    fn handler(&self, kind: TokenKind) -> &JwtHandler {
        match kind {
            TokenKind::Access => &self.access,
            TokenKind::Refresh => &self.refresh,
        }
    }

    fn ttl(&self, kind: TokenKind) -> Duration {
        match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        }
    }
}
