use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use uuid::Uuid;

use super::errors::JwtError;
use crate::role::Role;

/// Session token claims.
///
/// The payload is `{userId, role}`; `iat`, `exp` and `jti` are stamped at
/// issuance. `jti` keeps two tokens issued for the same user within the same
/// second distinct, so a stored refresh token always identifies one session.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Claims {
    /// Subject (user identifier)
    #[serde(rename = "userId")]
    pub user_id: String,

    pub role: Role,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Unique token identifier
    pub jti: String,
}

impl Claims {
    /// Create claims issued now and valid for `ttl`.
    pub fn new(user_id: impl ToString, role: Role, ttl: Duration) -> Self {
        Self::issued_at(user_id, role, Utc::now(), ttl)
    }

    /// Create claims issued at an explicit instant.
    pub fn issued_at(user_id: impl ToString, role: Role, now: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            user_id: user_id.to_string(),
            role,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            jti: Uuid::new_v4().to_string(),
        }
    }

    /// Expiration as a timestamp.
    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.exp, 0).unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

/// Wire shape accepted when decoding.
///
/// Every payload field is optional so that a correctly signed token with a
/// missing or mistyped field is reported as an invalid payload rather than
/// as a malformed token.
#[derive(Debug, Deserialize)]
pub(crate) struct RawClaims {
    #[serde(rename = "userId", default)]
    user_id: Option<serde_json::Value>,
    #[serde(default)]
    role: Option<serde_json::Value>,
    #[serde(default)]
    iat: Option<i64>,
    #[serde(default)]
    exp: Option<i64>,
    #[serde(default)]
    jti: Option<String>,
}

impl TryFrom<RawClaims> for Claims {
    type Error = JwtError;

    fn try_from(raw: RawClaims) -> Result<Self, Self::Error> {
        let user_id = match raw.user_id {
            Some(serde_json::Value::String(id)) if !id.is_empty() => id,
            _ => return Err(JwtError::InvalidPayload("missing userId".to_string())),
        };

        let role = match raw.role {
            Some(serde_json::Value::String(role)) => role
                .parse::<Role>()
                .map_err(|e| JwtError::InvalidPayload(e.to_string()))?,
            _ => return Err(JwtError::InvalidPayload("missing role".to_string())),
        };

        let exp = raw
            .exp
            .ok_or_else(|| JwtError::InvalidPayload("missing exp".to_string()))?;

        Ok(Self {
            user_id,
            role,
            iat: raw.iat.unwrap_or_default(),
            exp,
            jti: raw.jti.unwrap_or_default(),
        })
    }
}
