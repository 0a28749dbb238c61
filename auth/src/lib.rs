//! Authentication utilities library
//!
//! Provides the credential primitives used by the session service:
//! - Password hashing and comparison (Argon2id)
//! - Closed role set carried inside tokens
//! - Session token signing and verification with separate access/refresh keys
//!
//! # Examples
//!
//! ## Password Hashing
//! ```
//! use auth::{hash_password, verify_password};
//!
//! let hash = hash_password("my_password").unwrap();
//! assert!(verify_password("my_password", &hash).unwrap());
//! ```
//!
//! ## Session Tokens
//! ```
//! use auth::{Role, TokenCodec, TokenSettings};
//! use chrono::Duration;
//!
//! let codec = TokenCodec::new(
//!     TokenSettings::new("access_secret_at_least_32_bytes_long!", Duration::minutes(15)),
//!     TokenSettings::new("refresh_secret_at_least_32_bytes_long", Duration::days(7)),
//! );
//!
//! let pair = codec.issue_pair("user123", Role::User).unwrap();
//! let claims = codec.verify_access(&pair.access_token).unwrap();
//! assert_eq!(claims.user_id, "user123");
//! assert!(codec.verify_refresh(&pair.access_token).is_err());
//! ```

pub mod jwt;
pub mod password;
pub mod role;
pub mod tokens;

// Re-export commonly used items
pub use jwt::Claims;
pub use jwt::JwtError;
pub use jwt::JwtHandler;
pub use password::hash_password;
pub use password::verify_password;
pub use password::PasswordError;
pub use role::Role;
pub use role::RoleError;
pub use tokens::TokenCodec;
pub use tokens::TokenKind;
pub use tokens::TokenPair;
pub use tokens::TokenSettings;
