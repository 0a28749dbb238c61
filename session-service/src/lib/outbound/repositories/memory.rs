use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::session::errors::SessionError;
use crate::domain::session::models::EmailAddress;
use crate::domain::session::models::RefreshTokenRecord;
use crate::domain::session::models::User;
use crate::domain::session::models::UserCredentials;
use crate::domain::session::ports::RefreshTokenRepository;
use crate::domain::session::ports::UserRepository;

/// Process-local user store keyed by email.
#[derive(Default)]
pub struct InMemoryUserRepository {
    users: RwLock<HashMap<EmailAddress, UserCredentials>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create(&self, credentials: UserCredentials) -> Result<User, SessionError> {
        let mut users = self.users.write().await;

        if users.contains_key(&credentials.user.email) {
            return Err(SessionError::EmailAlreadyExists(
                credentials.user.email.to_string(),
            ));
        }

        let user = credentials.user.clone();
        users.insert(user.email.clone(), credentials);
        Ok(user)
    }

    async fn exists_by_email(&self, email: &EmailAddress) -> Result<bool, SessionError> {
        Ok(self.users.read().await.contains_key(email))
    }

    async fn find_by_email(
        &self,
        email: &EmailAddress,
    ) -> Result<Option<UserCredentials>, SessionError> {
        Ok(self.users.read().await.get(email).cloned())
    }
}

/// Process-local refresh-token store keyed by token value.
#[derive(Default)]
pub struct InMemoryRefreshTokenRepository {
    records: RwLock<HashMap<String, RefreshTokenRecord>>,
}

impl InMemoryRefreshTokenRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }
}

#[async_trait]
impl RefreshTokenRepository for InMemoryRefreshTokenRepository {
    async fn create(&self, record: RefreshTokenRecord) -> Result<RefreshTokenRecord, SessionError> {
        self.records
            .write()
            .await
            .insert(record.token.clone(), record.clone());
        Ok(record)
    }

    async fn delete_by_token(&self, token: &str) -> Result<bool, SessionError> {
        Ok(self.records.write().await.remove(token).is_some())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use chrono::Utc;

    use super::*;
    use crate::domain::session::models::RefreshTokenId;
    use crate::domain::session::models::Role;
    use crate::domain::session::models::UserId;
    use crate::domain::session::models::Username;

    fn credentials(email: &str) -> UserCredentials {
        UserCredentials {
            user: User {
                id: UserId::new(),
                username: Username::new("ana".to_string()).unwrap(),
                email: EmailAddress::new(email.to_string()).unwrap(),
                role: Role::User,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
            password_hash: "hash".to_string(),
        }
    }

    #[tokio::test]
    async fn test_user_email_is_unique() {
        let repo = InMemoryUserRepository::new();
        repo.create(credentials("ana@x.com")).await.unwrap();

        let result = repo.create(credentials("ANA@x.com")).await;
        assert!(matches!(result, Err(SessionError::EmailAlreadyExists(_))));

        let email = EmailAddress::new("ana@x.com".to_string()).unwrap();
        assert!(repo.exists_by_email(&email).await.unwrap());
        assert_eq!(
            repo.find_by_email(&email).await.unwrap().unwrap().password_hash,
            "hash"
        );
    }

    #[tokio::test]
    async fn test_refresh_token_delete_once() {
        let repo = InMemoryRefreshTokenRepository::new();
        repo.create(RefreshTokenRecord {
            id: RefreshTokenId::new(),
            user_id: UserId::new(),
            token: "t1".to_string(),
            user_agent: "ua".to_string(),
            ip: "127.0.0.1".to_string(),
            expires_at: Utc::now() + Duration::days(7),
            created_at: Utc::now(),
        })
        .await
        .unwrap();

        assert_eq!(repo.len().await, 1);
        assert!(repo.delete_by_token("t1").await.unwrap());
        assert!(!repo.delete_by_token("t1").await.unwrap());
        assert_eq!(repo.len().await, 0);
    }
}
