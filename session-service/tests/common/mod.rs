use std::net::SocketAddr;
use std::sync::Arc;

use auth::TokenCodec;
use auth::TokenSettings;
use sqlx::postgres::PgConnectOptions;
use sqlx::Connection;
use sqlx::Executor;
use sqlx::PgConnection;
use sqlx::PgPool;
use session_service::config::Environment;
use session_service::domain::session::service::SessionService;
use session_service::inbound::http::router::create_router;
use session_service::inbound::http::router::AppState;
use session_service::rate_limit::RateLimiter;
use session_service::rate_limit::RatePolicies;
use session_service::repositories::InMemoryRefreshTokenRepository;
use session_service::repositories::postgres;
use session_service::repositories::InMemoryUserRepository;

pub const ACCESS_SECRET: &str = "test-access-secret-for-jwt-signing-0123456789";
pub const REFRESH_SECRET: &str = "test-refresh-secret-for-jwt-signing-0123456789";
pub const ADMIN_EMAIL: &str = "boss@example.com";

/// Test application that spawns a real server
pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub api_client: reqwest::Client,
    pub token_codec: Arc<TokenCodec>,
    pub refresh_tokens: Arc<InMemoryRefreshTokenRepository>,
}

pub fn token_codec() -> TokenCodec {
    TokenCodec::new(
        TokenSettings::new(ACCESS_SECRET, chrono::Duration::minutes(15)),
        TokenSettings::new(REFRESH_SECRET, chrono::Duration::days(7)),
    )
}

impl TestApp {
    /// Spawn the application with default rate limits
    pub async fn spawn() -> Self {
        Self::spawn_with(RatePolicies::default()).await
    }

    /// Spawn the application in a background task and return TestApp
    pub async fn spawn_with(policies: RatePolicies) -> Self {
        // Use random port (0 = OS assigns)
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind random port");
        let port = listener.local_addr().unwrap().port();
        let address = format!("http://127.0.0.1:{}", port);

        let token_codec = Arc::new(token_codec());
        let refresh_tokens = Arc::new(InMemoryRefreshTokenRepository::new());

        let session_service = Arc::new(SessionService::new(
            Arc::new(InMemoryUserRepository::new()),
            Arc::clone(&refresh_tokens),
            Arc::clone(&token_codec),
            vec![ADMIN_EMAIL.to_string()],
        ));

        let state = AppState::new(
            session_service,
            Arc::clone(&token_codec),
            Arc::new(RateLimiter::new(policies)),
            Environment::Test,
            "memory",
        );
        let router = create_router(state);

        // Spawn server in background
        tokio::spawn(async move {
            axum::serve(
                listener,
                router.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .expect("Server error");
        });

        Self {
            address,
            port,
            api_client: reqwest::Client::builder()
                .build()
                .expect("Failed to create reqwest client"),
            token_codec,
            refresh_tokens,
        }
    }

    /// Helper to make GET request
    pub fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.api_client.get(format!("{}{}", self.address, path))
    }

    /// Helper to make POST request
    pub fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.api_client.post(format!("{}{}", self.address, path))
    }

    /// Helper to make POST request with Bearer token
    pub fn post_authenticated(&self, path: &str, token: &str) -> reqwest::RequestBuilder {
        self.post(path).bearer_auth(token)
    }

    pub async fn sign_up(&self, username: &str, email: &str, password: &str) -> reqwest::Response {
        self.post("/api/v1/auth/sign-up")
            .json(&serde_json::json!({
                "username": username,
                "email": email,
                "password": password
            }))
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn login(&self, email: &str, password: &str) -> reqwest::Response {
        self.post("/api/v1/auth/login")
            .json(&serde_json::json!({
                "email": email,
                "password": password
            }))
            .send()
            .await
            .expect("Failed to execute request")
    }

    /// Sign up and return `(access token, refresh token)`.
    pub async fn session(&self, username: &str, email: &str) -> (String, String) {
        let response = self.sign_up(username, email, "secret1").await;
        let refresh_token = refresh_cookie(&response).expect("Missing refresh cookie");
        let body: serde_json::Value = response.json().await.expect("Failed to parse response");
        let access_token = body["data"]["accessToken"]
            .as_str()
            .expect("Missing access token")
            .to_string();
        (access_token, refresh_token)
    }
}

/// `Set-Cookie` header for the refresh token, if any.
pub fn refresh_cookie_header(response: &reqwest::Response) -> Option<String> {
    response
        .headers()
        .get_all(reqwest::header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find(|value| value.starts_with("refreshToken="))
        .map(str::to_string)
}

/// Refresh token value carried by the response cookie, if any.
pub fn refresh_cookie(response: &reqwest::Response) -> Option<String> {
    refresh_cookie_header(response).and_then(|header| {
        header
            .split(';')
            .next()
            .and_then(|pair| pair.strip_prefix("refreshToken="))
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    })
}

/// Per-test PostgreSQL database, created from `DATABASE_URL`.
pub struct TestDb {
    pub pool: PgPool,
    pub db_name: String,
    admin_url: String,
}

impl TestDb {
    /// Create a fresh database with migrations applied.
    ///
    /// Returns `None` when `DATABASE_URL` is unset so the caller can skip.
    pub async fn from_env() -> Option<Self> {
        let Ok(admin_url) = std::env::var("DATABASE_URL") else {
            eprintln!("DATABASE_URL not set, skipping PostgreSQL test");
            return None;
        };

        let db_name = format!(
            "test_session_service_{}",
            uuid::Uuid::new_v4().to_string().replace('-', "_")
        );

        let mut conn = PgConnection::connect(&admin_url)
            .await
            .expect("Failed to connect to Postgres");
        conn.execute(format!(r#"CREATE DATABASE "{}";"#, db_name).as_str())
            .await
            .expect("Failed to create test database");

        let options = admin_url
            .parse::<PgConnectOptions>()
            .expect("Failed to parse DATABASE_URL")
            .database(&db_name);

        // Runs the migrations as well.
        let pool = postgres::connect_with(options, 5)
            .await
            .expect("Failed to connect to test database");

        Some(Self {
            pool,
            db_name,
            admin_url,
        })
    }
}

impl Drop for TestDb {
    fn drop(&mut self) {
        let db_name = self.db_name.clone();
        let admin_url = self.admin_url.clone();
        tokio::spawn(async move {
            if let Ok(mut conn) = PgConnection::connect(&admin_url).await {
                let _ = conn
                    .execute(
                        format!(
                            r#"SELECT pg_terminate_backend(pid) FROM pg_stat_activity WHERE datname = '{}';"#,
                            db_name
                        )
                        .as_str(),
                    )
                    .await;
                let _ = conn
                    .execute(format!(r#"DROP DATABASE IF EXISTS "{}";"#, db_name).as_str())
                    .await;
            }
        });
    }
}
