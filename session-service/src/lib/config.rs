use std::env;
use std::fmt;
use std::time::Duration;

use auth::TokenCodec;
use auth::TokenSettings;
use config::Config as ConfigBuilder;
use config::ConfigError;
use config::Environment as EnvironmentSource;
use config::File;
use serde::Deserialize;

use crate::rate_limit::RatePolicies;
use crate::rate_limit::RatePolicy;

/// Longest accepted token lifetime: one year.
pub const MAX_TOKEN_TTL_SECS: i64 = 365 * 24 * 60 * 60;

/// Longest accepted rate-limit window, block or sweep interval: one day.
pub const MAX_RATE_LIMIT_SECS: u64 = 24 * 60 * 60;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Deployment environment.
#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
    Test,
}

impl Environment {
    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Environment::Development => "development",
            Environment::Production => "production",
            Environment::Test => "test",
        })
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    pub http_port: u16,
    #[serde(default)]
    pub environment: Environment,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

/// Credential store settings. Without a URL the service keeps everything in memory.
#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: default_max_connections(),
        }
    }
}

fn default_max_connections() -> u32 {
    5
}

#[derive(Debug, Deserialize, Clone)]
pub struct JwtConfig {
    pub access_token_secret: String,
    #[serde(default = "default_access_ttl")]
    pub access_token_ttl_secs: i64,
    pub refresh_token_secret: String,
    #[serde(default = "default_refresh_ttl")]
    pub refresh_token_ttl_secs: i64,
}

fn default_access_ttl() -> i64 {
    15 * 60
}

fn default_refresh_ttl() -> i64 {
    7 * 24 * 60 * 60
}

impl JwtConfig {
    pub fn token_codec(&self) -> TokenCodec {
        TokenCodec::new(
            TokenSettings::new(
                &self.access_token_secret,
                chrono::Duration::seconds(self.access_token_ttl_secs),
            ),
            TokenSettings::new(
                &self.refresh_token_secret,
                chrono::Duration::seconds(self.refresh_token_ttl_secs),
            ),
        )
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AuthConfig {
    /// Emails that sign up with the admin role. Comma separated when set from the environment.
    #[serde(default, deserialize_with = "comma_separated")]
    pub admin_emails: Vec<String>,
}

fn comma_separated<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum ListOrString {
        List(Vec<String>),
        String(String),
    }

    let values = match ListOrString::deserialize(deserializer)? {
        ListOrString::List(values) => values,
        ListOrString::String(value) => value.split(',').map(str::to_string).collect(),
    };

    Ok(values
        .into_iter()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .collect())
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct RolePolicyConfig {
    pub points: u32,
    #[serde(default = "default_window")]
    pub window_secs: u64,
    #[serde(default = "default_block")]
    pub block_secs: u64,
}

fn default_window() -> u64 {
    60
}

fn default_block() -> u64 {
    5 * 60
}

impl RolePolicyConfig {
    fn per_minute(points: u32) -> Self {
        Self {
            points,
            window_secs: default_window(),
            block_secs: default_block(),
        }
    }

    fn policy(&self) -> RatePolicy {
        RatePolicy {
            points: self.points,
            window: Duration::from_secs(self.window_secs),
            block_duration: Duration::from_secs(self.block_secs),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RateLimitConfig {
    pub admin: RolePolicyConfig,
    pub editor: RolePolicyConfig,
    pub author: RolePolicyConfig,
    pub user: RolePolicyConfig,
    /// How often idle buckets are evicted.
    #[serde(default = "default_sweep")]
    pub sweep_interval_secs: u64,
}

fn default_sweep() -> u64 {
    60
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            admin: RolePolicyConfig::per_minute(300),
            editor: RolePolicyConfig::per_minute(150),
            author: RolePolicyConfig::per_minute(100),
            user: RolePolicyConfig::per_minute(50),
            sweep_interval_secs: default_sweep(),
        }
    }
}

impl RateLimitConfig {
    pub fn policies(&self) -> RatePolicies {
        RatePolicies {
            admin: self.admin.policy(),
            editor: self.editor.policy(),
            author: self.author.policy(),
            user: self.user.policy(),
        }
    }

    fn roles(&self) -> [(&'static str, &RolePolicyConfig); 4] {
        [
            ("admin", &self.admin),
            ("editor", &self.editor),
            ("author", &self.author),
            ("user", &self.user),
        ]
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_filter")]
    pub filter: String,
    #[serde(default)]
    pub json: bool,
}

fn default_filter() -> String {
    "session_service=debug,tower_http=debug".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
            json: false,
        }
    }
}

impl Config {
    /// Load configuration from files with environment variable overrides
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables (JWT__ACCESS_TOKEN_SECRET, SERVER__HTTP_PORT, etc.)
    /// 2. Environment-specific config file (config/{environment}.toml)
    /// 3. Default config file (config/default.toml)
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let configuration = ConfigBuilder::builder()
            // Start with default configuration
            .add_source(File::with_name("config/default").required(false))
            // Layer on environment-specific configuration
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Layer on environment variables (with __ as separator)
            // Example: JWT__ACCESS_TOKEN_SECRET=... overrides jwt.access_token_secret
            .add_source(EnvironmentSource::default().separator("__"))
            .build()?;

        let config: Config = configuration.try_deserialize()?;
        config.validate()?;

        Ok(config)
    }

    /// Reject settings the service cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let jwt = &self.jwt;
        if jwt.access_token_secret.is_empty() || jwt.refresh_token_secret.is_empty() {
            return Err(ConfigError::Message(
                "jwt secrets must not be empty".to_string(),
            ));
        }
        if jwt.access_token_secret == jwt.refresh_token_secret {
            return Err(ConfigError::Message(
                "jwt access and refresh secrets must differ".to_string(),
            ));
        }
        for (name, ttl) in [
            ("access_token_ttl_secs", jwt.access_token_ttl_secs),
            ("refresh_token_ttl_secs", jwt.refresh_token_ttl_secs),
        ] {
            if !(1..=MAX_TOKEN_TTL_SECS).contains(&ttl) {
                return Err(ConfigError::Message(format!(
                    "jwt.{} must be between 1 and {}",
                    name, MAX_TOKEN_TTL_SECS
                )));
            }
        }

        for (role, policy) in self.rate_limit.roles() {
            if policy.points == 0 || policy.window_secs == 0 {
                return Err(ConfigError::Message(format!(
                    "rate_limit.{} needs at least one point per non-empty window",
                    role
                )));
            }
            if policy.window_secs > MAX_RATE_LIMIT_SECS || policy.block_secs > MAX_RATE_LIMIT_SECS {
                return Err(ConfigError::Message(format!(
                    "rate_limit.{} window and block must not exceed {} seconds",
                    role, MAX_RATE_LIMIT_SECS
                )));
            }
        }
        if !(1..=MAX_RATE_LIMIT_SECS).contains(&self.rate_limit.sweep_interval_secs) {
            return Err(ConfigError::Message(format!(
                "rate_limit.sweep_interval_secs must be between 1 and {}",
                MAX_RATE_LIMIT_SECS
            )));
        }

        Ok(())
    }
}
