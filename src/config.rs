// src/config.rs

use std::env;
use std::net::SocketAddr;
use std::str::FromStr;

use dotenvy::dotenv;
use thiserror::Error;
use url::Url;

pub const DEFAULT_POSTS_PER_PAGE: i64 = 15;
/// Account confirmation links stay valid for a day.
pub const DEFAULT_CONFIRM_TOKEN_TTL: i64 = 24 * 60 * 60;
/// API bearer tokens expire after an hour.
pub const DEFAULT_API_TOKEN_TTL: i64 = 3600;

const DEV_SECRET_KEY: &str = "dev-secret-key-change-me";
const DEFAULT_SUBJECT_PREFIX: &str = "[Inkpost]";
const DEFAULT_SENDER: &str = "Inkpost Admin <no-reply@inkpost.local>";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set for the {1:?} profile")]
    Missing(&'static str, Profile),

    #[error("invalid value {value:?} for {key}")]
    Invalid { key: &'static str, value: String },
}

/// Environment profile selected with `APP_CONFIG`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    Development,
    Testing,
    Production,
    /// Production behind a TLS-terminating proxy; logs to stdout only.
    Heroku,
    /// Production on a plain host; logs to rolling files.
    Unix,
}

impl FromStr for Profile {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "default" | "development" => Ok(Profile::Development),
            "testing" => Ok(Profile::Testing),
            "production" => Ok(Profile::Production),
            "heroku" => Ok(Profile::Heroku),
            "unix" => Ok(Profile::Unix),
            other => Err(ConfigError::Invalid {
                key: "APP_CONFIG",
                value: other.to_string(),
            }),
        }
    }
}

impl Profile {
    pub fn is_production(self) -> bool {
        matches!(self, Profile::Production | Profile::Heroku | Profile::Unix)
    }

    pub fn default_log_level(self) -> &'static str {
        match self {
            Profile::Development => "debug",
            Profile::Testing => "error",
            Profile::Production | Profile::Heroku | Profile::Unix => "info",
        }
    }

    /// Whether a rolling log file is written next to stdout.
    pub fn logs_to_file(self) -> bool {
        matches!(self, Profile::Development | Profile::Production | Profile::Unix)
    }

    fn database_url_var(self) -> &'static str {
        match self {
            Profile::Testing => "TEST_DATABASE_URL",
            _ => "DATABASE_URL",
        }
    }

    fn default_database_url(self) -> Option<&'static str> {
        match self {
            Profile::Development => Some("sqlite://data-dev.sqlite?mode=rwc"),
            Profile::Testing => Some("sqlite::memory:"),
            _ => None,
        }
    }
}

/// Outgoing mail settings.
#[derive(Debug, Clone)]
pub struct MailConfig {
    /// SMTP relay host. Mail is only logged when unset.
    pub server: Option<String>,
    pub port: u16,
    pub use_tls: bool,
    pub username: Option<String>,
    pub password: Option<String>,
    pub subject_prefix: String,
    pub sender: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub profile: Profile,
    pub database_url: String,
    /// Signing key for confirmation and API tokens.
    pub secret_key: String,
    /// Externally visible base URL, used to build absolute links.
    pub server_url: String,
    pub bind_addr: SocketAddr,
    /// Accounts registered with this email become administrators.
    pub admin_email: Option<String>,
    pub posts_per_page: i64,
    pub ssl_disable: bool,
    pub confirm_token_ttl: i64,
    pub api_token_ttl: i64,
    pub api_rate_limit: Option<u64>,
    pub mail: MailConfig,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();

        let profile = var("APP_CONFIG")
            .map(|v| v.parse::<Profile>())
            .transpose()?
            .unwrap_or(Profile::Development);

        let database_url = match var(profile.database_url_var()) {
            Some(url) => url,
            None => profile
                .default_database_url()
                .map(str::to_string)
                .ok_or(ConfigError::Missing(profile.database_url_var(), profile))?,
        };

        let secret_key = match var("SECRET_KEY") {
            Some(key) => key,
            None if profile.is_production() => {
                return Err(ConfigError::Missing("SECRET_KEY", profile));
            }
            None => DEV_SECRET_KEY.to_string(),
        };

        let bind_addr = parse_var("BIND_ADDR", SocketAddr::from(([0, 0, 0, 0], 3000)))?;
        let server_url = var("SERVER_URL").unwrap_or_else(|| format!("http://{}", bind_addr));

        // Only the proxied deployment variant turns SSL on by default.
        let ssl_disable = match profile {
            Profile::Heroku => var("SSL_DISABLE").is_some_and(|v| parse_flag(&v)),
            _ => var("SSL_DISABLE").map(|v| parse_flag(&v)).unwrap_or(true),
        };

        let mail = MailConfig {
            server: var("MAIL_SERVER"),
            port: parse_var("MAIL_PORT", 25u16)?,
            use_tls: var("MAIL_USE_TLS").map(|v| parse_flag(&v)).unwrap_or(true),
            username: var("MAIL_USERNAME"),
            password: var("MAIL_PASSWORD"),
            subject_prefix: var("MAIL_SUBJECT_PREFIX")
                .unwrap_or_else(|| DEFAULT_SUBJECT_PREFIX.to_string()),
            sender: var("MAIL_SENDER").unwrap_or_else(|| DEFAULT_SENDER.to_string()),
        };

        let posts_per_page = parse_var("POSTS_PER_PAGE", DEFAULT_POSTS_PER_PAGE)?;
        if posts_per_page < 1 {
            return Err(ConfigError::Invalid {
                key: "POSTS_PER_PAGE",
                value: posts_per_page.to_string(),
            });
        }

        let api_rate_limit = var("API_RATE_LIMIT_PER_SECOND")
            .map(|v| {
                v.parse::<u64>().map_err(|_| ConfigError::Invalid {
                    key: "API_RATE_LIMIT_PER_SECOND",
                    value: v,
                })
            })
            .transpose()?;

        let rust_log = var("RUST_LOG").unwrap_or_else(|| profile.default_log_level().to_string());

        Ok(Self {
            profile,
            database_url,
            secret_key,
            server_url,
            bind_addr,
            admin_email: var("APP_ADMIN"),
            posts_per_page,
            ssl_disable,
            confirm_token_ttl: parse_var("CONFIRM_TOKEN_TTL", DEFAULT_CONFIRM_TOKEN_TTL)?,
            api_token_ttl: parse_var("API_TOKEN_TTL", DEFAULT_API_TOKEN_TTL)?,
            api_rate_limit,
            mail,
            rust_log,
        })
    }

    /// Deterministic configuration for tests: in-memory database, logged mail.
    pub fn for_testing() -> Self {
        Self {
            profile: Profile::Testing,
            database_url: "sqlite::memory:".to_string(),
            secret_key: "test_secret_for_integration_tests".to_string(),
            server_url: "http://localhost".to_string(),
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            admin_email: Some("admin@example.com".to_string()),
            posts_per_page: DEFAULT_POSTS_PER_PAGE,
            ssl_disable: true,
            confirm_token_ttl: DEFAULT_CONFIRM_TOKEN_TTL,
            api_token_ttl: DEFAULT_API_TOKEN_TTL,
            api_rate_limit: None,
            mail: MailConfig {
                server: None,
                port: 25,
                use_tls: false,
                username: None,
                password: None,
                subject_prefix: DEFAULT_SUBJECT_PREFIX.to_string(),
                sender: DEFAULT_SENDER.to_string(),
            },
            rust_log: Profile::Testing.default_log_level().to_string(),
        }
    }

    /// Absolute URL for `path` under `server_url`.
    pub fn external_url(&self, path: &str) -> String {
        match Url::parse(&self.server_url).and_then(|base| base.join(path)) {
            Ok(url) => url.to_string(),
            Err(_) => format!("{}{}", self.server_url.trim_end_matches('/'), path),
        }
    }
}

fn var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_var<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match var(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
        None => Ok(default),
    }
}

/// `true`, `on` and `1` (any case) switch a flag on.
pub fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "on" | "1"
    )
}
