// Application configuration loaded from environment variables
//
// DATABASE_URL    PostgreSQL connection string (not needed with USER_STORE=memory)
// HOST / PORT     bind address (default 0.0.0.0:8080)
// JWT_SECRET      token signing secret, at least 32 bytes
// COOKIE_SECRET   cookie signing secret, at least 32 bytes, different from JWT_SECRET
// TOKEN_TTL_SECS  token and cookie lifetime (default 7 days, at most 365 days)
// APP_ENV         development | production; production marks cookies Secure
// USER_STORE      postgres | memory
// ADMIN_EMAIL / ADMIN_PASSWORD  optional administrator seeded at startup

use chrono::Duration;
use std::str::FromStr;
use thiserror::Error;

use crate::auth::token::DEFAULT_TOKEN_TTL_SECS;

/// Longest accepted session lifetime: 365 days
pub const MAX_TOKEN_TTL_SECS: i64 = 31_536_000;

const MIN_SECRET_BYTES: usize = 32;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    Missing(&'static str),
    #[error("{name} has an invalid value: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(format!("unknown environment '{}'", other)),
        }
    }
}

/// Where user records live
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres { database_url: String },
    Memory,
}

/// First administrator created at startup when both variables are set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminBootstrap {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub cookie_secret: String,
    pub token_ttl: Duration,
    pub environment: Environment,
    pub store: StoreBackend,
    pub admin: Option<AdminBootstrap>,
}

impl AppConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let host = var("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = parse_or("PORT", var("PORT"), 8080u16)?;

        let jwt_secret = require_secret("JWT_SECRET", var("JWT_SECRET"))?;
        let cookie_secret = require_secret("COOKIE_SECRET", var("COOKIE_SECRET"))?;
        if jwt_secret == cookie_secret {
            return Err(ConfigError::Invalid {
                name: "COOKIE_SECRET",
                reason: "must differ from JWT_SECRET".to_string(),
            });
        }

        let ttl_secs = parse_or("TOKEN_TTL_SECS", var("TOKEN_TTL_SECS"), DEFAULT_TOKEN_TTL_SECS)?;
        if ttl_secs <= 0 {
            return Err(ConfigError::Invalid {
                name: "TOKEN_TTL_SECS",
                reason: "must be positive".to_string(),
            });
        }
        if ttl_secs > MAX_TOKEN_TTL_SECS {
            return Err(ConfigError::Invalid {
                name: "TOKEN_TTL_SECS",
                reason: format!("must be at most {} seconds", MAX_TOKEN_TTL_SECS),
            });
        }
        let token_ttl = Duration::try_seconds(ttl_secs).ok_or_else(|| ConfigError::Invalid {
            name: "TOKEN_TTL_SECS",
            reason: "out of range".to_string(),
        })?;

        let environment = parse_or("APP_ENV", var("APP_ENV"), Environment::Development)?;

        let store = match var("USER_STORE").as_deref().map(str::to_ascii_lowercase).as_deref() {
            None | Some("postgres") => StoreBackend::Postgres {
                database_url: var("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?,
            },
            Some("memory") => StoreBackend::Memory,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: "USER_STORE",
                    reason: format!("unknown store '{}'", other),
                })
            }
        };

        let admin = match (var("ADMIN_EMAIL"), var("ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => Some(AdminBootstrap { email, password }),
            (None, None) => None,
            (Some(_), None) => return Err(ConfigError::Missing("ADMIN_PASSWORD")),
            (None, Some(_)) => return Err(ConfigError::Missing("ADMIN_EMAIL")),
        };

        Ok(Self {
            host,
            port,
            jwt_secret,
            cookie_secret,
            token_ttl,
            environment,
            store,
            admin,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Cookies get the `Secure` attribute outside development
    pub fn secure_cookies(&self) -> bool {
        self.environment == Environment::Production
    }
}

fn require_secret(name: &'static str, value: Option<String>) -> Result<String, ConfigError> {
    let secret = value.ok_or(ConfigError::Missing(name))?;
    if secret.len() < MIN_SECRET_BYTES {
        return Err(ConfigError::Invalid {
            name,
            reason: format!("must be at least {} bytes long", MIN_SECRET_BYTES),
        });
    }
    Ok(secret)
}

fn parse_or<T>(name: &'static str, value: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}
