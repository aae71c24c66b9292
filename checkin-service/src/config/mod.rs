use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use service_core::config::{self as core_config, get_env};
use service_core::error::AppError;
use std::env;

/// 24 hours, the freshness window for issued tokens.
pub const DEFAULT_VALIDITY_WINDOW_MS: i64 = 24 * 60 * 60 * 1000;

/// Tolerated clock drift between the issuing and scanning hosts.
pub const DEFAULT_CLOCK_SKEW_MS: i64 = 30_000;

/// The documented insecure fallback secret. Deployments that rely on token
/// integrity must set CHECKIN_TOKEN_SECRET; in prod it is required.
pub const DEFAULT_TOKEN_SECRET: &str = "your-secret-key";

#[derive(Debug, Clone)]
pub struct CheckinConfig {
    pub common: core_config::Config,
    pub environment: Environment,
    pub service_name: String,
    pub service_version: String,
    pub log_level: String,
    pub token: TokenConfig,
    pub security: SecurityConfig,
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Dev,
    Prod,
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dev" => Ok(Environment::Dev),
            "prod" => Ok(Environment::Prod),
            _ => Err(format!("Invalid environment: {}", s)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TokenConfig {
    pub secret: Secret<String>,
    pub validity_window_ms: i64,
    pub clock_skew_ms: i64,
}

impl TokenConfig {
    pub fn uses_default_secret(&self) -> bool {
        self.secret.expose_secret() == DEFAULT_TOKEN_SECRET
    }
}

#[derive(Debug, Clone)]
pub struct SecurityConfig {
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub issue_attempts: u32,
    pub issue_window_seconds: u64,
    pub scan_attempts: u32,
    pub scan_window_seconds: u64,
    pub global_ip_limit: u32,
    pub global_ip_window_seconds: u64,
}

impl CheckinConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let common_config = core_config::Config::load()?;

        let env_str = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string());
        let environment: Environment = env_str
            .parse()
            .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?;

        let is_prod = environment == Environment::Prod;

        let config = CheckinConfig {
            common: common_config,
            environment,
            service_name: get_env("SERVICE_NAME", Some("checkin-service"), is_prod)?,
            service_version: get_env("SERVICE_VERSION", Some(env!("CARGO_PKG_VERSION")), is_prod)?,
            log_level: get_env("LOG_LEVEL", Some("info"), is_prod)?,
            token: TokenConfig {
                secret: load_token_secret(is_prod)?,
                validity_window_ms: parse_i64(
                    "CHECKIN_TOKEN_VALIDITY_MS",
                    DEFAULT_VALIDITY_WINDOW_MS,
                    is_prod,
                )?,
                clock_skew_ms: parse_i64(
                    "CHECKIN_TOKEN_CLOCK_SKEW_MS",
                    DEFAULT_CLOCK_SKEW_MS,
                    is_prod,
                )?,
            },
            security: SecurityConfig {
                allowed_origins: get_env("ALLOWED_ORIGINS", Some("http://localhost:3000"), is_prod)?
                    .split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect(),
            },
            rate_limit: RateLimitConfig {
                issue_attempts: parse_u32("RATE_LIMIT_ISSUE_ATTEMPTS", 30, is_prod)?,
                issue_window_seconds: parse_u64("RATE_LIMIT_ISSUE_WINDOW_SECONDS", 60, is_prod)?,
                scan_attempts: parse_u32("RATE_LIMIT_SCAN_ATTEMPTS", 60, is_prod)?,
                scan_window_seconds: parse_u64("RATE_LIMIT_SCAN_WINDOW_SECONDS", 60, is_prod)?,
                global_ip_limit: parse_u32("RATE_LIMIT_GLOBAL_IP_LIMIT", 300, is_prod)?,
                global_ip_window_seconds: parse_u64(
                    "RATE_LIMIT_GLOBAL_IP_WINDOW_SECONDS",
                    60,
                    is_prod,
                )?,
            },
        };

        Ok(config)
    }
}

/// The token secret is required in prod. Outside prod an unset secret falls
/// back to the documented insecure default; main warns the operator.
fn load_token_secret(is_prod: bool) -> Result<Secret<String>, AppError> {
    match env::var("CHECKIN_TOKEN_SECRET") {
        Ok(val) => Ok(Secret::new(val)),
        Err(_) if is_prod => Err(AppError::ConfigError(anyhow::anyhow!(
            "CHECKIN_TOKEN_SECRET is required in production but not set"
        ))),
        Err(_) => Ok(Secret::new(DEFAULT_TOKEN_SECRET.to_string())),
    }
}

fn parse_i64(key: &str, default: i64, is_prod: bool) -> Result<i64, AppError> {
    get_env(key, Some(&default.to_string()), is_prod)?
        .parse()
        .map_err(|e: std::num::ParseIntError| {
            AppError::ConfigError(anyhow::anyhow!("{}: {}", key, e))
        })
}

fn parse_u32(key: &str, default: u32, is_prod: bool) -> Result<u32, AppError> {
    get_env(key, Some(&default.to_string()), is_prod)?
        .parse()
        .map_err(|e: std::num::ParseIntError| {
            AppError::ConfigError(anyhow::anyhow!("{}: {}", key, e))
        })
}

fn parse_u64(key: &str, default: u64, is_prod: bool) -> Result<u64, AppError> {
    get_env(key, Some(&default.to_string()), is_prod)?
        .parse()
        .map_err(|e: std::num::ParseIntError| {
            AppError::ConfigError(anyhow::anyhow!("{}: {}", key, e))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_secret_is_flagged() {
        let config = TokenConfig {
            secret: Secret::new(DEFAULT_TOKEN_SECRET.to_string()),
            validity_window_ms: DEFAULT_VALIDITY_WINDOW_MS,
            clock_skew_ms: DEFAULT_CLOCK_SKEW_MS,
        };
        assert!(config.uses_default_secret());
    }

    #[test]
    fn explicit_secret_is_not_flagged() {
        let config = TokenConfig {
            secret: Secret::new("an-actual-secret".to_string()),
            validity_window_ms: DEFAULT_VALIDITY_WINDOW_MS,
            clock_skew_ms: DEFAULT_CLOCK_SKEW_MS,
        };
        assert!(!config.uses_default_secret());
    }
}
