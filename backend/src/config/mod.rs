//! Configuration module for the DeptSync backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use chrono::FixedOffset;

/// Errors raised while reading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to SQLite database file
    pub db_path: PathBuf,
    /// Path to Tantivy search index directory
    pub index_path: PathBuf,
    /// Root directory for uploaded attachments
    pub upload_dir: PathBuf,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Secret used to sign bearer tokens
    pub token_secret: String,
    /// Lifetime of issued bearer tokens
    pub token_ttl: Duration,
    /// Password of the seeded `admin` account
    pub admin_password: String,
    /// Offset of the department's wall clock from UTC
    pub utc_offset: FixedOffset,
    /// Maximum accepted upload size in bytes
    pub max_upload_bytes: usize,
    /// AI provider settings
    pub ai: AiConfig,
}

/// Settings for the OpenAI-compatible report generator.
#[derive(Debug, Clone)]
pub struct AiConfig {
    pub api_base: String,
    /// Generation is disabled when no key is configured
    pub api_key: Option<String>,
    pub model: String,
    pub timeout: Duration,
}

const DEFAULT_TOKEN_SECRET: &str = "deptsync-secret-key-change-in-production";

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let db_path = env::var("DEPTSYNC_DB_PATH")
            .unwrap_or_else(|_| "./data/deptsync.sqlite".to_string())
            .into();

        let index_path = env::var("DEPTSYNC_INDEX_PATH")
            .unwrap_or_else(|_| "./data/index".to_string())
            .into();

        let upload_dir = env::var("DEPTSYNC_UPLOAD_DIR")
            .unwrap_or_else(|_| "./data/uploads".to_string())
            .into();

        let bind_addr = parse_var("DEPTSYNC_BIND_ADDR", "127.0.0.1:8000")?;

        let log_level = env::var("DEPTSYNC_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let token_secret =
            env::var("DEPTSYNC_TOKEN_SECRET").unwrap_or_else(|_| DEFAULT_TOKEN_SECRET.to_string());

        let token_ttl_hours: u64 = parse_var("DEPTSYNC_TOKEN_TTL_HOURS", "168")?;

        let admin_password =
            env::var("DEPTSYNC_ADMIN_PASSWORD").unwrap_or_else(|_| "admin".to_string());

        let offset_raw = env::var("DEPTSYNC_UTC_OFFSET").unwrap_or_else(|_| "+08:00".to_string());
        let utc_offset = parse_offset(&offset_raw).ok_or(ConfigError::Invalid {
            name: "DEPTSYNC_UTC_OFFSET",
            value: offset_raw.clone(),
        })?;

        let max_upload_mb: usize = parse_var("DEPTSYNC_MAX_UPLOAD_MB", "50")?;

        let ai_timeout_secs: u64 = parse_var("DEPTSYNC_AI_TIMEOUT_SECS", "60")?;

        let ai = AiConfig {
            api_base: env::var("DEPTSYNC_OPENAI_API_BASE")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            api_key: env::var("DEPTSYNC_OPENAI_API_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty()),
            model: env::var("DEPTSYNC_OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o".to_string()),
            timeout: Duration::from_secs(ai_timeout_secs),
        };

        Ok(Self {
            db_path,
            index_path,
            upload_dir,
            bind_addr,
            log_level,
            token_secret,
            token_ttl: Duration::from_secs(token_ttl_hours * 3600),
            admin_password,
            utc_offset,
            max_upload_bytes: max_upload_mb * 1024 * 1024,
            ai,
        })
    }

    /// Whether the token secret is still the shipped default.
    pub fn uses_default_secret(&self) -> bool {
        self.token_secret == DEFAULT_TOKEN_SECRET
    }
}

fn parse_var<T: std::str::FromStr>(name: &'static str, default: &str) -> Result<T, ConfigError> {
    let value = env::var(name).unwrap_or_else(|_| default.to_string());
    value
        .parse()
        .map_err(|_| ConfigError::Invalid { name, value })
}

/// Parse a `+HH:MM` / `-HH:MM` offset.
pub fn parse_offset(raw: &str) -> Option<FixedOffset> {
    let raw = raw.trim();
    let (sign, rest) = match raw.chars().next()? {
        '+' => (1, &raw[1..]),
        '-' => (-1, &raw[1..]),
        _ => (1, raw),
    };
    let (hours, minutes) = rest.split_once(':').unwrap_or((rest, "0"));
    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = minutes.parse().ok()?;
    if hours > 23 || minutes > 59 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}
