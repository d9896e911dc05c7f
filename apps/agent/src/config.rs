use anyhow::{bail, Context, Result};

/// Which `RecordStore` implementation backs the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

/// SMTP settings for the digest mailer. An empty host puts the mailer in no-op mode.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub store_backend: StoreBackend,
    pub database_url: Option<String>,
    pub anthropic_api_key: String,
    /// The profile every job is scored against.
    pub profile_user_id: String,
    /// JSON `UserProfile` upserted at startup, if set.
    pub profile_seed_path: Option<String>,
    pub digest_sender: String,
    pub digest_recipient: String,
    pub smtp: SmtpConfig,
    /// 0 disables the in-process change-feed dispatcher.
    pub feed_poll_interval_secs: u64,
    pub feed_batch_size: usize,
    /// 0 means the digest only runs when triggered over HTTP.
    pub digest_interval_secs: u64,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let store_backend = match optional_env("STORE_BACKEND").as_deref() {
            None | Some("postgres") => StoreBackend::Postgres,
            Some("memory") => StoreBackend::Memory,
            Some(other) => bail!("STORE_BACKEND must be 'postgres' or 'memory', got '{other}'"),
        };

        let database_url = match store_backend {
            StoreBackend::Postgres => Some(require_env("DATABASE_URL")?),
            StoreBackend::Memory => optional_env("DATABASE_URL"),
        };

        Ok(Config {
            store_backend,
            database_url,
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            profile_user_id: optional_env("PROFILE_USER_ID")
                .unwrap_or_else(|| "default_user".to_string()),
            profile_seed_path: optional_env("PROFILE_SEED_PATH"),
            digest_sender: require_env("DIGEST_SENDER")?,
            digest_recipient: require_env("DIGEST_RECIPIENT")?,
            smtp: SmtpConfig {
                host: optional_env("SMTP_HOST").unwrap_or_default(),
                port: parse_env("SMTP_PORT", 587)?,
                username: optional_env("SMTP_USERNAME"),
                password: optional_env("SMTP_PASSWORD"),
            },
            feed_poll_interval_secs: parse_env("FEED_POLL_INTERVAL_SECS", 5)?,
            feed_batch_size: parse_env("FEED_BATCH_SIZE", 25)?,
            digest_interval_secs: parse_env("DIGEST_INTERVAL_SECS", 0)?,
            port: parse_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_env(key) {
        Some(raw) => raw
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid number, got '{raw}'")),
        None => Ok(default),
    }
}
