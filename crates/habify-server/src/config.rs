use std::env;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result, bail};
use tracing::info;

use habify_engine::ResubmitPolicy;

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &["change-me-to-a-random-string", "dev-secret-change-me"];

pub struct Config {
    pub jwt_secret: String,
    pub db_path: PathBuf,
    pub host: String,
    pub port: u16,
    pub token_ttl_days: i64,
    pub reset_ttl_minutes: i64,
    pub public_url: String,
    pub resubmit_policy: ResubmitPolicy,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let jwt_secret = env::var("HABIFY_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("HABIFY_JWT_SECRET is unset or still a placeholder; set it in .env and restart");
        }

        Ok(Self {
            jwt_secret,
            db_path: try_load::<String>("HABIFY_DB_PATH", "habify.db")?.into(),
            host: try_load("HABIFY_HOST", "0.0.0.0")?,
            port: try_load("HABIFY_PORT", "8000")?,
            token_ttl_days: try_load("HABIFY_TOKEN_TTL_DAYS", "30")?,
            reset_ttl_minutes: try_load("HABIFY_RESET_TTL_MINUTES", "60")?,
            public_url: try_load("HABIFY_PUBLIC_URL", "http://localhost:3000")?,
            resubmit_policy: try_load("HABIFY_RESUBMIT_POLICY", "once-per-day")?,
        })
    }
}

fn try_load<T>(key: &str, default: &str) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    let raw = env::var(key).unwrap_or_else(|_| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });
    raw.parse()
        .map_err(|e| anyhow::anyhow!("{e}"))
        .with_context(|| format!("invalid {key} value: {raw}"))
}
