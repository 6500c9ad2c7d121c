#![deny(clippy::print_stdout, clippy::print_stderr)]

use anyhow::Context;
use serde::Deserialize;

/// Process-wide configuration, loaded once at startup from environment
/// variables (optionally via a `.env` file) under the `VANTAGE_` prefix.
/// Missing or malformed required fields are a fatal startup error.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub bind_address: String,
    pub token_secret_base64: String,
    pub token_ttl_hours: i64,
    pub database_url: String,
    pub broker_url: String,
    pub login_rate_limit_capacity: u32,
    pub register_rate_limit_capacity: u32,
    pub trial_window_days: i64,
    pub subscription_duration_days: i64,
    pub ai_chat_quota_active: u32,
    pub ai_chat_quota_trial: u32,
    pub ai_chat_quota_free: u32,
    pub cors_allowed_origins: Vec<String>,
}

impl Settings {
    /// Reads `.env` (if present) then layers defaults under explicit
    /// `VANTAGE_*` environment variables. A `.env` file is optional; its
    /// absence is not an error.
    pub fn load() -> anyhow::Result<Self> {
        if let Err(err) = dotenvy::dotenv()
            && !err.not_found()
        {
            return Err(err).context("failed to read .env file");
        }

        let raw = config::Config::builder()
            .set_default("bind_address", "0.0.0.0:8080")?
            .set_default("token_ttl_hours", 24)?
            .set_default("database_url", "")?
            .set_default("broker_url", "amqp://127.0.0.1:5672/%2f")?
            .set_default("login_rate_limit_capacity", 5)?
            .set_default("register_rate_limit_capacity", 3)?
            .set_default("trial_window_days", 5)?
            .set_default("subscription_duration_days", 30)?
            .set_default("ai_chat_quota_active", 50)?
            .set_default("ai_chat_quota_trial", 10)?
            .set_default("ai_chat_quota_free", 3)?
            .set_default("cors_allowed_origins", Vec::<String>::new())?
            .add_source(
                config::Environment::with_prefix("VANTAGE")
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("cors_allowed_origins")
                    .try_parsing(true),
            )
            .build()
            .context("failed to assemble configuration sources")?;

        let settings: Settings = raw
            .try_deserialize()
            .context("failed to deserialize configuration")?;

        if settings.token_secret_base64.trim().is_empty() {
            anyhow::bail!("VANTAGE_TOKEN_SECRET_BASE64 must be set to a base64-encoded signing secret");
        }

        Ok(settings)
    }
}
