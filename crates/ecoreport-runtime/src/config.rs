//! Process configuration, loaded once at startup from the environment.
//!
//! The bot credential and the review-channel identifier are critical: the
//! process must not start without them. SMTP parameters are optional as a
//! block; if any of the five is missing, email delivery is disabled with a
//! single warning and everything else works normally.

use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use tracing::warn;

use ecoreport_core::MediaLimits;

use crate::transport::ChatId;

/// Errors from configuration loading. All of these are fatal.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("required environment variable {0} is not set")]
    Missing(&'static str),

    #[error("environment variable {name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// SMTP parameters for the email sink. Present only as a complete block.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub sender: String,
    /// Redacted in Debug output.
    pub password: SecretString,
    pub recipient: String,
}

/// Everything the process needs, loaded once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Chat-platform credential. Redacted in Debug output.
    pub bot_token: SecretString,
    /// The review channel that receives finalized reports.
    pub review_channel: ChatId,
    /// `None` disables email delivery.
    pub smtp: Option<SmtpConfig>,
    /// Byte caps for video and video-note attachments.
    pub media_limits: MediaLimits,
    /// Idle time after which an abandoned session is evicted.
    pub session_idle_ttl: Duration,
}

const SMTP_VARS: [&str; 5] = [
    "SMTP_HOST",
    "SMTP_PORT",
    "SMTP_SENDER",
    "SMTP_PASSWORD",
    "SMTP_RECIPIENT",
];

fn required(name: &'static str) -> Result<String, ConfigError> {
    std::env::var(name).map_err(|_| ConfigError::Missing(name))
}

fn parsed<T: std::str::FromStr>(name: &'static str, value: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|err: T::Err| ConfigError::Invalid {
        name,
        reason: err.to_string(),
    })
}

fn optional_mb(name: &'static str, default: u64) -> Result<u64, ConfigError> {
    match std::env::var(name) {
        Ok(value) => parsed(name, &value),
        Err(_) => Ok(default),
    }
}

impl SmtpConfig {
    /// Load the SMTP block; `None` when any variable is absent.
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let missing: Vec<&str> = SMTP_VARS
            .iter()
            .copied()
            .filter(|name| std::env::var(name).is_err())
            .collect();
        if !missing.is_empty() {
            warn!(missing = ?missing, "SMTP configuration incomplete; email delivery disabled");
            return Ok(None);
        }

        let port_raw = required("SMTP_PORT")?;
        Ok(Some(Self {
            host: required("SMTP_HOST")?,
            port: parsed("SMTP_PORT", &port_raw)?,
            sender: required("SMTP_SENDER")?,
            password: SecretString::from(required("SMTP_PASSWORD")?),
            recipient: required("SMTP_RECIPIENT")?,
        }))
    }
}

impl AppConfig {
    /// Load the full configuration. Missing or malformed critical values
    /// return an error; the caller logs it and exits.
    pub fn from_env() -> Result<Self, ConfigError> {
        let bot_token = SecretString::from(required("BOT_TOKEN")?);
        let channel_raw = required("REVIEW_CHANNEL_ID")?;
        let review_channel = ChatId(parsed("REVIEW_CHANNEL_ID", &channel_raw)?);

        let video_mb = optional_mb("MAX_VIDEO_SIZE_MB", MediaLimits::DEFAULT_VIDEO_MB)?;
        let video_note_mb =
            optional_mb("MAX_VIDEO_NOTE_SIZE_MB", MediaLimits::DEFAULT_VIDEO_NOTE_MB)?;

        let ttl_secs: u64 = match std::env::var("SESSION_IDLE_TTL_SECS") {
            Ok(value) => parsed("SESSION_IDLE_TTL_SECS", &value)?,
            Err(_) => 3600,
        };

        Ok(Self {
            bot_token,
            review_channel,
            smtp: SmtpConfig::from_env()?,
            media_limits: MediaLimits::from_megabytes(video_mb, video_note_mb),
            session_idle_ttl: Duration::from_secs(ttl_secs),
        })
    }
}
