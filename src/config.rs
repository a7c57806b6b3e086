//! Configuration types.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use chrono_tz::Tz;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use secrecy::SecretString;

use crate::error::ConfigError;

/// Funnel runtime configuration.
#[derive(Debug, Clone)]
pub struct FunnelConfig {
    /// Snapshot file holding every user's conversation state.
    pub state_path: PathBuf,
    /// Directory holding the catalog JSON files.
    pub catalog_dir: PathBuf,
    /// Root directory that media keys are resolved against.
    pub media_dir: PathBuf,
    /// Delay before the web-payment follow-up prompt fires.
    pub follow_up_delay: Duration,
    /// Delay before reinitializing a channel whose session dropped.
    pub reconnect_delay: Duration,
    /// Local currency units per foreign currency unit.
    pub exchange_rate: Decimal,
    /// Identity prefix (country code) that marks the local region.
    pub local_prefix: String,
    /// Timezone used for the business-hours gate and log timestamps.
    pub timezone: Tz,
}

impl Default for FunnelConfig {
    fn default() -> Self {
        Self {
            state_path: PathBuf::from("./data/states.json"),
            catalog_dir: PathBuf::from("./data"),
            media_dir: PathBuf::from("./media"),
            follow_up_delay: Duration::from_secs(180), // 3 minutes
            reconnect_delay: Duration::from_secs(10),
            exchange_rate: dec!(3.7),
            local_prefix: "51".to_string(),
            timezone: chrono_tz::America::Lima,
        }
    }
}

impl FunnelConfig {
    /// Build from `FUNNEL_*` environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (environment, test fixtures).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let follow_up_secs = parse_or(&lookup, "FUNNEL_FOLLOW_UP_SECS", 180u64)?;
        let reconnect_secs = parse_or(&lookup, "FUNNEL_RECONNECT_SECS", 10u64)?;
        let exchange_rate = parse_or(&lookup, "FUNNEL_EXCHANGE_RATE", defaults.exchange_rate)?;
        if exchange_rate <= Decimal::ZERO {
            return Err(ConfigError::InvalidValue {
                key: "FUNNEL_EXCHANGE_RATE".into(),
                message: "must be positive".into(),
            });
        }

        let timezone = match lookup("FUNNEL_TIMEZONE") {
            Some(raw) => raw.parse::<Tz>().map_err(|e| ConfigError::InvalidValue {
                key: "FUNNEL_TIMEZONE".into(),
                message: e.to_string(),
            })?,
            None => defaults.timezone,
        };

        Ok(Self {
            state_path: lookup("FUNNEL_STATE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.state_path),
            catalog_dir: lookup("FUNNEL_CATALOG_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.catalog_dir),
            media_dir: lookup("FUNNEL_MEDIA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.media_dir),
            follow_up_delay: Duration::from_secs(follow_up_secs),
            reconnect_delay: Duration::from_secs(reconnect_secs),
            exchange_rate,
            local_prefix: lookup("FUNNEL_LOCAL_PREFIX").unwrap_or(defaults.local_prefix),
            timezone,
        })
    }
}

/// Telegram channel configuration.
#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub bot_token: SecretString,
    pub allowed_users: Vec<String>,
}

impl TelegramConfig {
    /// Returns `None` when `TELEGRAM_BOT_TOKEN` is unset.
    pub fn from_env() -> Option<Self> {
        let token = std::env::var("TELEGRAM_BOT_TOKEN").ok()?;
        let allowed_users = std::env::var("TELEGRAM_ALLOWED_USERS")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Some(Self {
            bot_token: SecretString::from(token),
            allowed_users,
        })
    }
}

fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        }),
        None => Ok(default),
    }
}
