//! Server configuration, loaded from environment variables.

use chrono::FixedOffset;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
#[error("config error: {0}")]
pub struct ConfigError(String);

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_path: String,
    /// Title of the game the current week is played on.
    pub active_game: String,
    pub reset_offset: FixedOffset,
    pub rollover_check_interval: Duration,
    /// Present only when `MIRROR_ENABLED=true`.
    pub mirror: Option<MirrorConfig>,
}

#[derive(Debug, Clone)]
pub struct MirrorConfig {
    pub api_url: String,
    pub token: String,
    pub document_id: String,
    pub file_name: String,
    pub timeout: Duration,
}

impl ServerConfig {
    /// Optional variables and defaults:
    /// - `HOST` (`0.0.0.0`), `PORT` (`3001`), `DATABASE_PATH` (`retro-club.db`)
    /// - `ACTIVE_GAME` (`TETRIS GB`)
    /// - `RESET_UTC_OFFSET_MINUTES` (`0`)
    /// - `ROLLOVER_CHECK_SECS` (`300`)
    /// - `MIRROR_ENABLED` (`false`); when true `MIRROR_TOKEN` and
    ///   `MIRROR_DOCUMENT_ID` are required, and `MIRROR_API_URL`,
    ///   `MIRROR_FILE_NAME`, `MIRROR_TIMEOUT_MS` (`10000`) are read.
    pub fn from_env() -> Result<Self, ConfigError> {
        let offset_minutes: i32 = parse_var("RESET_UTC_OFFSET_MINUTES", "0")?;
        let reset_offset = offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| {
                ConfigError(format!("RESET_UTC_OFFSET_MINUTES out of range: {}", offset_minutes))
            })?;

        let mirror_enabled: bool = parse_var("MIRROR_ENABLED", "false")?;
        let mirror = if mirror_enabled {
            Some(MirrorConfig {
                api_url: var_or("MIRROR_API_URL", "https://api.github.com"),
                token: required_var("MIRROR_TOKEN")?,
                document_id: required_var("MIRROR_DOCUMENT_ID")?,
                file_name: var_or("MIRROR_FILE_NAME", "retro_game_club_data.json"),
                timeout: Duration::from_millis(parse_var("MIRROR_TIMEOUT_MS", "10000")?),
            })
        } else {
            None
        };

        Ok(Self {
            host: var_or("HOST", "0.0.0.0"),
            port: parse_var("PORT", "3001")?,
            database_path: var_or("DATABASE_PATH", "retro-club.db"),
            active_game: var_or("ACTIVE_GAME", "TETRIS GB"),
            reset_offset,
            rollover_check_interval: Duration::from_secs(parse_var("ROLLOVER_CHECK_SECS", "300")?),
            mirror,
        })
    }
}

fn var_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_owned())
}

fn required_var(name: &str) -> Result<String, ConfigError> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError(format!("missing required env var {}", name))),
    }
}

fn parse_var<T>(name: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    var_or(name, default)
        .trim()
        .parse()
        .map_err(|e| ConfigError(format!("invalid {}: {}", name, e)))
}
