//! Environment-backed runtime configuration for `roomlist-replay`.

use std::{env, error::Error, fmt, path::PathBuf};

use roomlist_core::DEFAULT_SORT_DELAY_MS;
use roomlist_platform::DEFAULT_CAPACITY_BYTES;
use roomlist_view::RoomListSettings;

const DEFAULT_DATA_DIR: &str = "./.roomlist-replay-store";
const THUMBNAIL_SUBDIR: &str = "thumbnails";
const DEFAULT_TICK_MS: u64 = 50;

/// Runtime configuration used by the replay app.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayConfig {
    /// JSON script to replay.
    pub script_path: PathBuf,
    /// Root for the on-disk image cache.
    pub data_dir: PathBuf,
    /// Directory serving `mxc://server/id` thumbnails as `server/id` files.
    pub thumbnail_dir: PathBuf,
    /// Delay between pointer leave and deferred sort.
    pub sort_delay_ms: u64,
    /// Image cache budget.
    pub cache_capacity_bytes: u64,
    /// Scheduler tick used while waiting.
    pub tick_ms: u64,
}

impl ReplayConfig {
    /// Parse configuration from environment variables; `script_arg` wins over
    /// `ROOMLIST_SCRIPT`.
    pub fn from_env(script_arg: Option<String>) -> Result<Self, ConfigError> {
        Self::from_lookup(script_arg, |key| env::var(key).ok())
    }

    fn from_lookup<F>(script_arg: Option<String>, mut lookup: F) -> Result<Self, ConfigError>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let script_path = script_arg
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty())
            .or_else(|| optional_trimmed_env("ROOMLIST_SCRIPT", &mut lookup))
            .map(PathBuf::from)
            .ok_or(ConfigError::Missing {
                key: "ROOMLIST_SCRIPT",
            })?;

        let data_dir = optional_trimmed_env("ROOMLIST_DATA_DIR", &mut lookup)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));
        let thumbnail_dir = optional_trimmed_env("ROOMLIST_THUMBNAIL_DIR", &mut lookup)
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join(THUMBNAIL_SUBDIR));

        let sort_delay_ms =
            parse_u64_with_default("ROOMLIST_SORT_DELAY_MS", DEFAULT_SORT_DELAY_MS, &mut lookup)?;
        let cache_capacity_bytes = parse_u64_with_default(
            "ROOMLIST_CACHE_CAPACITY_BYTES",
            DEFAULT_CAPACITY_BYTES,
            &mut lookup,
        )?;
        let tick_ms = parse_u64_with_default("ROOMLIST_TICK_MS", DEFAULT_TICK_MS, &mut lookup)?;

        if cache_capacity_bytes == 0 {
            return Err(ConfigError::InvalidValue {
                key: "ROOMLIST_CACHE_CAPACITY_BYTES",
                value: "0".to_owned(),
                reason: "must be at least 1".to_owned(),
            });
        }
        if tick_ms == 0 {
            return Err(ConfigError::InvalidValue {
                key: "ROOMLIST_TICK_MS",
                value: "0".to_owned(),
                reason: "must be at least 1".to_owned(),
            });
        }

        Ok(Self {
            script_path,
            data_dir,
            thumbnail_dir,
            sort_delay_ms,
            cache_capacity_bytes,
            tick_ms,
        })
    }

    /// View settings derived from this configuration.
    pub fn room_list_settings(&self) -> RoomListSettings {
        RoomListSettings {
            sort_delay_ms: self.sort_delay_ms,
            ..RoomListSettings::default()
        }
    }
}

/// Errors produced while parsing runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A required value was not provided.
    Missing { key: &'static str },
    /// An environment variable could not be parsed.
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing { key } => write!(f, "missing {key} (or script path argument)"),
            Self::InvalidValue { key, value, reason } => {
                write!(f, "invalid {key}='{value}': {reason}")
            }
        }
    }
}

impl Error for ConfigError {}

fn optional_trimmed_env<F>(key: &'static str, lookup: &mut F) -> Option<String>
where
    F: FnMut(&str) -> Option<String>,
{
    lookup(key)
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

fn parse_u64_with_default<F>(
    key: &'static str,
    default: u64,
    lookup: &mut F,
) -> Result<u64, ConfigError>
where
    F: FnMut(&str) -> Option<String>,
{
    let Some(value) = optional_trimmed_env(key, lookup) else {
        return Ok(default);
    };
    value
        .parse::<u64>()
        .map_err(|err| ConfigError::InvalidValue {
            key,
            value,
            reason: err.to_string(),
        })
}
