//! Engine settings read from the environment.
//!
//! Every knob has a default so a bare `tickmud-engine` starts a playable demo world.
//! Values come from process environment variables (populated from `.env` files by
//! `main`), falling back to the defaults below.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use tickmud_domain::RoomId;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:4000";
pub const DEFAULT_DATABASE_URL: &str = "sqlite://tickmud.db?mode=rwc";
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 1000;
pub const DEFAULT_HEARTBEAT_TICKS: u64 = 15;
pub const DEFAULT_AREA_QUEUE_CAPACITY: usize = 256;
pub const DEFAULT_OUTBOX_CAPACITY: usize = 256;
pub const DEFAULT_WRITE_TIMEOUT_MS: u64 = 5000;
pub const DEFAULT_MAX_LINE_LENGTH: usize = 512;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SettingsError {
    #[error("Invalid value for {key}: '{value}' ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

impl SettingsError {
    fn invalid(key: &'static str, value: &str, reason: impl ToString) -> Self {
        Self::Invalid {
            key,
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    pub bind_addr: SocketAddr,
    pub database_url: String,
    pub tick_interval: Duration,
    /// Ticks between heartbeats; 0 disables regeneration.
    pub heartbeat_ticks: u64,
    /// Where new players appear. Defaults to the first room of the first area.
    pub start_room: Option<RoomId>,
    pub area_queue_capacity: usize,
    pub outbox_capacity: usize,
    pub write_timeout: Duration,
    pub max_line_length: usize,
    pub preload_world: bool,
    pub seed_demo_world: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 4000)),
            database_url: DEFAULT_DATABASE_URL.to_string(),
            tick_interval: Duration::from_millis(DEFAULT_TICK_INTERVAL_MS),
            heartbeat_ticks: DEFAULT_HEARTBEAT_TICKS,
            start_room: None,
            area_queue_capacity: DEFAULT_AREA_QUEUE_CAPACITY,
            outbox_capacity: DEFAULT_OUTBOX_CAPACITY,
            write_timeout: Duration::from_millis(DEFAULT_WRITE_TIMEOUT_MS),
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
            preload_world: false,
            seed_demo_world: true,
        }
    }
}

impl EngineSettings {
    /// Read settings from the process environment.
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, SettingsError> {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let defaults = Self::default();

        Ok(Self {
            bind_addr: parse_or(&get, "BIND_ADDR", defaults.bind_addr)?,
            database_url: get("DATABASE_URL").unwrap_or(defaults.database_url),
            tick_interval: Duration::from_millis(positive(
                "TICK_INTERVAL_MS",
                &get,
                DEFAULT_TICK_INTERVAL_MS,
            )?),
            heartbeat_ticks: parse_or(&get, "HEARTBEAT_TICKS", defaults.heartbeat_ticks)?,
            start_room: get("START_ROOM")
                .map(|value| {
                    value
                        .trim()
                        .parse::<RoomId>()
                        .map_err(|e| SettingsError::invalid("START_ROOM", &value, e))
                })
                .transpose()?,
            area_queue_capacity: positive(
                "AREA_QUEUE_CAPACITY",
                &get,
                DEFAULT_AREA_QUEUE_CAPACITY,
            )?,
            outbox_capacity: positive("OUTBOX_CAPACITY", &get, DEFAULT_OUTBOX_CAPACITY)?,
            write_timeout: Duration::from_millis(positive(
                "WRITE_TIMEOUT_MS",
                &get,
                DEFAULT_WRITE_TIMEOUT_MS,
            )?),
            max_line_length: positive("MAX_LINE_LENGTH", &get, DEFAULT_MAX_LINE_LENGTH)?,
            preload_world: flag(&get, "PRELOAD_WORLD", defaults.preload_world)?,
            seed_demo_world: flag(&get, "SEED_DEMO_WORLD", defaults.seed_demo_world)?,
        })
    }
}

fn parse_or<T>(
    get: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, SettingsError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match get(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|e| SettingsError::invalid(key, &value, e)),
        None => Ok(default),
    }
}

fn positive<T>(
    key: &'static str,
    get: &impl Fn(&str) -> Option<String>,
    default: T,
) -> Result<T, SettingsError>
where
    T: FromStr + PartialEq + Default,
    T::Err: std::fmt::Display,
{
    let value = parse_or(get, key, default)?;
    if value == T::default() {
        return Err(SettingsError::invalid(key, "0", "must be greater than zero"));
    }
    Ok(value)
}

fn flag(
    get: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: bool,
) -> Result<bool, SettingsError> {
    let Some(value) = get(key) else {
        return Ok(default);
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(SettingsError::invalid(key, &value, "expected true or false")),
    }
}
