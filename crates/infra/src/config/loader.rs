//! Configuration loader
//!
//! Resolves engine configuration in three layers: an optional config file,
//! `SATCHEL_*` environment overrides on top, then validation of the merged
//! result. A missing file is fine; every section of [`Config`] has working
//! defaults.
//!
//! ## File resolution
//! 1. `SATCHEL_CONFIG` - explicit path; if set, the file must exist and parse
//! 2. `satchel.toml`, `satchel.json`, `config.toml`, `config.json` in the
//!    working directory, first hit wins
//!
//! ## Environment overrides
//! - `SATCHEL_BASE_URL`: Origin that relative request URLs resolve against
//! - `SATCHEL_HTTP_TIMEOUT_SECS`: Per-request network timeout in seconds
//! - `SATCHEL_DATA_DIR`: Directory for persisted snapshots
//! - `SATCHEL_SYNC_INTERVAL`: Periodic replay interval in seconds
//! - `SATCHEL_SYNC_ENABLED`: Whether the periodic replay runs
//! - `SATCHEL_COLLECTION_CAPACITY`: Item cap per bounded collection
//! - `SATCHEL_QUEUE_MAX_ATTEMPTS`: Replay attempts before dead-lettering
//! - `SATCHEL_QUERY_TIMEOUT_MS`: Bounded wait for bus queries

use std::path::Path;
use std::path::PathBuf;

use satchel_domain::{Config, Result, SatchelError};

const PROBE_NAMES: [&str; 4] = ["satchel.toml", "satchel.json", "config.toml", "config.json"];

/// Load the engine configuration.
///
/// Starts from a resolved config file when one exists, otherwise from
/// [`Config::default`], applies environment overrides, and validates the
/// merged result.
///
/// # Errors
/// Returns `SatchelError::Config` if:
/// - `SATCHEL_CONFIG` points at a missing or unreadable file
/// - A found config file fails to parse
/// - An environment override holds an unparsable value
/// - The merged configuration fails validation
pub fn load() -> Result<Config> {
    let mut config = match resolve_config_path()? {
        Some(path) => load_from_file(&path)?,
        None => {
            tracing::debug!("no config file found; starting from defaults");
            Config::default()
        }
    };

    apply_env_overrides(&mut config)?;
    config.validate()?;

    Ok(config)
}

/// Figure out which config file to read, if any.
///
/// An explicit `SATCHEL_CONFIG` beats probing, and pointing it at a missing
/// file is an error instead of a silent fall-through to defaults.
fn resolve_config_path() -> Result<Option<PathBuf>> {
    if let Ok(explicit) = std::env::var("SATCHEL_CONFIG") {
        let path = PathBuf::from(explicit);
        if !path.exists() {
            return Err(SatchelError::Config(format!(
                "SATCHEL_CONFIG points at {}, which does not exist",
                path.display()
            )));
        }
        return Ok(Some(path));
    }

    let cwd = match std::env::current_dir() {
        Ok(dir) => dir,
        Err(_) => return Ok(None),
    };

    Ok(PROBE_NAMES.iter().map(|name| cwd.join(name)).find(|candidate| candidate.exists()))
}

/// Read and parse a single config file, format chosen by extension.
///
/// # Errors
/// Returns `SatchelError::Config` when the file cannot be read, has an
/// extension other than `.toml`/`.json`, or fails to parse.
pub fn load_from_file(path: &Path) -> Result<Config> {
    tracing::info!(path = %path.display(), "loading configuration file");

    let contents = std::fs::read_to_string(path).map_err(|e| {
        SatchelError::Config(format!("failed to read config file {}: {e}", path.display()))
    })?;

    match path.extension().and_then(|e| e.to_str()) {
        Some("toml") => toml::from_str(&contents)
            .map_err(|e| SatchelError::Config(format!("invalid TOML in {}: {e}", path.display()))),
        Some("json") => serde_json::from_str(&contents)
            .map_err(|e| SatchelError::Config(format!("invalid JSON in {}: {e}", path.display()))),
        other => Err(SatchelError::Config(format!(
            "unsupported config extension {:?} for {}",
            other.unwrap_or(""),
            path.display()
        ))),
    }
}

/// Apply `SATCHEL_*` environment variable overrides to a configuration
///
/// Only variables that are set change anything; a variable that is set but
/// unparsable is an error rather than a silent fallback.
///
/// # Errors
/// Returns `SatchelError::Config` if a set variable has an invalid value.
pub fn apply_env_overrides(config: &mut Config) -> Result<()> {
    if let Ok(base_url) = std::env::var("SATCHEL_BASE_URL") {
        config.http.base_url = Some(base_url);
    }
    if let Some(timeout) = env_override::<u64>("SATCHEL_HTTP_TIMEOUT_SECS")? {
        config.http.timeout_secs = timeout;
    }
    if let Ok(dir) = std::env::var("SATCHEL_DATA_DIR") {
        config.storage.data_dir = PathBuf::from(dir);
    }
    if let Some(interval) = env_override::<u64>("SATCHEL_SYNC_INTERVAL")? {
        config.sync.interval_seconds = interval;
    }
    if let Some(enabled) = env_bool("SATCHEL_SYNC_ENABLED")? {
        config.sync.enabled = enabled;
    }
    if let Some(capacity) = env_override::<usize>("SATCHEL_COLLECTION_CAPACITY")? {
        config.cache.collection_capacity = capacity;
    }
    if let Some(attempts) = env_override::<u32>("SATCHEL_QUEUE_MAX_ATTEMPTS")? {
        config.queue.max_attempts = attempts;
    }
    if let Some(timeout) = env_override::<u64>("SATCHEL_QUERY_TIMEOUT_MS")? {
        config.bus.query_timeout_ms = timeout;
    }

    Ok(())
}

/// Parse an optional environment override
///
/// # Errors
/// Returns `SatchelError::Config` if the variable is set but unparsable.
fn env_override<T: std::str::FromStr>(key: &str) -> Result<Option<T>>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|e| SatchelError::Config(format!("invalid {key}: {e}"))),
        Err(_) => Ok(None),
    }
}

/// Parse a boolean environment variable
///
/// Accepts `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` in any case.
/// Anything else set in the variable is an error, not a quiet `false`.
fn env_bool(key: &str) -> Result<Option<bool>> {
    let raw = match std::env::var(key) {
        Ok(raw) => raw,
        Err(_) => return Ok(None),
    };

    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(Some(true)),
        "0" | "false" | "no" | "off" => Ok(Some(false)),
        other => {
            Err(SatchelError::Config(format!("invalid {key}: expected a boolean, got {other:?}")))
        }
    }
}
