//! Settings loading with deep merge and environment variable overrides.
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::errors::{Result, SettingsError};
use crate::types::SpilloverSettings;

/// Upper bound for `tree.maxPlacementAttempts`.
pub const MAX_PLACEMENT_ATTEMPTS: u32 = 32;

/// `~/.spillover`, falling back to `/tmp/.spillover` without `HOME`.
pub fn spillover_home() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".spillover")
}

/// Resolve the path to the settings file (`~/.spillover/settings.json`).
pub fn settings_path() -> PathBuf {
    spillover_home().join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<SpilloverSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// If the file does not exist, returns defaults. If the file contains
/// invalid JSON or out-of-range values, returns an error.
pub fn load_settings_from_path(path: &Path) -> Result<SpilloverSettings> {
    let mut settings = load_file_layer(path)?;
    apply_env_overrides(&mut settings);
    Ok(settings)
}

fn load_file_layer(path: &Path) -> Result<SpilloverSettings> {
    let defaults = serde_json::to_value(SpilloverSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    let settings: SpilloverSettings = serde_json::from_value(merged)?;
    validate(&settings)?;
    Ok(settings)
}

fn validate(settings: &SpilloverSettings) -> Result<()> {
    let attempts = settings.tree.max_placement_attempts;
    if !(1..=MAX_PLACEMENT_ATTEMPTS).contains(&attempts) {
        return Err(SettingsError::InvalidValue {
            key: "tree.maxPlacementAttempts",
            detail: format!("must be 1..={MAX_PLACEMENT_ATTEMPTS}, got {attempts}"),
        });
    }
    if settings.tree.root_code.trim().is_empty() {
        return Err(SettingsError::InvalidValue {
            key: "tree.rootCode",
            detail: "must not be empty".into(),
        });
    }
    Ok(())
}

impl SpilloverSettings {
    /// Absolute database path; relative paths resolve against `~/.spillover`.
    pub fn database_path(&self) -> PathBuf {
        let path = PathBuf::from(&self.database.path);
        if path.is_absolute() {
            path
        } else {
            spillover_home().join(path)
        }
    }
}

/// Recursive deep merge of two JSON values.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply process environment overrides to loaded settings.
pub fn apply_env_overrides(settings: &mut SpilloverSettings) {
    apply_overrides(settings, |name| std::env::var(name).ok());
}

/// Apply overrides read through `lookup`.
///
/// Invalid values are ignored with a warning (fall back to file/default).
pub fn apply_overrides<F>(settings: &mut SpilloverSettings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let env = EnvReader { lookup };

    if let Some(v) = env.string("SPILLOVER_HOST") {
        settings.server.host = v;
    }
    if let Some(v) = env.u16("PORT", 0, 65535) {
        settings.server.port = v;
    }
    if let Some(v) = env.u16("SPILLOVER_PORT", 0, 65535) {
        settings.server.port = v;
    }
    if let Some(v) = env.string("SPILLOVER_DB") {
        settings.database.path = v;
    }
    if let Some(v) = env.string("SPILLOVER_JWT_SECRET") {
        settings.auth.jwt_secret = v;
    }
    if let Some(v) = env.u64("SPILLOVER_TOKEN_TTL_SECS", 60, 31_536_000) {
        settings.auth.token_ttl_secs = v;
    }
    if let Some(v) = env.u64("SPILLOVER_PLACEMENT_ATTEMPTS", 1, u64::from(MAX_PLACEMENT_ATTEMPTS)) {
        settings.tree.max_placement_attempts = v as u32;
    }
    if let Some(raw) = env.string("SPILLOVER_COUNT_RULE") {
        match raw.parse() {
            Ok(rule) => settings.tree.count_rule = rule,
            Err(e) => tracing::warn!(key = "SPILLOVER_COUNT_RULE", value = %raw, error = %e, "ignoring"),
        }
    }
    if let Some(v) = env.string("SPILLOVER_LOG_LEVEL") {
        settings.logging.level = v;
    }
    if let Some(v) = env.bool("SPILLOVER_LOG_JSON") {
        settings.logging.json = v;
    }
}

// ── Pure parsing functions (testable without env vars) ──────────────────────

/// Parse a string as a boolean.
///
/// Accepts (case-insensitive): `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`.
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a string as a `u16` within a range.
pub fn parse_u16_range(val: &str, min: u16, max: u16) -> Option<u16> {
    let n: u16 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `u64` within a range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

struct EnvReader<F> {
    lookup: F,
}

impl<F> EnvReader<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn string(&self, name: &str) -> Option<String> {
        (self.lookup)(name).filter(|v| !v.is_empty())
    }

    fn bool(&self, name: &str) -> Option<bool> {
        let val = self.string(name)?;
        let result = parse_bool(&val);
        if result.is_none() {
            tracing::warn!(key = name, value = %val, "invalid boolean env var, ignoring");
        }
        result
    }

    fn u16(&self, name: &str, min: u16, max: u16) -> Option<u16> {
        let val = self.string(name)?;
        let result = parse_u16_range(&val, min, max);
        if result.is_none() {
            tracing::warn!(key = name, value = %val, "invalid u16 env var, ignoring");
        }
        result
    }

    fn u64(&self, name: &str, min: u64, max: u64) -> Option<u64> {
        let val = self.string(name)?;
        let result = parse_u64_range(&val, min, max);
        if result.is_none() {
            tracing::warn!(key = name, value = %val, "invalid u64 env var, ignoring");
        }
        result
    }
}
