//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`BattleSettings::default()`]
//! 2. If the settings file exists, deep-merge user values over defaults
//! 3. Apply environment variable overrides (highest priority)
//! 4. Validate cross-field constraints
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use battle_core::security::{env_vars, ApiKey, ApiKeys};

use crate::errors::{Result, SettingsError};
use crate::types::BattleSettings;

/// Environment variable naming an explicit settings file.
pub const SETTINGS_PATH_VAR: &str = "BATTLE_SETTINGS";

/// `$BATTLE_SETTINGS`, else `~/.agent-battle/settings.json`.
pub fn settings_path() -> PathBuf {
    if let Some(explicit) = read_env_string(SETTINGS_PATH_VAR) {
        return PathBuf::from(explicit);
    }
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".agent-battle").join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<BattleSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// If the file does not exist, returns defaults. If the file contains
/// invalid JSON, returns an error.
pub fn load_settings_from_path(path: &Path) -> Result<BattleSettings> {
    load_with(path, |name| std::env::var(name).ok())
}

fn load_with(path: &Path, env: impl Fn(&str) -> Option<String>) -> Result<BattleSettings> {
    let defaults = serde_json::to_value(BattleSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    let mut settings: BattleSettings = serde_json::from_value(merged)?;
    apply_overrides(&mut settings, env);
    validate(&settings)?;
    Ok(settings)
}

/// Recursive deep merge of two JSON values.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = match target_map.remove(&key) {
                    Some(target_val) => deep_merge(target_val, source_val),
                    None => source_val,
                };
                target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply `BATTLE_*` overrides read through `env`. Invalid values are logged
/// and ignored.
fn apply_overrides(settings: &mut BattleSettings, env: impl Fn(&str) -> Option<String>) {
    let read = |name: &str| env(name).filter(|v| !v.trim().is_empty());

    // ── Server ──────────────────────────────────────────────────────
    if let Some(v) = read("BATTLE_HOST") {
        settings.server.host = v;
    }
    if let Some(v) = read("BATTLE_PORT").and_then(|v| checked("BATTLE_PORT", &v, parse_u16_range(&v, 1, 65535))) {
        settings.server.port = v;
    }
    if let Some(v) = read("BATTLE_CORS_ORIGINS") {
        settings.server.cors_origins = parse_list(&v);
    }

    // ── Debate ──────────────────────────────────────────────────────
    if let Some(v) = read("BATTLE_DEFAULT_MAX_ROUNDS")
        .and_then(|v| checked("BATTLE_DEFAULT_MAX_ROUNDS", &v, parse_u64_range(&v, 1, 20)))
    {
        settings.debate.default_max_rounds = v as u32;
    }
    if let Some(v) = read("BATTLE_ROUND_DELAY_MS")
        .and_then(|v| checked("BATTLE_ROUND_DELAY_MS", &v, parse_u64_range(&v, 0, 60_000)))
    {
        settings.debate.round_delay_ms = v;
    }

    // ── Logging ─────────────────────────────────────────────────────
    if let Some(v) = read("BATTLE_LOG_LEVEL") {
        settings.logging.level = v;
    }
    if let Some(v) = read("BATTLE_LOG_JSON").and_then(|v| checked("BATTLE_LOG_JSON", &v, parse_bool(&v))) {
        settings.logging.json = v;
    }
}

fn checked<T>(key: &str, raw: &str, parsed: Option<T>) -> Option<T> {
    if parsed.is_none() {
        warn!(key, value = %raw, "invalid env var, ignoring");
    }
    parsed
}

fn validate(settings: &BattleSettings) -> Result<()> {
    let debate = &settings.debate;
    if debate.max_rounds_limit == 0 {
        return Err(SettingsError::InvalidValue("maxRoundsLimit must be at least 1".into()));
    }
    if debate.default_max_rounds == 0 || debate.default_max_rounds > debate.max_rounds_limit {
        return Err(SettingsError::InvalidValue(format!(
            "defaultMaxRounds must be between 1 and {}",
            debate.max_rounds_limit
        )));
    }
    if debate.event_buffer == 0 {
        return Err(SettingsError::InvalidValue("eventBuffer must be at least 1".into()));
    }
    Ok(())
}

/// Provider keys from the process environment. Gemini accepts
/// `GOOGLE_API_KEY`, falling back to `GEMINI_API_KEY`.
pub fn load_api_keys() -> ApiKeys {
    api_keys_with(|name| std::env::var(name).ok())
}

fn api_keys_with(env: impl Fn(&str) -> Option<String>) -> ApiKeys {
    let key = |name: &str| env(name).and_then(|v| ApiKey::from_non_empty(&v));
    ApiKeys {
        openai: key(env_vars::OPENAI_API_KEY),
        gemini: key(env_vars::GOOGLE_API_KEY).or_else(|| key(env_vars::GEMINI_API_KEY)),
        anthropic: key(env_vars::ANTHROPIC_API_KEY),
    }
}

// ── Pure parsing functions ──────────────────────────────────────────────────

/// Accepts (case-insensitive): `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`.
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

pub fn parse_u16_range(val: &str, min: u16, max: u16) -> Option<u16> {
    let n: u16 = val.trim().parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.trim().parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Comma-separated list, blanks dropped.
pub fn parse_list(val: &str) -> Vec<String> {
    val.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn read_env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}
