//! # battle-settings
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults** ([`BattleSettings::default()`])
//! 2. **User file** `~/.agent-battle/settings.json`, or the path in
//!    `BATTLE_SETTINGS` (deep-merged over defaults)
//! 3. **Environment variables** `BATTLE_*` overrides (highest priority)
//!
//! Provider API keys never come from the file; see [`load_api_keys`].

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, load_api_keys, load_settings, load_settings_from_path, settings_path};
pub use types::*;
