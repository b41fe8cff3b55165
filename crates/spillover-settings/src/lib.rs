//! # spillover-settings
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`SpilloverSettings::default()`]
//! 2. **User file**: `~/.spillover/settings.json` (deep-merged over defaults)
//! 3. **Environment variables**: `SPILLOVER_*` overrides (highest priority)
//!
//! The loaded value is handed to each component at startup; there is no
//! global instance.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, load_settings, load_settings_from_path, settings_path, spillover_home};
pub use types::*;
