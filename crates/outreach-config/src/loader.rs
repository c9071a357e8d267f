// SPDX-FileCopyrightText: 2026 Outreach Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Layered configuration loading with Figment.
//!
//! Lookup order: `./outreach.toml` > `~/.config/outreach/outreach.toml` >
//! `/etc/outreach/outreach.toml`, with `OUTREACH_*` environment overrides on top.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::OutreachConfig;

/// Config sections, used to turn `OUTREACH_SECTION_KEY` into `section.key`.
const SECTIONS: &[&str] = &["server", "storage", "sequencer", "chat"];

/// System-wide config file path.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/outreach/outreach.toml";

/// Local config file name, resolved against the working directory.
pub const LOCAL_CONFIG_FILE: &str = "outreach.toml";

/// User config file under the XDG config directory.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("outreach").join(LOCAL_CONFIG_FILE))
}

/// Load configuration from the standard hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/outreach/outreach.toml`
/// 3. `~/.config/outreach/outreach.toml`
/// 4. `./outreach.toml`
/// 5. `OUTREACH_*` environment variables
pub fn load_config() -> Result<OutreachConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no file lookup, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<OutreachConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(OutreachConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from an explicit file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<OutreachConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(OutreachConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// The Figment behind [`load_config`], before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(OutreachConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG_PATH))
        .merge(Toml::file(user_config_path().unwrap_or_default()))
        .merge(Toml::file(LOCAL_CONFIG_FILE))
        .merge(env_provider())
}

/// Maps `OUTREACH_SEQUENCER_INTERVAL_SECS` to `sequencer.interval_secs`.
///
/// Only the first underscore after a known section name becomes a dot, so
/// keys that contain underscores survive intact.
fn env_provider() -> Env {
    Env::prefixed("OUTREACH_").map(|key| {
        let key_str = key.as_str();
        for section in SECTIONS {
            if let Some(rest) = key_str
                .strip_prefix(section)
                .and_then(|r| r.strip_prefix('_'))
            {
                return format!("{section}.{rest}").into();
            }
        }
        key_str.to_string().into()
    })
}
