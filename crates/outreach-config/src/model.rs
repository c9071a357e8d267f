// SPDX-FileCopyrightText: 2026 Outreach Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup.

use serde::{Deserialize, Serialize};

/// Top-level Outreach configuration.
///
/// Every section is optional and defaults to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct OutreachConfig {
    /// Process-level settings and the gateway bind address.
    #[serde(default)]
    pub server: ServerConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Campaign sequencer settings.
    #[serde(default)]
    pub sequencer: SequencerConfig,

    /// Live chat settings.
    #[serde(default)]
    pub chat: ChatConfig,
}

/// Process and gateway configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Host address the gateway binds to.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port the gateway binds to.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3100
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("outreach").join("outreach.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("outreach.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Campaign sequencer configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SequencerConfig {
    /// Run the sequencer inside `outreach serve`.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Seconds between ticks.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Seconds a claimed enrollment stays locked to one instance.
    #[serde(default = "default_claim_timeout_secs")]
    pub claim_timeout_secs: u64,

    /// Failed attempts at one step before the enrollment is marked failed.
    /// `0` retries forever.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: default_interval_secs(),
            claim_timeout_secs: default_claim_timeout_secs(),
            max_attempts: default_max_attempts(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_interval_secs() -> u64 {
    60
}

fn default_claim_timeout_secs() -> u64 {
    300
}

fn default_max_attempts() -> u32 {
    10
}

/// What `chat:init` does when the supplied lead id does not resolve.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownLeadPolicy {
    /// Create a fresh chat-widget lead and continue.
    #[default]
    Create,
    /// Answer with an `error` event and leave the session untouched.
    Reject,
}

/// Live chat configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ChatConfig {
    /// Lead id clients send when they have no lead yet.
    #[serde(default = "default_anonymous_lead_id")]
    pub anonymous_lead_id: String,

    #[serde(default)]
    pub unknown_lead_policy: UnknownLeadPolicy,

    /// Phrases that make the default responder request a human handover.
    #[serde(default = "default_handover_keywords")]
    pub handover_keywords: Vec<String>,

    /// Per-connection outbound queue length; events beyond it are dropped.
    #[serde(default = "default_outbound_buffer")]
    pub outbound_buffer: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            anonymous_lead_id: default_anonymous_lead_id(),
            unknown_lead_policy: UnknownLeadPolicy::default(),
            handover_keywords: default_handover_keywords(),
            outbound_buffer: default_outbound_buffer(),
        }
    }
}

fn default_anonymous_lead_id() -> String {
    "anonymous".to_string()
}

fn default_handover_keywords() -> Vec<String> {
    ["human", "agent", "representative", "speak to someone"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_outbound_buffer() -> usize {
    64
}
