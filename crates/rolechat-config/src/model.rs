// SPDX-FileCopyrightText: 2026 Rolechat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Rolechat service.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Rolechat configuration.
///
/// Every section is optional and falls back to the defaults below.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RolechatConfig {
    /// HTTP listener and logging.
    #[serde(default)]
    pub server: ServerConfig,

    /// SQLite storage settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Inference provider settings.
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Turn pipeline tuning.
    #[serde(default)]
    pub chat: ChatConfig,

    #[serde(default)]
    pub safety: SafetyConfig,

    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Character personas served by the config-backed character store.
    #[serde(default)]
    pub characters: Vec<CharacterConfig>,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8888
}

fn default_log_level() -> String {
    "info".to_string()
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
        .map(|p| p.join("rolechat").join("rolechat.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("rolechat.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// OpenAI-compatible provider configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
    /// API key. `None` means the `ROLECHAT_PROVIDER_API_KEY` env var must supply it.
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_model")]
    pub model: String,

    /// Maximum tokens to generate per reply.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Retries on transient HTTP status before the stream opens.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_base_url(),
            model: default_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            max_retries: default_max_retries(),
        }
    }
}

fn default_base_url() -> String {
    "https://api.deepseek.com".to_string()
}

fn default_model() -> String {
    "deepseek-chat".to_string()
}

fn default_max_tokens() -> u32 {
    1000
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_retries() -> u32 {
    1
}

/// What the relay does when its queue is full.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackpressureMode {
    /// Drop the incremental event and keep generating.
    #[default]
    Drop,
    /// Wait up to `block_timeout_ms` for room, then drop.
    Block,
}

/// Turn pipeline configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ChatConfig {
    /// Queue capacity between the turn task and the HTTP writer.
    #[serde(default = "default_relay_capacity")]
    pub relay_capacity: usize,

    /// Wall-clock budget for a whole turn.
    #[serde(default = "default_turn_timeout_secs")]
    pub turn_timeout_secs: u64,

    /// Wall-clock budget for the provider call alone.
    #[serde(default = "default_inference_timeout_secs")]
    pub inference_timeout_secs: u64,

    #[serde(default = "default_max_content_chars")]
    pub max_content_chars: usize,

    /// Title given to conversations created by a turn.
    #[serde(default = "default_title")]
    pub default_title: String,

    #[serde(default)]
    pub backpressure: BackpressureMode,

    #[serde(default = "default_block_timeout_ms")]
    pub block_timeout_ms: u64,

    /// Used when a character has an empty prompt.
    #[serde(default = "default_system_prompt")]
    pub default_system_prompt: String,

    /// Keep only the most recent N prior messages. `None` keeps everything.
    #[serde(default)]
    pub history_limit: Option<usize>,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            relay_capacity: default_relay_capacity(),
            turn_timeout_secs: default_turn_timeout_secs(),
            inference_timeout_secs: default_inference_timeout_secs(),
            max_content_chars: default_max_content_chars(),
            default_title: default_title(),
            backpressure: BackpressureMode::default(),
            block_timeout_ms: default_block_timeout_ms(),
            default_system_prompt: default_system_prompt(),
            history_limit: None,
        }
    }
}

fn default_relay_capacity() -> usize {
    16
}

fn default_turn_timeout_secs() -> u64 {
    60
}

fn default_inference_timeout_secs() -> u64 {
    60
}

fn default_max_content_chars() -> usize {
    2000
}

fn default_title() -> String {
    "New conversation".to_string()
}

fn default_block_timeout_ms() -> u64 {
    500
}

fn default_system_prompt() -> String {
    "You are a friendly character. Stay in character and reply conversationally.".to_string()
}

/// Keyword safety checker configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SafetyConfig {
    /// Case-insensitive substrings that reject a message.
    #[serde(default)]
    pub blocked_terms: Vec<String>,
}

/// Per-user fixed-window rate limit.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RateLimitConfig {
    #[serde(default = "default_rate_limit_enabled")]
    pub enabled: bool,

    /// Turns admitted per window.
    #[serde(default = "default_max_turns")]
    pub max_turns: u32,

    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: default_rate_limit_enabled(),
            max_turns: default_max_turns(),
            window_secs: default_window_secs(),
        }
    }
}

fn default_rate_limit_enabled() -> bool {
    true
}

fn default_max_turns() -> u32 {
    30
}

fn default_window_secs() -> u64 {
    60
}

/// One `[[characters]]` entry.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CharacterConfig {
    pub id: i64,

    pub name: String,

    #[serde(default)]
    pub system_prompt: String,

    #[serde(default)]
    pub voice: VoiceConfig,
}

/// TTS parameters; all default to 1.0.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct VoiceConfig {
    #[serde(default = "default_voice_param")]
    pub rate: f32,
    #[serde(default = "default_voice_param")]
    pub pitch: f32,
    #[serde(default = "default_voice_param")]
    pub volume: f32,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            rate: default_voice_param(),
            pitch: default_voice_param(),
            volume: default_voice_param(),
        }
    }
}

fn default_voice_param() -> f32 {
    1.0
}
