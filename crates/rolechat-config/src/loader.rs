// SPDX-FileCopyrightText: 2026 Rolechat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./rolechat.toml` > `~/.config/rolechat/rolechat.toml`
//! > `/etc/rolechat/rolechat.toml` with environment variable overrides via the
//! `ROLECHAT_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::RolechatConfig;

pub(crate) const SYSTEM_CONFIG_PATH: &str = "/etc/rolechat/rolechat.toml";
pub(crate) const LOCAL_CONFIG_PATH: &str = "rolechat.toml";

/// Sections addressable from the environment. Longest names first so that
/// `rate_limit_` is never split at its inner underscore.
const ENV_SECTIONS: &[&str] = &[
    "rate_limit",
    "provider",
    "storage",
    "server",
    "safety",
    "chat",
];

pub(crate) fn user_config_path() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("rolechat/rolechat.toml"))
        .unwrap_or_default()
}

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/rolechat/rolechat.toml`
/// 3. `~/.config/rolechat/rolechat.toml`
/// 4. `./rolechat.toml`
/// 5. `ROLECHAT_*` environment variables
pub fn load_config() -> Result<RolechatConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no files, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<RolechatConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(RolechatConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from an explicit file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<RolechatConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(RolechatConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the layered Figment before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(RolechatConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG_PATH))
        .merge(Toml::file(user_config_path()))
        .merge(Toml::file(LOCAL_CONFIG_PATH))
        .merge(env_provider())
}

/// Environment provider with explicit section mapping.
///
/// `Env::split("_")` would turn `ROLECHAT_PROVIDER_API_KEY` into
/// `provider.api.key`; only the first known section prefix becomes a dot.
/// Keys reach the mapper in their original case.
fn env_provider() -> Env {
    Env::prefixed("ROLECHAT_")
        .map(|key| map_env_key(&key.as_str().to_ascii_lowercase()).into())
}

/// Maps a lowercased, prefix-stripped env key to a dotted config path.
pub(crate) fn map_env_key(key: &str) -> String {
    for section in ENV_SECTIONS {
        if let Some(rest) = key
            .strip_prefix(section)
            .and_then(|r| r.strip_prefix('_'))
            .filter(|r| !r.is_empty())
        {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_keys_map_to_sections() {
        assert_eq!(map_env_key("provider_api_key"), "provider.api_key");
        assert_eq!(map_env_key("rate_limit_max_turns"), "rate_limit.max_turns");
        assert_eq!(map_env_key("chat_max_content_chars"), "chat.max_content_chars");
        assert_eq!(map_env_key("server_port"), "server.port");
    }

    #[test]
    fn unknown_env_keys_pass_through() {
        assert_eq!(map_env_key("unrelated"), "unrelated");
        assert_eq!(map_env_key("chat"), "chat");
    }

    #[test]
    fn env_overrides_file_values() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "rolechat.toml",
                r#"
[server]
port = 9000

[provider]
model = "from-file"
"#,
            )?;
            jail.set_env("ROLECHAT_PROVIDER_MODEL", "from-env");
            jail.set_env("ROLECHAT_RATE_LIMIT_MAX_TURNS", "5");
            jail.set_env("ROLECHAT_PROVIDER_API_KEY", "sk-from-env");

            let config = load_config_from_path(Path::new("rolechat.toml"))
                .expect("config should load");
            assert_eq!(config.server.port, 9000);
            assert_eq!(config.provider.model, "from-env");
            assert_eq!(config.rate_limit.max_turns, 5);
            assert_eq!(config.provider.api_key.as_deref(), Some("sk-from-env"));
            Ok(())
        });
    }

    #[test]
    fn env_applies_to_the_standard_hierarchy() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("ROLECHAT_SERVER_PORT", "8123");
            jail.set_env("ROLECHAT_CHAT_MAX_CONTENT_CHARS", "500");

            let config: RolechatConfig = build_figment().extract()?;
            assert_eq!(config.server.port, 8123);
            assert_eq!(config.chat.max_content_chars, 500);
            Ok(())
        });
    }
}
