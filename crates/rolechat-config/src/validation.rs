// SPDX-FileCopyrightText: 2026 Rolechat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.

use std::collections::HashSet;

use crate::diagnostic::ConfigError;
use crate::model::RolechatConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration.
///
/// Collects every violation instead of stopping at the first.
pub fn validate_config(config: &RolechatConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    let host = config.server.host.trim();
    if host.is_empty() {
        errors.push(ConfigError::validation("server.host must not be empty"));
    } else if host.parse::<std::net::IpAddr>().is_err()
        && !host
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-')
    {
        errors.push(ConfigError::validation(format!(
            "server.host `{host}` is not a valid IP address or hostname"
        )));
    }

    if config.server.port == 0 {
        errors.push(ConfigError::validation("server.port must not be 0"));
    }

    if !LOG_LEVELS.contains(&config.server.log_level.as_str()) {
        errors.push(ConfigError::validation(format!(
            "server.log_level must be one of {}, got `{}`",
            LOG_LEVELS.join(", "),
            config.server.log_level
        )));
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::validation(
            "storage.database_path must not be empty",
        ));
    }

    if config.provider.base_url.trim().is_empty() {
        errors.push(ConfigError::validation("provider.base_url must not be empty"));
    }
    if config.provider.model.trim().is_empty() {
        errors.push(ConfigError::validation("provider.model must not be empty"));
    }
    if config.provider.max_tokens == 0 {
        errors.push(ConfigError::validation(
            "provider.max_tokens must be at least 1",
        ));
    }
    let temperature = config.provider.temperature;
    if !(0.0..=2.0).contains(&temperature) {
        errors.push(ConfigError::validation(format!(
            "provider.temperature must be between 0.0 and 2.0, got {temperature}"
        )));
    }

    let chat = &config.chat;
    if chat.relay_capacity == 0 {
        errors.push(ConfigError::validation("chat.relay_capacity must be at least 1"));
    }
    if chat.turn_timeout_secs == 0 {
        errors.push(ConfigError::validation(
            "chat.turn_timeout_secs must be at least 1",
        ));
    }
    if chat.inference_timeout_secs == 0 {
        errors.push(ConfigError::validation(
            "chat.inference_timeout_secs must be at least 1",
        ));
    }
    if chat.max_content_chars == 0 {
        errors.push(ConfigError::validation(
            "chat.max_content_chars must be at least 1",
        ));
    }
    if chat.default_title.trim().is_empty() {
        errors.push(ConfigError::validation("chat.default_title must not be empty"));
    }
    if chat.history_limit == Some(0) {
        errors.push(ConfigError::validation(
            "chat.history_limit must be at least 1 when set",
        ));
    }

    if config.rate_limit.enabled {
        if config.rate_limit.max_turns == 0 {
            errors.push(ConfigError::validation(
                "rate_limit.max_turns must be at least 1",
            ));
        }
        if config.rate_limit.window_secs == 0 {
            errors.push(ConfigError::validation(
                "rate_limit.window_secs must be at least 1",
            ));
        }
    }

    if config.safety.blocked_terms.iter().any(|t| t.trim().is_empty()) {
        errors.push(ConfigError::validation(
            "safety.blocked_terms must not contain empty terms",
        ));
    }

    let mut seen = HashSet::new();
    for (i, character) in config.characters.iter().enumerate() {
        if character.id <= 0 {
            errors.push(ConfigError::validation(format!(
                "characters[{i}].id must be positive, got {}",
                character.id
            )));
        }
        if !seen.insert(character.id) {
            errors.push(ConfigError::validation(format!(
                "duplicate character id {} in [[characters]] array",
                character.id
            )));
        }
        if character.name.trim().is_empty() {
            errors.push(ConfigError::validation(format!(
                "characters[{i}].name must not be empty"
            )));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
