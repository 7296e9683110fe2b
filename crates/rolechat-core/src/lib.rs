// SPDX-FileCopyrightText: 2026 Rolechat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Rolechat streaming chat service.
//!
//! Holds the error taxonomy, the domain rows, the transient [`ChatEvent`]
//! and the collaborator traits. Every other crate in the workspace builds
//! on these.

pub mod error;
pub mod event;
pub mod traits;
pub mod types;

pub use error::{ErrorCategory, RolechatError};
pub use event::{ChatEvent, ChatEventKind};
pub use types::{
    AdapterType, Character, Conversation, ConversationId, ConversationStatus, HealthStatus,
    Message, MessageId, NewConversation, NewMessage, ProviderMessage, ProviderRequest,
    ProviderStreamChunk, RateDecision, Role, SafetyVerdict, TokenUsage, VoiceParams,
};

pub use traits::{
    CharacterStore, PluginAdapter, ProviderAdapter, ProviderStream, RateLimiter, SafetyChecker,
    StorageAdapter,
};

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::str::FromStr;

    #[test]
    fn role_display_and_parse_round_trip() {
        for role in [Role::User, Role::Assistant, Role::System] {
            let parsed = Role::from_str(&role.to_string()).expect("should parse back");
            assert_eq!(role, parsed);
            assert_eq!(Role::from_store(role.as_store()), role);
        }
    }

    #[test]
    fn legacy_ai_role_maps_to_assistant() {
        assert_eq!(Role::from_store("ai"), Role::Assistant);
        assert_eq!(Role::from_store("narrator"), Role::Assistant);
        assert_eq!(Role::from_store(""), Role::Assistant);
    }

    #[test]
    fn conversation_status_codes() {
        assert_eq!(ConversationStatus::Active.as_code(), 1);
        assert_eq!(ConversationStatus::from_code(2), ConversationStatus::Deleted);
        assert_eq!(ConversationStatus::from_code(1), ConversationStatus::Active);
    }

    #[test]
    fn conversation_id_sentinel() {
        assert!(ConversationId::NONE.is_none());
        assert!(!ConversationId(4).is_none());
        assert_eq!(serde_json::to_string(&ConversationId(4)).unwrap(), "4");
    }

    #[test]
    fn new_message_constructors_set_role() {
        let m = NewMessage::assistant(ConversationId(2), "hi");
        assert_eq!(m.role, Role::Assistant);
        assert!(m.token_used.is_none());
        assert_eq!(NewMessage::user(ConversationId(2), "yo").role, Role::User);
    }

    #[test]
    fn all_trait_modules_are_exported() {
        fn _assert_plugin_adapter<T: PluginAdapter>() {}
        fn _assert_provider_adapter<T: ProviderAdapter>() {}
        fn _assert_storage_adapter<T: StorageAdapter>() {}
        fn _assert_character_store<T: CharacterStore>() {}
        fn _assert_safety_checker<T: SafetyChecker>() {}
        fn _assert_rate_limiter<T: RateLimiter>() {}
    }

    proptest! {
        #[test]
        fn from_store_never_yields_user_for_other_strings(raw in "[a-z]{0,12}") {
            let role = Role::from_store(&raw);
            if raw != "user" {
                prop_assert_ne!(role, Role::User);
            }
        }
    }
}
