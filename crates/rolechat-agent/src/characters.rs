// SPDX-FileCopyrightText: 2026 Rolechat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Character store backed by the `[[characters]]` config entries.

use std::collections::HashMap;

use async_trait::async_trait;
use rolechat_config::model::CharacterConfig;
use rolechat_core::{Character, CharacterStore, RolechatError, VoiceParams};

#[derive(Debug, Clone, Default)]
pub struct ConfigCharacterStore {
    characters: HashMap<i64, Character>,
}

impl ConfigCharacterStore {
    /// Characters with an empty prompt get `default_prompt`.
    pub fn new(entries: &[CharacterConfig], default_prompt: &str) -> Self {
        let characters = entries
            .iter()
            .map(|c| {
                let system_prompt = if c.system_prompt.trim().is_empty() {
                    default_prompt.to_string()
                } else {
                    c.system_prompt.clone()
                };
                let character = Character {
                    id: c.id,
                    name: c.name.clone(),
                    system_prompt,
                    voice: VoiceParams {
                        rate: c.voice.rate,
                        pitch: c.voice.pitch,
                        volume: c.voice.volume,
                    },
                };
                (c.id, character)
            })
            .collect();
        Self { characters }
    }

    pub fn len(&self) -> usize {
        self.characters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.characters.is_empty()
    }
}

#[async_trait]
impl CharacterStore for ConfigCharacterStore {
    async fn get_character(&self, id: i64) -> Result<Option<Character>, RolechatError> {
        Ok(self.characters.get(&id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rolechat_config::model::VoiceConfig;

    fn entry(id: i64, prompt: &str) -> CharacterConfig {
        CharacterConfig {
            id,
            name: format!("c{id}"),
            system_prompt: prompt.into(),
            voice: VoiceConfig::default(),
        }
    }

    #[tokio::test]
    async fn looks_up_by_id() {
        let store = ConfigCharacterStore::new(&[entry(7, "You are Ada.")], "default");
        let ada = store.get_character(7).await.unwrap().unwrap();
        assert_eq!(ada.system_prompt, "You are Ada.");
        assert_eq!(ada.voice, VoiceParams::default());
        assert!(store.get_character(8).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn empty_prompt_falls_back_to_default() {
        let store = ConfigCharacterStore::new(&[entry(1, "  ")], "default");
        let c = store.get_character(1).await.unwrap().unwrap();
        assert_eq!(c.system_prompt, "default");
        assert_eq!(store.len(), 1);
    }
}
