// SPDX-FileCopyrightText: 2026 Rolechat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Keyword content safety checker.

use async_trait::async_trait;
use rolechat_config::model::SafetyConfig;
use rolechat_core::{RolechatError, SafetyChecker, SafetyVerdict};

/// Fails any text containing one of the configured terms, ignoring case.
#[derive(Debug, Clone, Default)]
pub struct KeywordSafetyChecker {
    terms: Vec<String>,
}

impl KeywordSafetyChecker {
    pub fn new<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let terms = terms
            .into_iter()
            .map(|t| t.as_ref().trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();
        Self { terms }
    }

    pub fn from_config(config: &SafetyConfig) -> Self {
        Self::new(&config.blocked_terms)
    }

    fn verdict(&self, text: &str) -> SafetyVerdict {
        let lowered = text.to_lowercase();
        match self.terms.iter().find(|t| lowered.contains(t.as_str())) {
            Some(term) => SafetyVerdict::Fail {
                reason: format!("blocked term '{term}'"),
            },
            None => SafetyVerdict::Pass,
        }
    }
}

#[async_trait]
impl SafetyChecker for KeywordSafetyChecker {
    async fn check(&self, text: &str) -> Result<SafetyVerdict, RolechatError> {
        Ok(self.verdict(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn empty_list_passes_everything() {
        let checker = KeywordSafetyChecker::default();
        assert_eq!(checker.check("anything").await.unwrap(), SafetyVerdict::Pass);
    }

    #[tokio::test]
    async fn match_is_case_insensitive() {
        let checker = KeywordSafetyChecker::new(["Forbidden"]);
        let verdict = checker.check("this is FORBIDDEN text").await.unwrap();
        assert!(matches!(verdict, SafetyVerdict::Fail { reason } if reason.contains("forbidden")));
    }

    #[test]
    fn blank_terms_are_ignored() {
        let checker = KeywordSafetyChecker::new(["  ", "bad"]);
        assert_eq!(checker.verdict("fine"), SafetyVerdict::Pass);
        assert!(matches!(checker.verdict("bad"), SafetyVerdict::Fail { .. }));
    }
}
