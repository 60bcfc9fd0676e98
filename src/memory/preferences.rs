//! Keyword-heuristic preference extraction.
//!
//! A pass over conversation turns that derives preference statements from
//! a configurable keyword-to-category rule table and feeds them back into
//! the store. Extraction itself is a pure function ([`extract_candidates`])
//! so each rule can be unit-tested independent of persistence.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use super::store::MemoryStore;
use super::types::{MemoryKind, UserPreferences};
use crate::completion::ChatMessage;

/// One extraction rule: sentences containing `keyword` are recorded under
/// `category`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreferenceRule {
    pub keyword: String,
    pub category: String,
}

impl PreferenceRule {
    pub fn new(keyword: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            category: category.into(),
        }
    }
}

/// The reference rule table.
pub fn default_rules() -> Vec<PreferenceRule> {
    vec![
        PreferenceRule::new("like", "likes"),
        PreferenceRule::new("love", "likes"),
        PreferenceRule::new("enjoy", "likes"),
        PreferenceRule::new("interested in", "interests"),
        PreferenceRule::new("passionate about", "interests"),
        PreferenceRule::new("topic", "topics"),
        PreferenceRule::new("about", "topics"),
    ]
}

/// Pure extraction pass: scan `user`-role messages against `rules`.
///
/// Content is lower-cased and split on sentence-terminating periods; every
/// sentence containing a rule's keyword is trimmed and recorded under that
/// rule's category, deduplicated within the call. Category order is
/// deterministic; value order follows first appearance.
pub fn extract_candidates(
    rules: &[PreferenceRule],
    messages: &[ChatMessage],
) -> BTreeMap<String, Vec<String>> {
    let mut candidates: BTreeMap<String, Vec<String>> = BTreeMap::new();

    for message in messages {
        if message.role != "user" {
            continue;
        }
        let content = message.content.to_lowercase();
        for rule in rules {
            if !content.contains(&rule.keyword) {
                continue;
            }
            for sentence in content.split('.') {
                if !sentence.contains(&rule.keyword) {
                    continue;
                }
                let value = sentence.trim();
                if value.is_empty() {
                    continue;
                }
                let list = candidates.entry(rule.category.clone()).or_default();
                if !list.iter().any(|v| v == value) {
                    list.push(value.to_string());
                }
            }
        }
    }

    candidates
}

impl MemoryStore {
    /// Extract preference statements from `messages` and persist them.
    ///
    /// Every distinct candidate becomes a `preference`-kind memory entry
    /// (`"{category}: {value}"`); individual store failures are logged and
    /// skipped. The per-user [`UserPreferences`] record is then merged by
    /// category-wise union and saved — that save is best-effort too.
    ///
    /// Returns the freshly extracted (not merged) mapping.
    pub fn extract_preferences(
        &self,
        user_id: &str,
        messages: &[ChatMessage],
    ) -> BTreeMap<String, Vec<String>> {
        let candidates = extract_candidates(&self.config().preferences.rules, messages);

        for (category, values) in &candidates {
            for value in values {
                let metadata = serde_json::json!({
                    "category": category,
                    "value": value,
                });
                if let Err(err) = self.store(
                    user_id,
                    &format!("{category}: {value}"),
                    MemoryKind::Preference,
                    metadata,
                ) {
                    warn!(user_id, category, error = %err, "skipping preference value");
                }
            }
        }

        if let Err(err) = self.merge_and_save(user_id, &candidates) {
            error!(user_id, error = %err, "failed to save user preferences");
        }

        candidates
    }

    fn merge_and_save(
        &self,
        user_id: &str,
        extracted: &BTreeMap<String, Vec<String>>,
    ) -> anyhow::Result<()> {
        let mut prefs = self
            .backend()
            .load_preferences(user_id)?
            .unwrap_or_else(|| UserPreferences::new(user_id));
        prefs.merge(extracted);
        self.backend().save_preferences(&prefs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(content: &str) -> ChatMessage {
        ChatMessage::user(content)
    }

    #[test]
    fn extracts_sentences_containing_keywords() {
        let rules = default_rules();
        let messages = [user("I really like hiking. The weather was bad.")];
        let candidates = extract_candidates(&rules, &messages);

        assert_eq!(candidates["likes"], vec!["i really like hiking"]);
        assert!(!candidates.contains_key("interests"));
    }

    #[test]
    fn ignores_non_user_roles() {
        let rules = default_rules();
        let messages = [ChatMessage::assistant("You might like jazz.")];
        assert!(extract_candidates(&rules, &messages).is_empty());
    }

    #[test]
    fn multi_word_keywords_match() {
        let rules = default_rules();
        let messages = [user("I am passionate about astronomy.")];
        let candidates = extract_candidates(&rules, &messages);
        assert_eq!(
            candidates["interests"],
            vec!["i am passionate about astronomy"]
        );
    }

    #[test]
    fn deduplicates_within_a_call() {
        let rules = default_rules();
        let messages = [user("I like tea."), user("I like tea.")];
        let candidates = extract_candidates(&rules, &messages);
        assert_eq!(candidates["likes"].len(), 1);
    }

    #[test]
    fn one_sentence_can_hit_multiple_categories() {
        let rules = default_rules();
        let messages = [user("Let's talk about music I like.")];
        let candidates = extract_candidates(&rules, &messages);
        assert_eq!(candidates["likes"], vec!["let's talk about music i like"]);
        assert_eq!(candidates["topics"], vec!["let's talk about music i like"]);
    }

    #[test]
    fn custom_rule_table_is_honored() {
        let rules = vec![PreferenceRule::new("hate", "dislikes")];
        let messages = [user("I hate mornings. I like coffee.")];
        let candidates = extract_candidates(&rules, &messages);
        assert_eq!(candidates["dislikes"], vec!["i hate mornings"]);
        assert!(!candidates.contains_key("likes"));
    }

    #[test]
    fn bare_keyword_sentence_is_kept_trimmed() {
        let rules = default_rules();
        let messages = [user("like.")];
        let candidates = extract_candidates(&rules, &messages);
        assert_eq!(candidates["likes"], vec!["like"]);
    }
}
