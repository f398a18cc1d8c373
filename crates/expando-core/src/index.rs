//! Trigger normalization and the anchor-keyed lookup index.

use crate::models::Snippet;
use crate::settings::DelimiterConfig;
use std::collections::HashMap;
use uuid::Uuid;

/// Normalize a raw trigger against the delimiter configuration.
///
/// Missing delimiter and anchor are added; `None` means the trigger can never
/// fire (blank, or nothing between delimiter and anchor).
pub fn normalize_trigger(raw: &str, config: &DelimiterConfig) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let mut trigger = String::with_capacity(trimmed.len() + config.start_delimiter.len() + 1);
    if !trimmed.starts_with(&config.start_delimiter) {
        trigger.push_str(&config.start_delimiter);
    }
    trigger.push_str(trimmed);

    let ends_with_anchor = trigger.chars().last().is_some_and(|c| config.is_anchor(c));
    if !ends_with_anchor {
        trigger.push(config.default_anchor()?);
    }

    // Delimiter plus anchor, with at least one character between them.
    if trigger.chars().count() <= config.start_delimiter.chars().count() + 1 {
        return None;
    }
    trigger
        .chars()
        .last()
        .filter(|c| config.is_anchor(*c))
        .map(|_| trigger)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub snippet_id: Uuid,
    /// Fully normalized form, delimiter and anchor included.
    pub trigger: String,
    pub expansion: String,
    char_len: usize,
}

impl IndexEntry {
    pub fn char_len(&self) -> usize {
        self.char_len
    }
}

/// Enabled triggers grouped by their anchor, longest first within each group.
#[derive(Debug, Clone, Default)]
pub struct TriggerIndex {
    by_anchor: HashMap<char, Vec<IndexEntry>>,
    config: DelimiterConfig,
}

impl TriggerIndex {
    pub fn build(snippets: &[Snippet], config: &DelimiterConfig) -> Self {
        let mut by_anchor: HashMap<char, Vec<IndexEntry>> = HashMap::new();

        for snippet in snippets.iter().filter(|s| s.is_enabled) {
            let Some(trigger) = normalize_trigger(&snippet.trigger, config) else {
                continue;
            };
            let Some(anchor) = trigger.chars().last() else {
                continue;
            };
            let char_len = trigger.chars().count();
            by_anchor.entry(anchor).or_default().push(IndexEntry {
                snippet_id: snippet.id,
                trigger,
                expansion: snippet.expansion.clone(),
                char_len,
            });
        }

        // Stable sort: among equal lengths, earlier snippets stay first.
        for entries in by_anchor.values_mut() {
            entries.sort_by(|a, b| b.char_len.cmp(&a.char_len));
        }

        Self {
            by_anchor,
            config: config.clone(),
        }
    }

    pub fn config(&self) -> &DelimiterConfig {
        &self.config
    }

    pub fn candidates(&self, anchor: char) -> &[IndexEntry] {
        self.by_anchor
            .get(&anchor)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.by_anchor.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_anchor.is_empty()
    }
}
