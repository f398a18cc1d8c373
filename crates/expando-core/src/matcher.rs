//! Boundary-aware longest-match evaluation over the input buffer.

use crate::buffer::InputBuffer;
use crate::index::TriggerIndex;
use uuid::Uuid;

/// A trigger found at the tail of the buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchResult {
    pub snippet_id: Uuid,
    pub trigger: String,
    pub expansion: String,
    /// The trigger is glued to a preceding word; only an active selection
    /// makes the replacement eligible.
    pub requires_selection: bool,
}

impl MatchResult {
    /// Characters to delete: the full normalized trigger.
    pub fn delete_count(&self) -> usize {
        self.trigger.chars().count()
    }
}

/// Characters that separate a trigger from what precedes it.
const BOUNDARY_PUNCTUATION: [char; 6] = ['/', '?', '&', '=', '#', ':'];

pub fn is_boundary(c: char) -> bool {
    if c.is_whitespace() || BOUNDARY_PUNCTUATION.contains(&c) {
        return true;
    }
    !(c.is_alphanumeric() || c == '_')
}

/// Match evaluation with one-shot suppression.
#[derive(Debug, Default)]
pub struct MatchEvaluator {
    suppress_next: bool,
}

impl MatchEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Skip exactly the next evaluation.
    pub fn suppress_next(&mut self) {
        self.suppress_next = true;
    }

    pub fn is_suppressed(&self) -> bool {
        self.suppress_next
    }

    pub fn evaluate(&mut self, buffer: &InputBuffer, index: &TriggerIndex) -> Option<MatchResult> {
        if std::mem::take(&mut self.suppress_next) {
            return None;
        }

        let anchor = buffer.last_char()?;
        if !index.config().is_anchor(anchor) {
            return None;
        }

        let candidates = index.candidates(anchor);
        if candidates.is_empty() {
            return None;
        }

        let typed: Vec<char> = buffer.chars().collect();
        for entry in candidates {
            let len = entry.char_len();
            if len > typed.len() {
                continue;
            }
            let start = typed.len() - len;
            if !typed[start..].iter().copied().eq(entry.trigger.chars()) {
                continue;
            }

            let boundary_ok = start == 0 || is_boundary(typed[start - 1]);
            return Some(MatchResult {
                snippet_id: entry.snippet_id,
                trigger: entry.trigger.clone(),
                expansion: entry.expansion.clone(),
                requires_selection: !boundary_ok,
            });
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Snippet;
    use crate::settings::DelimiterConfig;

    fn index_of(pairs: &[(&str, &str)]) -> TriggerIndex {
        let snippets: Vec<Snippet> = pairs
            .iter()
            .map(|(t, e)| Snippet::new(t.to_string(), e.to_string()))
            .collect();
        TriggerIndex::build(&snippets, &DelimiterConfig::default())
    }

    fn buffer_of(text: &str) -> InputBuffer {
        let mut buffer = InputBuffer::default();
        buffer.append(text);
        buffer
    }

    #[test]
    fn longest_trigger_wins() {
        let index = index_of(&[(";b/", "short"), (";ab/", "long")]);
        let mut evaluator = MatchEvaluator::new();

        let result = evaluator.evaluate(&buffer_of("x ;ab/"), &index).unwrap();
        assert_eq!(result.trigger, ";ab/");
        assert_eq!(result.expansion, "long");
        assert!(!result.requires_selection);
    }

    #[test]
    fn shorter_suffix_still_matches_when_longer_does_not() {
        let index = index_of(&[(";b/", "short"), (";ab/", "long")]);
        let mut evaluator = MatchEvaluator::new();
        let result = evaluator.evaluate(&buffer_of("zz ;b/"), &index).unwrap();
        assert_eq!(result.trigger, ";b/");
    }

    #[test]
    fn glued_trigger_requires_selection() {
        let index = index_of(&[(";t/", "tee")]);
        let mut evaluator = MatchEvaluator::new();

        let glued = evaluator.evaluate(&buffer_of("x;t/"), &index).unwrap();
        assert!(glued.requires_selection);

        let at_start = evaluator.evaluate(&buffer_of(";t/"), &index).unwrap();
        assert!(!at_start.requires_selection);

        let after_space = evaluator.evaluate(&buffer_of("a ;t/"), &index).unwrap();
        assert!(!after_space.requires_selection);

        let after_underscore = evaluator.evaluate(&buffer_of("_;t/"), &index).unwrap();
        assert!(after_underscore.requires_selection);
    }

    #[test]
    fn url_punctuation_counts_as_boundary() {
        for c in ['/', '?', '&', '=', '#', ':', '(', '-'] {
            assert!(is_boundary(c), "{c:?} should be a boundary");
        }
        for c in ['a', 'Z', '7', '_', 'é'] {
            assert!(!is_boundary(c), "{c:?} should not be a boundary");
        }
    }

    #[test]
    fn suppression_is_one_shot() {
        let index = index_of(&[(";t/", "tee")]);
        let buffer = buffer_of(";t/");
        let mut evaluator = MatchEvaluator::new();

        evaluator.suppress_next();
        assert!(evaluator.evaluate(&buffer, &index).is_none());
        assert!(!evaluator.is_suppressed());
        assert!(evaluator.evaluate(&buffer, &index).is_some());
    }

    #[test]
    fn non_anchor_tail_or_empty_buffer_never_matches() {
        let index = index_of(&[(";t/", "tee")]);
        let mut evaluator = MatchEvaluator::new();
        assert!(evaluator.evaluate(&InputBuffer::default(), &index).is_none());
        assert!(evaluator.evaluate(&buffer_of(";t"), &index).is_none());
        assert!(evaluator.evaluate(&buffer_of(";u/"), &index).is_none());
        assert!(evaluator.evaluate(&buffer_of(";t."), &index).is_none());
    }

    #[test]
    fn delete_count_covers_full_trigger() {
        let index = index_of(&[("eml", "user@example.com")]);
        let mut evaluator = MatchEvaluator::new();
        let result = evaluator.evaluate(&buffer_of("hi ;eml/"), &index).unwrap();
        assert_eq!(result.delete_count(), 5);
    }
}
