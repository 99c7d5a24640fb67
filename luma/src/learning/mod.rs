//! Post-turn learning heuristics: pure keyword classifiers over the user
//! text plus an `observe` entry point that appends matched facts into the
//! memory store. No external calls. All rules are independent and
//! additive; several may fire on one turn.

use chrono::Local;

use crate::memory::{BUCKET_PREFERENCES, BUCKET_SHARED_EXPERIENCES, MemoryStore};

/// Substrings that suggest the user stated a taste or desire.
const PREFERENCE_SIGNALS: &[&str] = &[
    "love", "like", "prefer", "favorite", "hate", "want", "need", "enjoy", "into",
];

/// First-person substrings that suggest the user shared something about
/// themselves.
const PERSONAL_SIGNALS: &[&str] = &[
    "i am", "i'm", "my", "i work", "i study", "i live", "i do",
];

/// Every Nth turn records a dated conversation fact.
const PERIODIC_INTERVAL: u64 = 5;

/// Inputs longer than this many whitespace tokens record a topic fact.
const TOPIC_MIN_WORDS: usize = 5;

/// Character budget for the recorded topic excerpt.
const TOPIC_EXCERPT: usize = 50;

/// What a piece of user text revealed, per classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LearnedSignal {
    /// Matched a preference-signal substring.
    Preference,
    /// Matched a first-person substring.
    Personal,
}

/// Classify one user message. Both signals may be present at once.
pub fn classify(user_text: &str) -> Vec<LearnedSignal> {
    let lower = user_text.to_lowercase();
    let mut signals = Vec::new();

    if PREFERENCE_SIGNALS.iter().any(|kw| lower.contains(kw)) {
        signals.push(LearnedSignal::Preference);
    }
    if PERSONAL_SIGNALS.iter().any(|kw| lower.contains(kw)) {
        signals.push(LearnedSignal::Personal);
    }

    signals
}

/// Apply every learning rule for one turn. `turn_count` is the 1-based
/// total number of turns seen so far.
pub fn observe(memory: &mut MemoryStore, user_text: &str, turn_count: u64) {
    for signal in classify(user_text) {
        let fact = match signal {
            LearnedSignal::Preference => format!("Mentioned: {}", user_text),
            LearnedSignal::Personal => format!("Personal: {}", user_text),
        };
        memory.record_fact(BUCKET_PREFERENCES, &fact);
    }

    if turn_count % PERIODIC_INTERVAL == 0 {
        memory.record_fact(
            BUCKET_SHARED_EXPERIENCES,
            &format!(
                "Had a conversation about various topics on {}",
                Local::now().format("%Y-%m-%d")
            ),
        );
    }

    if user_text.split_whitespace().count() > TOPIC_MIN_WORDS {
        memory.record_fact(BUCKET_SHARED_EXPERIENCES, &topic_fact(user_text));
    }
}

/// `Discussed: <first 50 chars>`, with an ellipsis only when truncated.
fn topic_fact(user_text: &str) -> String {
    if user_text.chars().count() > TOPIC_EXCERPT {
        let excerpt: String = user_text.chars().take(TOPIC_EXCERPT).collect();
        format!("Discussed: {}...", excerpt)
    } else {
        format!("Discussed: {}", user_text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::store::MEMORY_FILE;
    use tempfile::tempdir;

    fn store() -> (tempfile::TempDir, MemoryStore) {
        let dir = tempdir().unwrap();
        let store = MemoryStore::load(dir.path().join(MEMORY_FILE));
        (dir, store)
    }

    #[test]
    fn test_love_records_mentioned_preference() {
        let (_dir, mut memory) = store();
        observe(&mut memory, "I LOVE rainy mornings", 1);

        let values = memory.preference_values();
        assert!(values.iter().any(|v| v.starts_with("Mentioned:")));
    }

    #[test]
    fn test_both_classifiers_fire_on_one_input() {
        let signals = classify("I'm really into synthwave");
        assert!(signals.contains(&LearnedSignal::Preference));
        assert!(signals.contains(&LearnedSignal::Personal));

        let (_dir, mut memory) = store();
        observe(&mut memory, "I'm really into synthwave", 1);
        assert_eq!(memory.bucket_len(BUCKET_PREFERENCES), 2);
    }

    #[test]
    fn test_neutral_text_matches_nothing() {
        assert!(classify("ok").is_empty());
    }

    #[test]
    fn test_periodic_rule_fires_only_on_fifth_turn() {
        let (_dir, mut memory) = store();
        // Short, signal-free input so only the periodic rule can fire.
        for turn in 1..=4 {
            observe(&mut memory, "ok", turn);
            assert_eq!(memory.bucket_len(BUCKET_SHARED_EXPERIENCES), 0);
        }
        observe(&mut memory, "ok", 5);
        assert_eq!(memory.bucket_len(BUCKET_SHARED_EXPERIENCES), 1);

        let entries = memory.entries(BUCKET_SHARED_EXPERIENCES);
        assert!(entries[0].1.starts_with("Had a conversation about various topics on "));
    }

    #[test]
    fn test_long_input_records_topic() {
        let (_dir, mut memory) = store();
        observe(&mut memory, "so today we should really talk about the borrow checker", 1);

        let entries = memory.entries(BUCKET_SHARED_EXPERIENCES);
        assert_eq!(entries.len(), 1);
        assert_eq!(
            entries[0].1,
            "Discussed: so today we should really talk about the borrow ch..."
        );
    }

    #[test]
    fn test_short_topic_has_no_ellipsis() {
        assert_eq!(topic_fact("one two three four five six"), "Discussed: one two three four five six");
    }

    #[test]
    fn test_periodic_and_topic_rules_are_additive() {
        let (_dir, mut memory) = store();
        observe(&mut memory, "tell me what you think about all of this", 5);
        assert_eq!(memory.bucket_len(BUCKET_SHARED_EXPERIENCES), 2);
    }
}
