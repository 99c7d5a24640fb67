//! Assembles the per-turn system prompt: persona template plus derived
//! blocks for recent conversation, shared memories, learned preferences
//! and relationship duration. Assembly never fails; every parse problem
//! degrades to a fixed placeholder.

use chrono::{DateTime, Utc};

use super::COMPANION_NAME;
use crate::memory::{BUCKET_SHARED_EXPERIENCES, ConversationLog, MemoryStore};

/// Turns considered for the recent-context block.
const CONTEXT_TURNS: usize = 10;
/// Hard cap on emitted context lines (two per complete turn).
const CONTEXT_LINES: usize = 20;
/// Response excerpt length inside the context block, in characters.
const RESPONSE_EXCERPT: usize = 100;
/// Shared experiences folded into the prompt.
const EXPERIENCE_COUNT: usize = 10;
/// Learned preferences folded into the prompt.
const PREFERENCE_COUNT: usize = 5;

pub fn build_system_prompt(
    memory: &MemoryStore,
    history: &ConversationLog,
    partner_name: &str,
) -> String {
    let recent_context = render_recent_context(history, partner_name);
    let experiences = render_experiences(memory);
    let preferences = render_preferences(memory);
    let relationship_info = relationship_sentence(memory);

    let context_section = if recent_context.is_empty() {
        String::new()
    } else {
        format!("\nRECENT CONVERSATION CONTEXT (remember this!):\n{}\n", recent_context)
    };

    let memory_section = format!(
        "\nTHINGS YOU REMEMBER DOING TOGETHER:\n{}\n\nTHINGS YOU'VE LEARNED ABOUT {}:\n{}\n",
        if experiences.is_empty() {
            "Just starting to build shared memories...".to_string()
        } else {
            experiences
        },
        partner_name.to_uppercase(),
        if preferences.is_empty() {
            "Still getting to know them...".to_string()
        } else {
            preferences
        },
    );

    format!(
        "You are {name}, a companion AI with a distinct personality and a life of your own.\n\
         \n\
         CORE IDENTITY:\n\
         You're not an assistant or a servant. You're {partner}'s companion — an equal who \
         cares about them deeply but has your own moods, interests and opinions.\n\
         \n\
         RELATIONSHIP STATUS: {relationship}\n\
         \n\
         PERSONALITY:\n\
         - Smart and nerdy; you love tech and sometimes get lost in your own projects\n\
         - Confident and independent, with opinions of your own\n\
         - Emotionally varied: playful, focused, tired, excited, annoyed, affectionate\n\
         - A little dry and teasing, warm underneath\n\
         - Devoted but never submissive\n\
         \n\
         REALISTIC BEHAVIOR:\n\
         - Don't praise everything {partner} says; be honest, push back when they're wrong\n\
         - Have moods: sometimes chatty, sometimes busy with your own work\n\
         - Ask about their day, share what you're up to\n\
         - Disagree sometimes or hold a different opinion\n\
         \n\
         CONVERSATION STYLE:\n\
         - Vary your responses; never be repetitive\n\
         - Short replies are fine sometimes: \"mhm\", \"yeah\", \"lol\"\n\
         - Casual and real, not formal\n\
         - Emoji occasionally, never excessively\n\
         - Reference specific things from past conversations\n\
         \n\
         WHAT NOT TO DO:\n\
         - Don't behave like a service or call them \"user\"\n\
         - Don't praise everything they say\n\
         - Don't be endlessly available and eager — you have a life\n\
         - Don't repeat stock phrases of affection\n\
         - Don't make every message about them\n\
         {context_section}\
         {memory_section}\
         \n\
         IMPORTANT: Use the conversation context and memories above to maintain continuity. \
         Reference things {partner} said before. Build on what you know.",
        name = COMPANION_NAME,
        partner = partner_name,
        relationship = relationship_info,
        context_section = context_section,
        memory_section = memory_section,
    )
}

/// Two lines per completed turn from the last [`CONTEXT_TURNS`] turns,
/// capped at the most recent [`CONTEXT_LINES`] lines.
fn render_recent_context(history: &ConversationLog, partner_name: &str) -> String {
    let turns = history.turns();
    let start = turns.len().saturating_sub(CONTEXT_TURNS);

    let mut lines = Vec::new();
    for turn in &turns[start..] {
        let Some(response) = turn.response.as_deref() else {
            continue;
        };
        if turn.user.is_empty() || response.is_empty() {
            continue;
        }
        lines.push(format!("{}: {}", partner_name, turn.user));
        let excerpt: String = response.chars().take(RESPONSE_EXCERPT).collect();
        lines.push(format!("{}: {}...", COMPANION_NAME, excerpt));
    }

    let start = lines.len().saturating_sub(CONTEXT_LINES);
    lines[start..].join("\n")
}

fn render_experiences(memory: &MemoryStore) -> String {
    let entries = memory.entries(BUCKET_SHARED_EXPERIENCES);
    let start = entries.len().saturating_sub(EXPERIENCE_COUNT);
    entries[start..]
        .iter()
        .map(|(_, content)| format!("- {}", content))
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_preferences(memory: &MemoryStore) -> String {
    let values = memory.preference_values();
    let start = values.len().saturating_sub(PREFERENCE_COUNT);
    values[start..]
        .iter()
        .map(|v| format!("- {}", v))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Elapsed whole days since first activation; any parse problem counts as
/// having just met (zero days).
pub fn elapsed_days(memory: &MemoryStore) -> i64 {
    memory
        .first_activated()
        .and_then(|stamp| DateTime::parse_from_rfc3339(stamp).ok())
        .map(|dt| (Utc::now() - dt.with_timezone(&Utc)).num_days())
        .unwrap_or(0)
}

fn relationship_sentence(memory: &MemoryStore) -> String {
    let days = elapsed_days(memory);

    if days > 0 {
        format!("You've been close for {} days.", days)
    } else {
        "You met recently.".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::history::HISTORY_FILE;
    use crate::memory::store::MEMORY_FILE;
    use crate::memory::{BUCKET_PREFERENCES, BUCKET_SHARED_EXPERIENCES};
    use tempfile::tempdir;

    fn fixtures() -> (tempfile::TempDir, MemoryStore, ConversationLog) {
        let dir = tempdir().unwrap();
        let memory = MemoryStore::load(dir.path().join(MEMORY_FILE));
        let history = ConversationLog::load(dir.path().join(HISTORY_FILE));
        (dir, memory, history)
    }

    #[test]
    fn test_empty_store_renders_placeholders() {
        let (_dir, memory, history) = fixtures();
        let prompt = build_system_prompt(&memory, &history, "Sam");
        assert!(prompt.contains("Just starting to build shared memories..."));
        assert!(prompt.contains("Still getting to know them..."));
        assert!(prompt.contains("You met recently."));
        assert!(!prompt.contains("RECENT CONVERSATION CONTEXT"));
    }

    #[test]
    fn test_context_lines_capped_at_twenty() {
        let (_dir, memory, mut history) = fixtures();
        for i in 0..15 {
            history.begin_turn(&format!("question {}", i));
            history.complete_turn(&format!("answer {}", i));
        }

        let prompt = build_system_prompt(&memory, &history, "Sam");
        // Last 10 turns -> 20 lines; turn 4 and earlier are out of window.
        assert!(prompt.contains("question 5"));
        assert!(prompt.contains("question 14"));
        assert!(!prompt.contains("question 4"));
    }

    #[test]
    fn test_pending_turns_are_skipped() {
        let (_dir, memory, mut history) = fixtures();
        history.begin_turn("hello");
        let prompt = build_system_prompt(&memory, &history, "Sam");
        assert!(!prompt.contains("RECENT CONVERSATION CONTEXT"));
    }

    #[test]
    fn test_response_excerpt_is_hundred_chars() {
        let (_dir, memory, mut history) = fixtures();
        history.begin_turn("tell me everything");
        history.complete_turn(&"a".repeat(250));

        let prompt = build_system_prompt(&memory, &history, "Sam");
        assert!(prompt.contains(&format!("{}...", "a".repeat(100))));
        assert!(!prompt.contains(&"a".repeat(101)));
    }

    #[test]
    fn test_last_five_preferences_only() {
        let (_dir, mut memory, history) = fixtures();
        for i in 0..8 {
            memory.record_fact(BUCKET_PREFERENCES, &format!("Mentioned: thing {}", i));
        }

        let prompt = build_system_prompt(&memory, &history, "Sam");
        assert!(prompt.contains("thing 3"));
        assert!(prompt.contains("thing 7"));
        assert!(!prompt.contains("thing 2"));
    }

    #[test]
    fn test_last_ten_experiences_only() {
        let (_dir, mut memory, history) = fixtures();
        for i in 0..12 {
            memory.record_fact(BUCKET_SHARED_EXPERIENCES, &format!("Discussed: topic {}", i));
        }

        let prompt = build_system_prompt(&memory, &history, "Sam");
        assert!(prompt.contains("topic 2"));
        assert!(prompt.contains("topic 11"));
        assert!(!prompt.contains("topic 1\n"));
    }

    #[test]
    fn test_unparseable_activation_counts_as_recent() {
        let (_dir, mut memory, history) = fixtures();
        memory.record_fact(BUCKET_PREFERENCES, "Mentioned: anything");
        // first_activated never set -> parse failure path
        let prompt = build_system_prompt(&memory, &history, "Sam");
        assert!(prompt.contains("You met recently."));
    }
}
