use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::now_stamp;
use super::store::MemoryStore;

pub const HISTORY_FILE: &str = "luma_conversations.json";

/// Retained turns after a save; oldest entries are evicted first.
pub const HISTORY_LIMIT: usize = 100;

/// One user message and its reply. `response` is `None` while the
/// completion call for the turn is still pending.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnRecord {
    pub timestamp: String,
    pub user: String,
    #[serde(default)]
    pub response: Option<String>,
}

/// Rolling conversation log, FIFO-capped at [`HISTORY_LIMIT`] turns.
pub struct ConversationLog {
    path: PathBuf,
    turns: Vec<TurnRecord>,
}

impl ConversationLog {
    /// Load the log. Missing file, unreadable file, or a document that is
    /// not an array all yield an empty log with a warning; never errors.
    pub fn load(path: PathBuf) -> Self {
        let turns = match fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<Value>(&raw) {
                Ok(Value::Array(items)) => items
                    .into_iter()
                    .filter_map(|item| serde_json::from_value::<TurnRecord>(item).ok())
                    .collect(),
                Ok(_) => {
                    log::warn!(
                        "Conversation file {} is not a JSON array, starting fresh",
                        path.display()
                    );
                    Vec::new()
                }
                Err(e) => {
                    log::warn!("Cannot parse conversation file {}: {}", path.display(), e);
                    Vec::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                log::warn!("Cannot read conversation file {}: {}", path.display(), e);
                Vec::new()
            }
        };

        Self { path, turns }
    }

    /// Append a pending turn (no response yet).
    pub fn begin_turn(&mut self, user_text: &str) {
        self.turns.push(TurnRecord {
            timestamp: now_stamp(),
            user: user_text.to_string(),
            response: None,
        });
    }

    /// Fill in the response of the most recent turn.
    pub fn complete_turn(&mut self, response: &str) {
        if let Some(last) = self.turns.last_mut() {
            last.response = Some(response.to_string());
        }
    }

    /// Truncate to the most recent [`HISTORY_LIMIT`] turns and persist.
    /// The memory document is always saved alongside the log. Write
    /// failures are warned about and swallowed.
    pub fn save(&mut self, memory: &MemoryStore) {
        if self.turns.len() > HISTORY_LIMIT {
            self.turns.drain(..self.turns.len() - HISTORY_LIMIT);
        }

        match serde_json::to_string_pretty(&self.turns) {
            Ok(rendered) => {
                if let Err(e) = fs::write(&self.path, rendered) {
                    log::warn!("Cannot write conversation file {}: {}", self.path.display(), e);
                }
            }
            Err(e) => log::warn!("Cannot serialize conversation log: {}", e),
        }

        memory.save();
    }

    pub fn turns(&self) -> &[TurnRecord] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::store::MEMORY_FILE;
    use tempfile::tempdir;

    #[test]
    fn test_load_missing_or_malformed_is_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(HISTORY_FILE);
        assert!(ConversationLog::load(path.clone()).is_empty());

        fs::write(&path, r#"{"not": "an array"}"#).unwrap();
        assert!(ConversationLog::load(path.clone()).is_empty());

        fs::write(&path, "garbage").unwrap();
        assert!(ConversationLog::load(path).is_empty());
    }

    #[test]
    fn test_save_truncates_to_last_hundred_in_order() {
        let dir = tempdir().unwrap();
        let memory = MemoryStore::load(dir.path().join(MEMORY_FILE));
        let path = dir.path().join(HISTORY_FILE);
        let mut log = ConversationLog::load(path.clone());

        for i in 0..130 {
            log.begin_turn(&format!("message {}", i));
            log.complete_turn(&format!("reply {}", i));
        }
        log.save(&memory);

        let reloaded = ConversationLog::load(path);
        assert_eq!(reloaded.len(), HISTORY_LIMIT);
        assert_eq!(reloaded.turns()[0].user, "message 30");
        assert_eq!(reloaded.turns()[HISTORY_LIMIT - 1].user, "message 129");
    }

    #[test]
    fn test_pending_turn_round_trip() {
        let dir = tempdir().unwrap();
        let memory = MemoryStore::load(dir.path().join(MEMORY_FILE));
        let path = dir.path().join(HISTORY_FILE);
        let mut log = ConversationLog::load(path.clone());

        log.begin_turn("hello there");
        log.save(&memory);

        let reloaded = ConversationLog::load(path);
        assert_eq!(reloaded.len(), 1);
        assert_eq!(reloaded.turns()[0].user, "hello there");
        assert!(reloaded.turns()[0].response.is_none());
    }

    #[test]
    fn test_saving_log_saves_memory_too() {
        let dir = tempdir().unwrap();
        let memory_path = dir.path().join(MEMORY_FILE);
        let mut memory = MemoryStore::load(memory_path.clone());
        memory.ensure_initialized();
        fs::remove_file(&memory_path).unwrap();

        let mut log = ConversationLog::load(dir.path().join(HISTORY_FILE));
        log.begin_turn("hi");
        log.save(&memory);

        assert!(memory_path.exists());
    }
}
