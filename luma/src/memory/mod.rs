//! File-backed persistence for the companion's two documents:
//! the long-term memory store and the rolling conversation log.
//!
//! Both are plain JSON files under the data directory. Loads are
//! corruption tolerant (a bad file is warned about and replaced with an
//! empty document), saves never propagate errors past a warning.

pub mod history;
pub mod store;

pub use history::{ConversationLog, TurnRecord, HISTORY_LIMIT};
pub use store::{MemoryStore, BUCKET_PREFERENCES, BUCKET_SHARED_EXPERIENCES};

use chrono::{SecondsFormat, Utc};

/// RFC 3339 UTC with fixed microsecond precision. Fixed width keeps
/// timestamp-keyed maps ordered by insertion.
pub fn now_stamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}
