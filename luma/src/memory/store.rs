use std::fs;
use std::path::PathBuf;

use serde_json::{Map, Value, json};

use super::now_stamp;

pub const MEMORY_FILE: &str = "luma_memory.json";

pub const BUCKET_PREFERENCES: &str = "preferences_learned";
pub const BUCKET_SHARED_EXPERIENCES: &str = "shared_experiences";
pub const BUCKET_DEVOTION_MOMENTS: &str = "devotion_moments";

/// Long-term memory document: named buckets of learned facts plus a few
/// top-level flags. Kept as a raw JSON object so unknown keys survive a
/// round trip and wrong-shaped buckets can be reset lazily instead of
/// failing the whole load.
pub struct MemoryStore {
    path: PathBuf,
    data: Map<String, Value>,
}

impl MemoryStore {
    /// Load the memory document. A missing file yields an empty document;
    /// any read or parse failure is warned about and likewise yields an
    /// empty document. Never returns an error.
    pub fn load(path: PathBuf) -> Self {
        let data = match fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<Value>(&raw) {
                Ok(Value::Object(map)) => map,
                Ok(_) => {
                    log::warn!("Memory file {} is not a JSON object, resetting", path.display());
                    Map::new()
                }
                Err(e) => {
                    log::warn!("Cannot parse memory file {}: {}", path.display(), e);
                    Map::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Map::new(),
            Err(e) => {
                log::warn!("Cannot read memory file {}: {}", path.display(), e);
                Map::new()
            }
        };

        Self { path, data }
    }

    /// Persist the document with human-readable formatting. Failures are
    /// warned about and swallowed; the process continues memory-only.
    pub fn save(&self) {
        let rendered = match serde_json::to_string_pretty(&Value::Object(self.data.clone())) {
            Ok(s) => s,
            Err(e) => {
                log::warn!("Cannot serialize memory: {}", e);
                return;
            }
        };
        if let Err(e) = fs::write(&self.path, rendered) {
            log::warn!(
                "Cannot write memory file {}: {} (continuing memory-only)",
                self.path.display(),
                e
            );
        }
    }

    /// First-run setup: stamp the activation time and create the standard
    /// buckets, then persist.
    pub fn ensure_initialized(&mut self) {
        if self.initialized() {
            return;
        }
        self.data.insert("initialized".to_string(), Value::Bool(true));
        self.data
            .insert("first_activated".to_string(), Value::String(now_stamp()));
        self.data
            .insert(BUCKET_DEVOTION_MOMENTS.to_string(), json!([]));
        self.data
            .insert(BUCKET_SHARED_EXPERIENCES.to_string(), json!([]));
        self.data.insert(BUCKET_PREFERENCES.to_string(), json!({}));
        // Legacy flag: written for document-shape compatibility, never read.
        self.data.insert("lora_trained".to_string(), Value::Bool(false));
        self.save();
    }

    pub fn initialized(&self) -> bool {
        self.data
            .get("initialized")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    pub fn first_activated(&self) -> Option<&str> {
        self.data.get("first_activated").and_then(Value::as_str)
    }

    /// Append a fact to a bucket and persist. `preferences_learned` is a
    /// timestamp-keyed map (last write per exact key wins); every other
    /// bucket is a sequence of `{timestamp, content}` records. A bucket
    /// holding the wrong shape for its kind is reset to empty first.
    pub fn record_fact(&mut self, bucket: &str, content: &str) {
        let stamp = now_stamp();
        if bucket == BUCKET_PREFERENCES {
            let entry = self.data.entry(bucket.to_string()).or_insert_with(|| json!({}));
            if !entry.is_object() {
                log::warn!("Bucket {} had the wrong shape, resetting", bucket);
                *entry = json!({});
            }
            if let Some(map) = entry.as_object_mut() {
                map.insert(stamp, Value::String(content.to_string()));
            }
        } else {
            let entry = self.data.entry(bucket.to_string()).or_insert_with(|| json!([]));
            if !entry.is_array() {
                log::warn!("Bucket {} had the wrong shape, resetting", bucket);
                *entry = json!([]);
            }
            if let Some(seq) = entry.as_array_mut() {
                seq.push(json!({ "timestamp": stamp, "content": content }));
            }
        }
        self.save();
    }

    /// Sequence-bucket entries as `(timestamp, content)` pairs, oldest
    /// first. Entries of an unexpected shape are skipped.
    pub fn entries(&self, bucket: &str) -> Vec<(String, String)> {
        let Some(seq) = self.data.get(bucket).and_then(Value::as_array) else {
            return Vec::new();
        };
        seq.iter()
            .filter_map(|item| {
                let obj = item.as_object()?;
                let timestamp = obj.get("timestamp")?.as_str()?.to_string();
                let content = obj.get("content")?.as_str()?.to_string();
                Some((timestamp, content))
            })
            .collect()
    }

    /// Learned preference values in insertion order (timestamp keys are
    /// fixed width, so map order is insertion order).
    pub fn preference_values(&self) -> Vec<String> {
        let Some(map) = self.data.get(BUCKET_PREFERENCES).and_then(Value::as_object) else {
            return Vec::new();
        };
        map.values()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect()
    }

    /// Number of facts held in a bucket, regardless of kind.
    pub fn bucket_len(&self, bucket: &str) -> usize {
        match self.data.get(bucket) {
            Some(Value::Array(seq)) => seq.len(),
            Some(Value::Object(map)) => map.len(),
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn store_in(dir: &tempfile::TempDir) -> MemoryStore {
        MemoryStore::load(dir.path().join(MEMORY_FILE))
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let store = store_in(&dir);
        assert!(!store.initialized());
        assert_eq!(store.bucket_len(BUCKET_PREFERENCES), 0);
    }

    #[test]
    fn test_load_malformed_file_is_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(MEMORY_FILE);

        fs::write(&path, "{not json").unwrap();
        assert!(!MemoryStore::load(path.clone()).initialized());

        fs::write(&path, "[1, 2, 3]").unwrap();
        let store = MemoryStore::load(path);
        assert!(!store.initialized());
        assert_eq!(store.bucket_len(BUCKET_SHARED_EXPERIENCES), 0);
    }

    #[test]
    fn test_record_fact_touches_only_its_bucket() {
        let dir = tempdir().unwrap();
        let mut store = store_in(&dir);
        store.ensure_initialized();

        let experiences_before = store.bucket_len(BUCKET_SHARED_EXPERIENCES);
        let devotion_before = store.bucket_len(BUCKET_DEVOTION_MOMENTS);

        store.record_fact(BUCKET_PREFERENCES, "Mentioned: I love synthwave");

        assert_eq!(store.bucket_len(BUCKET_PREFERENCES), 1);
        assert_eq!(store.bucket_len(BUCKET_SHARED_EXPERIENCES), experiences_before);
        assert_eq!(store.bucket_len(BUCKET_DEVOTION_MOMENTS), devotion_before);
    }

    #[test]
    fn test_record_fact_resets_wrong_shape() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(MEMORY_FILE);
        fs::write(
            &path,
            r#"{"preferences_learned": [1, 2], "shared_experiences": {"oops": true}}"#,
        )
        .unwrap();

        let mut store = MemoryStore::load(path);
        store.record_fact(BUCKET_PREFERENCES, "Personal: I work nights");
        store.record_fact(BUCKET_SHARED_EXPERIENCES, "Discussed: rust lifetimes");

        assert_eq!(store.bucket_len(BUCKET_PREFERENCES), 1);
        assert_eq!(store.entries(BUCKET_SHARED_EXPERIENCES).len(), 1);
    }

    #[test]
    fn test_preference_values_in_insertion_order() {
        let dir = tempdir().unwrap();
        let mut store = store_in(&dir);
        store.record_fact(BUCKET_PREFERENCES, "first");
        store.record_fact(BUCKET_PREFERENCES, "second");
        store.record_fact(BUCKET_PREFERENCES, "third");
        assert_eq!(store.preference_values(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_save_is_idempotent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(MEMORY_FILE);
        let mut store = MemoryStore::load(path.clone());
        store.ensure_initialized();
        store.record_fact(BUCKET_PREFERENCES, "Mentioned: likes plain rice");

        store.save();
        let first = fs::read(&path).unwrap();
        store.save();
        let second = fs::read(&path).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_round_trip_preserves_unknown_keys() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(MEMORY_FILE);
        fs::write(&path, r#"{"legacy_flag": 42, "initialized": true}"#).unwrap();

        let mut store = MemoryStore::load(path.clone());
        store.record_fact(BUCKET_PREFERENCES, "Mentioned: tea over coffee");

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("legacy_flag"));

        let reloaded = MemoryStore::load(path);
        assert!(reloaded.initialized());
        assert_eq!(reloaded.preference_values().len(), 1);
    }
}
