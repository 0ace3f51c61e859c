//! Local key-value persistence.
//!
//! Survey state that outlives a page view (cached definitions, activation
//! records, seen markers) is written through this trait. Every key falls
//! under one documented prefix so [`STORAGE_PREFIX`] removal resets the
//! whole feature.

use std::collections::HashMap;

use parking_lot::RwLock;

/// Prefix shared by every key this crate writes.
pub const STORAGE_PREFIX: &str = "surveys/";

/// Key holding the cached survey list as JSON.
pub const CACHED_SURVEYS_KEY: &str = "surveys/cache";

/// Key holding the JSON id list of event/action-activated surveys.
pub const ACTIVATED_SURVEYS_KEY: &str = "surveys/activated";

/// Key holding the RFC 3339 timestamp any survey was last shown.
pub const LAST_SEEN_KEY: &str = "surveys/last_seen_at";

/// Prefix for per-survey seen markers; the survey id is appended.
pub const SEEN_PREFIX: &str = "surveys/seen/";

/// Local key-value store supplied by the embedding SDK.
pub trait SurveyStorage: Send + Sync {
    /// Read the raw value stored under `key`.
    fn get(&self, key: &str) -> Option<String>;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: String);

    /// Remove `key` if present.
    fn remove(&self, key: &str);

    /// Remove every key starting with `prefix`.
    fn remove_by_prefix(&self, prefix: &str);
}

/// In-memory storage backend; the default when the embedding SDK supplies
/// no persistence of its own.
#[derive(Default)]
pub struct MemoryStorage {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl SurveyStorage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: String) {
        self.entries.write().insert(key.to_string(), value);
    }

    fn remove(&self, key: &str) {
        self.entries.write().remove(key);
    }

    fn remove_by_prefix(&self, prefix: &str) {
        self.entries.write().retain(|key, _| !key.starts_with(prefix));
    }
}
