use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use engine_logging::{engine_debug, engine_warn};
use migrator_core::MigrationProgress;
use serde::{Deserialize, Serialize};

use crate::persist::{AtomicFileWriter, PersistError};

/// Source of "now" for expiry decisions.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

fn system_clock() -> Clock {
    Arc::new(Utc::now)
}

fn expiry(now: DateTime<Utc>, ttl: Duration) -> DateTime<Utc> {
    let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX);
    now.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Durable key-value home of the progress record. Expired entries read as absent.
pub trait ProgressStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<MigrationProgress>, PersistError>;
    fn set(&self, key: &str, value: &MigrationProgress, ttl: Duration) -> Result<(), PersistError>;
    fn delete(&self, key: &str) -> Result<(), PersistError>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredProgress {
    expires_at: DateTime<Utc>,
    progress: MigrationProgress,
}

/// In-process store, used by tests and dry runs.
pub struct MemoryProgressStore {
    entries: Mutex<HashMap<String, StoredProgress>>,
    clock: Clock,
}

impl Default for MemoryProgressStore {
    fn default() -> Self {
        Self::with_clock(system_clock())
    }
}

impl MemoryProgressStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_clock(clock: Clock) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            clock,
        }
    }
}

impl ProgressStore for MemoryProgressStore {
    fn get(&self, key: &str) -> Result<Option<MigrationProgress>, PersistError> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let now = (self.clock)();
        match entries.get(key) {
            Some(stored) if stored.expires_at > now => Ok(Some(stored.progress.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    fn set(&self, key: &str, value: &MigrationProgress, ttl: Duration) -> Result<(), PersistError> {
        let expires_at = expiry((self.clock)(), ttl);
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(
            key.to_string(),
            StoredProgress {
                expires_at,
                progress: value.clone(),
            },
        );
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), PersistError> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.remove(key);
        Ok(())
    }
}

/// One JSON file per key in a state directory, written atomically.
pub struct FileProgressStore {
    writer: AtomicFileWriter,
    clock: Clock,
}

impl FileProgressStore {
    pub fn new(dir: PathBuf) -> Self {
        Self::with_clock(dir, system_clock())
    }

    pub fn with_clock(dir: PathBuf, clock: Clock) -> Self {
        Self {
            writer: AtomicFileWriter::new(dir),
            clock,
        }
    }

    fn filename(key: &str) -> String {
        let safe: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
            .collect();
        format!("{safe}.json")
    }
}

impl ProgressStore for FileProgressStore {
    fn get(&self, key: &str) -> Result<Option<MigrationProgress>, PersistError> {
        let filename = Self::filename(key);
        let Some(content) = self.writer.read(&filename)? else {
            return Ok(None);
        };

        let stored: StoredProgress = match serde_json::from_str(&content) {
            Ok(stored) => stored,
            Err(err) => {
                engine_warn!("Ignoring unreadable progress record {}: {}", filename, err);
                return Ok(None);
            }
        };

        if stored.expires_at <= (self.clock)() {
            engine_debug!("Progress record {} expired at {}", filename, stored.expires_at);
            self.writer.remove(&filename)?;
            return Ok(None);
        }
        Ok(Some(stored.progress))
    }

    fn set(&self, key: &str, value: &MigrationProgress, ttl: Duration) -> Result<(), PersistError> {
        let stored = StoredProgress {
            expires_at: expiry((self.clock)(), ttl),
            progress: value.clone(),
        };
        let json = serde_json::to_string_pretty(&stored)?;
        self.writer.write(&Self::filename(key), &json)?;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), PersistError> {
        self.writer.remove(&Self::filename(key))?;
        Ok(())
    }
}
