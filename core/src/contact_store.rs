/// Contact storage — append-only collection mirrored to a JSON file
use crate::error::{Result, SiteError};
use crate::persistence;
use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// `YYYY-MM-DDTHH:MM:SS.ffffff`, lexicographically sortable
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

/// Fields a visitor can fill in on the contact form.
///
/// Values are taken as whatever JSON the client sent. `None` means the key
/// was absent; an explicit `null` is `Some(Value::Null)`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ContactSubmission {
    #[serde(default, deserialize_with = "present")]
    pub name: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub email: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub phone: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub event_type: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub event_date: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub message: Option<Value>,
}

fn present<'de, D>(deserializer: D) -> std::result::Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// One stored inquiry, kept exactly as it reads on disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContactEntry(Value);

impl ContactEntry {
    fn from_submission(submission: ContactSubmission, stamp: NaiveDateTime) -> Self {
        let mut record = Map::new();
        record.insert("name".into(), submission.name.unwrap_or(Value::Null));
        record.insert("email".into(), submission.email.unwrap_or(Value::Null));
        record.insert("phone".into(), submission.phone.unwrap_or(Value::Null));
        record.insert("event_type".into(), submission.event_type.unwrap_or(Value::Null));
        record.insert("event_date".into(), submission.event_date.unwrap_or(Value::Null));
        record.insert(
            "message".into(),
            submission.message.unwrap_or_else(|| Value::String(String::new())),
        );
        record.insert(
            "timestamp".into(),
            Value::String(stamp.format(TIMESTAMP_FORMAT).to_string()),
        );
        Self(Value::Object(record))
    }

    /// Raw value of a field, `None` if the record has no such key
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Field as text, `None` if absent or not a string
    pub fn text(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn timestamp(&self) -> Option<&str> {
        self.text("timestamp")
    }
}

struct Inner {
    entries: Vec<ContactEntry>,
    last_stamp: Option<NaiveDateTime>,
}

impl Inner {
    /// Wall clock, clamped so it never runs backwards within this process
    fn next_stamp(&mut self) -> NaiveDateTime {
        let now = Local::now().naive_local();
        let stamp = match self.last_stamp {
            Some(prev) if prev > now => prev,
            _ => now,
        };
        self.last_stamp = Some(stamp);
        stamp
    }
}

/// In-memory contact collection backed by a single JSON file.
///
/// Every append rewrites the whole file. Appends are serialized by a mutex so
/// two submissions handled at once cannot overwrite each other's save.
#[derive(Clone)]
pub struct ContactStore {
    path: Arc<PathBuf>,
    inner: Arc<Mutex<Inner>>,
}

impl ContactStore {
    /// Load the collection from `path`, starting empty if the file is absent
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries: Vec<ContactEntry> = persistence::load_json(&path, Vec::new())?;
        info!("Loaded {} contact entries from {:?}", entries.len(), path);

        Ok(Self {
            path: Arc::new(path),
            inner: Arc::new(Mutex::new(Inner {
                entries,
                last_stamp: None,
            })),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stamp, append and persist one submission.
    ///
    /// If the file can't be written the entry is taken back out, so memory
    /// always matches the last successful save.
    pub async fn append(&self, submission: ContactSubmission) -> Result<ContactEntry> {
        let mut inner = self.inner.lock().await;
        let stamp = inner.next_stamp();
        let entry = ContactEntry::from_submission(submission, stamp);

        inner.entries.push(entry.clone());

        // File I/O runs off the runtime threads; the lock stays held so saves
        // land in append order.
        let path = self.path.clone();
        let snapshot = inner.entries.clone();
        let saved = tokio::task::spawn_blocking(move || persistence::save_json(&path, &snapshot))
            .await
            .unwrap_or_else(|e| Err(SiteError::Server(format!("save task failed: {}", e))));
        if let Err(e) = saved {
            inner.entries.pop();
            return Err(e);
        }

        debug!(
            "Appended contact entry #{} at {}",
            inner.entries.len(),
            entry.timestamp().unwrap_or_default()
        );
        Ok(entry)
    }

    /// Snapshot of the collection, oldest first
    pub async fn entries(&self) -> Vec<ContactEntry> {
        self.inner.lock().await.entries.clone()
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
