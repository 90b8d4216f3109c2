//! Persistence backends for memory records.

use crate::error::MemoryError;
use crate::model::{MemoryKind, MemoryRecord};
use async_trait::async_trait;
use log::{debug, info};
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, HashSet};
use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Durable storage behind a `MemoryStore`.
///
/// The store keeps its own index for similarity and range queries, so a
/// backend only needs to load everything at start-up and apply writes.
#[async_trait]
pub trait MemoryBackend: Send + Sync {
    /// Load every persisted record.
    async fn load(&self) -> Result<Vec<MemoryRecord>, MemoryError>;

    /// Persist a new record.
    async fn insert(&self, record: &MemoryRecord) -> Result<(), MemoryError>;

    /// Replace existing records by id. Ids that are no longer present are
    /// skipped.
    async fn update(&self, records: &[MemoryRecord]) -> Result<(), MemoryError>;

    /// Remove records of one kind, returning how many were present.
    async fn remove(&self, kind: MemoryKind, ids: &[Uuid]) -> Result<usize, MemoryError>;
}

/// File-backed backend storing one JSONL file per memory kind.
#[derive(Debug)]
pub struct FileMemoryBackend {
    /// Root directory for memory records.
    root: PathBuf,
    /// Serializes file mutations across concurrent callers.
    write_lock: Mutex<()>,
}

impl FileMemoryBackend {
    /// Create a new file-backed backend under the given root.
    pub fn new(root: impl AsRef<Path>) -> Result<Self, MemoryError> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root)?;
        info!("initialized file memory backend (root={})", root.display());
        Ok(Self {
            root,
            write_lock: Mutex::new(()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path to the JSONL file of a kind.
    fn kind_path(&self, kind: MemoryKind) -> PathBuf {
        self.root.join(format!("{kind}.jsonl"))
    }

    /// Path to the temporary file used for atomic rewrites.
    fn temp_path(&self, kind: MemoryKind) -> PathBuf {
        self.root.join(format!("{kind}.jsonl.tmp"))
    }

    /// Load all records of a kind.
    fn load_records(&self, kind: MemoryKind) -> Result<Vec<MemoryRecord>, MemoryError> {
        let path = self.kind_path(kind);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let file = OpenOptions::new().read(true).open(path)?;
        let reader = BufReader::new(file);
        let mut records = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let record: MemoryRecord = serde_json::from_str(&line)?;
            records.push(record);
        }
        Ok(records)
    }

    /// Rewrite a kind's records atomically.
    fn write_records(&self, kind: MemoryKind, records: &[MemoryRecord]) -> Result<(), MemoryError> {
        let path = self.kind_path(kind);
        let temp_path = self.temp_path(kind);
        {
            let mut file = OpenOptions::new()
                .create(true)
                .truncate(true)
                .write(true)
                .open(&temp_path)?;
            for record in records {
                let line = serde_json::to_string(record)?;
                writeln!(file, "{line}")?;
            }
            file.sync_all()?;
        }
        std::fs::rename(temp_path, path)?;
        Ok(())
    }
}

#[async_trait]
impl MemoryBackend for FileMemoryBackend {
    async fn load(&self) -> Result<Vec<MemoryRecord>, MemoryError> {
        let _guard = self.write_lock.lock();
        let mut records = Vec::new();
        for kind in MemoryKind::ALL {
            records.extend(self.load_records(kind)?);
        }
        debug!(
            "loaded memory records (root={}, count={})",
            self.root.display(),
            records.len()
        );
        Ok(records)
    }

    /// Store a record by appending to its kind file.
    async fn insert(&self, record: &MemoryRecord) -> Result<(), MemoryError> {
        let line = serde_json::to_string(record)?;
        let _guard = self.write_lock.lock();
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.kind_path(record.kind))?;
        writeln!(file, "{line}")?;
        debug!(
            "stored memory record (id={}, kind={}, content_len={})",
            record.id,
            record.kind,
            record.content.len()
        );
        Ok(())
    }

    async fn update(&self, records: &[MemoryRecord]) -> Result<(), MemoryError> {
        if records.is_empty() {
            return Ok(());
        }
        let _guard = self.write_lock.lock();
        for kind in MemoryKind::ALL {
            let updates = records
                .iter()
                .filter(|record| record.kind == kind)
                .map(|record| (record.id, record))
                .collect::<HashMap<_, _>>();
            if updates.is_empty() {
                continue;
            }
            let mut stored = self.load_records(kind)?;
            let mut changed = 0usize;
            for record in &mut stored {
                if let Some(next) = updates.get(&record.id) {
                    *record = (*next).clone();
                    changed += 1;
                }
            }
            if changed > 0 {
                self.write_records(kind, &stored)?;
            }
            debug!("updated memory records (kind={}, count={})", kind, changed);
        }
        Ok(())
    }

    async fn remove(&self, kind: MemoryKind, ids: &[Uuid]) -> Result<usize, MemoryError> {
        if ids.is_empty() {
            return Ok(0);
        }
        let targets = ids.iter().copied().collect::<HashSet<_>>();
        let _guard = self.write_lock.lock();
        let mut stored = self.load_records(kind)?;
        let before = stored.len();
        stored.retain(|record| !targets.contains(&record.id));
        let removed = before - stored.len();
        if removed > 0 {
            self.write_records(kind, &stored)?;
        }
        debug!("removed memory records (kind={}, count={})", kind, removed);
        Ok(removed)
    }
}

/// Volatile backend for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    records: RwLock<HashMap<Uuid, MemoryRecord>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend pre-populated with records, e.g. to simulate a restart.
    pub fn with_records(records: impl IntoIterator<Item = MemoryRecord>) -> Self {
        Self {
            records: RwLock::new(records.into_iter().map(|r| (r.id, r)).collect()),
        }
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

#[async_trait]
impl MemoryBackend for InMemoryBackend {
    async fn load(&self) -> Result<Vec<MemoryRecord>, MemoryError> {
        Ok(self.records.read().values().cloned().collect())
    }

    async fn insert(&self, record: &MemoryRecord) -> Result<(), MemoryError> {
        self.records.write().insert(record.id, record.clone());
        Ok(())
    }

    async fn update(&self, records: &[MemoryRecord]) -> Result<(), MemoryError> {
        let mut stored = self.records.write();
        for record in records {
            if let Some(existing) = stored.get_mut(&record.id) {
                *existing = record.clone();
            }
        }
        Ok(())
    }

    async fn remove(&self, kind: MemoryKind, ids: &[Uuid]) -> Result<usize, MemoryError> {
        let mut stored = self.records.write();
        let mut removed = 0;
        for id in ids {
            if stored.get(id).is_some_and(|record| record.kind == kind) {
                stored.remove(id);
                removed += 1;
            }
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::{FileMemoryBackend, MemoryBackend};
    use crate::model::{Importance, MemoryKind, MemoryRecord, Metadata};
    use chrono::Utc;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;
    use uuid::Uuid;

    fn record(kind: MemoryKind, content: &str) -> MemoryRecord {
        let now = Utc::now();
        MemoryRecord {
            id: Uuid::new_v4(),
            kind,
            content: content.to_string(),
            metadata: Metadata::new(),
            importance: Importance::MIN,
            created_at: now,
            last_accessed_at: now,
            updated_at: None,
            access_count: 0,
            embedding: vec![0.5, 0.5],
        }
    }

    #[tokio::test]
    async fn file_backend_splits_records_by_kind() {
        let temp = tempdir().expect("tempdir");
        let backend = FileMemoryBackend::new(temp.path()).expect("backend");
        backend
            .insert(&record(MemoryKind::Episodic, "hello"))
            .await
            .expect("insert");
        backend
            .insert(&record(MemoryKind::Semantic, "fact"))
            .await
            .expect("insert");

        assert!(temp.path().join("episodic.jsonl").exists());
        assert!(temp.path().join("semantic.jsonl").exists());
        assert!(!temp.path().join("procedural.jsonl").exists());
        assert_eq!(backend.load().await.expect("load").len(), 2);
    }

    #[tokio::test]
    async fn file_backend_rewrites_on_update_and_remove() {
        let temp = tempdir().expect("tempdir");
        let backend = FileMemoryBackend::new(temp.path()).expect("backend");
        let mut first = record(MemoryKind::Episodic, "one");
        let second = record(MemoryKind::Episodic, "two");
        backend.insert(&first).await.expect("insert");
        backend.insert(&second).await.expect("insert");

        first.content = "one, edited".to_string();
        backend
            .update(std::slice::from_ref(&first))
            .await
            .expect("update");
        let removed = backend
            .remove(MemoryKind::Episodic, &[second.id, Uuid::new_v4()])
            .await
            .expect("remove");
        assert_eq!(removed, 1);

        let reopened = FileMemoryBackend::new(temp.path()).expect("reopen");
        let records = reopened.load().await.expect("load");
        assert_eq!(records, vec![first]);
        assert!(!temp.path().join("episodic.jsonl.tmp").exists());
    }

    #[tokio::test]
    async fn update_skips_missing_records() {
        let temp = tempdir().expect("tempdir");
        let backend = FileMemoryBackend::new(temp.path()).expect("backend");
        let ghost = record(MemoryKind::Procedural, "ghost");
        backend.update(&[ghost]).await.expect("update");
        assert!(backend.load().await.expect("load").is_empty());
    }
}
