//! Memory store: indexed, write-through, relevance-ranked.

use crate::backend::{FileMemoryBackend, InMemoryBackend, MemoryBackend};
use crate::cache::{CacheStats, RecallCache, RecallKey};
use crate::clock::{Clock, SystemClock};
use crate::embedding::HashingEmbedder;
use crate::error::MemoryError;
use crate::model::{Importance, MemoryKind, MemoryRecord, Metadata, ScoredMemory};
use crate::policy::{RetentionPolicy, days_before};
use crate::recall::{rank_order, relevance_score};
use chrono::{DateTime, Utc};
use directories::UserDirs;
use log::{debug, info, warn};
use organix_rs_config::{MemoryConfig, RelevanceConfig};
use organix_rs_protocol::{ChatProvider, ChatRequest, EmbeddingProvider};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt::Write as _;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex as AsyncMutex;
use uuid::Uuid;

const DIGEST_PROMPT: &str = "You condense memory digests. Summarize the key facts, \
decisions and recurring topics below in a few short paragraphs.";
const DIGEST_EXCERPT_CHARS: usize = 200;

/// Per-kind counters reported by `MemoryStore::stats`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct KindStats {
    pub count: usize,
    pub average_importance: f64,
    /// Records per metadata `type`; untyped records count as `general`.
    pub categories: BTreeMap<String, usize>,
}

/// Store-wide counters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemoryStats {
    pub total: usize,
    pub per_kind: BTreeMap<MemoryKind, KindStats>,
    pub oldest: Option<DateTime<Utc>>,
    pub newest: Option<DateTime<Utc>>,
    pub cache: CacheStats,
}

/// Builder for a `MemoryStore` with injectable collaborators.
pub struct MemoryStoreBuilder {
    config: MemoryConfig,
    backend: Option<Arc<dyn MemoryBackend>>,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    clock: Option<Arc<dyn Clock>>,
}

impl MemoryStoreBuilder {
    pub fn new(config: MemoryConfig) -> Self {
        Self {
            config,
            backend: None,
            embedder: None,
            clock: None,
        }
    }

    /// Persistence backend; defaults to a volatile in-memory backend.
    pub fn backend(mut self, backend: Arc<dyn MemoryBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Embedding provider; defaults to `HashingEmbedder`.
    pub fn embedder(mut self, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    /// Time source; defaults to `SystemClock`.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Load persisted records and build the store.
    pub async fn build(self) -> Result<MemoryStore, MemoryError> {
        let backend = self
            .backend
            .unwrap_or_else(|| Arc::new(InMemoryBackend::new()));
        let embedder = self.embedder.unwrap_or_else(|| {
            Arc::new(HashingEmbedder::new(self.config.embedding_dimensions))
        });
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let cache = RecallCache::new(self.config.cache_capacity, self.config.cache_ttl_secs);

        let store = MemoryStore {
            backend,
            embedder,
            clock,
            relevance: self.config.relevance.clone(),
            retention: RetentionPolicy::from(&self.config),
            index: RwLock::new(HashMap::new()),
            cache: Mutex::new(cache),
            generation: AtomicU64::new(0),
            writer: AsyncMutex::new(()),
        };
        store.load_index().await?;
        Ok(store)
    }
}

/// Durable, queryable store of memory records.
///
/// The store is the single writer of records: every mutation goes to the
/// backend first and is then applied to the in-memory index used for
/// similarity and range queries.
pub struct MemoryStore {
    backend: Arc<dyn MemoryBackend>,
    embedder: Arc<dyn EmbeddingProvider>,
    clock: Arc<dyn Clock>,
    relevance: RelevanceConfig,
    retention: RetentionPolicy,
    index: RwLock<HashMap<Uuid, MemoryRecord>>,
    cache: Mutex<RecallCache>,
    /// Bumped on every mutation so a recall computed against an older index
    /// is not cached.
    generation: AtomicU64,
    /// Held from reading a record in the index until its new state is
    /// persisted, so writes to an existing record reach the backend in the
    /// order they reach the index.
    writer: AsyncMutex<()>,
}

impl MemoryStore {
    pub fn builder(config: MemoryConfig) -> MemoryStoreBuilder {
        MemoryStoreBuilder::new(config)
    }

    /// Open the file-backed store described by `config`.
    pub async fn open(config: &MemoryConfig) -> Result<Self, MemoryError> {
        let root = match config.path.as_deref() {
            Some(path) => PathBuf::from(path),
            None => default_memory_root().ok_or_else(|| {
                MemoryError::Validation(
                    "cannot resolve home directory; set memory.path".to_string(),
                )
            })?,
        };
        let backend = FileMemoryBackend::new(&root)?;
        Self::builder(config.clone())
            .backend(Arc::new(backend))
            .build()
            .await
    }

    /// Volatile store with default collaborators.
    pub async fn in_memory(config: &MemoryConfig) -> Result<Self, MemoryError> {
        Self::builder(config.clone()).build().await
    }

    async fn load_index(&self) -> Result<(), MemoryError> {
        let records = self.backend.load().await?;
        let dimensions = self.embedder.dimensions();
        let mut stale = Vec::new();
        let mut loaded = HashMap::with_capacity(records.len());
        for mut record in records {
            if record.embedding.len() != dimensions {
                record.embedding = self.embed(&record.content).await?;
                stale.push(record.clone());
            }
            loaded.insert(record.id, record);
        }
        if !stale.is_empty() {
            info!("re-embedded stored memories (count={})", stale.len());
            self.backend.update(&stale).await?;
        }
        info!("memory index loaded (records={})", loaded.len());
        *self.index.write() = loaded;
        Ok(())
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, MemoryError> {
        let vector = self
            .embedder
            .embed(text)
            .await
            .map_err(|err| MemoryError::Embedding(err.to_string()))?;
        let expected = self.embedder.dimensions();
        if vector.len() != expected {
            return Err(MemoryError::Embedding(format!(
                "expected {expected} dimensions, got {}",
                vector.len()
            )));
        }
        Ok(vector)
    }

    /// Add a record and return its id.
    pub async fn add(
        &self,
        kind: MemoryKind,
        content: impl Into<String>,
        metadata: Metadata,
        importance: u8,
    ) -> Result<Uuid, MemoryError> {
        let importance = Importance::new(importance)?;
        let content = content.into();
        let embedding = self.embed(&content).await?;
        let now = self.clock.now();
        let record = MemoryRecord {
            id: Uuid::new_v4(),
            kind,
            content,
            metadata,
            importance,
            created_at: now,
            last_accessed_at: now,
            updated_at: None,
            access_count: 0,
            embedding,
        };
        self.backend.insert(&record).await?;
        let id = record.id;
        self.index.write().insert(id, record);
        self.invalidate(kind);
        debug!("memory added (id={}, kind={}, importance={})", id, kind, importance);
        Ok(id)
    }

    /// Rank records by relevance to `query` and return the best `limit`.
    ///
    /// Returned records have their access time and count refreshed.
    pub async fn retrieve_relevant(
        &self,
        query: &str,
        kind: Option<MemoryKind>,
        limit: usize,
        min_importance: u8,
    ) -> Result<Vec<ScoredMemory>, MemoryError> {
        if limit == 0 || query.trim().is_empty() {
            return Ok(Vec::new());
        }
        let now = self.clock.now();
        let key = RecallKey::new(query, kind, limit, min_importance);
        let cached = self.cache.lock().get(&key, now);
        let hits = match cached {
            Some(hits) => hits,
            None => {
                let generation = self.generation.load(Ordering::Acquire);
                let query_embedding = self.embed(query).await?;
                let hits = {
                    let index = self.index.read();
                    let mut scored = index
                        .values()
                        .filter(|record| kind.is_none_or(|kind| record.kind == kind))
                        .filter(|record| record.importance.get() >= min_importance)
                        .filter_map(|record| {
                            relevance_score(&self.relevance, &query_embedding, record, now)
                                .map(|score| (record, score))
                        })
                        .collect::<Vec<_>>();
                    scored.sort_by(|a, b| rank_order(*a, *b));
                    scored
                        .into_iter()
                        .take(limit)
                        .map(|(record, score)| (record.id, score))
                        .collect::<Vec<_>>()
                };
                let mut cache = self.cache.lock();
                if self.generation.load(Ordering::Acquire) == generation {
                    cache.put(key, hits.clone(), now);
                }
                hits
            }
        };

        let ids = hits.iter().map(|(id, _)| *id).collect::<Vec<_>>();
        let scores = hits.into_iter().collect::<HashMap<_, _>>();
        let records = self.touch(&ids, now).await;
        debug!(
            "memory recall (kind={:?}, limit={}, returned={})",
            kind,
            limit,
            records.len()
        );
        Ok(records
            .into_iter()
            .map(|record| {
                let score = scores.get(&record.id).copied().unwrap_or_default();
                ScoredMemory { record, score }
            })
            .collect())
    }

    /// Records created in `[start, end]` (end defaults to now), newest first.
    pub async fn retrieve_by_timeframe(
        &self,
        start: DateTime<Utc>,
        end: Option<DateTime<Utc>>,
        kind: Option<MemoryKind>,
        limit: usize,
    ) -> Result<Vec<MemoryRecord>, MemoryError> {
        let now = self.clock.now();
        let end = end.unwrap_or(now);
        if end < start {
            return Err(MemoryError::Validation(format!(
                "timeframe end {end} is before start {start}"
            )));
        }
        let ids = {
            let index = self.index.read();
            let mut matching = index
                .values()
                .filter(|record| kind.is_none_or(|kind| record.kind == kind))
                .filter(|record| record.created_at >= start && record.created_at <= end)
                .collect::<Vec<_>>();
            matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
            matching
                .into_iter()
                .take(limit)
                .map(|record| record.id)
                .collect::<Vec<_>>()
        };
        Ok(self.touch(&ids, now).await)
    }

    /// Refresh access bookkeeping for `ids`, preserving their order.
    async fn touch(&self, ids: &[Uuid], now: DateTime<Utc>) -> Vec<MemoryRecord> {
        if ids.is_empty() {
            return Vec::new();
        }
        let _writer = self.writer.lock().await;
        let touched = {
            let mut index = self.index.write();
            ids.iter()
                .filter_map(|id| {
                    index.get_mut(id).map(|record| {
                        record.touch(now);
                        record.clone()
                    })
                })
                .collect::<Vec<_>>()
        };
        if let Err(err) = self.backend.update(&touched).await {
            warn!(
                "failed to persist memory access times (count={}, error={})",
                touched.len(),
                err
            );
        }
        touched
    }

    /// Update content and/or merge metadata. Content changes are re-embedded.
    pub async fn update(
        &self,
        id: Uuid,
        content: Option<String>,
        metadata: Option<Metadata>,
    ) -> Result<bool, MemoryError> {
        let snapshot = self.get(id).ok_or(MemoryError::NotFound(id))?;
        if content.is_none() && metadata.is_none() {
            return Ok(true);
        }
        // Embed before taking the writer; recalls should not wait on it.
        let content = match content {
            Some(content) if content != snapshot.content => {
                let embedding = self.embed(&content).await?;
                Some((content, Some(embedding)))
            }
            Some(content) => Some((content, None)),
            None => None,
        };

        let _writer = self.writer.lock().await;
        let mut next = self.get(id).ok_or(MemoryError::NotFound(id))?;
        if let Some((content, embedding)) = content
            && content != next.content
        {
            next.embedding = match embedding {
                Some(embedding) => embedding,
                None => self.embed(&content).await?,
            };
            next.content = content;
        }
        if let Some(metadata) = metadata {
            next.metadata.extend(metadata);
        }
        next.updated_at = Some(self.clock.now());

        self.backend.update(std::slice::from_ref(&next)).await?;
        let kind = next.kind;
        self.index.write().insert(id, next);
        self.invalidate(kind);
        debug!("memory updated (id={}, kind={})", id, kind);
        Ok(true)
    }

    /// Adjust the importance of a record.
    pub async fn set_importance(&self, id: Uuid, importance: u8) -> Result<(), MemoryError> {
        let importance = Importance::new(importance)?;
        let _writer = self.writer.lock().await;
        let mut next = self.get(id).ok_or(MemoryError::NotFound(id))?;
        next.importance = importance;
        self.backend.update(std::slice::from_ref(&next)).await?;
        let kind = next.kind;
        self.index.write().insert(id, next);
        self.invalidate(kind);
        debug!("memory importance set (id={}, importance={})", id, importance);
        Ok(())
    }

    /// Delete a record. Returns `false` if it was already absent.
    pub async fn delete(&self, id: Uuid) -> Result<bool, MemoryError> {
        let _writer = self.writer.lock().await;
        let kind = self.index.read().get(&id).map(|record| record.kind);
        let Some(kind) = kind else {
            return Ok(false);
        };
        self.backend.remove(kind, &[id]).await?;
        let removed = self.index.write().remove(&id).is_some();
        self.invalidate(kind);
        debug!("memory deleted (id={}, kind={}, removed={})", id, kind, removed);
        Ok(removed)
    }

    /// Evict old, unimportant, rarely recalled records, oldest first.
    ///
    /// `max_age_days` overrides the configured default cutoff.
    pub async fn prune(&self, max_age_days: Option<u32>) -> Result<usize, MemoryError> {
        let _writer = self.writer.lock().await;
        let now = self.clock.now();
        let cutoff = self.retention.cutoff(now, max_age_days);
        let (mut victims, scanned) = {
            let index = self.index.read();
            let victims = index
                .values()
                .filter(|record| self.retention.is_evictable(record, cutoff))
                .map(|record| (record.created_at, record.kind, record.id))
                .collect::<Vec<_>>();
            (victims, index.len())
        };
        victims.sort();
        victims.truncate(self.retention.max_prune_per_call);

        let mut removed = 0;
        for kind in MemoryKind::ALL {
            let ids = victims
                .iter()
                .filter(|(_, victim_kind, _)| *victim_kind == kind)
                .map(|(_, _, id)| *id)
                .collect::<Vec<_>>();
            if ids.is_empty() {
                continue;
            }
            self.backend.remove(kind, &ids).await?;
            {
                let mut index = self.index.write();
                removed += ids.iter().filter(|id| index.remove(*id).is_some()).count();
            }
            self.invalidate(kind);
        }
        info!(
            "memory pruned (removed={}, scanned={}, cutoff={})",
            removed, scanned, cutoff
        );
        Ok(removed)
    }

    /// Fetch a record without touching its access bookkeeping.
    pub fn get(&self, id: Uuid) -> Option<MemoryRecord> {
        self.index.read().get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.index.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.read().is_empty()
    }

    /// Drop cached recall results and reset hit/miss counters.
    pub fn clear_cache(&self) {
        self.cache.lock().clear();
        debug!("memory recall cache cleared");
    }

    pub fn stats(&self) -> MemoryStats {
        let index = self.index.read();
        let mut per_kind = MemoryKind::ALL
            .into_iter()
            .map(|kind| (kind, KindStats::default()))
            .collect::<BTreeMap<_, _>>();
        let mut importance_sums = BTreeMap::<MemoryKind, u64>::new();
        let mut oldest: Option<DateTime<Utc>> = None;
        let mut newest: Option<DateTime<Utc>> = None;
        for record in index.values() {
            if let Some(stats) = per_kind.get_mut(&record.kind) {
                stats.count += 1;
                let category = record.metadata_str("type").unwrap_or("general");
                *stats.categories.entry(category.to_string()).or_default() += 1;
            }
            *importance_sums.entry(record.kind).or_default() += u64::from(record.importance.get());
            oldest = Some(oldest.map_or(record.created_at, |t| t.min(record.created_at)));
            newest = Some(newest.map_or(record.created_at, |t| t.max(record.created_at)));
        }
        for (kind, stats) in &mut per_kind {
            if stats.count > 0 {
                let sum = importance_sums.get(kind).copied().unwrap_or_default();
                stats.average_importance = sum as f64 / stats.count as f64;
            }
        }
        MemoryStats {
            total: index.len(),
            per_kind,
            oldest,
            newest,
            cache: self.cache.lock().stats(),
        }
    }

    /// Digest of recent records grouped by kind and metadata `type`.
    ///
    /// With a condenser the digest is condensed by the chat provider; a
    /// provider failure falls back to the rendered digest.
    pub async fn summarize(
        &self,
        kind: Option<MemoryKind>,
        timeframe_days: u32,
        limit: usize,
        condenser: Option<&dyn ChatProvider>,
    ) -> Result<String, MemoryError> {
        let since = days_before(self.clock.now(), timeframe_days);
        let selected = {
            let index = self.index.read();
            let mut selected = index
                .values()
                .filter(|record| kind.is_none_or(|kind| record.kind == kind))
                .filter(|record| record.created_at >= since)
                .cloned()
                .collect::<Vec<_>>();
            selected.sort_by(|a, b| {
                b.importance
                    .cmp(&a.importance)
                    .then_with(|| b.created_at.cmp(&a.created_at))
            });
            selected.truncate(limit);
            selected
        };
        if selected.is_empty() {
            return Ok(format!(
                "No memories recorded in the last {timeframe_days} days."
            ));
        }

        let digest = render_digest(&selected, timeframe_days);
        let Some(condenser) = condenser else {
            return Ok(digest);
        };
        match condenser
            .complete(&ChatRequest::new(DIGEST_PROMPT, digest.clone()))
            .await
        {
            Ok(summary) if !summary.trim().is_empty() => Ok(summary),
            Ok(_) => {
                warn!("memory condenser returned an empty summary; using digest");
                Ok(digest)
            }
            Err(err) => {
                warn!("memory condenser failed (error={}); using digest", err);
                Ok(digest)
            }
        }
    }

    fn invalidate(&self, kind: MemoryKind) {
        let mut cache = self.cache.lock();
        self.generation.fetch_add(1, Ordering::AcqRel);
        cache.invalidate_kind(kind);
    }
}

/// Default storage root: `~/.organix/memory`.
pub fn default_memory_root() -> Option<PathBuf> {
    UserDirs::new().map(|dirs| dirs.home_dir().join(".organix").join("memory"))
}

fn render_digest(records: &[MemoryRecord], timeframe_days: u32) -> String {
    let mut groups: BTreeMap<MemoryKind, BTreeMap<&str, Vec<&MemoryRecord>>> = BTreeMap::new();
    for record in records {
        let category = record.metadata_str("type").unwrap_or("general");
        groups
            .entry(record.kind)
            .or_default()
            .entry(category)
            .or_default()
            .push(record);
    }

    let mut out = format!(
        "Memory digest: {} records from the last {} days\n",
        records.len(),
        timeframe_days
    );
    for (kind, categories) in groups {
        let count: usize = categories.values().map(Vec::len).sum();
        let _ = writeln!(out, "[{kind}] {count} records");
        for (category, entries) in categories {
            let _ = writeln!(out, "  {category}:");
            for record in entries {
                let _ = writeln!(
                    out,
                    "    - ({}, importance {}) {}",
                    record.created_at.format("%Y-%m-%d %H:%M"),
                    record.importance,
                    excerpt(&record.content, DIGEST_EXCERPT_CHARS)
                );
            }
        }
    }
    out
}

fn excerpt(text: &str, max_chars: usize) -> String {
    let single_line = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if single_line.chars().count() <= max_chars {
        return single_line;
    }
    let mut cut = single_line.chars().take(max_chars).collect::<String>();
    cut.push_str("...");
    cut
}
