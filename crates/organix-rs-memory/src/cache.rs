//! Bounded LRU cache in front of relevance recall.

use crate::model::MemoryKind;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use uuid::Uuid;

/// Identity of a recall request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct RecallKey {
    pub query: String,
    pub kind: Option<MemoryKind>,
    pub limit: usize,
    pub min_importance: u8,
}

impl RecallKey {
    pub fn new(query: &str, kind: Option<MemoryKind>, limit: usize, min_importance: u8) -> Self {
        Self {
            query: query.trim().to_lowercase(),
            kind,
            limit,
            min_importance,
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    hits: Vec<(Uuid, f32)>,
    stored_at: DateTime<Utc>,
}

/// Hit/miss counters reported by `MemoryStore::stats`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
    /// `hits / (hits + misses)`, 0 before the first lookup.
    pub hit_rate: f64,
}

/// Recall cache storing ranked ids, not records, so cached answers always
/// reflect the current record state.
#[derive(Debug)]
pub(crate) struct RecallCache {
    capacity: usize,
    ttl: Duration,
    entries: HashMap<RecallKey, CacheEntry>,
    /// Most recently used at the back.
    order: VecDeque<RecallKey>,
    hits: u64,
    misses: u64,
}

impl RecallCache {
    pub fn new(capacity: usize, ttl_secs: u64) -> Self {
        Self {
            capacity,
            ttl: Duration::seconds(
                i64::try_from(ttl_secs)
                    .unwrap_or(i64::MAX)
                    .min(i64::MAX / 1000),
            ),
            entries: HashMap::new(),
            order: VecDeque::new(),
            hits: 0,
            misses: 0,
        }
    }

    pub fn get(&mut self, key: &RecallKey, now: DateTime<Utc>) -> Option<Vec<(Uuid, f32)>> {
        let fresh = match self.entries.get(key) {
            Some(entry) => now - entry.stored_at <= self.ttl,
            None => {
                self.misses += 1;
                return None;
            }
        };
        if !fresh {
            self.remove(key);
            self.misses += 1;
            return None;
        }
        self.promote(key);
        self.hits += 1;
        self.entries.get(key).map(|entry| entry.hits.clone())
    }

    pub fn put(&mut self, key: RecallKey, hits: Vec<(Uuid, f32)>, now: DateTime<Utc>) {
        if self.capacity == 0 {
            return;
        }
        if self.entries.contains_key(&key) {
            self.promote(&key);
        } else {
            while self.entries.len() >= self.capacity {
                let Some(oldest) = self.order.pop_front() else {
                    break;
                };
                self.entries.remove(&oldest);
            }
            self.order.push_back(key.clone());
        }
        self.entries.insert(
            key,
            CacheEntry {
                hits,
                stored_at: now,
            },
        );
    }

    /// Drop entries that could include records of `kind`.
    pub fn invalidate_kind(&mut self, kind: MemoryKind) {
        let stale = self
            .entries
            .keys()
            .filter(|key| key.kind.is_none() || key.kind == Some(kind))
            .cloned()
            .collect::<Vec<_>>();
        for key in stale {
            self.remove(&key);
        }
    }

    /// Drop all entries and reset counters.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
        self.hits = 0;
        self.misses = 0;
    }

    pub fn stats(&self) -> CacheStats {
        let lookups = self.hits + self.misses;
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            entries: self.entries.len(),
            hit_rate: if lookups == 0 {
                0.0
            } else {
                self.hits as f64 / lookups as f64
            },
        }
    }

    fn promote(&mut self, key: &RecallKey) {
        if let Some(pos) = self.order.iter().position(|k| k == key)
            && let Some(key) = self.order.remove(pos)
        {
            self.order.push_back(key);
        }
    }

    fn remove(&mut self, key: &RecallKey) {
        self.entries.remove(key);
        self.order.retain(|k| k != key);
    }
}
