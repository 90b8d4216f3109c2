//! Retention policy applied by `MemoryStore::prune`.

use crate::model::MemoryRecord;
use chrono::{DateTime, TimeDelta, Utc};
use organix_rs_config::MemoryConfig;

/// Age-based eviction rules.
#[derive(Debug, Clone, PartialEq)]
pub struct RetentionPolicy {
    /// Default age cutoff in days.
    pub max_age_days: u32,
    /// Records at or above this importance are never evicted by age.
    pub protect_importance: u8,
    /// Records recalled more often than this are never evicted by age.
    pub protect_access_count: Option<u32>,
    /// Upper bound on removals per sweep.
    pub max_prune_per_call: usize,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self::from(&MemoryConfig::default())
    }
}

impl From<&MemoryConfig> for RetentionPolicy {
    fn from(config: &MemoryConfig) -> Self {
        Self {
            max_age_days: config.max_age_days,
            protect_importance: config.protect_importance,
            protect_access_count: config.protect_access_count,
            max_prune_per_call: config.max_prune_per_call,
        }
    }
}

impl RetentionPolicy {
    /// Creation-time cutoff for a sweep at `now`.
    pub fn cutoff(&self, now: DateTime<Utc>, max_age_days: Option<u32>) -> DateTime<Utc> {
        days_before(now, max_age_days.unwrap_or(self.max_age_days))
    }

    /// Whether the record is exempt from age-based eviction.
    pub fn is_protected(&self, record: &MemoryRecord) -> bool {
        if record.importance.get() >= self.protect_importance {
            return true;
        }
        self.protect_access_count
            .is_some_and(|limit| record.access_count > u64::from(limit))
    }

    /// Whether the record should be evicted given the cutoff.
    pub fn is_evictable(&self, record: &MemoryRecord, cutoff: DateTime<Utc>) -> bool {
        record.created_at < cutoff && !self.is_protected(record)
    }
}

/// `now` minus `days`, saturating at the earliest representable instant.
pub(crate) fn days_before(now: DateTime<Utc>, days: u32) -> DateTime<Utc> {
    TimeDelta::try_days(i64::from(days))
        .and_then(|age| now.checked_sub_signed(age))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

#[cfg(test)]
mod tests {
    use super::{RetentionPolicy, days_before};
    use crate::model::{Importance, MemoryKind, MemoryRecord, Metadata};
    use chrono::{DateTime, Duration, Utc};
    use uuid::Uuid;

    fn aged(days: i64, importance: u8, access_count: u64) -> MemoryRecord {
        let created = Utc::now() - Duration::days(days);
        MemoryRecord {
            id: Uuid::new_v4(),
            kind: MemoryKind::Episodic,
            content: "x".to_string(),
            metadata: Metadata::new(),
            importance: Importance::new(importance).expect("importance"),
            created_at: created,
            last_accessed_at: created,
            updated_at: None,
            access_count,
            embedding: Vec::new(),
        }
    }

    #[test]
    fn importance_and_access_protect_old_records() {
        let policy = RetentionPolicy::default();
        let cutoff = policy.cutoff(Utc::now(), Some(30));
        assert!(policy.is_evictable(&aged(31, 1, 0), cutoff));
        assert!(policy.is_evictable(&aged(31, 3, 5), cutoff));
        assert!(!policy.is_evictable(&aged(31, 4, 0), cutoff));
        assert!(!policy.is_evictable(&aged(31, 2, 6), cutoff));
        assert!(!policy.is_evictable(&aged(29, 1, 0), cutoff));
    }

    #[test]
    fn access_protection_can_be_disabled() {
        let policy = RetentionPolicy {
            protect_access_count: None,
            ..RetentionPolicy::default()
        };
        let cutoff = policy.cutoff(Utc::now(), None);
        assert!(policy.is_evictable(&aged(400, 1, 1_000), cutoff));
    }

    #[test]
    fn huge_cutoffs_saturate_instead_of_overflowing() {
        let now = Utc::now();
        assert_eq!(days_before(now, u32::MAX), DateTime::<Utc>::MIN_UTC);
        assert_eq!(days_before(now, 0), now);
        let policy = RetentionPolicy::default();
        let cutoff = policy.cutoff(now, Some(200_000_000));
        assert!(!policy.is_evictable(&aged(10_000, 1, 0), cutoff));
    }
}
