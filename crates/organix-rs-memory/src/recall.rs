//! Relevance scoring for memory recall.
//!
//! `score = w_sim * max(cos, 0) + w_rec * 2^(-age / half_life) + w_imp * (importance - 1) / 4`
//!
//! Only records whose cosine similarity exceeds `min_similarity` are
//! candidates, so recency and importance reorder relevant results but never
//! surface unrelated ones.

use crate::embedding::cosine_similarity;
use crate::model::MemoryRecord;
use chrono::{DateTime, Utc};
use organix_rs_config::RelevanceConfig;
use std::cmp::Ordering;

const SECONDS_PER_DAY: f32 = 86_400.0;

/// Score a record against a query embedding, or `None` if it is not relevant.
pub fn relevance_score(
    config: &RelevanceConfig,
    query: &[f32],
    record: &MemoryRecord,
    now: DateTime<Utc>,
) -> Option<f32> {
    let similarity = cosine_similarity(query, &record.embedding);
    if similarity <= config.min_similarity {
        return None;
    }
    let age_days = (now - record.created_at).num_seconds().max(0) as f32 / SECONDS_PER_DAY;
    let recency = (-std::f32::consts::LN_2 * age_days / config.recency_half_life_days).exp();
    let importance = f32::from(record.importance.get() - 1) / 4.0;
    Some(
        config.similarity_weight * similarity.max(0.0)
            + config.recency_weight * recency
            + config.importance_weight * importance,
    )
}

/// Ordering for ranked results: score, then importance, then newer first,
/// then id for a total order.
pub fn rank_order(a: (&MemoryRecord, f32), b: (&MemoryRecord, f32)) -> Ordering {
    b.1.total_cmp(&a.1)
        .then_with(|| b.0.importance.cmp(&a.0.importance))
        .then_with(|| b.0.created_at.cmp(&a.0.created_at))
        .then_with(|| a.0.id.cmp(&b.0.id))
}

#[cfg(test)]
mod tests {
    use super::{rank_order, relevance_score};
    use crate::model::{Importance, MemoryKind, MemoryRecord, Metadata};
    use chrono::{Duration, Utc};
    use organix_rs_config::RelevanceConfig;
    use std::cmp::Ordering;
    use uuid::Uuid;

    fn record(embedding: Vec<f32>, importance: u8, age_days: i64) -> MemoryRecord {
        let created = Utc::now() - Duration::days(age_days);
        MemoryRecord {
            id: Uuid::new_v4(),
            kind: MemoryKind::Semantic,
            content: String::new(),
            metadata: Metadata::new(),
            importance: Importance::new(importance).expect("importance"),
            created_at: created,
            last_accessed_at: created,
            updated_at: None,
            access_count: 0,
            embedding,
        }
    }

    #[test]
    fn unrelated_records_are_filtered() {
        let config = RelevanceConfig::default();
        let orthogonal = record(vec![0.0, 1.0], 5, 0);
        assert_eq!(
            relevance_score(&config, &[1.0, 0.0], &orthogonal, Utc::now()),
            None
        );
    }

    #[test]
    fn recency_and_importance_break_similarity_ties() {
        let config = RelevanceConfig::default();
        let now = Utc::now();
        let fresh = record(vec![1.0, 0.0], 1, 0);
        let old = record(vec![1.0, 0.0], 1, 60);
        let important = record(vec![1.0, 0.0], 5, 60);
        let fresh_score = relevance_score(&config, &[1.0, 0.0], &fresh, now).expect("fresh");
        let old_score = relevance_score(&config, &[1.0, 0.0], &old, now).expect("old");
        let important_score =
            relevance_score(&config, &[1.0, 0.0], &important, now).expect("important");
        assert!(fresh_score > old_score);
        assert!(important_score > old_score);
        assert!(fresh_score <= 1.0 + f32::EPSILON);
    }

    #[test]
    fn equal_scores_prefer_importance_then_newer() {
        let low = record(vec![], 2, 1);
        let high = record(vec![], 4, 5);
        let newer_low = record(vec![], 2, 0);
        assert_eq!(rank_order((&high, 0.5), (&low, 0.5)), Ordering::Less);
        assert_eq!(rank_order((&newer_low, 0.5), (&low, 0.5)), Ordering::Less);
        assert_eq!(rank_order((&low, 0.9), (&high, 0.5)), Ordering::Less);
    }
}
