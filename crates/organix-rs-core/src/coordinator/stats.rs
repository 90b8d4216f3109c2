//! Coordination counters.

use crate::types::CoordinationStats;
use parking_lot::Mutex;
use std::time::Duration;

const NO_INTENT: &str = "none";

#[derive(Debug, Default)]
struct StatsState {
    stats: CoordinationStats,
    timed_requests: u64,
    total_elapsed_ms: f64,
}

/// Thread-safe recorder behind [`crate::Coordinator::stats`].
#[derive(Debug, Default)]
pub(crate) struct StatsRecorder {
    state: Mutex<StatsState>,
}

impl StatsRecorder {
    pub(crate) fn record_request(&self, primary_intent: Option<&str>) {
        let mut state = self.state.lock();
        state.stats.total_requests += 1;
        *state
            .stats
            .intent_distribution
            .entry(primary_intent.unwrap_or(NO_INTENT).to_string())
            .or_insert(0) += 1;
    }

    pub(crate) fn record_agent(&self, agent_id: &str) {
        *self
            .state
            .lock()
            .stats
            .agent_usage
            .entry(agent_id.to_string())
            .or_insert(0) += 1;
    }

    pub(crate) fn record_collaboration(&self, failed_branches: usize) {
        let mut state = self.state.lock();
        state.stats.collaborations += 1;
        state.stats.failed_branches += failed_branches as u64;
    }

    pub(crate) fn record_elapsed(&self, elapsed: Duration) {
        let mut state = self.state.lock();
        state.timed_requests += 1;
        state.total_elapsed_ms += elapsed.as_secs_f64() * 1000.0;
        state.stats.avg_response_time_ms = state.total_elapsed_ms / state.timed_requests as f64;
    }

    /// Snapshot with a zero entry for every agent in `registered`.
    pub(crate) fn snapshot<'a>(
        &self,
        registered: impl IntoIterator<Item = &'a String>,
    ) -> CoordinationStats {
        let mut stats = self.state.lock().stats.clone();
        for id in registered {
            stats.agent_usage.entry(id.clone()).or_insert(0);
        }
        stats
    }
}
