use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use odex_core::UserId;
use serde::Serialize;

use super::schedulable::{Status, STATUS_OK};

/// Scheduler operational counters, shown in debug dumps.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SchedulerMetrics {
    /// Units handed to the execution cycle, by user.
    pub dispatched: BTreeMap<UserId, u64>,
    /// Units whose post-hook has run, by user.
    pub completed: BTreeMap<UserId, u64>,
    /// Completed units with a nonzero status.
    pub failed: u64,
    /// Average `do_work` duration by user.
    pub avg_work_duration: BTreeMap<UserId, Duration>,
    /// Last completion time.
    pub last_completed: Option<DateTime<Utc>>,
}

impl SchedulerMetrics {
    pub fn record_dispatch(&mut self, user_id: UserId) {
        *self.dispatched.entry(user_id).or_default() += 1;
    }

    /// Record a finished cycle.
    pub fn record_completion(&mut self, user_id: UserId, duration: Duration, status: Status) {
        *self.completed.entry(user_id).or_default() += 1;
        if status != STATUS_OK {
            self.failed += 1;
        }
        self.last_completed = Some(Utc::now());

        // Update rolling average duration
        let count = self.completed[&user_id];
        let prev_avg = self
            .avg_work_duration
            .get(&user_id)
            .copied()
            .unwrap_or_default();

        // Incremental mean: new_avg = prev_avg + (duration - prev_avg) / count
        let new_avg = if count == 1 {
            duration
        } else {
            let prev_nanos = prev_avg.as_nanos() as f64;
            let cur_nanos = duration.as_nanos() as f64;
            let avg_nanos = prev_nanos + (cur_nanos - prev_nanos) / count as f64;
            Duration::from_nanos(avg_nanos as u64)
        };

        self.avg_work_duration.insert(user_id, new_avg);
    }

    pub fn total_completed(&self) -> u64 {
        self.completed.values().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_single_completion() {
        let mut m = SchedulerMetrics::default();
        m.record_dispatch(1);
        m.record_completion(1, Duration::from_millis(100), STATUS_OK);

        assert_eq!(m.dispatched[&1], 1);
        assert_eq!(m.completed[&1], 1);
        assert_eq!(m.failed, 0);
        assert!(m.last_completed.is_some());
        assert_eq!(m.avg_work_duration[&1], Duration::from_millis(100));
    }

    #[test]
    fn record_multiple_completions_averages() {
        let mut m = SchedulerMetrics::default();
        m.record_completion(1, Duration::from_millis(100), STATUS_OK);
        m.record_completion(1, Duration::from_millis(200), 3);

        assert_eq!(m.completed[&1], 2);
        assert_eq!(m.failed, 1);
        // Average of 100ms and 200ms = 150ms
        let avg = m.avg_work_duration[&1].as_millis();
        assert!((140..=160).contains(&avg), "expected ~150ms, got {}ms", avg);
    }

    #[test]
    fn default_metrics() {
        let m = SchedulerMetrics::default();
        assert_eq!(m.total_completed(), 0);
        assert!(m.dispatched.is_empty());
        assert!(m.last_completed.is_none());
    }
}
