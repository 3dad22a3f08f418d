//! Aggregate duration and outcome statistics over an action trace.

use serde::Serialize;

use crate::action::{ActionRecord, ActionStatus};
use crate::format::duration_label;

/// Shown in place of the minimum when no completed action has a duration.
pub const UNAVAILABLE: &str = "unavailable";

/// Aggregate performance statistics over a run's action trace.
///
/// Duration statistics consider only `Completed` records with a known duration.
/// Degenerate traces (empty, all failed, all pending) produce zero averages and
/// an unavailable minimum instead of an error.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceSummary {
    pub average_ms: f64,
    /// `None` means "unavailable".
    pub min_ms: Option<u64>,
    pub max_ms: u64,
    pub total_completed_ms: u64,
    pub completed: usize,
    pub failed: usize,
    pub pending: usize,
    pub executing: usize,
    pub total: usize,
    /// Completed over total, in percent; 0 for an empty trace.
    pub success_rate: f64,
}

impl PerformanceSummary {
    pub fn from_records(records: &[ActionRecord]) -> Self {
        let count = |status: ActionStatus| records.iter().filter(|r| r.status == status).count();
        let completed = count(ActionStatus::Completed);
        let failed = count(ActionStatus::Failed);
        let pending = count(ActionStatus::Pending);
        let executing = count(ActionStatus::Executing);
        let total = records.len();

        let durations: Vec<u64> = records
            .iter()
            .filter_map(ActionRecord::completed_duration)
            .collect();
        let total_completed_ms = durations.iter().copied().fold(0_u64, u64::saturating_add);
        let average_ms = if durations.is_empty() {
            0.0
        } else {
            total_completed_ms as f64 / durations.len() as f64
        };

        let success_rate = if total == 0 {
            0.0
        } else {
            completed as f64 / total as f64 * 100.0
        };

        Self {
            average_ms,
            min_ms: durations.iter().copied().min(),
            max_ms: durations.iter().copied().max().unwrap_or(0),
            total_completed_ms,
            completed,
            failed,
            pending,
            executing,
            total,
            success_rate,
        }
    }

    pub fn min_label(&self) -> String {
        match self.min_ms {
            Some(ms) => duration_label(Some(ms)),
            None => UNAVAILABLE.to_string(),
        }
    }

    pub fn max_label(&self) -> String {
        duration_label(Some(self.max_ms))
    }

    pub fn average_label(&self) -> String {
        duration_label(Some(self.average_ms.round() as u64))
    }

    pub fn success_rate_label(&self) -> String {
        format!("{:.0}%", self.success_rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_trace_yields_defaults() {
        let summary = PerformanceSummary::from_records(&[]);
        assert_eq!(summary.average_ms, 0.0);
        assert_eq!(summary.min_ms, None);
        assert_eq!(summary.min_label(), "unavailable");
        assert_eq!(summary.max_ms, 0);
        assert_eq!(summary.success_rate, 0.0);
        assert_eq!(summary.total, 0);
    }

    #[test]
    fn statistics_cover_completed_records_only() {
        let records = vec![
            ActionRecord::completed("a", 100),
            ActionRecord::failed("b", 5_000),
            ActionRecord::completed("c", 300),
            ActionRecord::executing("d"),
        ];
        let summary = PerformanceSummary::from_records(&records);
        assert_eq!(summary.average_ms, 200.0);
        assert_eq!(summary.min_ms, Some(100));
        assert_eq!(summary.max_ms, 300);
        assert_eq!(summary.total_completed_ms, 400);
        assert_eq!(summary.completed, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.executing, 1);
        assert_eq!(summary.total, 4);
        assert_eq!(summary.success_rate, 50.0);
        assert_eq!(summary.success_rate_label(), "50%");
        assert_eq!(summary.average_label(), "200ms");
    }

    #[test]
    fn all_failed_trace_has_unavailable_minimum() {
        let records = vec![ActionRecord::failed("a", 10), ActionRecord::failed("b", 20)];
        let summary = PerformanceSummary::from_records(&records);
        assert_eq!(summary.average_ms, 0.0);
        assert_eq!(summary.min_label(), "unavailable");
        assert_eq!(summary.max_ms, 0);
        assert_eq!(summary.completed, 0);
        assert_eq!(summary.failed, 2);
        assert_eq!(summary.success_rate, 0.0);
    }

    #[test]
    fn completed_without_duration_counts_but_has_no_timing() {
        let records = vec![ActionRecord::new("a", ActionStatus::Completed, None)];
        let summary = PerformanceSummary::from_records(&records);
        assert_eq!(summary.completed, 1);
        assert_eq!(summary.success_rate, 100.0);
        assert_eq!(summary.min_ms, None);
    }
}
