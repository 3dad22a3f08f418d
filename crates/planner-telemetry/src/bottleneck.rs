//! Ranks completed actions by duration to surface the largest contributors to run time.

use serde::Serialize;

use crate::action::ActionRecord;

/// Number of bottlenecks reported by [`top_bottlenecks`].
pub const TOP_BOTTLENECKS: usize = 3;

/// Display threshold: entries above this share of the top duration are flagged.
pub const SIGNIFICANT_PERCENT: f64 = 50.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bottleneck {
    /// Position of the action in the execution trace.
    pub index: usize,
    pub name: String,
    pub duration_ms: u64,
    /// Duration relative to the slowest entry, in percent (the slowest is 100).
    pub percentage: f64,
    pub significant: bool,
}

/// Returns up to `limit` completed actions, slowest first.
///
/// Ties keep execution order (stable sort), so the earlier action wins. When every
/// candidate took zero milliseconds there is nothing to compare against and all
/// percentages are zero.
pub fn find_bottlenecks(records: &[ActionRecord], limit: usize) -> Vec<Bottleneck> {
    let mut ranked: Vec<(usize, &ActionRecord, u64)> = records
        .iter()
        .enumerate()
        .filter_map(|(index, record)| record.completed_duration().map(|d| (index, record, d)))
        .collect();
    ranked.sort_by(|a, b| b.2.cmp(&a.2));
    ranked.truncate(limit);

    let top = ranked.first().map(|(_, _, d)| *d).unwrap_or(0);
    ranked
        .into_iter()
        .map(|(index, record, duration_ms)| {
            let percentage = if top == 0 {
                0.0
            } else {
                duration_ms as f64 / top as f64 * 100.0
            };
            Bottleneck {
                index,
                name: record.name.clone(),
                duration_ms,
                percentage,
                significant: percentage > SIGNIFICANT_PERCENT,
            }
        })
        .collect()
}

pub fn top_bottlenecks(records: &[ActionRecord]) -> Vec<Bottleneck> {
    find_bottlenecks(records, TOP_BOTTLENECKS)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn completed(durations: &[u64]) -> Vec<ActionRecord> {
        durations
            .iter()
            .enumerate()
            .map(|(i, d)| ActionRecord::completed(format!("action {i}"), *d))
            .collect()
    }

    #[test]
    fn ranks_with_stable_tie_break() {
        let top = top_bottlenecks(&completed(&[10, 50, 30, 50, 5]));
        let indices: Vec<_> = top.iter().map(|b| b.index).collect();
        let durations: Vec<_> = top.iter().map(|b| b.duration_ms).collect();
        let percentages: Vec<_> = top.iter().map(|b| b.percentage).collect();
        assert_eq!(indices, vec![1, 3, 2]);
        assert_eq!(durations, vec![50, 50, 30]);
        assert_eq!(percentages, vec![100.0, 100.0, 60.0]);
        assert!(top.iter().all(|b| b.significant));
    }

    #[test]
    fn small_entries_are_not_significant() {
        let top = top_bottlenecks(&completed(&[100, 50, 20]));
        let flags: Vec<_> = top.iter().map(|b| b.significant).collect();
        assert_eq!(flags, vec![true, false, false]);
    }

    #[test]
    fn ignores_unfinished_and_failed_actions() {
        let records = vec![
            ActionRecord::failed("slow failure", 9_000),
            ActionRecord::executing("running"),
            ActionRecord::completed("done", 40),
        ];
        let top = top_bottlenecks(&records);
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].index, 2);
        assert_eq!(top[0].percentage, 100.0);
    }

    #[test]
    fn fewer_than_limit_and_empty() {
        assert_eq!(top_bottlenecks(&completed(&[1, 2])).len(), 2);
        assert!(top_bottlenecks(&[]).is_empty());
    }

    #[test]
    fn zero_durations_have_zero_percentage() {
        let top = top_bottlenecks(&completed(&[0, 0]));
        assert!(top.iter().all(|b| b.percentage == 0.0 && !b.significant));
    }
}
