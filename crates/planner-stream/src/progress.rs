//! Progress estimation strategies.
//!
//! The planner emits discrete milestones, not a percentage, so the visible progress
//! is estimated client-side. The strategy is a trait so a producer that reports real
//! percentages can be plugged in without touching the reducer.

use crate::protocol::EventKind;

/// Maps the previous progress value and an incoming event kind to the next value.
///
/// Implementations must be pure and must never return less than `previous`; the
/// reducer clamps to `[previous, 100]` regardless.
pub trait ProgressEstimator: Send + Sync {
    fn estimate(&self, previous: u8, kind: EventKind) -> u8;
}

/// Default estimator: fixed floors for the start milestones, a fixed step per
/// executed action capped below 100, and exactly 100 on completion.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MilestoneEstimator;

impl MilestoneEstimator {
    pub const AGENT_STARTED_FLOOR: u8 = 5;
    pub const PLANNING_STARTED_FLOOR: u8 = 10;
    pub const ACTION_STEP: u8 = 15;
    /// Highest value reachable before the terminal event.
    pub const ACTION_CEILING: u8 = 85;
    pub const COMPLETE: u8 = 100;
}

impl ProgressEstimator for MilestoneEstimator {
    fn estimate(&self, previous: u8, kind: EventKind) -> u8 {
        let next = match kind {
            EventKind::AgentStarted => previous.max(Self::AGENT_STARTED_FLOOR),
            EventKind::PlanningStarted => previous.max(Self::PLANNING_STARTED_FLOOR),
            EventKind::ActionExecuted => previous
                .saturating_add(Self::ACTION_STEP)
                .min(Self::ACTION_CEILING),
            EventKind::Progress | EventKind::Error => previous,
            EventKind::AgentCompleted => Self::COMPLETE,
        };
        next.max(previous).min(Self::COMPLETE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn floors_and_steps() {
        let e = MilestoneEstimator;
        assert_eq!(e.estimate(0, EventKind::AgentStarted), 5);
        assert_eq!(e.estimate(5, EventKind::PlanningStarted), 10);
        assert_eq!(e.estimate(10, EventKind::ActionExecuted), 25);
        assert_eq!(e.estimate(25, EventKind::Progress), 25);
        assert_eq!(e.estimate(25, EventKind::Error), 25);
        assert_eq!(e.estimate(25, EventKind::AgentCompleted), 100);
    }

    #[test]
    fn actions_cap_below_completion() {
        let e = MilestoneEstimator;
        let mut progress = 10;
        for _ in 0..20 {
            progress = e.estimate(progress, EventKind::ActionExecuted);
        }
        assert_eq!(progress, MilestoneEstimator::ACTION_CEILING);
    }

    #[test]
    fn floors_never_regress() {
        let e = MilestoneEstimator;
        assert_eq!(e.estimate(40, EventKind::AgentStarted), 40);
        assert_eq!(e.estimate(40, EventKind::PlanningStarted), 40);
        assert_eq!(e.estimate(90, EventKind::ActionExecuted), 90);
    }

    #[test]
    fn never_decreases_for_any_kind_and_value() {
        let e = MilestoneEstimator;
        for previous in 0..=100_u8 {
            for kind in EventKind::ALL {
                let next = e.estimate(previous, kind);
                assert!(next >= previous, "{kind} regressed from {previous} to {next}");
                assert!(next <= 100);
            }
        }
    }
}
