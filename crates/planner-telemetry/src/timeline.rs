//! Linear execution timeline: one item per action, width proportional to duration.

use serde::Serialize;

use crate::action::{ActionRecord, ActionStatus};
use crate::format::duration_label;

/// Icon category rendered next to a timeline item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusIcon {
    Pending,
    Running,
    Done,
    Failed,
}

impl From<ActionStatus> for StatusIcon {
    fn from(status: ActionStatus) -> Self {
        match status {
            ActionStatus::Pending => StatusIcon::Pending,
            ActionStatus::Executing => StatusIcon::Running,
            ActionStatus::Completed => StatusIcon::Done,
            ActionStatus::Failed => StatusIcon::Failed,
        }
    }
}

/// Connector drawn from an item to the next one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectorStyle {
    /// The left item completed; execution moved on.
    Solid,
    /// The left item has not completed (pending, running or failed).
    Dashed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineItem {
    pub index: usize,
    pub name: String,
    pub status: ActionStatus,
    pub icon: StatusIcon,
    pub duration_ms: Option<u64>,
    pub duration_label: String,
    /// Share of the summed known durations, in percent. Zero for unfinished items.
    pub width_percent: f64,
    /// `None` on the last item.
    pub connector: Option<ConnectorStyle>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Timeline {
    items: Vec<TimelineItem>,
    total_duration_ms: u64,
}

impl Timeline {
    /// Projects `records` into timeline items, preserving execution order.
    pub fn build(records: &[ActionRecord]) -> Self {
        let total_duration_ms = records
            .iter()
            .filter_map(|r| r.duration_ms)
            .fold(0_u64, u64::saturating_add);
        let last = records.len().saturating_sub(1);

        let items = records
            .iter()
            .enumerate()
            .map(|(index, record)| {
                let width_percent = match record.duration_ms {
                    Some(ms) if total_duration_ms > 0 => {
                        ms as f64 / total_duration_ms as f64 * 100.0
                    }
                    _ => 0.0,
                };
                let connector = (index < last).then(|| {
                    if record.status == ActionStatus::Completed {
                        ConnectorStyle::Solid
                    } else {
                        ConnectorStyle::Dashed
                    }
                });
                TimelineItem {
                    index,
                    name: record.name.clone(),
                    status: record.status,
                    icon: record.status.into(),
                    duration_ms: record.duration_ms,
                    duration_label: duration_label(record.duration_ms),
                    width_percent,
                    connector,
                }
            })
            .collect();

        Self {
            items,
            total_duration_ms,
        }
    }

    pub fn items(&self) -> &[TimelineItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Sum of all non-null durations.
    pub fn total_duration_ms(&self) -> u64 {
        self.total_duration_ms
    }

    pub fn total_width_percent(&self) -> f64 {
        self.items.iter().map(|i| i.width_percent).sum()
    }
}
