//! Derived views over the action trace of a plan-generation run.
//!
//! Every view here is a pure projection of an ordered `ActionRecord` slice:
//! nothing is cached and nothing mutates the input.

pub mod action;
pub mod analytics;
pub mod bottleneck;
pub mod dag;
pub mod error;
pub mod format;
pub mod observability;
pub mod timeline;

pub use action::{ActionRecord, ActionStatus, parse_trace, validate_trace};
pub use analytics::PerformanceSummary;
pub use bottleneck::{
    Bottleneck, SIGNIFICANT_PERCENT, TOP_BOTTLENECKS, find_bottlenecks, top_bottlenecks,
};
pub use dag::{
    CycleDetected, DagEdge, DagNode, LayoutOptions, NodePosition, StatusColor, StepGraph,
};
pub use error::TelemetryError;
pub use timeline::{ConnectorStyle, StatusIcon, Timeline, TimelineItem};
