//! Plain-text rendering of run results and trace analytics.

use std::fmt::Write as _;

use planner_stream::PlanResult;
use planner_telemetry::{
    ActionRecord, Bottleneck, ConnectorStyle, PerformanceSummary, StatusIcon, Timeline,
    top_bottlenecks,
};
use serde::Serialize;

const BAR_WIDTH: usize = 30;

/// Everything `analyze` reports about one trace.
#[derive(Debug, Serialize)]
pub struct TraceReport {
    pub timeline: Timeline,
    pub summary: PerformanceSummary,
    pub bottlenecks: Vec<Bottleneck>,
}

impl TraceReport {
    pub fn new(records: &[ActionRecord]) -> Self {
        Self {
            timeline: Timeline::build(records),
            summary: PerformanceSummary::from_records(records),
            bottlenecks: top_bottlenecks(records),
        }
    }

    pub fn render(&self) -> String {
        if self.timeline.is_empty() {
            return "No actions recorded.\n".to_string();
        }
        let mut out = String::new();
        out.push_str(&render_timeline(&self.timeline));
        out.push('\n');
        out.push_str(&render_summary(&self.summary));
        out.push('\n');
        out.push_str(&render_bottlenecks(&self.bottlenecks));
        out
    }
}

fn icon_glyph(icon: StatusIcon) -> &'static str {
    match icon {
        StatusIcon::Pending => "○",
        StatusIcon::Running => "◐",
        StatusIcon::Done => "●",
        StatusIcon::Failed => "✕",
    }
}

fn bar(width_percent: f64) -> String {
    let filled = ((width_percent / 100.0) * BAR_WIDTH as f64).round() as usize;
    let filled = filled.min(BAR_WIDTH);
    format!("{}{}", "█".repeat(filled), "·".repeat(BAR_WIDTH - filled))
}

pub fn render_timeline(timeline: &Timeline) -> String {
    let mut out = String::from("Timeline\n");
    for item in timeline.items() {
        let _ = writeln!(
            out,
            "  {} {:<28} {} {:>8}",
            icon_glyph(item.icon),
            item.name,
            bar(item.width_percent),
            item.duration_label
        );
        match item.connector {
            Some(ConnectorStyle::Solid) => out.push_str("  │\n"),
            Some(ConnectorStyle::Dashed) => out.push_str("  ┆\n"),
            None => {}
        }
    }
    out
}

pub fn render_summary(summary: &PerformanceSummary) -> String {
    let mut out = String::from("Performance\n");
    let _ = writeln!(out, "  average      {}", summary.average_label());
    let _ = writeln!(out, "  fastest      {}", summary.min_label());
    let _ = writeln!(out, "  slowest      {}", summary.max_label());
    let _ = writeln!(
        out,
        "  success      {} ({} of {})",
        summary.success_rate_label(),
        summary.completed,
        summary.total
    );
    if summary.failed + summary.pending + summary.executing > 0 {
        let _ = writeln!(
            out,
            "  unfinished   {} failed, {} executing, {} pending",
            summary.failed, summary.executing, summary.pending
        );
    }
    out
}

pub fn render_bottlenecks(bottlenecks: &[Bottleneck]) -> String {
    let mut out = String::from("Bottlenecks\n");
    if bottlenecks.is_empty() {
        out.push_str("  none\n");
        return out;
    }
    for (rank, b) in bottlenecks.iter().enumerate() {
        let _ = writeln!(
            out,
            "  {}. {:<28} {:>8} {:>5.0}%{}",
            rank + 1,
            b.name,
            planner_telemetry::format::duration_label(Some(b.duration_ms)),
            b.percentage,
            if b.significant { "  !" } else { "" }
        );
    }
    out
}

pub fn render_plan(result: &PlanResult) -> String {
    let mut out = format!("Learning path: {}\n", result.path);
    for (i, step) in result.curriculum.iter().enumerate() {
        let _ = write!(out, "  {:>2}. {}", i + 1, step.name);
        if let Some(hours) = step.estimated_hours {
            let _ = write!(out, " (~{hours}h)");
        }
        out.push('\n');
    }
    let _ = writeln!(
        out,
        "Generated in {:.1}s, estimated cost ${:.4}",
        result.generation_time_seconds, result.estimated_cost
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use planner_stream::CurriculumStep;

    fn trace() -> Vec<ActionRecord> {
        vec![
            ActionRecord::completed("fetch prerequisites", 1_000),
            ActionRecord::completed("rank paths", 3_000),
            ActionRecord::failed("estimate cost", 200),
        ]
    }

    #[test]
    fn bar_is_proportional_and_bounded() {
        assert_eq!(bar(0.0).chars().filter(|c| *c == '█').count(), 0);
        assert_eq!(bar(50.0).chars().filter(|c| *c == '█').count(), 15);
        assert_eq!(bar(140.0).chars().filter(|c| *c == '█').count(), BAR_WIDTH);
    }

    #[test]
    fn timeline_draws_connectors_between_items() {
        let text = render_timeline(&Timeline::build(&trace()));
        assert_eq!(text.matches('│').count(), 2);
        assert!(!text.contains('┆'));
        assert!(text.contains("3.0s"));
        assert!(text.contains('✕'));
    }

    #[test]
    fn report_flags_significant_bottlenecks() {
        let text = TraceReport::new(&trace()).render();
        assert!(text.contains("1. rank paths"));
        assert!(text.contains("success      67% (2 of 3)"));
        assert!(text.contains("1 failed"));
        assert_eq!(text.matches("  !").count(), 1);
    }

    #[test]
    fn empty_trace_renders_placeholder() {
        assert_eq!(TraceReport::new(&[]).render(), "No actions recorded.\n");
    }

    #[test]
    fn plan_lists_steps_in_order() {
        let result = PlanResult {
            curriculum: vec![
                CurriculumStep::named("Ownership"),
                CurriculumStep {
                    estimated_hours: Some(6.5),
                    ..CurriculumStep::named("Async Rust")
                },
            ],
            path: "systems".into(),
            generation_time_seconds: 12.34,
            estimated_cost: 0.01,
        };
        let text = render_plan(&result);
        assert!(text.starts_with("Learning path: systems\n"));
        assert!(text.contains("   1. Ownership\n"));
        assert!(text.contains("   2. Async Rust (~6.5h)\n"));
        assert!(text.contains("12.3s"));
    }
}
