//! Display helpers shared by the timeline and graph views.

/// Placeholder for actions that have not finished yet.
pub const NO_DURATION: &str = "--";

/// Renders a duration for display.
///
/// Sub-second values keep millisecond precision, values under a minute use one
/// decimal of seconds (rounded down), longer values are split into minutes and
/// seconds.
pub fn duration_label(duration_ms: Option<u64>) -> String {
    let Some(ms) = duration_ms else {
        return NO_DURATION.to_string();
    };
    if ms < 1_000 {
        format!("{ms}ms")
    } else if ms < 60_000 {
        // Tenths are truncated, not rounded.
        format!("{}.{}s", ms / 1_000, (ms % 1_000) / 100)
    } else {
        format!("{}m {}s", ms / 60_000, (ms % 60_000) / 1_000)
    }
}

/// Truncates `text` to at most `max_chars` characters, ending in `…` when cut.
pub fn truncate_label(text: &str, max_chars: usize) -> String {
    if max_chars == 0 {
        return String::new();
    }
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars - 1).collect();
    out.push('…');
    out
}
