//! Platform message formatters.
//!
//! Formatters are pure: the same payload and channel always produce the
//! same message value, with no I/O and no hidden state. Priority styling
//! is table-driven so each level is independently testable.

use crate::models::{CompletionMetrics, Priority};

pub mod slack;
pub mod teams;

/// Visual severity attributes for one priority level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeverityStyle {
    /// Emoji prefix used in message headings.
    pub emoji: &'static str,
    /// Hex color (no `#`), consumed by Teams `themeColor`.
    pub color: &'static str,
    /// Short label for fact tables.
    pub label: &'static str,
}

const SEVERITY_TABLE: [(Priority, SeverityStyle); 4] = [
    (
        Priority::Critical,
        SeverityStyle {
            emoji: "\u{1f6a8}",
            color: "D32F2F",
            label: "critical",
        },
    ),
    (
        Priority::High,
        SeverityStyle {
            emoji: "\u{26a0}\u{fe0f}",
            color: "F57C00",
            label: "high",
        },
    ),
    (
        Priority::Normal,
        SeverityStyle {
            emoji: "\u{2139}\u{fe0f}",
            color: "1976D2",
            label: "normal",
        },
    ),
    (
        Priority::Low,
        SeverityStyle {
            emoji: "\u{1f4a4}",
            color: "9E9E9E",
            label: "low",
        },
    ),
];

/// Look up the severity style for a priority level.
#[must_use]
pub fn severity_style(priority: Priority) -> &'static SeverityStyle {
    // The table covers every Priority variant; the fallback arm is
    // unreachable but keeps the lookup total without panicking.
    SEVERITY_TABLE
        .iter()
        .find(|(p, _)| *p == priority)
        .map_or(&SEVERITY_TABLE[2].1, |(_, style)| style)
}

/// Render a millisecond duration compactly: `420ms`, `4.2s`, `3m 20s`.
#[must_use]
#[allow(clippy::cast_precision_loss)] // durations are far below 2^52 ms.
pub fn format_duration(ms: u64) -> String {
    if ms < 1000 {
        format!("{ms}ms")
    } else if ms < 60_000 {
        let secs = ms as f64 / 1000.0;
        if (secs - secs.trunc()).abs() < 0.05 {
            format!("{secs:.0}s")
        } else {
            format!("{secs:.1}s")
        }
    } else {
        format!("{}m {}s", ms / 60_000, (ms % 60_000) / 1000)
    }
}

/// Render completion metrics as a compact fact line.
#[must_use]
pub fn metrics_line(metrics: &CompletionMetrics) -> String {
    let mark = if metrics.success { "\u{2713}" } else { "\u{2717}" };
    format!(
        "Duration: {} \u{b7} Tokens: {} \u{b7} Success: {mark}",
        format_duration(metrics.duration_ms),
        metrics.token_count,
    )
}
