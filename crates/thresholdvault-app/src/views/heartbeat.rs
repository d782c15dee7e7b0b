//! Heartbeat countdown.
//!
//! The countdown is derived from the vault's absolute due time and a `now`
//! the caller samples once per refresh tick, not per render; recomputing
//! mid-render would make the ring jitter. A refresh tick occurs at least
//! once per [`REFRESH_TICK`] while a countdown is on screen.

use std::time::Duration;

const SECONDS_PER_DAY: u64 = 86_400;

/// Minimum refresh cadence for an on-screen countdown.
pub const REFRESH_TICK: Duration = Duration::from_secs(60);

/// Urgency band for the countdown display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// More than 14 days remaining.
    Healthy,
    /// 7 to 14 days remaining, inclusive.
    Warning,
    /// Fewer than 7 days remaining.
    Critical,
}

impl Severity {
    /// Band for a remaining-day count.
    #[must_use]
    pub fn from_remaining_days(remaining_days: u64) -> Self {
        if remaining_days > 14 {
            Self::Healthy
        } else if remaining_days >= 7 {
            Self::Warning
        } else {
            Self::Critical
        }
    }

    /// Stable label for display surfaces.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Warning => "warning",
            Self::Critical => "critical",
        }
    }
}

/// Whole days until the due time, rounded to the nearest day and clamped
/// at zero for due times in the past.
#[must_use]
pub fn remaining_days(due_seconds: u64, now_seconds: u64) -> u64 {
    let diff = due_seconds.saturating_sub(now_seconds);
    (diff + SECONDS_PER_DAY / 2) / SECONDS_PER_DAY
}

/// Fraction of the heartbeat interval still remaining, clamped to [0, 1].
#[must_use]
pub fn progress(remaining_days: u64, interval_days: u32) -> f64 {
    let interval = u64::from(interval_days.max(1));
    (remaining_days as f64 / interval as f64).clamp(0.0, 1.0)
}

/// Render-ready countdown state for one vault.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeartbeatView {
    /// Whole days until the heartbeat is due.
    pub remaining_days: u64,
    /// Urgency band.
    pub severity: Severity,
    /// Remaining fraction of the interval, for the countdown ring.
    pub progress: f64,
}

impl HeartbeatView {
    /// Compute the countdown for a due time, clock sample and interval.
    #[must_use]
    pub fn compute(due_seconds: u64, now_seconds: u64, interval_days: u32) -> Self {
        let remaining = remaining_days(due_seconds, now_seconds);
        Self {
            remaining_days: remaining,
            severity: Severity::from_remaining_days(remaining),
            progress: progress(remaining, interval_days),
        }
    }
}
