//! Guardian quorum progress.

use thresholdvault_core::{GuardianRecord, GuardianStatus, GuardianSubmission};

/// Render-ready quorum progress for one vault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuorumView {
    /// Guardians whose status is ShareSubmitted.
    pub submitted: u64,
    /// Shares required to authorize fund release.
    pub threshold: u64,
    /// Whether `submitted` has reached `threshold`.
    pub threshold_met: bool,
}

impl QuorumView {
    /// Derive quorum progress from a guardian roster.
    #[must_use]
    pub fn from_roster(roster: &[GuardianRecord], threshold: u64) -> Self {
        let submitted = roster
            .iter()
            .filter(|g| g.status == GuardianStatus::ShareSubmitted)
            .count() as u64;
        Self {
            submitted,
            threshold,
            threshold_met: submitted >= threshold,
        }
    }

    /// Wrap a backend-reported quorum result.
    #[must_use]
    pub fn from_submission(submission: GuardianSubmission, threshold: u64) -> Self {
        Self {
            submitted: submission.submitted,
            threshold,
            threshold_met: submission.threshold_met,
        }
    }

    /// Submitted fraction of the threshold, clamped to [0, 1].
    #[must_use]
    pub fn fraction(&self) -> f64 {
        if self.threshold == 0 {
            1.0
        } else {
            (self.submitted as f64 / self.threshold as f64).min(1.0)
        }
    }
}
