//! Render-side lifecycle interpretation.
//!
//! The client renders the status the backend returned and offers the
//! actions that status permits. It never advances the state machine
//! locally: whether missed heartbeats truly exceeded the allowance is the
//! backend's decision, and every action re-fetches the authoritative
//! post-action state.

use thresholdvault_core::VaultStatus;

/// An owner action the dashboard may offer for a vault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnerAction {
    /// Submit a liveness heartbeat.
    SubmitHeartbeat,
    /// Ask the backend to evaluate inheritance eligibility.
    RequestInheritance,
    /// Execute inheritance once a quorum authorized it.
    ExecuteInheritance,
}

/// Actions permitted for a vault in the given status.
#[must_use]
pub fn permitted_owner_actions(status: VaultStatus) -> &'static [OwnerAction] {
    match status {
        VaultStatus::Deployed | VaultStatus::Executed => &[],
        VaultStatus::Active => &[OwnerAction::SubmitHeartbeat, OwnerAction::RequestInheritance],
        VaultStatus::InheritancePending => &[OwnerAction::ExecuteInheritance],
    }
}

/// Render-ready lifecycle state for one vault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecycleView {
    /// Backend-reported status.
    pub status: VaultStatus,
    /// Display label.
    pub label: &'static str,
    /// Whether the vault can make no further transitions.
    pub terminal: bool,
    /// Actions the dashboard may offer.
    pub actions: &'static [OwnerAction],
}

impl LifecycleView {
    /// Interpret a backend-reported status.
    #[must_use]
    pub fn for_status(status: VaultStatus) -> Self {
        Self {
            status,
            label: status.label(),
            terminal: status.is_terminal(),
            actions: permitted_owner_actions(status),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn active_vaults_offer_heartbeat_and_request() {
        let view = LifecycleView::for_status(VaultStatus::Active);
        assert_eq!(
            view.actions,
            &[OwnerAction::SubmitHeartbeat, OwnerAction::RequestInheritance]
        );
        assert!(!view.terminal);
    }

    #[test]
    fn pending_vaults_offer_execution_only() {
        let view = LifecycleView::for_status(VaultStatus::InheritancePending);
        assert_eq!(view.actions, &[OwnerAction::ExecuteInheritance]);
    }

    #[test]
    fn deployed_and_executed_offer_nothing() {
        assert!(LifecycleView::for_status(VaultStatus::Deployed)
            .actions
            .is_empty());
        let executed = LifecycleView::for_status(VaultStatus::Executed);
        assert!(executed.actions.is_empty());
        assert!(executed.terminal);
    }
}
