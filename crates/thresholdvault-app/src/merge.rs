//! Type-aware snapshot equality.
//!
//! The sync coordinator applies a fetched snapshot only when it differs by
//! value from what the containers already hold; a merge that always
//! replaced would falsely signal "changed" data and trigger needless
//! downstream recomputation. Equality is spelled out field by field over
//! the defined entities so the comparison rules are visible and testable
//! independently of the synchronization logic. Numeric fields are compared
//! by value; there is no object-identity shortcut anywhere.

use thresholdvault_core::{GuardianRecord, GuardianSubmission, VaultDetail, VaultSummary};

/// Whether two list-level snapshots differ by value.
#[must_use]
pub fn summary_changed(stored: &VaultSummary, fetched: &VaultSummary) -> bool {
    stored.id != fetched.id
        || stored.name != fetched.name
        || stored.status != fetched.status
        || stored.bitcoin_address != fetched.bitcoin_address
        || stored.guardian_count != fetched.guardian_count
        || stored.guardian_threshold != fetched.guardian_threshold
        || stored.heartbeat_due_in_seconds != fetched.heartbeat_due_in_seconds
}

/// Whether two vault lists differ by value, order-sensitively.
///
/// The backend returns a stable ordering; a reordering is a change the UI
/// should observe.
#[must_use]
pub fn vault_list_changed(stored: &[VaultSummary], fetched: &[VaultSummary]) -> bool {
    stored.len() != fetched.len()
        || stored
            .iter()
            .zip(fetched.iter())
            .any(|(a, b)| summary_changed(a, b))
}

/// Whether two guardian rosters differ by value.
#[must_use]
pub fn roster_changed(stored: &[GuardianRecord], fetched: &[GuardianRecord]) -> bool {
    stored.len() != fetched.len()
        || stored.iter().zip(fetched.iter()).any(|(a, b)| {
            a.email_hash != b.email_hash
                || a.alias != b.alias
                || a.status != b.status
                || a.principal != b.principal
        })
}

/// Whether two detail snapshots differ by value.
#[must_use]
pub fn detail_changed(stored: &VaultDetail, fetched: &VaultDetail) -> bool {
    summary_changed(&stored.summary, &fetched.summary)
        || stored.last_heartbeat != fetched.last_heartbeat
        || stored.missed_heartbeats != fetched.missed_heartbeats
        || stored.heirs != fetched.heirs
        || roster_changed(&stored.guardians, &fetched.guardians)
}

/// Whether two quorum results differ by value.
#[must_use]
pub fn submission_changed(stored: &GuardianSubmission, fetched: &GuardianSubmission) -> bool {
    stored.submitted != fetched.submitted || stored.threshold_met != fetched.threshold_met
}

#[cfg(test)]
mod tests {
    use super::*;
    use thresholdvault_core::{EmailHash, GuardianStatus, HeirRecord, VaultStatus};

    fn summary(id: u64) -> VaultSummary {
        VaultSummary {
            id,
            name: format!("vault-{id}"),
            status: VaultStatus::Active,
            bitcoin_address: "bc1qvault".to_string(),
            guardian_count: 3,
            guardian_threshold: 2,
            heartbeat_due_in_seconds: 1_900_000_000,
        }
    }

    fn detail(id: u64) -> VaultDetail {
        VaultDetail {
            summary: summary(id),
            last_heartbeat: 1_897_000_000,
            missed_heartbeats: 0,
            heirs: vec![HeirRecord {
                address: "bc1qheir".to_string(),
                weight_bps: 10_000,
            }],
            guardians: vec![GuardianRecord {
                email_hash: EmailHash::new([5; 32]),
                alias: "Alice".to_string(),
                status: GuardianStatus::Accepted,
                principal: None,
            }],
        }
    }

    #[test]
    fn value_equal_snapshots_with_distinct_identity_are_unchanged() {
        let stored = summary(42);
        // A snapshot reconstructed through a different path (serde round
        // trip) shares no allocation with the stored one.
        let fetched: VaultSummary =
            serde_json::from_str(&serde_json::to_string(&stored).unwrap()).unwrap();
        assert!(!summary_changed(&stored, &fetched));
        assert!(!vault_list_changed(
            std::slice::from_ref(&stored),
            std::slice::from_ref(&fetched)
        ));
    }

    #[test]
    fn numeric_field_change_is_detected_by_value() {
        let stored = summary(42);
        let mut fetched = stored.clone();
        fetched.heartbeat_due_in_seconds += 86_400;
        assert!(summary_changed(&stored, &fetched));
    }

    #[test]
    fn list_length_and_order_matter() {
        let a = summary(1);
        let b = summary(2);
        assert!(vault_list_changed(&[a.clone()], &[a.clone(), b.clone()]));
        assert!(vault_list_changed(
            &[a.clone(), b.clone()],
            &[b.clone(), a.clone()]
        ));
        assert!(!vault_list_changed(&[a.clone(), b.clone()], &[a, b]));
    }

    #[test]
    fn roster_status_progress_is_a_change() {
        let stored = detail(9);
        let mut fetched = stored.clone();
        fetched.guardians[0].status = GuardianStatus::ShareSubmitted;
        assert!(detail_changed(&stored, &fetched));
        assert!(roster_changed(&stored.guardians, &fetched.guardians));
    }

    #[test]
    fn detail_round_trip_is_unchanged() {
        let stored = detail(9);
        let fetched: VaultDetail =
            serde_json::from_str(&serde_json::to_string(&stored).unwrap()).unwrap();
        assert!(!detail_changed(&stored, &fetched));
    }

    #[test]
    fn submission_compared_by_value() {
        let stored = GuardianSubmission {
            submitted: 2,
            threshold_met: true,
        };
        assert!(!submission_changed(&stored, &stored.clone()));
        assert!(submission_changed(
            &stored,
            &GuardianSubmission {
                submitted: 3,
                threshold_met: true,
            }
        ));
    }
}
