//! Vault entities and client-side validation.
//!
//! These mirror the wire shapes served by the vault manager backend. The
//! client renders lifecycle state, it never transitions it: every status
//! value here was decided by the backend, and the client re-fetches after
//! each explicit action to observe the authoritative post-action state.

use crate::errors::ClientError;
use crate::guardian::GuardianRecord;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Vault identifier assigned by the vault manager.
pub type VaultId = u64;

/// Heir weights are expressed in basis points and must sum to this total
/// across a vault's heirs.
pub const TOTAL_WEIGHT_BPS: u64 = 10_000;

/// Smallest guardian roster the guardian manager accepts.
pub const MIN_GUARDIANS: usize = 3;

/// Largest guardian roster the guardian manager accepts.
pub const MAX_GUARDIANS: usize = 5;

/// Backend-authoritative vault lifecycle status.
///
/// Deployed → Active → InheritancePending → Executed. The client never
/// performs these transitions locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum VaultStatus {
    /// Vault created, guardians not yet bound.
    #[default]
    Deployed,
    /// Guardians bound, heartbeats running.
    Active,
    /// The backend determined the allowed-misses threshold was exceeded.
    InheritancePending,
    /// A guardian quorum authorized fund movement and the custody service
    /// confirmed a transaction. Terminal.
    Executed,
}

impl VaultStatus {
    /// Whether this status admits no further transitions.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Executed)
    }

    /// Human-readable label for display surfaces.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Deployed => "Deployed",
            Self::Active => "Active",
            Self::InheritancePending => "Inheritance Pending",
            Self::Executed => "Executed",
        }
    }
}

impl fmt::Display for VaultStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Heartbeat liveness configuration chosen at vault creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeartbeatConfig {
    /// Days between expected heartbeats.
    pub interval_days: u32,
    /// Missed heartbeats tolerated before inheritance becomes eligible.
    pub allowed_misses: u32,
}

/// A destination address and its proportional share of vault funds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeirRecord {
    /// Bitcoin destination address.
    pub address: String,
    /// Share of funds in basis points.
    pub weight_bps: u64,
}

/// The list-level snapshot of a vault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultSummary {
    /// Vault identifier.
    pub id: VaultId,
    /// Owner-chosen display name.
    pub name: String,
    /// Backend-authoritative lifecycle status.
    pub status: VaultStatus,
    /// Custody address holding the vault funds.
    pub bitcoin_address: String,
    /// Number of guardians registered for the vault.
    pub guardian_count: u64,
    /// Guardian shares required to authorize fund release.
    pub guardian_threshold: u64,
    /// Absolute time the next heartbeat is due, in seconds since epoch.
    /// Always a timestamp, never a duration.
    pub heartbeat_due_in_seconds: u64,
}

/// The detail-level snapshot of a vault.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VaultDetail {
    /// The list-level snapshot.
    pub summary: VaultSummary,
    /// Last accepted heartbeat, seconds since epoch.
    pub last_heartbeat: u64,
    /// Missed heartbeats counted by the backend since the last accepted one.
    pub missed_heartbeats: u32,
    /// Heir records; weights sum to [`TOTAL_WEIGHT_BPS`].
    pub heirs: Vec<HeirRecord>,
    /// Full guardian roster.
    pub guardians: Vec<GuardianRecord>,
}

/// Validate heir records before they are sent anywhere.
///
/// Resolved entirely client-side; a failing payload never reaches a backend.
pub fn validate_heir_weights(heirs: &[HeirRecord]) -> Result<(), ClientError> {
    if heirs.is_empty() {
        return Err(ClientError::validation("at least one heir is required"));
    }
    if let Some(heir) = heirs.iter().find(|h| h.address.trim().is_empty()) {
        return Err(ClientError::validation(format!(
            "heir with weight {} bps has an empty address",
            heir.weight_bps
        )));
    }
    let total: u64 = heirs.iter().map(|h| h.weight_bps).sum();
    if total != TOTAL_WEIGHT_BPS {
        return Err(ClientError::validation(format!(
            "heir weights must sum to {TOTAL_WEIGHT_BPS} bps, got {total}"
        )));
    }
    Ok(())
}

/// Validate a guardian roster size against its threshold.
pub fn validate_guardian_roster(guardian_count: usize, threshold: u64) -> Result<(), ClientError> {
    if !(MIN_GUARDIANS..=MAX_GUARDIANS).contains(&guardian_count) {
        return Err(ClientError::validation(format!(
            "guardian count must be between {MIN_GUARDIANS} and {MAX_GUARDIANS}, got {guardian_count}"
        )));
    }
    if threshold == 0 || threshold > guardian_count as u64 {
        return Err(ClientError::validation(format!(
            "guardian threshold must be between 1 and {guardian_count}, got {threshold}"
        )));
    }
    Ok(())
}
