//! ThresholdVault Core - Client Domain Foundation
//!
//! Pure domain types for the ThresholdVault dashboard client. This crate
//! contains the entities exchanged with the remote custody backends and the
//! client-side error taxonomy, with no synchronization or transport logic.
//!
//! - `identity`: the active caller identity and the identity epoch counter
//!   that scopes cached remote handles
//! - `vault`: vault summaries, detail snapshots, heir records, lifecycle
//!   status and client-side validation
//! - `guardian`: guardian roster records, email hashes and quorum results
//! - `errors`: the `ClientError` taxonomy shared by every client layer

#![forbid(unsafe_code)]

pub mod errors;
pub mod guardian;
pub mod identity;
pub mod vault;

pub use errors::ClientError;
pub use guardian::{EmailHash, GuardianRecord, GuardianStatus, GuardianSubmission};
pub use identity::{Identity, IdentityEpoch};
pub use vault::{
    validate_guardian_roster, validate_heir_weights, HeartbeatConfig, HeirRecord, VaultDetail,
    VaultId, VaultStatus, VaultSummary, TOTAL_WEIGHT_BPS,
};
