//! Backend interfaces.
//!
//! The remote services are external collaborators; these traits are their
//! client-side seam. A concrete transport (an IC agent, a simulator, a test
//! double) implements [`Connector`] to build one typed handle per backend,
//! bound to the identity it was constructed under.
//!
//! Backends that return a discriminated success/failure result have both
//! branches resolved here at the boundary: success unwraps to the record,
//! failure becomes a [`ClientError::RemoteCall`] carrying the backend's
//! message verbatim. No ambiguous shape crosses into application logic.

use async_trait::async_trait;
use candid::Principal;
use std::sync::Arc;
use thresholdvault_core::{
    ClientError, EmailHash, GuardianRecord, GuardianSubmission, HeartbeatConfig, HeirRecord,
    Identity, VaultDetail, VaultId, VaultSummary,
};

/// A pending guardian invitation: plaintext email stays client-side only
/// long enough to be sent once at registration; the backend stores a hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardianInvite {
    /// Guardian email address.
    pub email: String,
    /// Human alias shown in rosters.
    pub alias: String,
}

/// Arguments for vault creation.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateVaultArgs {
    /// Owner-chosen display name.
    pub name: String,
    /// Guardian invitations.
    pub guardians: Vec<GuardianInvite>,
    /// Heir records; weights sum to the full basis-point total.
    pub heir_records: Vec<HeirRecord>,
    /// Guardian shares required to release funds.
    pub guardian_threshold: u64,
    /// Heartbeat liveness configuration.
    pub heartbeat: HeartbeatConfig,
}

/// Arguments for registering a vault's guardian set.
#[derive(Debug, Clone, PartialEq)]
pub struct RegisterGuardiansArgs {
    /// Vault the guardians protect.
    pub vault_id: VaultId,
    /// Vault owner principal.
    pub owner: Principal,
    /// Quorum threshold.
    pub threshold: u64,
    /// Threshold-key identifier used by the custody service.
    pub key_id: String,
    /// Guardian invitations.
    pub invites: Vec<GuardianInvite>,
}

/// Arguments for executing inheritance through the custody wallet.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecuteInheritanceArgs {
    /// Vault being executed.
    pub vault_id: VaultId,
    /// Threshold-key identifier.
    pub key_id: String,
    /// Heir payout records.
    pub heirs: Vec<HeirRecord>,
    /// Number of guardian shares backing the execution.
    pub guardian_submissions: u64,
}

/// Result of an inheritance execution confirmed by the vault manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InheritanceExecution {
    /// Bitcoin transaction id.
    pub transaction_id: String,
    /// Broadcast time, seconds since epoch.
    pub broadcast_time: u64,
}

/// Result of an inheritance execution at the custody wallet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustodyExecution {
    /// Bitcoin transaction id.
    pub transaction_id: String,
}

/// Receipt for a submitted guardian share.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareReceipt {
    /// Vault the share belongs to.
    pub vault_id: VaultId,
    /// Submission time, seconds since epoch.
    pub submitted_at: u64,
    /// Shares still required before the threshold is met.
    pub remaining_required: i64,
}

/// Vault manager operations.
#[async_trait]
pub trait VaultBackend: Send + Sync {
    /// Create a vault with its guardian invitations and heir records.
    async fn create_vault(&self, args: CreateVaultArgs) -> Result<VaultSummary, ClientError>;
    /// Submit an owner heartbeat; returns the authoritative post-action summary.
    async fn submit_heartbeat(&self, vault_id: VaultId) -> Result<VaultSummary, ClientError>;
    /// Full vault status snapshot.
    async fn vault_status(&self, vault_id: VaultId) -> Result<VaultDetail, ClientError>;
    /// Ask the backend to evaluate inheritance eligibility.
    async fn request_inheritance(&self, vault_id: VaultId) -> Result<VaultSummary, ClientError>;
    /// Execute inheritance once a quorum authorized it.
    async fn execute_inheritance(
        &self,
        vault_id: VaultId,
    ) -> Result<InheritanceExecution, ClientError>;
    /// Quorum progress for a vault.
    async fn guardian_threshold_status(
        &self,
        vault_id: VaultId,
    ) -> Result<GuardianSubmission, ClientError>;
    /// Vaults owned by a principal.
    async fn list_vaults(&self, owner: Principal) -> Result<Vec<VaultSummary>, ClientError>;
}

/// Guardian manager operations.
#[async_trait]
pub trait GuardianBackend: Send + Sync {
    /// Register a vault's guardian set.
    async fn register_guardians(
        &self,
        args: RegisterGuardiansArgs,
    ) -> Result<Vec<GuardianRecord>, ClientError>;
    /// Accept an invitation on behalf of the calling guardian.
    async fn accept_invitation(
        &self,
        vault_id: VaultId,
        email_hash: EmailHash,
    ) -> Result<GuardianRecord, ClientError>;
    /// Submit the calling guardian's key share.
    async fn submit_share(
        &self,
        vault_id: VaultId,
        email_hash: EmailHash,
        share_payload: Vec<u8>,
    ) -> Result<ShareReceipt, ClientError>;
    /// Look up a guardian record by hash, if present.
    async fn guardian_by_hash(
        &self,
        vault_id: VaultId,
        email_hash: EmailHash,
    ) -> Result<Option<GuardianRecord>, ClientError>;
    /// Vaults the calling principal guards.
    async fn list_vaults_for_guardian(&self) -> Result<Vec<VaultId>, ClientError>;
}

/// Bitcoin custody wallet operations.
#[async_trait]
pub trait CustodyBackend: Send + Sync {
    /// Generate (or return) the vault's custody address.
    async fn generate_vault_address(
        &self,
        vault_id: VaultId,
        key_id: String,
    ) -> Result<String, ClientError>;
    /// Build, sign and broadcast the inheritance transaction.
    async fn execute_inheritance(
        &self,
        args: ExecuteInheritanceArgs,
    ) -> Result<CustodyExecution, ClientError>;
    /// The vault's custody address, if one was generated.
    async fn view_wallet(&self, vault_id: VaultId) -> Result<Option<String>, ClientError>;
}

/// Builds typed backend handles for one gateway.
///
/// `fetch_root_key` is the trust-bootstrap step for non-mainnet gateways;
/// the handle cache bounds it with a timeout and treats failure as
/// non-fatal. Handle constructors receive the identity the handle must sign
/// requests as; a handle never serves a different identity.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Fetch the gateway's root verification key. Only meaningful for
    /// local/test networks; never called for mainnet.
    async fn fetch_root_key(&self) -> Result<(), ClientError>;
    /// Build a vault manager handle.
    fn vault_backend(&self, identity: &Identity, canister: Principal) -> Arc<dyn VaultBackend>;
    /// Build a guardian manager handle.
    fn guardian_backend(
        &self,
        identity: &Identity,
        canister: Principal,
    ) -> Arc<dyn GuardianBackend>;
    /// Build a custody wallet handle.
    fn custody_backend(&self, identity: &Identity, canister: Principal)
        -> Arc<dyn CustodyBackend>;
}

/// Resolve a backend's discriminated success/failure result.
///
/// The failure branch is converted immediately, carrying the backend's
/// message verbatim.
pub fn unwrap_backend<T>(result: Result<T, String>) -> Result<T, ClientError> {
    result.map_err(ClientError::RemoteCall)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_failure_branch_keeps_message_verbatim() {
        let failed: Result<u32, String> =
            Err("guardian already accepted invitation under different principal".to_string());
        let err = unwrap_backend(failed).unwrap_err();
        assert_eq!(
            err,
            ClientError::RemoteCall(
                "guardian already accepted invitation under different principal".to_string()
            )
        );
    }

    #[test]
    fn backend_success_branch_unwraps() {
        let ok: Result<u32, String> = Ok(7);
        assert_eq!(unwrap_backend(ok).unwrap(), 7);
    }
}
