//! User-triggered workflows.
//!
//! Explicit actions, as opposed to background synchronization. Mutations
//! carry no timeout: they resolve or surface an error. No action performs
//! an optimistic local status transition; each one applies (or re-fetches)
//! the authoritative post-action state the backend returned.

use crate::backend::{CreateVaultArgs, InheritanceExecution, ShareReceipt};
use crate::handles::RemoteHandleCache;
use crate::session::Session;
use crate::state::VaultStore;
use std::sync::Arc;
use thresholdvault_core::{
    validate_guardian_roster, validate_heir_weights, ClientError, EmailHash, GuardianRecord,
    Identity, VaultId, VaultSummary,
};

/// A parsed guardian invitation deep link.
///
/// Invitation emails carry a link of the form
/// `/guardian/accept?vaultId=<id>&emailHash=<hex>`; the plaintext email
/// address never appears in the link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuardianInviteLink {
    /// Vault the invitation is for.
    pub vault_id: VaultId,
    /// Email-derived guardian hash.
    pub email_hash: EmailHash,
}

impl GuardianInviteLink {
    /// Parse a deep link from a full URL or a bare query string.
    pub fn parse(link: &str) -> Result<Self, ClientError> {
        let query = link.split_once('?').map_or(link, |(_, q)| q);
        let mut vault_id = None;
        let mut email_hash = None;
        for pair in query.split('&') {
            let Some((name, value)) = pair.split_once('=') else {
                continue;
            };
            match name {
                "vaultId" => {
                    vault_id = Some(value.parse::<VaultId>().map_err(|_| {
                        ClientError::validation(format!("invalid vault id in link: {value}"))
                    })?);
                }
                "emailHash" => email_hash = Some(EmailHash::from_hex(value)?),
                _ => {}
            }
        }
        match (vault_id, email_hash) {
            (Some(vault_id), Some(email_hash)) => Ok(Self {
                vault_id,
                email_hash,
            }),
            _ => Err(ClientError::validation(
                "invitation link is missing vaultId or emailHash",
            )),
        }
    }
}

/// Explicit user actions over the remote backends.
pub struct Workflows {
    session: Arc<Session>,
    handles: Arc<RemoteHandleCache>,
    store: Arc<VaultStore>,
}

impl Workflows {
    /// Create the workflow surface.
    pub fn new(
        session: Arc<Session>,
        handles: Arc<RemoteHandleCache>,
        store: Arc<VaultStore>,
    ) -> Self {
        Self {
            session,
            handles,
            store,
        }
    }

    fn require_authenticated(&self) -> Result<Identity, ClientError> {
        let identity = self.session.current_identity();
        if identity.is_authenticated() {
            Ok(identity)
        } else {
            Err(ClientError::authentication("no authenticated identity"))
        }
    }

    /// Create a vault. The payload is validated client-side first; a
    /// failing payload never reaches a backend.
    pub async fn create_vault(&self, args: CreateVaultArgs) -> Result<VaultSummary, ClientError> {
        self.require_authenticated()?;
        if args.name.trim().is_empty() {
            return Err(ClientError::validation("vault name cannot be empty"));
        }
        validate_guardian_roster(args.guardians.len(), args.guardian_threshold)?;
        validate_heir_weights(&args.heir_records)?;
        if args.heartbeat.interval_days == 0 {
            return Err(ClientError::validation(
                "heartbeat interval must be at least one day",
            ));
        }
        let vault = self.handles.vault().await?;
        let summary = vault.create_vault(args).await?;
        tracing::info!(vault = summary.id, name = %summary.name, "vault created");
        self.apply_summary(summary.clone());
        Ok(summary)
    }

    /// Submit an owner heartbeat.
    pub async fn submit_heartbeat(&self, vault_id: VaultId) -> Result<VaultSummary, ClientError> {
        self.require_authenticated()?;
        let vault = self.handles.vault().await?;
        let summary = vault.submit_heartbeat(vault_id).await?;
        tracing::info!(
            vault = vault_id,
            due = summary.heartbeat_due_in_seconds,
            "heartbeat accepted"
        );
        self.apply_summary(summary.clone());
        Ok(summary)
    }

    /// Ask the backend to evaluate inheritance eligibility. Whether the
    /// allowed-misses threshold was truly exceeded is decided server-side.
    pub async fn request_inheritance(&self, vault_id: VaultId) -> Result<VaultSummary, ClientError> {
        self.require_authenticated()?;
        let vault = self.handles.vault().await?;
        let summary = vault.request_inheritance(vault_id).await?;
        tracing::info!(vault = vault_id, status = %summary.status, "inheritance requested");
        self.apply_summary(summary.clone());
        Ok(summary)
    }

    /// Execute inheritance once a quorum authorized it, then re-fetch the
    /// vault's authoritative post-execution state.
    pub async fn execute_inheritance(
        &self,
        vault_id: VaultId,
    ) -> Result<InheritanceExecution, ClientError> {
        self.require_authenticated()?;
        let vault = self.handles.vault().await?;
        let execution = vault.execute_inheritance(vault_id).await?;
        tracing::info!(
            vault = vault_id,
            transaction = %execution.transaction_id,
            "inheritance executed"
        );
        let detail = vault.vault_status(vault_id).await?;
        self.apply_summary(detail.summary.clone());
        self.store.set_detail(detail);
        Ok(execution)
    }

    /// Accept a guardian invitation parsed from a deep link.
    pub async fn accept_invitation(
        &self,
        link: GuardianInviteLink,
    ) -> Result<GuardianRecord, ClientError> {
        self.require_authenticated()?;
        let guardian = self.handles.guardian().await?;
        let record = guardian
            .accept_invitation(link.vault_id, link.email_hash)
            .await?;
        tracing::info!(vault = link.vault_id, guardian = %record.email_hash, "invitation accepted");
        Ok(record)
    }

    /// Submit the calling guardian's key share, then refresh the vault's
    /// quorum snapshot.
    pub async fn submit_share(
        &self,
        vault_id: VaultId,
        email_hash: EmailHash,
        share_payload: Vec<u8>,
    ) -> Result<ShareReceipt, ClientError> {
        self.require_authenticated()?;
        let guardian = self.handles.guardian().await?;
        let receipt = guardian
            .submit_share(vault_id, email_hash, share_payload)
            .await?;
        tracing::info!(
            vault = vault_id,
            remaining = receipt.remaining_required,
            "guardian share submitted"
        );
        let vault = self.handles.vault().await?;
        let quorum = vault.guardian_threshold_status(vault_id).await?;
        self.store.set_quorum(vault_id, quorum);
        Ok(receipt)
    }

    /// Vaults the calling principal guards.
    pub async fn guardian_vaults(&self) -> Result<Vec<VaultId>, ClientError> {
        self.require_authenticated()?;
        let guardian = self.handles.guardian().await?;
        guardian.list_vaults_for_guardian().await
    }

    /// Look up (and store) a vault's custody address.
    pub async fn wallet_address(&self, vault_id: VaultId) -> Result<Option<String>, ClientError> {
        self.require_authenticated()?;
        let custody = self.handles.custody().await?;
        let address = custody.view_wallet(vault_id).await?;
        self.store.set_wallet_address(vault_id, address.clone());
        Ok(address)
    }

    /// Upsert an authoritative post-action summary into the vault list.
    fn apply_summary(&self, summary: VaultSummary) {
        let mut vaults = self.store.vaults();
        match vaults.iter_mut().find(|v| v.id == summary.id) {
            Some(slot) => *slot = summary,
            None => vaults.push(summary),
        }
        self.store.set_vaults(vaults);
    }
}
