//! Canonical in-memory state containers.
//!
//! Containers are owned by the synchronization layer; UI components read
//! them and issue intents but never mutate them directly. Every mutation is
//! a single atomic replacement: a changed vault is swapped in wholesale,
//! never patched field by field. Writes are serialized by the cooperative
//! execution model; a write is visible once the replacement call returns.

use crate::session::IdentityObserver;
use crate::storage::{KeyValueStore, ONBOARDING_KEY};
use parking_lot::RwLock;
use std::collections::HashMap;
use thresholdvault_core::{
    GuardianSubmission, Identity, VaultDetail, VaultId, VaultSummary,
};

#[derive(Debug, Default)]
struct VaultStoreInner {
    vaults: Vec<VaultSummary>,
    selected: Option<VaultId>,
    loading: bool,
    error: Option<String>,
    details: HashMap<VaultId, VaultDetail>,
    quorum: HashMap<VaultId, GuardianSubmission>,
    addresses: HashMap<VaultId, Option<String>>,
}

/// Vault list, selection and per-vault snapshots.
#[derive(Debug, Default)]
pub struct VaultStore {
    inner: RwLock<VaultStoreInner>,
}

impl VaultStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current vault list.
    #[must_use]
    pub fn vaults(&self) -> Vec<VaultSummary> {
        self.inner.read().vaults.clone()
    }

    /// Replace the vault list.
    ///
    /// The current selection is preserved if still present in the new list,
    /// otherwise it defaults to the first vault, or none if the list is
    /// empty.
    pub fn set_vaults(&self, vaults: Vec<VaultSummary>) {
        let mut inner = self.inner.write();
        let keep_selection = inner
            .selected
            .filter(|id| vaults.iter().any(|v| v.id == *id));
        inner.selected = keep_selection.or_else(|| vaults.first().map(|v| v.id));
        inner.vaults = vaults;
    }

    /// Currently selected vault id.
    #[must_use]
    pub fn selected_vault_id(&self) -> Option<VaultId> {
        self.inner.read().selected
    }

    /// The selected vault's summary, if any.
    #[must_use]
    pub fn selected_vault(&self) -> Option<VaultSummary> {
        let inner = self.inner.read();
        let id = inner.selected?;
        inner.vaults.iter().find(|v| v.id == id).cloned()
    }

    /// Change the selection without touching the vault list.
    pub fn set_selected_vault_id(&self, id: Option<VaultId>) {
        self.inner.write().selected = id;
    }

    /// Whether a sync is in flight.
    #[must_use]
    pub fn loading(&self) -> bool {
        self.inner.read().loading
    }

    /// Set the loading flag.
    pub fn set_loading(&self, loading: bool) {
        self.inner.write().loading = loading;
    }

    /// Last sync error, if any.
    #[must_use]
    pub fn error(&self) -> Option<String> {
        self.inner.read().error.clone()
    }

    /// Store an error message; it surfaces until the next successful sync.
    pub fn set_error(&self, message: impl Into<String>) {
        self.inner.write().error = Some(message.into());
    }

    /// Clear the stored error.
    pub fn clear_error(&self) {
        self.inner.write().error = None;
    }

    /// Detail snapshot for a vault, if fetched.
    #[must_use]
    pub fn detail(&self, id: VaultId) -> Option<VaultDetail> {
        self.inner.read().details.get(&id).cloned()
    }

    /// Replace a vault's detail snapshot wholesale.
    pub fn set_detail(&self, detail: VaultDetail) {
        let mut inner = self.inner.write();
        inner.details.insert(detail.summary.id, detail);
    }

    /// Quorum progress for a vault, if fetched.
    #[must_use]
    pub fn quorum(&self, id: VaultId) -> Option<GuardianSubmission> {
        self.inner.read().quorum.get(&id).copied()
    }

    /// Replace a vault's quorum snapshot.
    pub fn set_quorum(&self, id: VaultId, submission: GuardianSubmission) {
        self.inner.write().quorum.insert(id, submission);
    }

    /// Custody address for a vault, if fetched. The outer `Option` is
    /// "have we asked", the inner one "does the wallet exist yet".
    #[must_use]
    pub fn wallet_address(&self, id: VaultId) -> Option<Option<String>> {
        self.inner.read().addresses.get(&id).cloned()
    }

    /// Replace a vault's custody address snapshot.
    pub fn set_wallet_address(&self, id: VaultId, address: Option<String>) {
        self.inner.write().addresses.insert(id, address);
    }

    /// Drop everything; used on logout.
    pub fn clear(&self) {
        *self.inner.write() = VaultStoreInner::default();
    }
}

impl IdentityObserver for VaultStore {
    fn identity_changed(&self, identity: &Identity) {
        if !identity.is_authenticated() {
            self.clear();
        }
    }
}

#[derive(Debug, Default)]
struct UiStoreInner {
    onboarding_complete: bool,
    offline: bool,
    show_create_vault: bool,
    hydrated: bool,
}

/// Session-level UI flags and the persisted onboarding flag.
#[derive(Debug, Default)]
pub struct UiStore {
    inner: RwLock<UiStoreInner>,
}

impl UiStore {
    /// Create the store with everything unset.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the onboarding flag from storage, once at startup.
    ///
    /// Storage failures are logged and leave the flag at its default; a
    /// broken disk should not block the dashboard.
    pub async fn hydrate(&self, store: &dyn KeyValueStore) {
        let stored = match store.get(ONBOARDING_KEY).await {
            Ok(value) => value.as_deref() == Some(b"1".as_slice()),
            Err(e) => {
                tracing::warn!(error = %e, "failed to hydrate onboarding flag");
                false
            }
        };
        let mut inner = self.inner.write();
        inner.onboarding_complete = stored;
        inner.hydrated = true;
    }

    /// Persist and set the onboarding flag.
    pub async fn set_onboarding_complete(&self, store: &dyn KeyValueStore, value: bool) {
        let result = if value {
            store.put(ONBOARDING_KEY, b"1".to_vec()).await
        } else {
            store.remove(ONBOARDING_KEY).await
        };
        if let Err(e) = result {
            tracing::warn!(error = %e, "failed to persist onboarding flag");
        }
        let mut inner = self.inner.write();
        inner.onboarding_complete = value;
        inner.hydrated = true;
    }

    /// Whether onboarding has been completed.
    #[must_use]
    pub fn onboarding_complete(&self) -> bool {
        self.inner.read().onboarding_complete
    }

    /// Whether the flag has been read from storage yet.
    #[must_use]
    pub fn hydrated(&self) -> bool {
        self.inner.read().hydrated
    }

    /// Whether the client is currently serving from the offline cache.
    #[must_use]
    pub fn offline(&self) -> bool {
        self.inner.read().offline
    }

    /// Flip the offline indicator.
    pub fn set_offline(&self, offline: bool) {
        let mut inner = self.inner.write();
        if inner.offline != offline {
            tracing::debug!(offline, "connectivity indicator changed");
            inner.offline = offline;
        }
    }

    /// Show or hide the create-vault wizard.
    pub fn toggle_create_vault(&self, show: bool) {
        self.inner.write().show_create_vault = show;
    }

    /// Whether the create-vault wizard is shown.
    #[must_use]
    pub fn show_create_vault(&self) -> bool {
        self.inner.read().show_create_vault
    }
}
