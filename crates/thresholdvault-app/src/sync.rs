//! Sync coordination.
//!
//! One fetch per (resource, identity) pair: overlapping callers share the
//! in-flight result instead of issuing duplicate remote calls. Resolved
//! values are merged into the state containers only when they differ by
//! value from what is already stored, and never on behalf of a caller that
//! has lost interest or an identity that has been superseded. No automatic
//! retry anywhere; failures surface and stay until the next success.

use crate::handles::RemoteHandleCache;
use crate::merge;
use crate::session::Session;
use crate::state::VaultStore;
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thresholdvault_core::{
    ClientError, GuardianSubmission, Identity, VaultDetail, VaultId, VaultSummary,
};

/// A synchronizable resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResourceKey {
    /// The owner's vault list.
    VaultList,
    /// One vault's detail snapshot.
    VaultStatus(VaultId),
    /// One vault's guardian quorum progress.
    QuorumStatus(VaultId),
    /// One vault's custody address.
    WalletAddress(VaultId),
}

impl ResourceKey {
    /// Stable label for log events.
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::VaultList => "vaults".to_string(),
            Self::VaultStatus(id) => format!("vaultStatus:{id}"),
            Self::QuorumStatus(id) => format!("quorumStatus:{id}"),
            Self::WalletAddress(id) => format!("walletAddress:{id}"),
        }
    }
}

/// A resolved resource value.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncValue {
    /// Vault list.
    Vaults(Vec<VaultSummary>),
    /// Vault detail snapshot.
    VaultStatus(VaultDetail),
    /// Quorum progress.
    Quorum(GuardianSubmission),
    /// Custody address, `None` if not yet generated.
    WalletAddress(Option<String>),
    /// Nothing fetched (anonymous identity).
    Empty,
}

/// Advisory, cooperative cancellation signal.
///
/// A caller holds an `Interest` while it cares about a sync's result and
/// cancels it on unmount or when the resource key is superseded. There is
/// no preemptive abort of in-flight calls; the coordinator checks the
/// signal before applying a resolved result.
#[derive(Debug, Clone, Default)]
pub struct Interest(Arc<AtomicBool>);

impl Interest {
    /// A live interest.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal loss of interest.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether the caller still cares.
    #[must_use]
    pub fn is_live(&self) -> bool {
        !self.0.load(Ordering::SeqCst)
    }
}

/// What a sync did.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    /// The fetched value differed from the stored one and was applied.
    Applied(SyncValue),
    /// The fetched value matched the stored one; no state replacement.
    Unchanged(SyncValue),
    /// No usable identity; loading/error cleared, nothing fetched.
    Empty,
    /// The result resolved after its caller lost interest or its identity
    /// was superseded; dropped silently, never surfaced as an error.
    Discarded,
}

type InFlight = Shared<BoxFuture<'static, Result<SyncValue, ClientError>>>;

/// Coalesces fetches and applies no-op-preserving merges.
pub struct SyncCoordinator {
    session: Arc<Session>,
    handles: Arc<RemoteHandleCache>,
    store: Arc<VaultStore>,
    inflight: Mutex<HashMap<(ResourceKey, Identity), InFlight>>,
}

impl SyncCoordinator {
    /// Create a coordinator over a session, handle cache and store.
    pub fn new(
        session: Arc<Session>,
        handles: Arc<RemoteHandleCache>,
        store: Arc<VaultStore>,
    ) -> Self {
        Self {
            session,
            handles,
            store,
            inflight: Mutex::new(HashMap::new()),
        }
    }

    /// Fetch a resource for the current identity, coalescing with any
    /// compatible fetch already in flight.
    pub async fn sync(
        &self,
        resource: ResourceKey,
        interest: &Interest,
    ) -> Result<SyncOutcome, ClientError> {
        let identity = self.session.current_identity();
        if !identity.is_authenticated() {
            self.store.set_loading(false);
            self.store.clear_error();
            return Ok(SyncOutcome::Empty);
        }

        let key = (resource.clone(), identity.clone());
        let (pending, started_here) = {
            let mut inflight = self.inflight.lock();
            match inflight.get(&key) {
                Some(existing) => (existing.clone(), false),
                None => {
                    let fetch = fetch(Arc::clone(&self.handles), resource.clone(), identity.clone())
                        .boxed()
                        .shared();
                    inflight.insert(key.clone(), fetch.clone());
                    (fetch, true)
                }
            }
        };
        if started_here {
            self.store.set_loading(true);
            tracing::debug!(resource = %resource.label(), identity = %identity, "sync fetch started");
        }

        let result = pending.clone().await;

        // Bookkeeping is settled once, by whichever awaiter gets here first.
        {
            let mut inflight = self.inflight.lock();
            if inflight.get(&key).is_some_and(|f| f.ptr_eq(&pending)) {
                inflight.remove(&key);
                self.store.set_loading(false);
            }
        }

        if !interest.is_live() {
            tracing::debug!(resource = %resource.label(), "stale sync result discarded");
            return Ok(SyncOutcome::Discarded);
        }
        if self.session.current_identity() != identity {
            tracing::debug!(resource = %resource.label(), "sync result for superseded identity discarded");
            return Ok(SyncOutcome::Discarded);
        }

        match result {
            Ok(value) => {
                let outcome = self.apply(&resource, value);
                self.store.clear_error();
                Ok(outcome)
            }
            Err(e) => {
                self.store.set_error(e.to_string());
                Err(e)
            }
        }
    }

    fn apply(&self, resource: &ResourceKey, value: SyncValue) -> SyncOutcome {
        match (resource, &value) {
            (ResourceKey::VaultList, SyncValue::Vaults(list)) => {
                let stored = self.store.vaults();
                if merge::vault_list_changed(&stored, list) {
                    self.store.set_vaults(list.clone());
                    SyncOutcome::Applied(value)
                } else {
                    SyncOutcome::Unchanged(value)
                }
            }
            (ResourceKey::VaultStatus(id), SyncValue::VaultStatus(detail)) => {
                match self.store.detail(*id) {
                    Some(stored) if !merge::detail_changed(&stored, detail) => {
                        SyncOutcome::Unchanged(value)
                    }
                    _ => {
                        self.store.set_detail(detail.clone());
                        SyncOutcome::Applied(value)
                    }
                }
            }
            (ResourceKey::QuorumStatus(id), SyncValue::Quorum(submission)) => {
                match self.store.quorum(*id) {
                    Some(stored) if !merge::submission_changed(&stored, submission) => {
                        SyncOutcome::Unchanged(value)
                    }
                    _ => {
                        self.store.set_quorum(*id, *submission);
                        SyncOutcome::Applied(value)
                    }
                }
            }
            (ResourceKey::WalletAddress(id), SyncValue::WalletAddress(address)) => {
                match self.store.wallet_address(*id) {
                    Some(stored) if stored == *address => SyncOutcome::Unchanged(value),
                    _ => {
                        self.store.set_wallet_address(*id, address.clone());
                        SyncOutcome::Applied(value)
                    }
                }
            }
            _ => {
                tracing::error!(resource = %resource.label(), "sync value shape mismatch");
                SyncOutcome::Unchanged(value)
            }
        }
    }
}

async fn fetch(
    handles: Arc<RemoteHandleCache>,
    resource: ResourceKey,
    identity: Identity,
) -> Result<SyncValue, ClientError> {
    match resource {
        ResourceKey::VaultList => {
            let vault = handles.vault().await?;
            Ok(SyncValue::Vaults(
                vault.list_vaults(identity.principal()).await?,
            ))
        }
        ResourceKey::VaultStatus(id) => {
            let vault = handles.vault().await?;
            Ok(SyncValue::VaultStatus(vault.vault_status(id).await?))
        }
        ResourceKey::QuorumStatus(id) => {
            let vault = handles.vault().await?;
            Ok(SyncValue::Quorum(vault.guardian_threshold_status(id).await?))
        }
        ResourceKey::WalletAddress(id) => {
            let custody = handles.custody().await?;
            Ok(SyncValue::WalletAddress(custody.view_wallet(id).await?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{
        Connector, CreateVaultArgs, CustodyBackend, CustodyExecution, ExecuteInheritanceArgs,
        GuardianBackend, InheritanceExecution, RegisterGuardiansArgs, ShareReceipt, VaultBackend,
    };
    use crate::config::AppConfig;
    use crate::session::AuthClient;
    use async_trait::async_trait;
    use candid::Principal;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;
    use thresholdvault_core::{EmailHash, GuardianRecord, VaultStatus};

    fn summary(id: u64, due: u64) -> VaultSummary {
        VaultSummary {
            id,
            name: format!("vault-{id}"),
            status: VaultStatus::Active,
            bitcoin_address: "bc1qvault".to_string(),
            guardian_count: 3,
            guardian_threshold: 2,
            heartbeat_due_in_seconds: due,
        }
    }

    /// Vault backend yielding scripted list responses after a fixed delay.
    struct ScriptedVault {
        calls: AtomicUsize,
        delay: Duration,
        responses: Mutex<Vec<Result<Vec<VaultSummary>, ClientError>>>,
    }

    impl ScriptedVault {
        fn new(delay: Duration, responses: Vec<Result<Vec<VaultSummary>, ClientError>>) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                delay,
                responses: Mutex::new(responses),
            }
        }
    }

    #[async_trait]
    impl VaultBackend for ScriptedVault {
        async fn create_vault(&self, _args: CreateVaultArgs) -> Result<VaultSummary, ClientError> {
            Err(ClientError::remote("unused"))
        }
        async fn submit_heartbeat(&self, _id: VaultId) -> Result<VaultSummary, ClientError> {
            Err(ClientError::remote("unused"))
        }
        async fn vault_status(&self, _id: VaultId) -> Result<VaultDetail, ClientError> {
            Err(ClientError::remote("unused"))
        }
        async fn request_inheritance(&self, _id: VaultId) -> Result<VaultSummary, ClientError> {
            Err(ClientError::remote("unused"))
        }
        async fn execute_inheritance(
            &self,
            _id: VaultId,
        ) -> Result<InheritanceExecution, ClientError> {
            Err(ClientError::remote("unused"))
        }
        async fn guardian_threshold_status(
            &self,
            _id: VaultId,
        ) -> Result<GuardianSubmission, ClientError> {
            Ok(GuardianSubmission {
                submitted: 1,
                threshold_met: false,
            })
        }
        async fn list_vaults(&self, _owner: Principal) -> Result<Vec<VaultSummary>, ClientError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            let mut responses = self.responses.lock();
            if responses.is_empty() {
                Ok(Vec::new())
            } else {
                responses.remove(0)
            }
        }
    }

    struct StubGuardianBackend;

    #[async_trait]
    impl GuardianBackend for StubGuardianBackend {
        async fn register_guardians(
            &self,
            _args: RegisterGuardiansArgs,
        ) -> Result<Vec<GuardianRecord>, ClientError> {
            Ok(Vec::new())
        }
        async fn accept_invitation(
            &self,
            _vault_id: VaultId,
            _email_hash: EmailHash,
        ) -> Result<GuardianRecord, ClientError> {
            Err(ClientError::remote("unused"))
        }
        async fn submit_share(
            &self,
            _vault_id: VaultId,
            _email_hash: EmailHash,
            _share_payload: Vec<u8>,
        ) -> Result<ShareReceipt, ClientError> {
            Err(ClientError::remote("unused"))
        }
        async fn guardian_by_hash(
            &self,
            _vault_id: VaultId,
            _email_hash: EmailHash,
        ) -> Result<Option<GuardianRecord>, ClientError> {
            Ok(None)
        }
        async fn list_vaults_for_guardian(&self) -> Result<Vec<VaultId>, ClientError> {
            Ok(Vec::new())
        }
    }

    struct StubCustodyBackend;

    #[async_trait]
    impl CustodyBackend for StubCustodyBackend {
        async fn generate_vault_address(
            &self,
            _vault_id: VaultId,
            _key_id: String,
        ) -> Result<String, ClientError> {
            Err(ClientError::remote("unused"))
        }
        async fn execute_inheritance(
            &self,
            _args: ExecuteInheritanceArgs,
        ) -> Result<CustodyExecution, ClientError> {
            Err(ClientError::remote("unused"))
        }
        async fn view_wallet(&self, _vault_id: VaultId) -> Result<Option<String>, ClientError> {
            Ok(Some("bc1qvault".to_string()))
        }
    }

    struct FixedConnector {
        vault: Arc<ScriptedVault>,
    }

    #[async_trait]
    impl Connector for FixedConnector {
        async fn fetch_root_key(&self) -> Result<(), ClientError> {
            Ok(())
        }
        fn vault_backend(
            &self,
            _identity: &Identity,
            _canister: Principal,
        ) -> Arc<dyn VaultBackend> {
            self.vault.clone()
        }
        fn guardian_backend(
            &self,
            _identity: &Identity,
            _canister: Principal,
        ) -> Arc<dyn GuardianBackend> {
            Arc::new(StubGuardianBackend)
        }
        fn custody_backend(
            &self,
            _identity: &Identity,
            _canister: Principal,
        ) -> Arc<dyn CustodyBackend> {
            Arc::new(StubCustodyBackend)
        }
    }

    struct AutoAuth;

    #[async_trait]
    impl AuthClient for AutoAuth {
        async fn login(&self) -> Result<Principal, ClientError> {
            Ok(Principal::from_slice(&[4; 4]))
        }
        async fn logout(&self) -> Result<(), ClientError> {
            Ok(())
        }
        async fn stored_identity(&self) -> Identity {
            Identity::anonymous()
        }
    }

    fn coordinator(vault: Arc<ScriptedVault>) -> (SyncCoordinator, Arc<Session>, Arc<VaultStore>) {
        let mut config = AppConfig::for_host("https://ic0.app");
        config.vault_manager = Some(Principal::from_slice(&[1; 8]));
        config.guardian_manager = Some(Principal::from_slice(&[2; 8]));
        config.custody_wallet = Some(Principal::from_slice(&[3; 8]));

        let session = Arc::new(Session::new(Arc::new(AutoAuth)));
        let handles = Arc::new(RemoteHandleCache::new(
            config,
            Arc::new(FixedConnector { vault }),
            session.clone(),
        ));
        let store = Arc::new(VaultStore::new());
        (
            SyncCoordinator::new(session.clone(), handles, store.clone()),
            session,
            store,
        )
    }

    #[tokio::test]
    async fn overlapping_syncs_share_one_remote_call() {
        let vault = Arc::new(ScriptedVault::new(
            Duration::from_millis(30),
            vec![Ok(vec![summary(42, 1_900_000_000)])],
        ));
        let (coordinator, session, store) = coordinator(vault.clone());
        session.login().await.unwrap();

        let interest = Interest::new();
        let first = coordinator.sync(ResourceKey::VaultList, &interest);
        let second = async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            coordinator.sync(ResourceKey::VaultList, &interest).await
        };
        let (first, second) = tokio::join!(first, second);

        assert!(first.is_ok());
        assert!(second.is_ok());
        assert_eq!(vault.calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.vaults().len(), 1);
        assert!(!store.loading());
    }

    #[tokio::test]
    async fn identical_refetch_is_a_no_op() {
        let list = vec![summary(42, 1_900_000_000)];
        let vault = Arc::new(ScriptedVault::new(
            Duration::ZERO,
            vec![Ok(list.clone()), Ok(list)],
        ));
        let (coordinator, session, _store) = coordinator(vault);
        session.login().await.unwrap();

        let interest = Interest::new();
        let first = coordinator
            .sync(ResourceKey::VaultList, &interest)
            .await
            .unwrap();
        let second = coordinator
            .sync(ResourceKey::VaultList, &interest)
            .await
            .unwrap();

        assert!(matches!(first, SyncOutcome::Applied(_)));
        assert!(matches!(second, SyncOutcome::Unchanged(_)));
    }

    #[tokio::test]
    async fn failure_is_stored_until_the_next_success() {
        let vault = Arc::new(ScriptedVault::new(
            Duration::ZERO,
            vec![
                Err(ClientError::remote("canister unreachable")),
                Ok(vec![summary(7, 1_900_000_000)]),
            ],
        ));
        let (coordinator, session, store) = coordinator(vault);
        session.login().await.unwrap();

        let interest = Interest::new();
        let err = coordinator
            .sync(ResourceKey::VaultList, &interest)
            .await
            .unwrap_err();
        assert_eq!(err, ClientError::remote("canister unreachable"));
        assert_eq!(
            store.error(),
            Some("remote call failed: canister unreachable".to_string())
        );

        coordinator
            .sync(ResourceKey::VaultList, &interest)
            .await
            .unwrap();
        assert_eq!(store.error(), None);
    }

    #[tokio::test]
    async fn cancelled_interest_never_writes_state() {
        let vault = Arc::new(ScriptedVault::new(
            Duration::from_millis(20),
            vec![Ok(vec![summary(42, 1_900_000_000)])],
        ));
        let (coordinator, session, store) = coordinator(vault);
        session.login().await.unwrap();

        let interest = Interest::new();
        let sync = coordinator.sync(ResourceKey::VaultList, &interest);
        let cancel = async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            interest.cancel();
        };
        let (outcome, ()) = tokio::join!(sync, cancel);

        assert_eq!(outcome.unwrap(), SyncOutcome::Discarded);
        assert!(store.vaults().is_empty());
        assert_eq!(store.error(), None);
    }

    #[tokio::test]
    async fn anonymous_identity_short_circuits() {
        let vault = Arc::new(ScriptedVault::new(Duration::ZERO, Vec::new()));
        let (coordinator, _session, store) = coordinator(vault.clone());
        store.set_loading(true);
        store.set_error("leftover");

        let outcome = coordinator
            .sync(ResourceKey::VaultList, &Interest::new())
            .await
            .unwrap();

        assert_eq!(outcome, SyncOutcome::Empty);
        assert_eq!(vault.calls.load(Ordering::SeqCst), 0);
        assert!(!store.loading());
        assert_eq!(store.error(), None);
    }

    #[tokio::test]
    async fn identity_superseded_mid_fetch_discards_the_result() {
        let vault = Arc::new(ScriptedVault::new(
            Duration::from_millis(20),
            vec![Ok(vec![summary(42, 1_900_000_000)])],
        ));
        let (coordinator, session, store) = coordinator(vault);
        session.login().await.unwrap();

        let interest = Interest::new();
        let sync = coordinator.sync(ResourceKey::VaultList, &interest);
        let logout = async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            session.logout().await.unwrap();
        };
        let (outcome, ()) = tokio::join!(sync, logout);

        assert_eq!(outcome.unwrap(), SyncOutcome::Discarded);
        assert!(store.vaults().is_empty());
    }
}
