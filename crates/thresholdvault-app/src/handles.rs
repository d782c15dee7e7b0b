//! Remote handle cache.
//!
//! One memoized handle per logical backend, keyed by the identity epoch it
//! was built under. Invalidation is an epoch bump plus an atomic discard of
//! the whole set; no handle is ever individually revoked, and no request
//! issued after a transition can be served by a handle built under a
//! superseded identity.
//!
//! Construction is single-flight: concurrent callers awaiting the same
//! backend before construction completes share one pending future and
//! receive the identical handle. A failed construction is memoized too:
//! a missing backend address is fatal and is not silently retried.

use crate::backend::{Connector, CustodyBackend, GuardianBackend, VaultBackend};
use crate::config::{AppConfig, BackendKind, Network};
use crate::session::{IdentityObserver, Session};
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use thresholdvault_core::{ClientError, Identity, IdentityEpoch};

/// Default bound on the trust-bootstrap (root key fetch) step.
pub const TRUST_BOOTSTRAP_TIMEOUT: Duration = Duration::from_secs(5);

type Construction<T> = Shared<BoxFuture<'static, Result<Arc<T>, ClientError>>>;

struct Slot<T: ?Sized> {
    inner: Mutex<Option<(IdentityEpoch, Construction<T>)>>,
}

impl<T: ?Sized> Slot<T> {
    fn new() -> Self {
        Self {
            inner: Mutex::new(None),
        }
    }

    fn clear(&self) {
        *self.inner.lock() = None;
    }

    fn is_live(&self, epoch: IdentityEpoch) -> bool {
        matches!(&*self.inner.lock(), Some((e, _)) if *e == epoch)
    }

    /// Return the memoized construction for `epoch`, installing a fresh one
    /// built by `construct` if the slot is empty or scoped to an older
    /// epoch. The lock is never held across an await point.
    fn get_or_insert(
        &self,
        epoch: IdentityEpoch,
        construct: impl FnOnce() -> BoxFuture<'static, Result<Arc<T>, ClientError>>,
    ) -> Construction<T> {
        let mut guard = self.inner.lock();
        match &*guard {
            Some((e, pending)) if *e == epoch => pending.clone(),
            _ => {
                let pending = construct().shared();
                *guard = Some((epoch, pending.clone()));
                pending
            }
        }
    }
}

/// Produces and memoizes one remote-service handle per backend, bound to
/// the identity active at construction time.
pub struct RemoteHandleCache {
    config: AppConfig,
    connector: Arc<dyn Connector>,
    session: Arc<Session>,
    bootstrap_timeout: Duration,
    vault: Slot<dyn VaultBackend>,
    guardian: Slot<dyn GuardianBackend>,
    custody: Slot<dyn CustodyBackend>,
}

impl RemoteHandleCache {
    /// Create the cache for one gateway configuration.
    pub fn new(config: AppConfig, connector: Arc<dyn Connector>, session: Arc<Session>) -> Self {
        Self {
            config,
            connector,
            session,
            bootstrap_timeout: TRUST_BOOTSTRAP_TIMEOUT,
            vault: Slot::new(),
            guardian: Slot::new(),
            custody: Slot::new(),
        }
    }

    /// Override the trust-bootstrap timeout (tests).
    #[must_use]
    pub fn with_bootstrap_timeout(mut self, timeout: Duration) -> Self {
        self.bootstrap_timeout = timeout;
        self
    }

    /// The vault manager handle for the current identity epoch.
    pub async fn vault(&self) -> Result<Arc<dyn VaultBackend>, ClientError> {
        let pending = self.construction(BackendKind::VaultManager, &self.vault, |c, id, can| {
            c.vault_backend(id, can)
        });
        pending.await
    }

    /// The guardian manager handle for the current identity epoch.
    pub async fn guardian(&self) -> Result<Arc<dyn GuardianBackend>, ClientError> {
        let pending =
            self.construction(BackendKind::GuardianManager, &self.guardian, |c, id, can| {
                c.guardian_backend(id, can)
            });
        pending.await
    }

    /// The custody wallet handle for the current identity epoch.
    pub async fn custody(&self) -> Result<Arc<dyn CustodyBackend>, ClientError> {
        let pending =
            self.construction(BackendKind::CustodyWallet, &self.custody, |c, id, can| {
                c.custody_backend(id, can)
            });
        pending.await
    }

    /// Discard every memoized handle.
    ///
    /// Called on every identity transition, including transitions to
    /// anonymous. The set is replaced atomically; the epoch check in
    /// [`Slot::get_or_insert`] makes the discard safe even against a
    /// construction still in flight.
    pub fn invalidate_all(&self) {
        tracing::debug!(epoch = %self.session.epoch(), "discarding remote handle set");
        self.vault.clear();
        self.guardian.clear();
        self.custody.clear();
    }

    /// Number of memoized handles scoped to the current epoch.
    #[must_use]
    pub fn live_handles(&self) -> usize {
        let epoch = self.session.epoch();
        [
            self.vault.is_live(epoch),
            self.guardian.is_live(epoch),
            self.custody.is_live(epoch),
        ]
        .iter()
        .filter(|live| **live)
        .count()
    }

    fn construction<T, F>(
        &self,
        backend: BackendKind,
        slot: &Slot<T>,
        make: F,
    ) -> Construction<T>
    where
        T: ?Sized + Send + Sync + 'static,
        F: FnOnce(&dyn Connector, &Identity, candid::Principal) -> Arc<T> + Send + 'static,
    {
        let epoch = self.session.epoch();
        let identity = self.session.current_identity();
        let connector = Arc::clone(&self.connector);
        let network = self.config.network;
        let canister = self.config.canister_for(backend);
        let timeout = self.bootstrap_timeout;
        slot.get_or_insert(epoch, move || {
            async move {
                let canister = canister?;
                if network == Network::Local {
                    bootstrap_trust(connector.as_ref(), backend, timeout).await;
                }
                tracing::debug!(
                    backend = backend.label(),
                    identity = %identity,
                    epoch = %epoch,
                    "constructed remote handle"
                );
                Ok(make(connector.as_ref(), &identity, canister))
            }
            .boxed()
        })
    }
}

impl IdentityObserver for RemoteHandleCache {
    fn identity_changed(&self, _identity: &Identity) {
        self.invalidate_all();
    }
}

/// One-time root key fetch for local/test gateways.
///
/// Failure only affects non-mainnet networks, so it is logged and ignored
/// rather than failing handle construction.
async fn bootstrap_trust(connector: &dyn Connector, backend: BackendKind, timeout: Duration) {
    match tokio::time::timeout(timeout, connector.fetch_root_key()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::warn!(
            backend = backend.label(),
            error = %e,
            "root key fetch failed; continuing without trust bootstrap"
        ),
        Err(_) => tracing::warn!(
            backend = backend.label(),
            timeout_ms = timeout.as_millis() as u64,
            "root key fetch timed out; continuing without trust bootstrap"
        ),
    }
}
