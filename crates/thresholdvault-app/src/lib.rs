//! # thresholdvault-app
//!
//! Client synchronization layer for the vault dashboard. The application
//! core owns identity, remote handles, sync coordination and the canonical
//! state containers; rendering surfaces read derived views and issue
//! intents, they never talk to a backend directly.
//!
//! Everything is dependency-injected through [`AppCore::new`]: tests build
//! an independent core with in-memory effects, production wires the
//! platform auth client, an IC transport and filesystem storage.

pub mod backend;
pub mod config;
pub mod handles;
pub mod merge;
pub mod offline;
pub mod session;
pub mod state;
pub mod storage;
pub mod sync;
pub mod views;
pub mod workflows;

use crate::backend::Connector;
use crate::config::AppConfig;
use crate::handles::RemoteHandleCache;
use crate::offline::{default_rules, OfflineCache, ResourceFetcher, SystemTimeSource};
use crate::session::{AuthClient, Session};
use crate::state::{UiStore, VaultStore};
use crate::storage::KeyValueStore;
use crate::sync::SyncCoordinator;
use crate::workflows::Workflows;
use std::sync::Arc;

/// The assembled application core.
///
/// Construction wires the identity observers: a transition discards the
/// remote handle set and, on logout, clears the vault containers, before
/// any dependent fetch can proceed.
pub struct AppCore {
    session: Arc<Session>,
    handles: Arc<RemoteHandleCache>,
    coordinator: Arc<SyncCoordinator>,
    workflows: Arc<Workflows>,
    vaults: Arc<VaultStore>,
    ui: Arc<UiStore>,
    storage: Arc<dyn KeyValueStore>,
    offline: Arc<OfflineCache>,
}

impl AppCore {
    /// Assemble a core from its injected effects.
    pub fn new(
        config: AppConfig,
        connector: Arc<dyn Connector>,
        auth: Arc<dyn AuthClient>,
        storage: Arc<dyn KeyValueStore>,
        fetcher: Arc<dyn ResourceFetcher>,
    ) -> Self {
        let session = Arc::new(Session::new(auth));
        let handles = Arc::new(RemoteHandleCache::new(
            config,
            connector,
            Arc::clone(&session),
        ));
        let vaults = Arc::new(VaultStore::new());
        let ui = Arc::new(UiStore::new());

        session.subscribe(handles.clone());
        session.subscribe(vaults.clone());

        let coordinator = Arc::new(SyncCoordinator::new(
            Arc::clone(&session),
            Arc::clone(&handles),
            Arc::clone(&vaults),
        ));
        let workflows = Arc::new(Workflows::new(
            Arc::clone(&session),
            Arc::clone(&handles),
            Arc::clone(&vaults),
        ));

        let offline = Arc::new(OfflineCache::new(
            default_rules(),
            fetcher,
            Arc::new(SystemTimeSource),
        ));
        let ui_signal = Arc::clone(&ui);
        offline.set_offline_signal(Arc::new(move |offline| ui_signal.set_offline(offline)));

        Self {
            session,
            handles,
            coordinator,
            workflows,
            vaults,
            ui,
            storage,
            offline,
        }
    }

    /// Restore persisted state, once, before the first fetch.
    pub async fn start(&self) {
        self.session.hydrate().await;
        self.ui.hydrate(self.storage.as_ref()).await;
    }

    /// The identity session.
    #[must_use]
    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// The remote handle cache.
    #[must_use]
    pub fn handles(&self) -> &Arc<RemoteHandleCache> {
        &self.handles
    }

    /// The sync coordinator.
    #[must_use]
    pub fn coordinator(&self) -> &Arc<SyncCoordinator> {
        &self.coordinator
    }

    /// Explicit user actions.
    #[must_use]
    pub fn workflows(&self) -> &Arc<Workflows> {
        &self.workflows
    }

    /// The vault state container.
    #[must_use]
    pub fn vaults(&self) -> &Arc<VaultStore> {
        &self.vaults
    }

    /// Session-level UI flags.
    #[must_use]
    pub fn ui(&self) -> &Arc<UiStore> {
        &self.ui
    }

    /// Persisted key-value storage.
    #[must_use]
    pub fn storage(&self) -> &Arc<dyn KeyValueStore> {
        &self.storage
    }

    /// The offline response cache.
    #[must_use]
    pub fn offline(&self) -> &Arc<OfflineCache> {
        &self.offline
    }
}
