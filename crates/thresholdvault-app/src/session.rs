//! Session identity management.
//!
//! A [`Session`] is an explicitly constructed, dependency-injected object
//! owning the single active identity. Tests instantiate independent
//! sessions; there is no shared module-level client or subscriber set.
//!
//! Subscribers are notified exactly once per confirmed transition, after
//! the underlying auth client has acknowledged the change and the identity
//! epoch has been bumped. Because notification runs synchronously inside
//! `login`/`logout`, handle-cache invalidation is always applied before any
//! dependent fetch issued after the transition can proceed.

use async_trait::async_trait;
use candid::Principal;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thresholdvault_core::{ClientError, Identity, IdentityEpoch};

/// External authentication ceremony.
///
/// Implemented by the platform auth client; the session never inspects how
/// the ceremony runs, only its confirmed outcome.
#[async_trait]
pub trait AuthClient: Send + Sync {
    /// Run the login ceremony; yields the authenticated principal.
    async fn login(&self) -> Result<Principal, ClientError>;
    /// Clear the authenticated session.
    async fn logout(&self) -> Result<(), ClientError>;
    /// Identity restored from a previous session, anonymous if none.
    async fn stored_identity(&self) -> Identity;
}

/// Typed observer for identity transitions.
///
/// The handle cache registers one of these so that every transition,
/// including transitions to anonymous, discards the cached handle set
/// before any dependent fetch proceeds.
pub trait IdentityObserver: Send + Sync {
    /// Called once per confirmed transition with the new identity.
    fn identity_changed(&self, identity: &Identity);
}

/// Handle for removing a registered observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(u64);

/// Owns the active identity and broadcasts transitions.
pub struct Session {
    auth: Arc<dyn AuthClient>,
    identity: RwLock<Identity>,
    epoch: AtomicU64,
    next_subscription: AtomicU64,
    observers: RwLock<Vec<(u64, Arc<dyn IdentityObserver>)>>,
}

impl Session {
    /// Create a session around an auth client, starting unauthenticated.
    pub fn new(auth: Arc<dyn AuthClient>) -> Self {
        Self {
            auth,
            identity: RwLock::new(Identity::anonymous()),
            epoch: AtomicU64::new(0),
            next_subscription: AtomicU64::new(0),
            observers: RwLock::new(Vec::new()),
        }
    }

    /// Restore a previously stored identity, once, before any fetch runs.
    ///
    /// Restoration is not a transition: no observer is notified because no
    /// dependent state exists yet.
    pub async fn hydrate(&self) {
        let stored = self.auth.stored_identity().await;
        if stored.is_authenticated() {
            tracing::debug!(identity = %stored, "restored stored identity");
        }
        *self.identity.write() = stored;
    }

    /// Begin the external login ceremony.
    ///
    /// On success the new identity is installed, the epoch bumped and every
    /// observer notified exactly once. On failure the identity remains
    /// unauthenticated and no notification is sent.
    pub async fn login(&self) -> Result<Identity, ClientError> {
        let principal = self.auth.login().await?;
        if principal == Principal::anonymous() {
            return Err(ClientError::authentication(
                "login ceremony yielded the anonymous principal",
            ));
        }
        let identity = Identity::from_principal(principal);
        self.apply_transition(identity.clone());
        Ok(identity)
    }

    /// Clear the session.
    pub async fn logout(&self) -> Result<(), ClientError> {
        self.auth.logout().await?;
        self.apply_transition(Identity::anonymous());
        Ok(())
    }

    /// The currently active identity.
    #[must_use]
    pub fn current_identity(&self) -> Identity {
        self.identity.read().clone()
    }

    /// Whether a usable (non-anonymous) principal is active.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.identity.read().is_authenticated()
    }

    /// The current identity epoch.
    #[must_use]
    pub fn epoch(&self) -> IdentityEpoch {
        IdentityEpoch(self.epoch.load(Ordering::SeqCst))
    }

    /// Register an observer for identity transitions.
    pub fn subscribe(&self, observer: Arc<dyn IdentityObserver>) -> SubscriptionId {
        let id = self.next_subscription.fetch_add(1, Ordering::SeqCst);
        self.observers.write().push((id, observer));
        SubscriptionId(id)
    }

    /// Remove a previously registered observer.
    pub fn unsubscribe(&self, subscription: SubscriptionId) {
        self.observers.write().retain(|(id, _)| *id != subscription.0);
    }

    fn apply_transition(&self, identity: Identity) {
        *self.identity.write() = identity.clone();
        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::info!(identity = %identity, epoch, "identity transition");
        // Snapshot under the lock, notify outside it: an observer may
        // subscribe or unsubscribe reentrantly.
        let observers: Vec<Arc<dyn IdentityObserver>> = self
            .observers
            .read()
            .iter()
            .map(|(_, observer)| Arc::clone(observer))
            .collect();
        for observer in observers {
            observer.identity_changed(&identity);
        }
    }
}
