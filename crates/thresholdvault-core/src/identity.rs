//! Caller identity and identity epochs.
//!
//! Exactly one identity is active at a time. The anonymous principal is
//! treated identically to "no identity" everywhere in the client: the
//! authenticated check is a raw equality check against the well-known
//! anonymous principal value, never a mere "identity present" test.

use candid::Principal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The identity the client acts on behalf of.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    principal: Principal,
}

impl Identity {
    /// The unauthenticated identity.
    #[must_use]
    pub fn anonymous() -> Self {
        Self {
            principal: Principal::anonymous(),
        }
    }

    /// An identity backed by an authenticated principal.
    ///
    /// Passing the anonymous principal here yields an identity that still
    /// reads as unauthenticated; callers that require authentication must
    /// check [`Identity::is_authenticated`].
    #[must_use]
    pub fn from_principal(principal: Principal) -> Self {
        Self { principal }
    }

    /// Whether this identity is a usable authenticated principal.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.principal != Principal::anonymous()
    }

    /// The underlying principal, authenticated or not.
    #[must_use]
    pub fn principal(&self) -> Principal {
        self.principal
    }

    /// The principal in its textual form, empty for anonymous.
    #[must_use]
    pub fn principal_text(&self) -> String {
        if self.is_authenticated() {
            self.principal.to_text()
        } else {
            String::new()
        }
    }
}

impl Default for Identity {
    fn default() -> Self {
        Self::anonymous()
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_authenticated() {
            write!(f, "{}", self.principal)
        } else {
            write!(f, "anonymous")
        }
    }
}

/// Monotonically increasing counter marking each distinct session.
///
/// Remote handles are scoped to the epoch they were built under; bumping the
/// epoch is the whole invalidation mechanism, no per-handle teardown.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct IdentityEpoch(pub u64);

impl IdentityEpoch {
    /// The epoch following this one.
    #[must_use]
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for IdentityEpoch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anonymous_identity_is_unauthenticated() {
        let identity = Identity::anonymous();
        assert!(!identity.is_authenticated());
        assert_eq!(identity.principal_text(), "");
        assert_eq!(identity.to_string(), "anonymous");
    }

    #[test]
    fn anonymous_principal_reads_as_unauthenticated_even_when_present() {
        // An identity object being present is not enough; the check is raw
        // equality against the anonymous principal value.
        let identity = Identity::from_principal(Principal::anonymous());
        assert!(!identity.is_authenticated());
    }

    #[test]
    fn authenticated_identity_round_trips_principal_text() {
        let principal = Principal::from_slice(&[1, 2, 3, 4]);
        let identity = Identity::from_principal(principal);
        assert!(identity.is_authenticated());
        assert_eq!(identity.principal(), principal);
        assert_eq!(identity.principal_text(), principal.to_text());
    }

    #[test]
    fn epochs_increase_monotonically() {
        let epoch = IdentityEpoch::default();
        assert!(epoch.next() > epoch);
        assert_eq!(epoch.next().next(), IdentityEpoch(2));
    }
}
