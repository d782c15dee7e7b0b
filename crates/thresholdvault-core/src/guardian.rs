//! Guardian roster records and quorum results.
//!
//! Guardians are identified by an email-derived hash; plaintext email
//! addresses never appear in client state. Status transitions are monotonic
//! (Invited → Accepted → ShareSubmitted) and authoritative only from the
//! backend; the client mirrors them, it never infers interim states.

use crate::errors::ClientError;
use candid::Principal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Length of the email-derived guardian hash (SHA-256).
pub const EMAIL_HASH_LEN: usize = 32;

/// Fixed-length hash identifying a guardian within a vault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EmailHash([u8; EMAIL_HASH_LEN]);

impl EmailHash {
    /// Wrap raw hash bytes.
    #[must_use]
    pub fn new(bytes: [u8; EMAIL_HASH_LEN]) -> Self {
        Self(bytes)
    }

    /// Parse the hex form used in guardian invitation links.
    pub fn from_hex(value: &str) -> Result<Self, ClientError> {
        let bytes = hex::decode(value.trim())
            .map_err(|e| ClientError::validation(format!("invalid email hash hex: {e}")))?;
        Self::try_from(bytes.as_slice())
    }

    /// Hex form for links and display.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Raw hash bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; EMAIL_HASH_LEN] {
        &self.0
    }
}

impl TryFrom<&[u8]> for EmailHash {
    type Error = ClientError;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        let bytes: [u8; EMAIL_HASH_LEN] = value.try_into().map_err(|_| {
            ClientError::validation(format!(
                "email hash must be {EMAIL_HASH_LEN} bytes, got {}",
                value.len()
            ))
        })?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for EmailHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Backend-authoritative guardian status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum GuardianStatus {
    /// Invitation sent, not yet accepted.
    #[default]
    Invited,
    /// Guardian authenticated and accepted the invitation.
    Accepted,
    /// Guardian submitted their key share.
    ShareSubmitted,
}

impl GuardianStatus {
    /// Human-readable label for display surfaces.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Invited => "Invited",
            Self::Accepted => "Accepted",
            Self::ShareSubmitted => "Share Submitted",
        }
    }
}

impl fmt::Display for GuardianStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// A guardian as reported by the guardian manager.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuardianRecord {
    /// Email-derived hash, never a plaintext address.
    pub email_hash: EmailHash,
    /// Human alias chosen by the vault owner.
    pub alias: String,
    /// Backend-authoritative status.
    pub status: GuardianStatus,
    /// Principal bound once the guardian authenticated, if any.
    pub principal: Option<Principal>,
}

/// Quorum progress as reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardianSubmission {
    /// Guardians that have submitted their share.
    pub submitted: u64,
    /// Whether `submitted` has reached the vault's threshold.
    pub threshold_met: bool,
}
