//! Client configuration.
//!
//! Backend addresses are fixed configuration, not user-editable. A missing
//! canister principal is not an error until the corresponding handle is
//! first constructed; at that point it is fatal and never silently retried.

use candid::Principal;
use std::env;
use thresholdvault_core::ClientError;

/// Environment variable naming the gateway host.
pub const ENV_IC_HOST: &str = "IC_HOST";
/// Environment variable naming the vault manager canister.
pub const ENV_VAULT_MGR: &str = "VAULT_MGR_CANISTER_ID";
/// Environment variable naming the guardian manager canister.
pub const ENV_GUARDIAN_MGR: &str = "GUARDIAN_MGR_CANISTER_ID";
/// Environment variable naming the bitcoin custody wallet canister.
pub const ENV_BITCOIN_WALLET: &str = "BITCOIN_WALLET_CANISTER_ID";

const MAINNET_HOST: &str = "https://ic0.app";

/// Which network the gateway fronts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Network {
    /// Production mainnet; root key is baked in, trust bootstrap is skipped.
    Mainnet,
    /// Local replica or testnet; root key must be fetched once per handle
    /// construction.
    Local,
}

impl Network {
    /// Infer the network flavor from a gateway URL.
    #[must_use]
    pub fn from_host(host: &str) -> Self {
        if host.contains("ic0.app") || host.contains("icp0.io") {
            Self::Mainnet
        } else {
            Self::Local
        }
    }
}

/// The three logical backends the client talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// Vault manager.
    VaultManager,
    /// Guardian manager.
    GuardianManager,
    /// Bitcoin custody wallet.
    CustodyWallet,
}

impl BackendKind {
    /// Stable label used in log events and error messages.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::VaultManager => "vault manager",
            Self::GuardianManager => "guardian manager",
            Self::CustodyWallet => "custody wallet",
        }
    }
}

/// Client configuration for one gateway and its backend canisters.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Gateway host URL.
    pub host: String,
    /// Network flavor, controls the trust-bootstrap step.
    pub network: Network,
    /// Vault manager canister principal.
    pub vault_manager: Option<Principal>,
    /// Guardian manager canister principal.
    pub guardian_manager: Option<Principal>,
    /// Bitcoin custody wallet canister principal.
    pub custody_wallet: Option<Principal>,
}

impl AppConfig {
    /// Configuration pointing at a host, network inferred from the URL.
    #[must_use]
    pub fn for_host(host: impl Into<String>) -> Self {
        let host = host.into();
        let network = Network::from_host(&host);
        Self {
            host,
            network,
            vault_manager: None,
            guardian_manager: None,
            custody_wallet: None,
        }
    }

    /// Read configuration from the process environment.
    ///
    /// Unset canister variables stay `None`; unparsable principals are
    /// treated the same as unset and logged, so a broken deployment fails at
    /// first use with a configuration error rather than at startup.
    #[must_use]
    pub fn from_env() -> Self {
        let host = env::var(ENV_IC_HOST).unwrap_or_else(|_| MAINNET_HOST.to_string());
        let mut config = Self::for_host(host);
        config.vault_manager = principal_from_env(ENV_VAULT_MGR);
        config.guardian_manager = principal_from_env(ENV_GUARDIAN_MGR);
        config.custody_wallet = principal_from_env(ENV_BITCOIN_WALLET);
        config
    }

    /// The canister principal for a backend, or a fatal configuration error.
    pub fn canister_for(&self, backend: BackendKind) -> Result<Principal, ClientError> {
        let canister = match backend {
            BackendKind::VaultManager => self.vault_manager,
            BackendKind::GuardianManager => self.guardian_manager,
            BackendKind::CustodyWallet => self.custody_wallet,
        };
        canister.ok_or_else(|| {
            ClientError::configuration(format!(
                "{} canister id is not configured",
                backend.label()
            ))
        })
    }
}

fn principal_from_env(key: &str) -> Option<Principal> {
    let raw = env::var(key).ok()?;
    if raw.trim().is_empty() {
        return None;
    }
    match Principal::from_text(raw.trim()) {
        Ok(principal) => Some(principal),
        Err(e) => {
            tracing::warn!(var = key, error = %e, "ignoring unparsable canister principal");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn network_inferred_from_host() {
        assert_eq!(Network::from_host("https://ic0.app"), Network::Mainnet);
        assert_eq!(Network::from_host("https://icp0.io"), Network::Mainnet);
        assert_eq!(Network::from_host("http://127.0.0.1:4943"), Network::Local);
    }

    #[test]
    fn missing_canister_is_a_configuration_error() {
        let config = AppConfig::for_host("http://127.0.0.1:4943");
        let err = config.canister_for(BackendKind::VaultManager).unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(
            err.to_string(),
            "configuration error: vault manager canister id is not configured"
        );
    }

    #[test]
    fn configured_canister_is_returned() {
        let mut config = AppConfig::for_host(MAINNET_HOST);
        let principal = Principal::from_slice(&[9; 8]);
        config.guardian_manager = Some(principal);
        assert_eq!(
            config.canister_for(BackendKind::GuardianManager).unwrap(),
            principal
        );
    }
}
