//! Core trait for wallet bridges.
//!
//! A wallet bridge is whatever injects accounts into the client: a browser
//! extension's JSON-RPC endpoint, a local dev node, or the in-memory devnet.
//! Keys never leave the wallet; the client only learns which account is
//! selected and asks the wallet to send transactions on its behalf.

use async_trait::async_trait;
use tokio::sync::watch;

use crate::types::Address;

/// Wallet bridge errors.
#[derive(Debug, thiserror::Error)]
pub enum WalletError {
    /// No wallet provider is present in the environment
    #[error("No wallet detected - please install a wallet")]
    NotDetected,

    /// The wallet exposed no accounts
    #[error("No wallet account available")]
    NoAccounts,

    /// The user or wallet rejected the request
    #[error("Wallet request rejected: {0}")]
    Rejected(String),

    /// Provider-level failure
    #[error("Wallet provider error: {0}")]
    Provider(String),
}

impl From<crate::rpc::RpcError> for WalletError {
    fn from(err: crate::rpc::RpcError) -> Self {
        match err {
            // EIP-1193 user rejection
            crate::rpc::RpcError::Rpc { code: 4001, message } => WalletError::Rejected(message),
            other => WalletError::Provider(other.to_string()),
        }
    }
}

/// The account that signs transactions through the wallet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signer {
    address: Address,
}

impl Signer {
    pub fn new(address: Address) -> Self {
        Self { address }
    }

    pub fn address(&self) -> Address {
        self.address
    }
}

/// Bridge to a wallet-injected provider.
#[async_trait]
pub trait WalletBridge: Send + Sync {
    /// Ask the wallet to expose its accounts, prompting the user if needed.
    async fn request_accounts(&self) -> Result<Vec<Address>, WalletError>;

    /// Get the signer for the currently selected account.
    async fn signer(&self) -> Result<Signer, WalletError> {
        let accounts = self.request_accounts().await?;
        accounts
            .first()
            .copied()
            .map(Signer::new)
            .ok_or(WalletError::NoAccounts)
    }

    /// Subscribe to selected-account changes (`None` when disconnected).
    fn account_changes(&self) -> watch::Receiver<Option<Address>>;
}
