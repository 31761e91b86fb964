//! Wallet bridge over a JSON-RPC provider endpoint.

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::traits::*;
use crate::rpc::RpcTransport;
use crate::types::Address;

/// Wallet bridge backed by a provider's JSON-RPC interface.
pub struct RpcWallet {
    transport: Arc<RpcTransport>,
    selected: watch::Sender<Option<Address>>,
}

impl RpcWallet {
    /// Create a wallet bridge sharing the given transport.
    pub fn new(transport: Arc<RpcTransport>) -> Self {
        let (selected, _) = watch::channel(None);
        Self {
            transport,
            selected,
        }
    }

    pub fn transport(&self) -> &Arc<RpcTransport> {
        &self.transport
    }

    fn parse_accounts(raw: Vec<String>) -> Result<Vec<Address>, WalletError> {
        raw.iter()
            .map(|s| {
                s.parse::<Address>()
                    .map_err(|e| WalletError::Provider(format!("bad account {}: {}", s, e)))
            })
            .collect()
    }

    fn publish(&self, accounts: &[Address]) {
        let first = accounts.first().copied();
        self.selected.send_if_modified(|current| {
            if *current != first {
                *current = first;
                true
            } else {
                false
            }
        });
    }

    /// Read the exposed accounts without prompting and publish any change.
    pub async fn poll_accounts(&self) -> Result<Vec<Address>, WalletError> {
        let raw: Vec<String> = self.transport.request("eth_accounts", json!([])).await?;
        let accounts = Self::parse_accounts(raw)?;
        self.publish(&accounts);
        Ok(accounts)
    }

    /// Poll `eth_accounts` on an interval so account switches made in the
    /// wallet reach [`WalletBridge::account_changes`] subscribers.
    pub fn spawn_account_poller(self: Arc<Self>, interval: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                if let Err(e) = self.poll_accounts().await {
                    warn!(error = %e, "Account poll failed");
                }
            }
        })
    }
}

#[async_trait]
impl WalletBridge for RpcWallet {
    async fn request_accounts(&self) -> Result<Vec<Address>, WalletError> {
        let raw: Vec<String> = self
            .transport
            .request("eth_requestAccounts", json!([]))
            .await?;
        let accounts = Self::parse_accounts(raw)?;
        debug!(count = accounts.len(), "Wallet exposed accounts");
        self.publish(&accounts);
        Ok(accounts)
    }

    async fn signer(&self) -> Result<Signer, WalletError> {
        let accounts = self.poll_accounts().await?;
        let address = accounts.first().copied().ok_or(WalletError::NoAccounts)?;
        info!(account = %address, "Wallet signer selected");
        Ok(Signer::new(address))
    }

    fn account_changes(&self) -> watch::Receiver<Option<Address>> {
        self.selected.subscribe()
    }
}
