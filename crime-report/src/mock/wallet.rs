//! In-memory wallet bridge.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::watch;

use crate::types::Address;
use crate::wallet::{Signer, WalletBridge, WalletError};

/// Wallet holding a fixed list of accounts; the first one is selected.
pub struct MockWallet {
    accounts: Mutex<Vec<Address>>,
    selected: watch::Sender<Option<Address>>,
    request_delay: Option<Duration>,
    rejecting: AtomicBool,
    request_count: AtomicU32,
}

impl MockWallet {
    pub fn new(accounts: Vec<Address>) -> Self {
        let (selected, _) = watch::channel(accounts.first().copied());
        Self {
            accounts: Mutex::new(accounts),
            selected,
            request_delay: None,
            rejecting: AtomicBool::new(false),
            request_count: AtomicU32::new(0),
        }
    }

    /// Wallet with a single account.
    pub fn single(account: Address) -> Self {
        Self::new(vec![account])
    }

    /// Hold every account request for `delay`, as a user prompt would.
    pub fn with_request_delay(mut self, delay: Duration) -> Self {
        self.request_delay = Some(delay);
        self
    }

    /// Reject account requests as if the user declined.
    pub fn set_rejecting(&self, rejecting: bool) {
        self.rejecting.store(rejecting, Ordering::SeqCst);
    }

    /// Select `account`, adding it if unknown, and notify subscribers.
    pub fn switch_account(&self, account: Address) {
        {
            let mut accounts = self.accounts();
            accounts.retain(|a| *a != account);
            accounts.insert(0, account);
        }
        self.selected.send_replace(Some(account));
    }

    /// Drop all accounts and notify subscribers.
    pub fn disconnect(&self) {
        self.accounts().clear();
        self.selected.send_replace(None);
    }

    /// Number of `request_accounts` calls.
    pub fn request_count(&self) -> u32 {
        self.request_count.load(Ordering::SeqCst)
    }

    fn accounts(&self) -> std::sync::MutexGuard<'_, Vec<Address>> {
        self.accounts.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl WalletBridge for MockWallet {
    async fn request_accounts(&self) -> Result<Vec<Address>, WalletError> {
        self.request_count.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.request_delay {
            tokio::time::sleep(delay).await;
        }
        if self.rejecting.load(Ordering::SeqCst) {
            return Err(WalletError::Rejected("User rejected the request".to_string()));
        }

        Ok(self.accounts().clone())
    }

    async fn signer(&self) -> Result<Signer, WalletError> {
        self.accounts()
            .first()
            .copied()
            .map(Signer::new)
            .ok_or(WalletError::NoAccounts)
    }

    fn account_changes(&self) -> watch::Receiver<Option<Address>> {
        self.selected.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_switch_account_notifies() {
        let wallet = MockWallet::new(vec![Address::from_low_u64(1), Address::from_low_u64(2)]);
        let mut changes = wallet.account_changes();

        wallet.switch_account(Address::from_low_u64(2));
        changes.changed().await.unwrap();
        assert_eq!(*changes.borrow(), Some(Address::from_low_u64(2)));
        assert_eq!(
            wallet.signer().await.unwrap().address(),
            Address::from_low_u64(2)
        );
    }

    #[tokio::test]
    async fn test_disconnected_wallet_has_no_signer() {
        let wallet = MockWallet::single(Address::from_low_u64(1));
        wallet.disconnect();
        assert!(matches!(wallet.signer().await, Err(WalletError::NoAccounts)));
        assert!(wallet.request_accounts().await.unwrap().is_empty());
    }
}
