//! Connection to the wallet-injected provider.

use std::sync::Arc;

use crate::contracts::{AdminRegistry, ContractSet, Ledger, UserRegistry};
use crate::types::Address;
use crate::wallet::{Signer, WalletBridge};

/// Provider, signer and the three contract handles, all bound to one
/// account. Built whole by `initialize` and replaced whole on account
/// change; it is never observed half-built.
pub struct Connection {
    provider: Arc<dyn WalletBridge>,
    signer: Signer,
    contracts: ContractSet,
}

impl Connection {
    pub(crate) fn new(provider: Arc<dyn WalletBridge>, signer: Signer, contracts: ContractSet) -> Self {
        Self {
            provider,
            signer,
            contracts,
        }
    }

    /// The account every transaction is sent from.
    pub fn account(&self) -> Address {
        self.signer.address()
    }

    pub fn signer(&self) -> &Signer {
        &self.signer
    }

    pub fn provider(&self) -> &Arc<dyn WalletBridge> {
        &self.provider
    }

    pub fn admin_manager(&self) -> &dyn AdminRegistry {
        self.contracts.admin_manager.as_ref()
    }

    pub fn user_manager(&self) -> &dyn UserRegistry {
        self.contracts.user_manager.as_ref()
    }

    pub fn crime_report(&self) -> &dyn Ledger {
        self.contracts.crime_report.as_ref()
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("account", &self.signer.address())
            .finish_non_exhaustive()
    }
}
