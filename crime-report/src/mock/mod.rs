//! In-memory devnet.
//!
//! Wallet, contracts, content store and gateway that live entirely in
//! memory, with failure injection for tests. [`Devnet`] wires them into a
//! ready [`ReportClient`].

pub mod chain;
pub mod store;
pub mod wallet;

pub use chain::{MockChain, MockContract, MockPendingTransaction};
pub use store::{MockStore, MOCK_GATEWAY_URL};
pub use wallet::MockWallet;

use std::sync::Arc;

use crate::client::ReportClient;
use crate::config::ClientConfig;
use crate::types::Address;

const fn devnet_address(tag: u8) -> Address {
    let mut bytes = [0u8; 20];
    bytes[0] = 0xde;
    bytes[19] = tag;
    Address::from_bytes(bytes)
}

/// A devnet deployment: one chain, one store and the wallet driving it.
pub struct Devnet {
    pub wallet: Arc<MockWallet>,
    pub chain: MockChain,
    pub store: Arc<MockStore>,
    pub config: ClientConfig,
}

impl Devnet {
    pub const ADMIN_MANAGER: Address = devnet_address(1);
    pub const USER_MANAGER: Address = devnet_address(2);
    pub const CRIME_REPORT: Address = devnet_address(3);

    /// Deploy with `owner` as registry owner and a wallet holding only the
    /// owner's account.
    pub fn new(owner: Address) -> Self {
        Self::with_wallet(owner, MockWallet::single(owner))
    }

    pub fn with_wallet(owner: Address, wallet: MockWallet) -> Self {
        let config = ClientConfig {
            admin_manager_address: Some(Self::ADMIN_MANAGER),
            user_manager_address: Some(Self::USER_MANAGER),
            crime_report_address: Some(Self::CRIME_REPORT),
            gateway_url: MOCK_GATEWAY_URL.to_string(),
            ..Default::default()
        };

        Self {
            wallet: Arc::new(wallet),
            chain: MockChain::new(owner),
            store: Arc::new(MockStore::new()),
            config,
        }
    }

    /// A client bound to this devnet. Every client shares the same chain
    /// and store.
    pub fn client(&self) -> ReportClient {
        self.client_with_config(self.config.clone())
    }

    pub fn client_with_config(&self, config: ClientConfig) -> ReportClient {
        ReportClient::new(config, self.store.clone(), self.store.clone())
            .with_provider(self.wallet.clone(), Arc::new(self.chain.clone()))
    }
}
