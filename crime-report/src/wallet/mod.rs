//! Wallet bridge abstraction.
//!
//! - JSON-RPC provider (browser extension bridge, dev node)
//! - In-memory devnet wallet lives in [`crate::mock`]

pub mod rpc;
pub mod traits;

pub use rpc::RpcWallet;
pub use traits::{Signer, WalletBridge, WalletError};
