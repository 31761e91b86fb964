//! Smart contract abstraction layer.
//!
//! - JSON-RPC bindings for deployed contracts
//! - In-memory devnet contracts live in [`crate::mock`]

pub mod rpc;
pub mod traits;

pub use rpc::{RpcBinder, RpcContract};
pub use traits::{
    AdminRegistry, ContractAddresses, ContractBinder, ContractError, ContractSet, Ledger,
    OnChainReport, PendingTransaction, TxReceipt, UserRegistry,
};
