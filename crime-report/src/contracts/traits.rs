//! Contract interfaces consumed by the client.
//!
//! Three contracts make up the system:
//! - `AdminManager`: owner plus the admin set
//! - `UserManager`: the registered-user set
//! - `CrimeReport`: the report ledger
//!
//! Write methods return a [`PendingTransaction`] whose `wait` resolves once
//! the transaction is confirmed.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::abi::AbiError;
use crate::rpc::RpcError;
use crate::types::{Address, ContentHash, ReportId, TxHash};
use crate::wallet::Signer;

/// Contract call errors.
#[derive(Debug, thiserror::Error)]
pub enum ContractError {
    /// Provider transport failure
    #[error("Provider error: {0}")]
    Rpc(#[from] RpcError),

    /// Return data could not be decoded
    #[error("ABI decode error: {0}")]
    Abi(#[from] AbiError),

    /// The transaction was mined but reverted
    #[error("Transaction {0} reverted")]
    Reverted(TxHash),

    /// The contract refused the call (require/revert during execution)
    #[error("Execution reverted: {0}")]
    ExecutionReverted(String),

    /// Unexpected value shape from the contract
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Addresses of the three deployed contracts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractAddresses {
    pub admin_manager: Address,
    pub user_manager: Address,
    pub crime_report: Address,
}

/// Confirmation receipt for a mined transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxReceipt {
    pub hash: TxHash,
    pub block_number: Option<u64>,
}

/// A submitted transaction awaiting confirmation.
#[async_trait]
pub trait PendingTransaction: Send + Sync {
    /// Transaction hash, known as soon as the wallet accepts it.
    fn hash(&self) -> TxHash;

    /// Block until the transaction is confirmed; reverted transactions fail.
    async fn wait(&self) -> Result<TxReceipt, ContractError>;
}

/// On-chain fields of a report, as returned by `getReport(id)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnChainReport {
    pub content_hash: ContentHash,
    pub location: String,
    pub media_hash: ContentHash,
    pub reporter: Address,
    /// Creation time in seconds since the epoch
    pub timestamp: u64,
    pub resolved: bool,
    /// Zero address until resolved
    pub resolved_by: Address,
    /// Empty until resolved
    pub resolution_hash: ContentHash,
}

/// The crime report ledger contract.
#[async_trait]
pub trait Ledger: Send + Sync {
    async fn report_count(&self) -> Result<u64, ContractError>;

    async fn get_report(&self, id: ReportId) -> Result<OnChainReport, ContractError>;

    async fn get_report_ids_by_user(&self, user: Address) -> Result<Vec<ReportId>, ContractError>;

    async fn report_crime(
        &self,
        content_hash: &ContentHash,
        location: &str,
        media_hash: &ContentHash,
    ) -> Result<Box<dyn PendingTransaction>, ContractError>;

    async fn resolve_case(
        &self,
        id: ReportId,
        resolution_hash: &ContentHash,
    ) -> Result<Box<dyn PendingTransaction>, ContractError>;
}

/// The admin registry contract.
#[async_trait]
pub trait AdminRegistry: Send + Sync {
    async fn owner(&self) -> Result<Address, ContractError>;

    async fn is_admin(&self, address: Address) -> Result<bool, ContractError>;

    async fn add_admin(
        &self,
        address: Address,
        cid: &ContentHash,
    ) -> Result<Box<dyn PendingTransaction>, ContractError>;
}

/// The user registry contract.
#[async_trait]
pub trait UserRegistry: Send + Sync {
    async fn is_registered_user(&self, address: Address) -> Result<bool, ContractError>;

    /// Register the signing account.
    async fn register_user(&self) -> Result<Box<dyn PendingTransaction>, ContractError>;

    async fn deregister_user(
        &self,
        address: Address,
    ) -> Result<Box<dyn PendingTransaction>, ContractError>;
}

/// Contract handles bound to one signer.
#[derive(Clone)]
pub struct ContractSet {
    pub admin_manager: Arc<dyn AdminRegistry>,
    pub user_manager: Arc<dyn UserRegistry>,
    pub crime_report: Arc<dyn Ledger>,
}

/// Binds contract handles to the selected signer.
#[async_trait]
pub trait ContractBinder: Send + Sync {
    async fn bind(
        &self,
        addresses: &ContractAddresses,
        signer: &Signer,
    ) -> Result<ContractSet, ContractError>;
}
