//! Error types for the report client.
//!
//! Capability checks (`is_admin`, `is_registered`) never return these; they
//! answer `false` on failure. Everything the caller explicitly asked to
//! happen reports failure through [`ClientError`], naming the action.

use thiserror::Error;

use crate::contracts::ContractError;
use crate::storage::{StorageError, UploadError};
use crate::wallet::WalletError;

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Why `initialize` failed. Initialization fails closed: nothing is
/// connected after any of these.
#[derive(Debug, Error)]
pub enum InitError {
    /// A contract address is missing from configuration
    #[error("Contract address {0} is missing from configuration")]
    MissingContractAddress(&'static str),

    /// No wallet bridge is present
    #[error("No wallet detected - please install a wallet")]
    WalletMissing,

    /// Another initialization is in flight
    #[error("Wallet request is already in progress")]
    AlreadyInProgress,

    /// The wallet refused or failed
    #[error("Wallet error: {0}")]
    Wallet(#[from] WalletError),

    /// Contract handles could not be bound
    #[error("Error initializing contracts: {0}")]
    Binding(#[from] ContractError),
}

/// Underlying cause of a failed action.
#[derive(Debug, Error)]
pub enum ActionError {
    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error(transparent)]
    Contract(#[from] ContractError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("invalid report document: {0}")]
    Document(#[from] serde_json::Error),
}

/// Client error types.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Operation needs a connection
    #[error("Contracts not initialized - call initialize() first")]
    NotInitialized,

    #[error("Failed to fetch owner address: {0}")]
    OwnerFetchFailed(#[source] ContractError),

    #[error("User registration failed: {0}")]
    RegistrationFailed(#[source] ActionError),

    #[error("User deregistration failed: {0}")]
    DeregistrationFailed(#[source] ActionError),

    #[error("Admin addition failed: {0}")]
    AdminAdditionFailed(#[source] ActionError),

    #[error("Crime report failed: {0}")]
    ReportFailed(#[source] ActionError),

    #[error("Case resolution failed: {0}")]
    ResolutionFailed(#[source] ActionError),

    #[error("Failed to retrieve report details: {0}")]
    ReportFetchFailed(#[source] ActionError),

    #[error("Failed to retrieve user reports: {0}")]
    UserReportsFailed(#[source] Box<ClientError>),

    #[error("Failed to get report count: {0}")]
    ReportCountFailed(#[source] ContractError),

    #[error("Failed to get user report IDs: {0}")]
    ReportIdsFailed(#[source] ContractError),

    /// Client could not be constructed from configuration
    #[error("Client setup failed: {0}")]
    Setup(String),
}

impl ClientError {
    /// True when the action failed because content could not be uploaded.
    pub fn is_upload_failure(&self) -> bool {
        matches!(
            self,
            ClientError::RegistrationFailed(ActionError::Upload(_))
                | ClientError::DeregistrationFailed(ActionError::Upload(_))
                | ClientError::AdminAdditionFailed(ActionError::Upload(_))
                | ClientError::ReportFailed(ActionError::Upload(_))
                | ClientError::ResolutionFailed(ActionError::Upload(_))
        )
    }
}
