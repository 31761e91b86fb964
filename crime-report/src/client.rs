//! ReportClient - contract interaction and content orchestration.
//!
//! Joins three contracts, a pinning service and a gateway into the report
//! and identity operations the application uses. Report content lives off
//! chain; the ledger stores only the content hashes.

use futures::future::{join_all, try_join_all};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::ClientConfig;
use crate::connection::Connection;
use crate::contracts::{ContractBinder, PendingTransaction, RpcBinder};
use crate::error::{ActionError, ClientError, InitError, Result};
use crate::report::{Media, Report, ReportDetails};
use crate::rpc::RpcTransport;
use crate::storage::{
    upload_with_retry, ContentGateway, ContentStore, HttpGateway, PinKind, PinataStore,
    UploadError,
};
use crate::types::{Address, ContentHash, ReportId, TxHash};
use crate::wallet::{RpcWallet, WalletBridge};

/// Payload pinned by the storage health probe.
pub const IPFS_TEST_PAYLOAD: &str = "IPFS Test Data";

/// Result of the storage health probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status")]
pub enum IpfsStatus {
    #[serde(rename = "OK")]
    Ok { hash: ContentHash },
    #[serde(rename = "Error")]
    Error { message: String },
}

impl IpfsStatus {
    pub fn is_ok(&self) -> bool {
        matches!(self, IpfsStatus::Ok { .. })
    }
}

/// Wallet bridge plus the binder that attaches contracts to its signer.
struct Provider {
    wallet: Arc<dyn WalletBridge>,
    binder: Arc<dyn ContractBinder>,
    /// JSON-RPC wallets only learn of account switches by polling
    poller: Option<Arc<RpcWallet>>,
}

/// Client for the crime report contracts and their off-chain content.
pub struct ReportClient {
    config: ClientConfig,
    provider: Option<Provider>,
    store: Arc<dyn ContentStore>,
    gateway: Arc<dyn ContentGateway>,
    /// Current connection; replaced whole, read as an `Arc` snapshot
    connection: RwLock<Option<Arc<Connection>>>,
    /// Held while an initialization is in flight
    initializing: Mutex<()>,
    /// Last health probe result
    ipfs_status: RwLock<Option<IpfsStatus>>,
}

impl ReportClient {
    /// Create a client without a wallet. Reads of off-chain content work;
    /// `initialize` fails until a wallet is attached with [`Self::with_provider`].
    pub fn new(
        config: ClientConfig,
        store: Arc<dyn ContentStore>,
        gateway: Arc<dyn ContentGateway>,
    ) -> Self {
        Self {
            config,
            provider: None,
            store,
            gateway,
            connection: RwLock::new(None),
            initializing: Mutex::new(()),
            ipfs_status: RwLock::new(None),
        }
    }

    /// Attach a wallet bridge and the contract binder for its provider.
    pub fn with_provider(
        mut self,
        wallet: Arc<dyn WalletBridge>,
        binder: Arc<dyn ContractBinder>,
    ) -> Self {
        self.provider = Some(Provider {
            wallet,
            binder,
            poller: None,
        });
        self
    }

    /// Build a client talking to Pinata, an HTTP gateway and, when
    /// `rpc_url` is set, a JSON-RPC wallet provider.
    pub fn from_config(config: ClientConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.request_timeout_secs);

        let store = PinataStore::new(config.pinata.clone())
            .map_err(|e| ClientError::Setup(e.to_string()))?;
        let gateway = HttpGateway::new(config.gateway_url.clone(), timeout)
            .map_err(|e| ClientError::Setup(e.to_string()))?;

        let rpc_url = config.rpc_url.clone();
        let poll = Duration::from_millis(config.receipt_poll_interval_ms);
        let client = Self::new(config, Arc::new(store), Arc::new(gateway));

        match rpc_url {
            Some(url) => {
                let transport = Arc::new(
                    RpcTransport::new(url, timeout).map_err(|e| ClientError::Setup(e.to_string()))?,
                );
                let wallet = Arc::new(RpcWallet::new(Arc::clone(&transport)));
                let binder = Arc::new(RpcBinder::new(transport, poll));
                let mut client = client.with_provider(wallet.clone(), binder);
                if let Some(provider) = client.provider.as_mut() {
                    provider.poller = Some(wallet);
                }
                Ok(client)
            }
            None => Ok(client),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    // ==================== Connection ====================

    /// Connect to the wallet and bind the three contracts to its selected
    /// account.
    ///
    /// Fails closed: on any error the previous connection (if any) is left
    /// untouched. A call made while another is in flight fails immediately
    /// with [`InitError::AlreadyInProgress`].
    pub async fn initialize(&self) -> std::result::Result<Address, InitError> {
        let addresses = self.config.contract_addresses().map_err(|missing| {
            error!(missing, "Contract addresses are missing in configuration");
            InitError::MissingContractAddress(missing)
        })?;

        let provider = self.provider.as_ref().ok_or_else(|| {
            error!("No wallet detected");
            InitError::WalletMissing
        })?;

        let _guard = self.initializing.try_lock().map_err(|_| {
            info!("Wallet request is already in progress");
            InitError::AlreadyInProgress
        })?;

        let accounts = provider.wallet.request_accounts().await.map_err(|e| {
            error!(error = %e, "Error requesting wallet accounts");
            InitError::from(e)
        })?;
        debug!(count = accounts.len(), "Wallet accounts granted");

        let signer = provider.wallet.signer().await?;
        let contracts = provider.binder.bind(&addresses, &signer).await.map_err(|e| {
            error!(error = %e, "Error initializing contracts");
            InitError::from(e)
        })?;

        let connection = Arc::new(Connection::new(
            Arc::clone(&provider.wallet),
            signer,
            contracts,
        ));
        *self.connection.write().await = Some(connection);

        info!(account = %signer.address(), "Contracts initialized successfully");
        Ok(signer.address())
    }

    /// React to the wallet switching accounts: drop the connection when the
    /// wallet disconnects, otherwise rebuild it for the new account.
    pub async fn handle_account_change(
        &self,
        account: Option<Address>,
    ) -> std::result::Result<Option<Address>, InitError> {
        match account {
            None => {
                self.disconnect().await;
                Ok(None)
            }
            Some(next) => {
                info!(account = %next, "Wallet account changed, reinitializing");
                self.initialize().await.map(Some)
            }
        }
    }

    /// Follow the wallet's account notifications, reinitializing on every
    /// change. Returns `None` when no wallet is attached.
    pub fn watch_accounts(self: Arc<Self>) -> Option<JoinHandle<()>> {
        let provider = self.provider.as_ref()?;
        let mut changes = provider.wallet.account_changes();
        let poller = provider.poller.clone();
        let interval = Duration::from_millis(self.config.account_poll_interval_ms);

        Some(tokio::spawn(async move {
            let poll_task = poller.map(|wallet| wallet.spawn_account_poller(interval));

            while changes.changed().await.is_ok() {
                let account = *changes.borrow_and_update();
                if self.current_account().await == account {
                    continue;
                }
                if let Err(e) = self.handle_account_change(account).await {
                    warn!(error = %e, "Reinitialization after account change failed");
                }
            }

            if let Some(task) = poll_task {
                task.abort();
            }
        }))
    }

    /// Drop the current connection.
    pub async fn disconnect(&self) {
        if self.connection.write().await.take().is_some() {
            info!("Wallet disconnected");
        }
    }

    /// Snapshot of the current connection.
    pub async fn connection(&self) -> Option<Arc<Connection>> {
        self.connection.read().await.clone()
    }

    /// Account the current connection is bound to.
    pub async fn current_account(&self) -> Option<Address> {
        self.connection().await.map(|c| c.account())
    }

    async fn require_connection(&self) -> Result<Arc<Connection>> {
        self.connection().await.ok_or(ClientError::NotInitialized)
    }

    // ==================== Content ====================

    async fn upload(&self, data: &[u8], kind: PinKind) -> std::result::Result<ContentHash, UploadError> {
        upload_with_retry(self.store.as_ref(), data, kind, self.config.upload_attempts)
            .await
            .map_err(|e| {
                error!(error = %e, "Error uploading to IPFS");
                e
            })
    }

    /// Pin the fixed probe payload and remember the outcome.
    pub async fn check_ipfs_status(&self) -> IpfsStatus {
        let status = match self.upload(IPFS_TEST_PAYLOAD.as_bytes(), PinKind::Text).await {
            Ok(hash) => IpfsStatus::Ok { hash },
            Err(e) => IpfsStatus::Error {
                message: e.to_string(),
            },
        };
        *self.ipfs_status.write().await = Some(status.clone());
        status
    }

    /// Outcome of the most recent [`Self::check_ipfs_status`], if any.
    pub async fn last_ipfs_status(&self) -> Option<IpfsStatus> {
        self.ipfs_status.read().await.clone()
    }

    // ==================== Identity ====================

    pub async fn get_owner(&self) -> Result<Address> {
        let conn = self.require_connection().await?;
        conn.admin_manager().owner().await.map_err(|e| {
            error!(error = %e, "Error fetching owner");
            ClientError::OwnerFetchFailed(e)
        })
    }

    /// Whether `address` is the owner or in the admin set. Any failure
    /// answers `false`.
    pub async fn is_admin(&self, address: Address) -> bool {
        let Some(conn) = self.connection().await else {
            warn!(%address, "Admin check without a connection");
            return false;
        };

        let owner = match conn.admin_manager().owner().await {
            Ok(owner) => owner,
            Err(e) => {
                warn!(%address, error = %e, "Error checking admin status");
                return false;
            }
        };
        if address == owner {
            return true;
        }

        conn.admin_manager().is_admin(address).await.unwrap_or_else(|e| {
            warn!(%address, error = %e, "Error checking admin status");
            false
        })
    }

    /// Whether `address` is a registered user. Any failure answers `false`.
    pub async fn is_registered(&self, address: Address) -> bool {
        let Some(conn) = self.connection().await else {
            warn!(%address, "Registration check without a connection");
            return false;
        };

        conn.user_manager()
            .is_registered_user(address)
            .await
            .unwrap_or_else(|e| {
                warn!(%address, error = %e, "Error checking registration status");
                false
            })
    }

    async fn confirm(pending: Box<dyn PendingTransaction>) -> std::result::Result<TxHash, ActionError> {
        let receipt = pending.wait().await?;
        Ok(receipt.hash)
    }

    /// Register the connected account.
    pub async fn register_user(&self) -> Result<TxHash> {
        let conn = self.require_connection().await?;
        let result = async {
            let pending = conn.user_manager().register_user().await?;
            Self::confirm(pending).await
        }
        .await;

        match result {
            Ok(tx) => {
                info!(account = %conn.account(), %tx, "User registered successfully");
                Ok(tx)
            }
            Err(e) => {
                error!(error = %e, "Error registering user");
                Err(ClientError::RegistrationFailed(e))
            }
        }
    }

    pub async fn deregister_user(&self, address: Address) -> Result<TxHash> {
        let conn = self.require_connection().await?;
        let result = async {
            let pending = conn.user_manager().deregister_user(address).await?;
            Self::confirm(pending).await
        }
        .await;

        match result {
            Ok(tx) => {
                info!(%address, %tx, "User deregistered successfully");
                Ok(tx)
            }
            Err(e) => {
                error!(%address, error = %e, "Error deregistering user");
                Err(ClientError::DeregistrationFailed(e))
            }
        }
    }

    /// Add an admin. The admin's name is pinned and its hash recorded on
    /// chain with the address.
    pub async fn add_admin(&self, address: Address, name: &str) -> Result<TxHash> {
        let conn = self.require_connection().await?;
        let result = async {
            let cid = self.upload(name.as_bytes(), PinKind::Text).await?;
            let pending = conn.admin_manager().add_admin(address, &cid).await?;
            Self::confirm(pending).await
        }
        .await;

        match result {
            Ok(tx) => {
                info!(%address, %tx, "Admin added successfully");
                Ok(tx)
            }
            Err(e) => {
                error!(%address, error = %e, "Error adding admin");
                Err(ClientError::AdminAdditionFailed(e))
            }
        }
    }

    // ==================== Reports ====================

    /// Submit a report.
    ///
    /// Media (if any) and the report document are pinned first; the ledger
    /// transaction carries both hashes. Content pinned before a failed
    /// transaction stays pinned and unreferenced.
    pub async fn report_crime(
        &self,
        name: &str,
        description: &str,
        location: &str,
        is_anonymous: bool,
        media: Option<&Media>,
    ) -> Result<TxHash> {
        let conn = self.require_connection().await?;
        let result = async {
            let media_hash = match media {
                Some(media) => self.upload(&media.bytes, PinKind::Media).await?,
                None => ContentHash::empty(),
            };

            let details = ReportDetails::new(name, description, is_anonymous);
            let document = serde_json::to_vec(&details)?;
            let report_hash = self.upload(&document, PinKind::Json).await?;

            let pending = conn
                .crime_report()
                .report_crime(&report_hash, location, &media_hash)
                .await?;
            Self::confirm(pending).await
        }
        .await;

        match result {
            Ok(tx) => {
                info!(reporter = %conn.account(), %tx, "Crime reported successfully");
                Ok(tx)
            }
            Err(e) => {
                error!(error = %e, "Error reporting crime");
                Err(ClientError::ReportFailed(e))
            }
        }
    }

    /// Rebuild one report from its on-chain fields and off-chain content.
    ///
    /// The report document must be fetchable. The media URL is computed,
    /// never fetched. A resolution text that cannot be fetched degrades to
    /// an empty string.
    pub async fn get_report(&self, id: ReportId) -> Result<Report> {
        let conn = self.require_connection().await?;
        let result = async {
            let on_chain = conn.crime_report().get_report(id).await?;

            let document = self.gateway.fetch(&on_chain.content_hash).await?;
            let details: ReportDetails = serde_json::from_slice(&document)?;

            let media_url = if on_chain.media_hash.is_empty() {
                String::new()
            } else {
                self.gateway.url(&on_chain.media_hash)
            };

            let resolution_details =
                if on_chain.resolved && !on_chain.resolution_hash.is_empty() {
                    match self.gateway.fetch_text(&on_chain.resolution_hash).await {
                        Ok(text) => text,
                        Err(e) => {
                            warn!(report_id = id, error = %e, "Error fetching resolution details");
                            String::new()
                        }
                    }
                } else {
                    String::new()
                };

            Ok::<_, ActionError>(Report::assemble(
                id,
                on_chain,
                details,
                media_url,
                resolution_details,
            ))
        }
        .await;

        result.map_err(|e| {
            error!(report_id = id, error = %e, "Error fetching report");
            ClientError::ReportFetchFailed(e)
        })
    }

    /// Resolve a case: pin the resolution message, record its hash on chain.
    pub async fn resolve_case(&self, id: ReportId, message: &str) -> Result<TxHash> {
        let conn = self.require_connection().await?;
        let result = async {
            let resolution_hash = self.upload(message.as_bytes(), PinKind::Text).await?;
            let pending = conn
                .crime_report()
                .resolve_case(id, &resolution_hash)
                .await?;
            Self::confirm(pending).await
        }
        .await;

        match result {
            Ok(tx) => {
                info!(report_id = id, %tx, "Case resolved successfully");
                Ok(tx)
            }
            Err(e) => {
                error!(report_id = id, error = %e, "Error resolving case");
                Err(ClientError::ResolutionFailed(e))
            }
        }
    }

    pub async fn get_report_count(&self) -> Result<u64> {
        let conn = self.require_connection().await?;
        conn.crime_report().report_count().await.map_err(|e| {
            error!(error = %e, "Error getting report count");
            ClientError::ReportCountFailed(e)
        })
    }

    pub async fn get_report_ids_by_user(&self, address: Address) -> Result<Vec<ReportId>> {
        let conn = self.require_connection().await?;
        conn.crime_report()
            .get_report_ids_by_user(address)
            .await
            .map_err(|e| {
                error!(%address, error = %e, "Error getting user report IDs");
                ClientError::ReportIdsFailed(e)
            })
    }

    /// All reports filed by `address`, rebuilt concurrently, in id order.
    /// One failed report fails the whole listing.
    pub async fn get_user_reports(&self, address: Address) -> Result<Vec<Report>> {
        let ids = self
            .get_report_ids_by_user(address)
            .await
            .map_err(|e| ClientError::UserReportsFailed(Box::new(e)))?;

        try_join_all(ids.into_iter().map(|id| self.get_report(id)))
            .await
            .map_err(|e| {
                error!(%address, error = %e, "Error fetching user reports");
                ClientError::UserReportsFailed(Box::new(e))
            })
    }

    /// Like [`Self::get_user_reports`], but reports that fail to rebuild are
    /// skipped instead of failing the listing.
    pub async fn get_user_reports_lenient(&self, address: Address) -> Result<Vec<Report>> {
        let ids = self
            .get_report_ids_by_user(address)
            .await
            .map_err(|e| ClientError::UserReportsFailed(Box::new(e)))?;

        let results = join_all(ids.iter().map(|id| self.get_report(*id))).await;
        Ok(results
            .into_iter()
            .zip(ids)
            .filter_map(|(result, id)| match result {
                Ok(report) => Some(report),
                Err(e) => {
                    warn!(report_id = id, error = %e, "Skipping report");
                    None
                }
            })
            .collect())
    }
}
