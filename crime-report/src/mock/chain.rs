//! In-memory devnet contracts.
//!
//! One shared chain state backs all three contracts. Transactions are
//! mined on submission, so state changes are visible before `wait` is
//! called; `wait` only reports the outcome.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::contracts::*;
use crate::types::{Address, ContentHash, ReportId, TxHash};
use crate::wallet::Signer;

/// Devnet genesis time, seconds since the epoch.
pub const GENESIS_TIMESTAMP: u64 = 1_700_000_000;

/// Seconds between devnet blocks.
pub const BLOCK_TIME_SECS: u64 = 12;

#[derive(Debug, Default)]
struct Faults {
    reads: bool,
    owner: bool,
    writes: bool,
    revert_next: bool,
    bind: bool,
    reports: HashSet<ReportId>,
}

#[derive(Debug)]
struct ChainState {
    owner: Address,
    admins: HashMap<Address, ContentHash>,
    users: HashSet<Address>,
    reports: Vec<OnChainReport>,
    by_user: HashMap<Address, Vec<ReportId>>,
    clock: u64,
    block: u64,
    submitted: u64,
    faults: Faults,
}

impl ChainState {
    fn check_read(&self) -> Result<(), ContractError> {
        if self.faults.reads {
            return Err(ContractError::InvalidResponse(
                "injected read failure".to_string(),
            ));
        }
        Ok(())
    }

    fn is_admin(&self, address: Address) -> bool {
        address == self.owner || self.admins.contains_key(&address)
    }

    /// Mine one transaction in a new block. `effect` receives the block
    /// timestamp; an `Err` from it rejects the transaction at submission
    /// and leaves state untouched. A transaction marked to revert is mined
    /// without its effect.
    fn mine(
        &mut self,
        effect: impl FnOnce(&mut Self, u64) -> Result<(), String>,
    ) -> Result<MockPendingTransaction, ContractError> {
        if self.faults.writes {
            return Err(ContractError::ExecutionReverted(
                "injected write failure".to_string(),
            ));
        }

        let timestamp = self.clock + BLOCK_TIME_SECS;
        let reverted = std::mem::take(&mut self.faults.revert_next);
        if !reverted {
            effect(self, timestamp).map_err(ContractError::ExecutionReverted)?;
        }

        self.submitted += 1;
        self.block += 1;
        self.clock = timestamp;

        let mut bytes = [0u8; 32];
        bytes[24..].copy_from_slice(&self.submitted.to_be_bytes());
        let hash = TxHash::from_bytes(bytes);

        Ok(MockPendingTransaction {
            hash,
            block_number: self.block,
            reverted,
        })
    }
}

/// Devnet contract deployment. Binding returns handles that send from the
/// signer's account.
#[derive(Clone)]
pub struct MockChain {
    state: Arc<Mutex<ChainState>>,
    binds: Arc<AtomicU32>,
}

impl MockChain {
    /// Deploy with `owner` as the admin registry owner.
    pub fn new(owner: Address) -> Self {
        Self {
            state: Arc::new(Mutex::new(ChainState {
                owner,
                admins: HashMap::new(),
                users: HashSet::new(),
                reports: Vec::new(),
                by_user: HashMap::new(),
                clock: GENESIS_TIMESTAMP,
                block: 0,
                submitted: 0,
                faults: Faults::default(),
            })),
            binds: Arc::new(AtomicU32::new(0)),
        }
    }

    fn state(&self) -> MutexGuard<'_, ChainState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Add an admin directly, bypassing the owner check.
    pub fn with_admin(self, address: Address) -> Self {
        self.state().admins.insert(address, ContentHash::empty());
        self
    }

    /// Register a user directly.
    pub fn with_user(self, address: Address) -> Self {
        self.state().users.insert(address);
        self
    }

    /// Handles sending from `account`, without going through a wallet.
    pub fn contracts_for(&self, account: Address) -> ContractSet {
        let contract = Arc::new(MockContract {
            state: Arc::clone(&self.state),
            from: account,
        });
        ContractSet {
            admin_manager: contract.clone(),
            user_manager: contract.clone(),
            crime_report: contract,
        }
    }

    pub fn fail_reads(&self, fail: bool) {
        self.state().faults.reads = fail;
    }

    pub fn fail_owner(&self, fail: bool) {
        self.state().faults.owner = fail;
    }

    pub fn fail_writes(&self, fail: bool) {
        self.state().faults.writes = fail;
    }

    pub fn fail_binding(&self, fail: bool) {
        self.state().faults.bind = fail;
    }

    /// Make `getReport(id)` fail.
    pub fn fail_report(&self, id: ReportId) {
        self.state().faults.reports.insert(id);
    }

    /// Mine the next transaction with a failed status.
    pub fn revert_next_transaction(&self) {
        self.state().faults.revert_next = true;
    }

    /// Number of successful `bind` calls.
    pub fn bind_count(&self) -> u32 {
        self.binds.load(Ordering::SeqCst)
    }

    /// Number of transactions accepted by the chain.
    pub fn submitted_count(&self) -> u64 {
        self.state().submitted
    }

    pub fn report_count(&self) -> usize {
        self.state().reports.len()
    }

    pub fn admin_cid(&self, address: Address) -> Option<ContentHash> {
        self.state().admins.get(&address).cloned()
    }

    pub fn is_user(&self, address: Address) -> bool {
        self.state().users.contains(&address)
    }
}

#[async_trait]
impl ContractBinder for MockChain {
    async fn bind(
        &self,
        _addresses: &ContractAddresses,
        signer: &Signer,
    ) -> Result<ContractSet, ContractError> {
        if self.state().faults.bind {
            return Err(ContractError::InvalidResponse(
                "injected binding failure".to_string(),
            ));
        }
        self.binds.fetch_add(1, Ordering::SeqCst);
        Ok(self.contracts_for(signer.address()))
    }
}

/// A transaction already mined on the devnet.
#[derive(Debug, Clone)]
pub struct MockPendingTransaction {
    hash: TxHash,
    block_number: u64,
    reverted: bool,
}

#[async_trait]
impl PendingTransaction for MockPendingTransaction {
    fn hash(&self) -> TxHash {
        self.hash
    }

    async fn wait(&self) -> Result<TxReceipt, ContractError> {
        if self.reverted {
            return Err(ContractError::Reverted(self.hash));
        }
        Ok(TxReceipt {
            hash: self.hash,
            block_number: Some(self.block_number),
        })
    }
}

/// Devnet contract handle bound to one sending account.
pub struct MockContract {
    state: Arc<Mutex<ChainState>>,
    from: Address,
}

impl MockContract {
    fn state(&self) -> MutexGuard<'_, ChainState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl AdminRegistry for MockContract {
    async fn owner(&self) -> Result<Address, ContractError> {
        let state = self.state();
        state.check_read()?;
        if state.faults.owner {
            return Err(ContractError::InvalidResponse(
                "injected owner failure".to_string(),
            ));
        }
        Ok(state.owner)
    }

    async fn is_admin(&self, address: Address) -> Result<bool, ContractError> {
        let state = self.state();
        state.check_read()?;
        Ok(state.admins.contains_key(&address))
    }

    async fn add_admin(
        &self,
        address: Address,
        cid: &ContentHash,
    ) -> Result<Box<dyn PendingTransaction>, ContractError> {
        let from = self.from;
        let tx = self.state().mine(|s, _| {
            if from != s.owner {
                return Err("Only owner can add admins".to_string());
            }
            s.admins.insert(address, cid.clone());
            Ok(())
        })?;
        Ok(Box::new(tx))
    }
}

#[async_trait]
impl UserRegistry for MockContract {
    async fn is_registered_user(&self, address: Address) -> Result<bool, ContractError> {
        let state = self.state();
        state.check_read()?;
        Ok(state.users.contains(&address))
    }

    async fn register_user(&self) -> Result<Box<dyn PendingTransaction>, ContractError> {
        let from = self.from;
        let tx = self.state().mine(|s, _| {
            if !s.users.insert(from) {
                return Err("User already registered".to_string());
            }
            Ok(())
        })?;
        Ok(Box::new(tx))
    }

    async fn deregister_user(
        &self,
        address: Address,
    ) -> Result<Box<dyn PendingTransaction>, ContractError> {
        let from = self.from;
        let tx = self.state().mine(|s, _| {
            if from != address && !s.is_admin(from) {
                return Err("Not authorized to deregister user".to_string());
            }
            if !s.users.remove(&address) {
                return Err("User not registered".to_string());
            }
            Ok(())
        })?;
        Ok(Box::new(tx))
    }
}

#[async_trait]
impl Ledger for MockContract {
    async fn report_count(&self) -> Result<u64, ContractError> {
        let state = self.state();
        state.check_read()?;
        Ok(state.reports.len() as u64)
    }

    async fn get_report(&self, id: ReportId) -> Result<OnChainReport, ContractError> {
        let state = self.state();
        state.check_read()?;
        if state.faults.reports.contains(&id) {
            return Err(ContractError::InvalidResponse(format!(
                "injected failure for report {}",
                id
            )));
        }
        usize::try_from(id)
            .ok()
            .and_then(|i| state.reports.get(i))
            .cloned()
            .ok_or_else(|| ContractError::ExecutionReverted("Report does not exist".to_string()))
    }

    async fn get_report_ids_by_user(&self, user: Address) -> Result<Vec<ReportId>, ContractError> {
        let state = self.state();
        state.check_read()?;
        Ok(state.by_user.get(&user).cloned().unwrap_or_default())
    }

    async fn report_crime(
        &self,
        content_hash: &ContentHash,
        location: &str,
        media_hash: &ContentHash,
    ) -> Result<Box<dyn PendingTransaction>, ContractError> {
        let from = self.from;
        let tx = self.state().mine(|s, now| {
            let id = s.reports.len() as ReportId;
            s.reports.push(OnChainReport {
                content_hash: content_hash.clone(),
                location: location.to_string(),
                media_hash: media_hash.clone(),
                reporter: from,
                timestamp: now,
                resolved: false,
                resolved_by: Address::ZERO,
                resolution_hash: ContentHash::empty(),
            });
            s.by_user.entry(from).or_default().push(id);
            Ok(())
        })?;
        Ok(Box::new(tx))
    }

    async fn resolve_case(
        &self,
        id: ReportId,
        resolution_hash: &ContentHash,
    ) -> Result<Box<dyn PendingTransaction>, ContractError> {
        let from = self.from;
        let tx = self.state().mine(|s, _| {
            if !s.is_admin(from) {
                return Err("Only admins can resolve cases".to_string());
            }
            let report = usize::try_from(id)
                .ok()
                .and_then(|i| s.reports.get_mut(i))
                .ok_or_else(|| "Report does not exist".to_string())?;
            if report.resolved {
                return Err("Case already resolved".to_string());
            }
            report.resolved = true;
            report.resolved_by = from;
            report.resolution_hash = resolution_hash.clone();
            Ok(())
        })?;
        Ok(Box::new(tx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owner() -> Address {
        Address::from_low_u64(1)
    }

    #[tokio::test]
    async fn test_report_then_resolve() {
        let chain = MockChain::new(owner());
        let reporter = chain.contracts_for(Address::from_low_u64(2));
        let admin = chain.contracts_for(owner());

        let tx = reporter
            .crime_report
            .report_crime(&"QmDoc".into(), "Main St", &ContentHash::empty())
            .await
            .unwrap();
        let receipt = tx.wait().await.unwrap();
        assert_eq!(receipt.block_number, Some(1));

        let report = admin.crime_report.get_report(0).await.unwrap();
        assert_eq!(report.reporter, Address::from_low_u64(2));
        assert_eq!(report.timestamp, GENESIS_TIMESTAMP + BLOCK_TIME_SECS);
        assert!(!report.resolved);

        admin
            .crime_report
            .resolve_case(0, &"QmFix".into())
            .await
            .unwrap();
        let report = admin.crime_report.get_report(0).await.unwrap();
        assert!(report.resolved);
        assert_eq!(report.resolved_by, owner());
        assert_eq!(chain.submitted_count(), 2);
    }

    #[tokio::test]
    async fn test_permission_reverts_leave_state() {
        let chain = MockChain::new(owner());
        let stranger = chain.contracts_for(Address::from_low_u64(9));

        let err = stranger
            .admin_manager
            .add_admin(Address::from_low_u64(3), &"QmName".into())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, ContractError::ExecutionReverted(_)));
        assert!(chain.admin_cid(Address::from_low_u64(3)).is_none());
        assert_eq!(chain.submitted_count(), 0);

        assert!(stranger.crime_report.get_report(0).await.is_err());
    }

    #[tokio::test]
    async fn test_duplicate_registration_reverts() {
        let chain = MockChain::new(owner());
        let user = chain.contracts_for(Address::from_low_u64(4));

        user.user_manager.register_user().await.unwrap();
        assert!(chain.is_user(Address::from_low_u64(4)));
        assert!(user.user_manager.register_user().await.is_err());
    }

    #[tokio::test]
    async fn test_reverted_receipt() {
        let chain = MockChain::new(owner());
        let user = chain.contracts_for(Address::from_low_u64(4));

        chain.revert_next_transaction();
        let tx = user.user_manager.register_user().await.unwrap();
        assert!(matches!(tx.wait().await, Err(ContractError::Reverted(_))));
    }
}
