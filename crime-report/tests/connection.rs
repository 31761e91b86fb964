//! Connection lifecycle and identity checks against the devnet.

use std::sync::Arc;
use std::time::Duration;

use crime_report::mock::{Devnet, MockStore, MockWallet};
use crime_report::{Address, ClientConfig, ClientError, InitError, ReportClient};

fn owner() -> Address {
    Address::from_low_u64(0x01)
}

#[tokio::test]
async fn operations_require_initialize() {
    let devnet = Devnet::new(owner());
    let client = devnet.client();

    assert!(client.connection().await.is_none());
    assert!(matches!(
        client.get_report_count().await,
        Err(ClientError::NotInitialized)
    ));
    assert!(matches!(
        client.register_user().await,
        Err(ClientError::NotInitialized)
    ));
    assert!(!client.is_admin(owner()).await);
    assert!(!client.is_registered(owner()).await);
}

#[tokio::test]
async fn initialize_binds_the_selected_account() {
    let devnet = Devnet::new(owner());
    let client = devnet.client();

    let account = client.initialize().await.unwrap();
    assert_eq!(account, owner());
    assert_eq!(client.current_account().await, Some(owner()));
    assert_eq!(client.get_owner().await.unwrap(), owner());
    assert_eq!(devnet.chain.bind_count(), 1);
}

#[tokio::test]
async fn missing_contract_address_fails_closed() {
    let devnet = Devnet::new(owner());
    let config = ClientConfig {
        user_manager_address: None,
        ..devnet.config.clone()
    };
    let client = devnet.client_with_config(config);

    let err = client.initialize().await.unwrap_err();
    assert!(matches!(
        err,
        InitError::MissingContractAddress("USER_MANAGER_ADDRESS")
    ));
    assert!(client.connection().await.is_none());
    assert_eq!(devnet.wallet.request_count(), 0);
}

#[tokio::test]
async fn client_without_wallet_cannot_connect() {
    let devnet = Devnet::new(owner());
    let store = Arc::new(MockStore::new());
    let client = ReportClient::new(devnet.config.clone(), store.clone(), store);

    assert!(matches!(
        client.initialize().await,
        Err(InitError::WalletMissing)
    ));
}

#[tokio::test]
async fn rejected_wallet_request_fails_closed() {
    let devnet = Devnet::new(owner());
    devnet.wallet.set_rejecting(true);
    let client = devnet.client();

    assert!(matches!(client.initialize().await, Err(InitError::Wallet(_))));
    assert!(client.connection().await.is_none());
    assert_eq!(devnet.chain.bind_count(), 0);
}

#[tokio::test]
async fn concurrent_initialize_is_rejected() {
    let wallet = MockWallet::single(owner()).with_request_delay(Duration::from_millis(50));
    let devnet = Devnet::with_wallet(owner(), wallet);
    let client = devnet.client();

    let (first, second) = tokio::join!(client.initialize(), client.initialize());

    assert_eq!(first.unwrap(), owner());
    assert!(matches!(second, Err(InitError::AlreadyInProgress)));
    assert_eq!(devnet.chain.bind_count(), 1);
    assert_eq!(devnet.wallet.request_count(), 1);

    // The guard is released once the first call completes.
    client.initialize().await.unwrap();
    assert_eq!(devnet.chain.bind_count(), 2);
}

#[tokio::test]
async fn failed_reinitialize_keeps_previous_connection() {
    let devnet = Devnet::new(owner());
    let client = devnet.client();
    client.initialize().await.unwrap();

    devnet.chain.fail_binding(true);
    devnet.wallet.switch_account(Address::from_low_u64(0x02));

    assert!(matches!(client.initialize().await, Err(InitError::Binding(_))));
    assert_eq!(client.current_account().await, Some(owner()));
}

#[tokio::test]
async fn account_change_rebuilds_connection() {
    let user = Address::from_low_u64(0x02);
    let devnet = Devnet::new(owner());
    let client = Arc::new(devnet.client());
    client.initialize().await.unwrap();

    let watcher = Arc::clone(&client).watch_accounts().unwrap();
    devnet.wallet.switch_account(user);

    let mut switched = false;
    for _ in 0..50 {
        if client.current_account().await == Some(user) {
            switched = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(switched, "connection was not rebuilt for the new account");

    devnet.wallet.disconnect();
    let mut dropped = false;
    for _ in 0..50 {
        if client.connection().await.is_none() {
            dropped = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(dropped, "connection survived a wallet disconnect");

    watcher.abort();
}

#[tokio::test]
async fn owner_is_admin_without_admin_set_membership() {
    let devnet = Devnet::new(owner());
    let client = devnet.client();
    client.initialize().await.unwrap();

    assert!(devnet.chain.admin_cid(owner()).is_none());
    assert!(client.is_admin(owner()).await);
    assert!(!client.is_admin(Address::from_low_u64(0x09)).await);
}

#[tokio::test]
async fn admin_check_denies_on_failure() {
    let admin = Address::from_low_u64(0x03);
    let devnet = Devnet::new(owner());
    let devnet = Devnet {
        chain: devnet.chain.clone().with_admin(admin),
        ..devnet
    };
    let client = devnet.client();
    client.initialize().await.unwrap();
    assert!(client.is_admin(admin).await);

    devnet.chain.fail_owner(true);
    assert!(!client.is_admin(admin).await);
    assert!(!client.is_admin(owner()).await);
    assert!(matches!(
        client.get_owner().await,
        Err(ClientError::OwnerFetchFailed(_))
    ));

    devnet.chain.fail_owner(false);
    devnet.chain.fail_reads(true);
    assert!(!client.is_admin(admin).await);
    assert!(!client.is_registered(admin).await);
}

#[tokio::test]
async fn add_admin_records_pinned_name() {
    let admin = Address::from_low_u64(0x03);
    let devnet = Devnet::new(owner());
    let client = devnet.client();
    client.initialize().await.unwrap();

    client.add_admin(admin, "Alice").await.unwrap();
    assert_eq!(
        devnet.chain.admin_cid(admin),
        Some(MockStore::hash_of(b"Alice"))
    );
    assert!(client.is_admin(admin).await);

    // Only the owner may add admins.
    devnet.wallet.switch_account(admin);
    client.initialize().await.unwrap();
    let err = client
        .add_admin(Address::from_low_u64(0x04), "Bob")
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::AdminAdditionFailed(_)));
}

#[tokio::test]
async fn register_and_deregister() {
    let user = Address::from_low_u64(0x02);
    let devnet = Devnet::new(owner());
    devnet.wallet.switch_account(user);
    let client = devnet.client();
    client.initialize().await.unwrap();

    assert!(!client.is_registered(user).await);
    client.register_user().await.unwrap();
    assert!(client.is_registered(user).await);

    let err = client.register_user().await.unwrap_err();
    assert!(matches!(err, ClientError::RegistrationFailed(_)));

    client.deregister_user(user).await.unwrap();
    assert!(!client.is_registered(user).await);
    assert!(matches!(
        client.deregister_user(user).await,
        Err(ClientError::DeregistrationFailed(_))
    ));
}
