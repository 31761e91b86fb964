//! Contract bindings over the provider's JSON-RPC interface.
//!
//! Reads go through `eth_call`; writes are handed to the wallet with
//! `eth_sendTransaction` and confirmed by polling `eth_getTransactionReceipt`.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use super::traits::*;
use crate::abi::{self, ParamType, Token};
use crate::rpc::{from_hex_data, to_hex_data, RpcError, RpcTransport};
use crate::types::{Address, ContentHash, ReportId, TxHash};
use crate::wallet::Signer;

/// Function selectors (first four bytes of keccak256 of the signature).
mod selector {
    /// `owner()`
    pub const OWNER: [u8; 4] = [0x8d, 0xa5, 0xcb, 0x5b];
    /// `isAdmin(address)`
    pub const IS_ADMIN: [u8; 4] = [0x24, 0xd7, 0x80, 0x6c];
    /// `addAdmin(address,string)`
    pub const ADD_ADMIN: [u8; 4] = [0xd1, 0x68, 0x56, 0xca];
    /// `isRegisteredUser(address)`
    pub const IS_REGISTERED_USER: [u8; 4] = [0x1f, 0x5b, 0xdf, 0x5d];
    /// `registerUser()`
    pub const REGISTER_USER: [u8; 4] = [0x4d, 0x38, 0x20, 0xeb];
    /// `deregisterUser(address)`
    pub const DEREGISTER_USER: [u8; 4] = [0xec, 0x0f, 0x6d, 0xb3];
    /// `reportCount()`
    pub const REPORT_COUNT: [u8; 4] = [0x18, 0x5c, 0x6f, 0x84];
    /// `getReport(uint256)`
    pub const GET_REPORT: [u8; 4] = [0x4e, 0x7f, 0x9b, 0x19];
    /// `getReportIdsByUser(address)`
    pub const GET_REPORT_IDS_BY_USER: [u8; 4] = [0x3c, 0x7f, 0x65, 0xc3];
    /// `reportCrime(string,string,string)`
    pub const REPORT_CRIME: [u8; 4] = [0x69, 0x1d, 0xb4, 0x92];
    /// `resolveCase(uint256,string)`
    pub const RESOLVE_CASE: [u8; 4] = [0xce, 0xee, 0xa0, 0x4b];
}

const REPORT_FIELDS: [ParamType; 8] = [
    ParamType::String,
    ParamType::String,
    ParamType::String,
    ParamType::Address,
    ParamType::Uint,
    ParamType::Bool,
    ParamType::Address,
    ParamType::String,
];

fn classify(err: RpcError) -> ContractError {
    match err {
        RpcError::Rpc { message, .. } if message.to_lowercase().contains("revert") => {
            ContractError::ExecutionReverted(message)
        }
        other => ContractError::Rpc(other),
    }
}

fn expect_token<T>(token: Option<Token>, f: fn(Token) -> Option<T>, what: &str) -> Result<T, ContractError> {
    token
        .and_then(f)
        .ok_or_else(|| ContractError::InvalidResponse(format!("expected {}", what)))
}

fn parse_quantity(s: &str) -> Option<u64> {
    u64::from_str_radix(s.trim_start_matches("0x"), 16).ok()
}

/// Binds [`RpcContract`] handles to a signer.
pub struct RpcBinder {
    transport: Arc<RpcTransport>,
    poll_interval: Duration,
}

impl RpcBinder {
    pub fn new(transport: Arc<RpcTransport>, poll_interval: Duration) -> Self {
        Self {
            transport,
            poll_interval,
        }
    }
}

#[async_trait]
impl ContractBinder for RpcBinder {
    async fn bind(
        &self,
        addresses: &ContractAddresses,
        signer: &Signer,
    ) -> Result<ContractSet, ContractError> {
        let handle = |address| {
            Arc::new(RpcContract {
                transport: Arc::clone(&self.transport),
                address,
                from: signer.address(),
                poll_interval: self.poll_interval,
            })
        };

        info!(
            admin_manager = %addresses.admin_manager,
            user_manager = %addresses.user_manager,
            crime_report = %addresses.crime_report,
            signer = %signer.address(),
            "Binding contracts"
        );

        Ok(ContractSet {
            admin_manager: handle(addresses.admin_manager),
            user_manager: handle(addresses.user_manager),
            crime_report: handle(addresses.crime_report),
        })
    }
}

/// A contract at one address, called on behalf of one signer.
pub struct RpcContract {
    transport: Arc<RpcTransport>,
    address: Address,
    from: Address,
    poll_interval: Duration,
}

impl RpcContract {
    pub fn address(&self) -> Address {
        self.address
    }

    /// Raw return data of an `eth_call`.
    async fn call(&self, selector: [u8; 4], args: &[Token]) -> Result<Vec<u8>, ContractError> {
        let data = to_hex_data(&abi::encode_call(selector, args));
        let raw: String = self
            .transport
            .request(
                "eth_call",
                json!([{ "from": self.from, "to": self.address, "data": data }, "latest"]),
            )
            .await
            .map_err(classify)?;
        Ok(from_hex_data(&raw)?)
    }

    async fn send(
        &self,
        selector: [u8; 4],
        args: &[Token],
    ) -> Result<Box<dyn PendingTransaction>, ContractError> {
        let data = to_hex_data(&abi::encode_call(selector, args));
        let raw: String = self
            .transport
            .request(
                "eth_sendTransaction",
                json!([{ "from": self.from, "to": self.address, "data": data }]),
            )
            .await
            .map_err(classify)?;
        let hash: TxHash = raw
            .parse()
            .map_err(|e| ContractError::InvalidResponse(format!("transaction hash: {}", e)))?;

        debug!(tx = %hash, to = %self.address, "Transaction submitted");
        Ok(Box::new(RpcPendingTransaction {
            transport: Arc::clone(&self.transport),
            hash,
            poll_interval: self.poll_interval,
        }))
    }

    async fn call_one(
        &self,
        selector: [u8; 4],
        args: &[Token],
        returns: ParamType,
    ) -> Result<Token, ContractError> {
        let data = self.call(selector, args).await?;
        abi::decode(&[returns], &data)?
            .into_iter()
            .next()
            .ok_or_else(|| ContractError::InvalidResponse("empty return data".into()))
    }
}

#[async_trait]
impl Ledger for RpcContract {
    async fn report_count(&self) -> Result<u64, ContractError> {
        let token = self.call_one(selector::REPORT_COUNT, &[], ParamType::Uint).await?;
        expect_token(Some(token), Token::into_uint, "uint256")
    }

    async fn get_report(&self, id: ReportId) -> Result<OnChainReport, ContractError> {
        let data = self.call(selector::GET_REPORT, &[Token::Uint(id)]).await?;
        let tokens = abi::decode_record(&REPORT_FIELDS, &data)?;
        let mut it = tokens.into_iter();

        Ok(OnChainReport {
            content_hash: expect_token(it.next(), Token::into_string, "ipfsHash")?.into(),
            location: expect_token(it.next(), Token::into_string, "location")?,
            media_hash: expect_token(it.next(), Token::into_string, "mediaIpfsHash")?.into(),
            reporter: expect_token(it.next(), Token::into_address, "reporter")?,
            timestamp: expect_token(it.next(), Token::into_uint, "timestamp")?,
            resolved: expect_token(it.next(), Token::into_bool, "resolved")?,
            resolved_by: expect_token(it.next(), Token::into_address, "resolvedBy")?,
            resolution_hash: expect_token(it.next(), Token::into_string, "resolutionIpfsHash")?.into(),
        })
    }

    async fn get_report_ids_by_user(&self, user: Address) -> Result<Vec<ReportId>, ContractError> {
        let token = self
            .call_one(
                selector::GET_REPORT_IDS_BY_USER,
                &[Token::Address(user)],
                ParamType::UintArray,
            )
            .await?;
        expect_token(Some(token), Token::into_uint_array, "uint256[]")
    }

    async fn report_crime(
        &self,
        content_hash: &ContentHash,
        location: &str,
        media_hash: &ContentHash,
    ) -> Result<Box<dyn PendingTransaction>, ContractError> {
        self.send(
            selector::REPORT_CRIME,
            &[
                Token::String(content_hash.to_string()),
                Token::String(location.to_string()),
                Token::String(media_hash.to_string()),
            ],
        )
        .await
    }

    async fn resolve_case(
        &self,
        id: ReportId,
        resolution_hash: &ContentHash,
    ) -> Result<Box<dyn PendingTransaction>, ContractError> {
        self.send(
            selector::RESOLVE_CASE,
            &[Token::Uint(id), Token::String(resolution_hash.to_string())],
        )
        .await
    }
}

#[async_trait]
impl AdminRegistry for RpcContract {
    async fn owner(&self) -> Result<Address, ContractError> {
        let token = self.call_one(selector::OWNER, &[], ParamType::Address).await?;
        expect_token(Some(token), Token::into_address, "address")
    }

    async fn is_admin(&self, address: Address) -> Result<bool, ContractError> {
        let token = self
            .call_one(selector::IS_ADMIN, &[Token::Address(address)], ParamType::Bool)
            .await?;
        expect_token(Some(token), Token::into_bool, "bool")
    }

    async fn add_admin(
        &self,
        address: Address,
        cid: &ContentHash,
    ) -> Result<Box<dyn PendingTransaction>, ContractError> {
        self.send(
            selector::ADD_ADMIN,
            &[Token::Address(address), Token::String(cid.to_string())],
        )
        .await
    }
}

#[async_trait]
impl UserRegistry for RpcContract {
    async fn is_registered_user(&self, address: Address) -> Result<bool, ContractError> {
        let token = self
            .call_one(
                selector::IS_REGISTERED_USER,
                &[Token::Address(address)],
                ParamType::Bool,
            )
            .await?;
        expect_token(Some(token), Token::into_bool, "bool")
    }

    async fn register_user(&self) -> Result<Box<dyn PendingTransaction>, ContractError> {
        self.send(selector::REGISTER_USER, &[]).await
    }

    async fn deregister_user(
        &self,
        address: Address,
    ) -> Result<Box<dyn PendingTransaction>, ContractError> {
        self.send(selector::DEREGISTER_USER, &[Token::Address(address)])
            .await
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReceiptJson {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    block_number: Option<String>,
}

/// Transaction confirmed by polling for its receipt.
pub struct RpcPendingTransaction {
    transport: Arc<RpcTransport>,
    hash: TxHash,
    poll_interval: Duration,
}

#[async_trait]
impl PendingTransaction for RpcPendingTransaction {
    fn hash(&self) -> TxHash {
        self.hash
    }

    async fn wait(&self) -> Result<TxReceipt, ContractError> {
        loop {
            let receipt: Option<ReceiptJson> = self
                .transport
                .request("eth_getTransactionReceipt", json!([self.hash]))
                .await?;

            if let Some(receipt) = receipt {
                let block_number = receipt.block_number.as_deref().and_then(parse_quantity);
                // Pre-byzantium receipts carry no status; treat them as success.
                if receipt.status.as_deref().and_then(parse_quantity) == Some(0) {
                    return Err(ContractError::Reverted(self.hash));
                }
                debug!(tx = %self.hash, block = ?block_number, "Transaction confirmed");
                return Ok(TxReceipt {
                    hash: self.hash,
                    block_number,
                });
            }

            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const TX: &str = "0x1111111111111111111111111111111111111111111111111111111111111111";

    fn ok(result: serde_json::Value) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({ "jsonrpc": "2.0", "id": 1, "result": result }))
    }

    async fn bound(server: &MockServer) -> ContractSet {
        let transport = Arc::new(RpcTransport::new(server.uri(), Duration::from_secs(5)).unwrap());
        let binder = RpcBinder::new(transport, Duration::from_millis(10));
        let addresses = ContractAddresses {
            admin_manager: Address::from_low_u64(1),
            user_manager: Address::from_low_u64(2),
            crime_report: Address::from_low_u64(3),
        };
        binder
            .bind(&addresses, &Signer::new(Address::from_low_u64(0xAA)))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_owner_call() {
        let server = MockServer::start().await;
        let owner = Address::from_low_u64(0x0123);
        let encoded = to_hex_data(&abi::encode(&[Token::Address(owner)]));

        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "method": "eth_call" })))
            .respond_with(ok(json!(encoded)))
            .mount(&server)
            .await;

        let contracts = bound(&server).await;
        assert_eq!(contracts.admin_manager.owner().await.unwrap(), owner);
    }

    #[tokio::test]
    async fn test_get_report_decodes_record() {
        let server = MockServer::start().await;
        let reporter = Address::from_low_u64(0xAA);
        let encoded = to_hex_data(&abi::encode(&[
            Token::String("QmContent".into()),
            Token::String("Main St".into()),
            Token::String("".into()),
            Token::Address(reporter),
            Token::Uint(1_700_000_000),
            Token::Bool(false),
            Token::Address(Address::ZERO),
            Token::String("".into()),
        ]));

        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "method": "eth_call" })))
            .respond_with(ok(json!(encoded)))
            .mount(&server)
            .await;

        let contracts = bound(&server).await;
        let report = contracts.crime_report.get_report(0).await.unwrap();
        assert_eq!(report.content_hash.as_str(), "QmContent");
        assert_eq!(report.location, "Main St");
        assert!(report.media_hash.is_empty());
        assert_eq!(report.reporter, reporter);
        assert_eq!(report.timestamp, 1_700_000_000);
        assert!(!report.resolved);
        assert!(report.resolved_by.is_zero());
    }

    #[tokio::test]
    async fn test_report_ids_by_user() {
        let server = MockServer::start().await;
        let encoded = to_hex_data(&abi::encode(&[Token::UintArray(vec![0, 3, 9])]));

        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "method": "eth_call" })))
            .respond_with(ok(json!(encoded)))
            .mount(&server)
            .await;

        let contracts = bound(&server).await;
        let ids = contracts
            .crime_report
            .get_report_ids_by_user(Address::from_low_u64(0xAA))
            .await
            .unwrap();
        assert_eq!(ids, vec![0, 3, 9]);
    }

    #[tokio::test]
    async fn test_get_report_decodes_struct_return() {
        let server = MockServer::start().await;
        let reporter = Address::from_low_u64(0xAB);
        let mut wrapped = vec![0u8; 31];
        wrapped.push(32);
        wrapped.extend(abi::encode(&[
            Token::String("QmContent".into()),
            Token::String("Elm St".into()),
            Token::String("QmMedia".into()),
            Token::Address(reporter),
            Token::Uint(1_700_000_012),
            Token::Bool(true),
            Token::Address(Address::from_low_u64(1)),
            Token::String("QmResolution".into()),
        ]));

        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "method": "eth_call" })))
            .respond_with(ok(json!(to_hex_data(&wrapped))))
            .mount(&server)
            .await;

        let contracts = bound(&server).await;
        let report = contracts.crime_report.get_report(1).await.unwrap();
        assert_eq!(report.location, "Elm St");
        assert_eq!(report.media_hash.as_str(), "QmMedia");
        assert!(report.resolved);
        assert_eq!(report.resolved_by, Address::from_low_u64(1));
        assert_eq!(report.resolution_hash.as_str(), "QmResolution");
    }

    #[tokio::test]
    async fn test_send_then_wait_for_receipt() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "method": "eth_sendTransaction" })))
            .respond_with(ok(json!(TX)))
            .mount(&server)
            .await;

        // First poll: still pending.
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "method": "eth_getTransactionReceipt" })))
            .respond_with(ok(serde_json::Value::Null))
            .up_to_n_times(1)
            .with_priority(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "method": "eth_getTransactionReceipt" })))
            .respond_with(ok(json!({ "status": "0x1", "blockNumber": "0x10" })))
            .mount(&server)
            .await;

        let contracts = bound(&server).await;
        let pending = contracts.user_manager.register_user().await.unwrap();
        assert_eq!(pending.hash().to_string(), TX);

        let receipt = pending.wait().await.unwrap();
        assert_eq!(receipt.block_number, Some(16));
    }

    #[tokio::test]
    async fn test_reverted_receipt() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "method": "eth_sendTransaction" })))
            .respond_with(ok(json!(TX)))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "method": "eth_getTransactionReceipt" })))
            .respond_with(ok(json!({ "status": "0x0", "blockNumber": "0x10" })))
            .mount(&server)
            .await;

        let contracts = bound(&server).await;
        let pending = contracts
            .crime_report
            .resolve_case(0, &ContentHash::from("QmResolution"))
            .await
            .unwrap();
        assert!(matches!(pending.wait().await, Err(ContractError::Reverted(_))));
    }

    #[tokio::test]
    async fn test_execution_revert_is_classified() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0",
                "id": 1,
                "error": { "code": 3, "message": "execution reverted: Not an admin" }
            })))
            .mount(&server)
            .await;

        let contracts = bound(&server).await;
        let err = contracts
            .crime_report
            .resolve_case(0, &ContentHash::from("Qm"))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, ContractError::ExecutionReverted(_)));
    }
}
