//! Client configuration.
//!
//! Contract addresses and pinning credentials come from the process
//! environment. A missing contract address is not a configuration error
//! here; it makes [`crate::ReportClient::initialize`] fail closed instead.

use serde::{Deserialize, Serialize};

use crate::contracts::ContractAddresses;
use crate::storage::{PinataConfig, DEFAULT_GATEWAY_URL, DEFAULT_UPLOAD_ATTEMPTS};
use crate::types::{Address, HexParseError};

pub const ENV_ADMIN_MANAGER_ADDRESS: &str = "ADMIN_MANAGER_ADDRESS";
pub const ENV_USER_MANAGER_ADDRESS: &str = "USER_MANAGER_ADDRESS";
pub const ENV_CRIME_REPORT_ADDRESS: &str = "CRIME_REPORT_ADDRESS";
pub const ENV_PINATA_API_KEY: &str = "PINATA_API_KEY";
pub const ENV_PINATA_SECRET_API_KEY: &str = "PINATA_SECRET_API_KEY";
pub const ENV_PINATA_API_URL: &str = "PINATA_API_URL";
pub const ENV_IPFS_GATEWAY_URL: &str = "IPFS_GATEWAY_URL";
pub const ENV_RPC_URL: &str = "RPC_URL";
pub const ENV_UPLOAD_ATTEMPTS: &str = "UPLOAD_ATTEMPTS";

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} is not a valid address ({value}): {source}")]
    InvalidAddress {
        var: &'static str,
        value: String,
        #[source]
        source: HexParseError,
    },

    #[error("{var} is not a valid number: {value}")]
    InvalidNumber { var: &'static str, value: String },
}

/// Configuration for [`crate::ReportClient`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// `AdminManager` contract address
    #[serde(default)]
    pub admin_manager_address: Option<Address>,

    /// `UserManager` contract address
    #[serde(default)]
    pub user_manager_address: Option<Address>,

    /// `CrimeReport` contract address
    #[serde(default)]
    pub crime_report_address: Option<Address>,

    /// Pinning service credentials
    #[serde(default)]
    pub pinata: PinataConfig,

    /// Public gateway used to read content back
    #[serde(default = "default_gateway_url")]
    pub gateway_url: String,

    /// Wallet provider JSON-RPC endpoint; no endpoint means no wallet
    #[serde(default)]
    pub rpc_url: Option<String>,

    /// Attempts per content upload
    #[serde(default = "default_upload_attempts")]
    pub upload_attempts: u32,

    /// Interval between receipt polls while waiting for confirmation
    #[serde(default = "default_receipt_poll_interval")]
    pub receipt_poll_interval_ms: u64,

    /// Interval between account polls when following wallet account changes
    #[serde(default = "default_account_poll_interval")]
    pub account_poll_interval_ms: u64,

    /// HTTP request timeout
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_gateway_url() -> String {
    DEFAULT_GATEWAY_URL.to_string()
}
fn default_upload_attempts() -> u32 {
    DEFAULT_UPLOAD_ATTEMPTS
}
fn default_receipt_poll_interval() -> u64 {
    1_000
}
fn default_account_poll_interval() -> u64 {
    2_000
}
fn default_request_timeout() -> u64 {
    30
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            admin_manager_address: None,
            user_manager_address: None,
            crime_report_address: None,
            pinata: PinataConfig::default(),
            gateway_url: default_gateway_url(),
            rpc_url: None,
            upload_attempts: default_upload_attempts(),
            receipt_poll_interval_ms: default_receipt_poll_interval(),
            account_poll_interval_ms: default_account_poll_interval(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl ClientConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup; unset and blank values fall back
    /// to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let address = |var: &'static str| -> Result<Option<Address>, ConfigError> {
            get(var)
                .map(|value| {
                    value.parse::<Address>().map_err(|source| ConfigError::InvalidAddress {
                        var,
                        value: value.clone(),
                        source,
                    })
                })
                .transpose()
        };

        let mut config = Self {
            admin_manager_address: address(ENV_ADMIN_MANAGER_ADDRESS)?,
            user_manager_address: address(ENV_USER_MANAGER_ADDRESS)?,
            crime_report_address: address(ENV_CRIME_REPORT_ADDRESS)?,
            rpc_url: get(ENV_RPC_URL),
            ..Default::default()
        };

        if let Some(key) = get(ENV_PINATA_API_KEY) {
            config.pinata.api_key = key;
        }
        if let Some(secret) = get(ENV_PINATA_SECRET_API_KEY) {
            config.pinata.secret_api_key = secret;
        }
        if let Some(url) = get(ENV_PINATA_API_URL) {
            config.pinata.api_url = url;
        }
        if let Some(url) = get(ENV_IPFS_GATEWAY_URL) {
            config.gateway_url = url;
        }
        if let Some(value) = get(ENV_UPLOAD_ATTEMPTS) {
            config.upload_attempts = value
                .parse::<u32>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or(ConfigError::InvalidNumber {
                    var: ENV_UPLOAD_ATTEMPTS,
                    value,
                })?;
        }

        Ok(config)
    }

    /// All three contract addresses, or the name of the first missing one.
    pub fn contract_addresses(&self) -> Result<ContractAddresses, &'static str> {
        Ok(ContractAddresses {
            admin_manager: self
                .admin_manager_address
                .ok_or(ENV_ADMIN_MANAGER_ADDRESS)?,
            user_manager: self.user_manager_address.ok_or(ENV_USER_MANAGER_ADDRESS)?,
            crime_report: self.crime_report_address.ok_or(ENV_CRIME_REPORT_ADDRESS)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_environment_is_empty() {
        let config = ClientConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.upload_attempts, 3);
        assert_eq!(config.gateway_url, "https://gateway.pinata.cloud");
        assert!(config.rpc_url.is_none());
        assert_eq!(config.contract_addresses(), Err(ENV_ADMIN_MANAGER_ADDRESS));
    }

    #[test]
    fn test_full_environment() {
        let config = ClientConfig::from_lookup(lookup(&[
            (ENV_ADMIN_MANAGER_ADDRESS, "0x00000000000000000000000000000000000000a1"),
            (ENV_USER_MANAGER_ADDRESS, "0x00000000000000000000000000000000000000a2"),
            (ENV_CRIME_REPORT_ADDRESS, "0x00000000000000000000000000000000000000A3"),
            (ENV_PINATA_API_KEY, "key"),
            (ENV_PINATA_SECRET_API_KEY, "secret"),
            (ENV_RPC_URL, "http://localhost:8545"),
            (ENV_UPLOAD_ATTEMPTS, "5"),
        ]))
        .unwrap();

        let addresses = config.contract_addresses().unwrap();
        assert_eq!(addresses.crime_report, Address::from_low_u64(0xa3));
        assert_eq!(config.pinata.api_key, "key");
        assert_eq!(config.pinata.secret_api_key, "secret");
        assert_eq!(config.rpc_url.as_deref(), Some("http://localhost:8545"));
        assert_eq!(config.upload_attempts, 5);
    }

    #[test]
    fn test_missing_single_address_is_named() {
        let config = ClientConfig::from_lookup(lookup(&[
            (ENV_ADMIN_MANAGER_ADDRESS, "0x00000000000000000000000000000000000000a1"),
            (ENV_USER_MANAGER_ADDRESS, "0x00000000000000000000000000000000000000a2"),
            (ENV_CRIME_REPORT_ADDRESS, "   "),
        ]))
        .unwrap();
        assert_eq!(config.contract_addresses(), Err(ENV_CRIME_REPORT_ADDRESS));
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let err = ClientConfig::from_lookup(lookup(&[(ENV_USER_MANAGER_ADDRESS, "0x1234")]))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidAddress { var: ENV_USER_MANAGER_ADDRESS, .. }
        ));

        let err = ClientConfig::from_lookup(lookup(&[(ENV_UPLOAD_ATTEMPTS, "0")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidNumber { .. }));
    }
}
