//! Crime Report - client for an on-chain crime reporting system
//!
//! Reports are recorded on a ledger contract; their content lives in IPFS
//! and only content hashes go on chain. This crate provides:
//! - A connection to a wallet-injected provider, bound to the selected account
//! - Identity checks and actions against the admin and user registries
//! - Report submission, reconstruction, listing and resolution
//! - Pinata uploads with bounded retry, gateway reads
//! - An in-memory devnet for tests and local use
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │              ReportClient               │
//! │   (auth, dashboard, submission flows)   │
//! └────────────────┬────────────────────────┘
//!                  │
//!      ┌───────────┼────────────────┐
//!      ▼           ▼                ▼
//! ┌──────────┐ ┌───────────────┐ ┌──────────────┐
//! │ Wallet   │ │ Contracts     │ │ ContentStore │
//! │ Bridge   │ │ Admin / User  │ │ + Gateway    │
//! │          │ │ / Ledger      │ │ (Pinata/IPFS)│
//! └──────────┘ └───────────────┘ └──────────────┘
//! ```

pub mod abi;
pub mod auth;
pub mod client;
pub mod config;
pub mod connection;
pub mod contracts;
pub mod dashboard;
pub mod error;
pub mod mock;
pub mod report;
pub mod rpc;
pub mod storage;
pub mod submission;
pub mod types;
pub mod wallet;

// Re-export main types for convenience
pub use auth::{authenticate, AuthError, AuthIntent, AuthOutcome};
pub use client::{IpfsStatus, ReportClient, IPFS_TEST_PAYLOAD};
pub use config::{ClientConfig, ConfigError};
pub use connection::Connection;
pub use dashboard::{load_dashboard, Dashboard};
pub use error::{ActionError, ClientError, InitError, Result};
pub use report::{Media, Report, ReportDetails, ReportStatus, ANONYMOUS_NAME};
pub use submission::{submit_report, DraftError, ReportDraft, MAX_MEDIA_BYTES};
pub use types::{Address, ContentHash, ReportId, TxHash};
