//! Off-chain content storage.
//!
//! - Pinata pinning service for uploads
//! - HTTP gateway for reads
//! - Bounded retry around uploads

pub mod gateway;
pub mod pinata;
pub mod traits;
pub mod upload;

pub use gateway::{HttpGateway, DEFAULT_GATEWAY_URL};
pub use pinata::{PinataConfig, PinataStore, DEFAULT_PINATA_API_URL};
pub use traits::{ContentGateway, ContentStore, PinKind, StorageError};
pub use upload::{upload_with_retry, UploadError, DEFAULT_UPLOAD_ATTEMPTS};
