//! Bounded upload retry.
//!
//! Uploads are the one call where transient failure is expected: each upload
//! gets a fixed number of immediate attempts; the first success wins.

use tracing::{debug, warn};

use super::traits::{ContentStore, PinKind, StorageError};
use crate::types::ContentHash;

/// Default number of upload attempts.
pub const DEFAULT_UPLOAD_ATTEMPTS: u32 = 3;

/// All upload attempts failed.
#[derive(Debug, thiserror::Error)]
#[error("IPFS upload failed after {attempts} attempt(s): {last}")]
pub struct UploadError {
    pub attempts: u32,
    #[source]
    pub last: StorageError,
}

/// Pin `data`, retrying up to `attempts` times with no delay in between.
pub async fn upload_with_retry(
    store: &dyn ContentStore,
    data: &[u8],
    kind: PinKind,
    attempts: u32,
) -> Result<ContentHash, UploadError> {
    let attempts = attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;
        match store.pin(data, kind).await {
            Ok(hash) => {
                debug!(%hash, attempt, size = data.len(), "Uploaded to IPFS");
                return Ok(hash);
            }
            Err(e) => {
                warn!(attempt, error = %e, "IPFS upload attempt failed");
                if attempt >= attempts {
                    return Err(UploadError { attempts, last: e });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockStore;

    #[tokio::test]
    async fn test_recovers_on_third_attempt() {
        let store = MockStore::new().failing_next(2);
        let hash = upload_with_retry(&store, b"evidence", PinKind::Media, 3)
            .await
            .unwrap();
        assert!(!hash.is_empty());
        assert_eq!(store.pin_attempts(), 3);
        assert_eq!(store.pinned_count(), 1);
    }

    #[tokio::test]
    async fn test_gives_up_after_limit() {
        let store = MockStore::new().failing_next(3);
        let err = upload_with_retry(&store, b"evidence", PinKind::Media, 3)
            .await
            .unwrap_err();
        assert_eq!(err.attempts, 3);
        assert_eq!(store.pin_attempts(), 3);
        assert_eq!(store.pinned_count(), 0);
    }

    #[tokio::test]
    async fn test_first_success_short_circuits() {
        let store = MockStore::new();
        upload_with_retry(&store, b"x", PinKind::Text, 3).await.unwrap();
        assert_eq!(store.pin_attempts(), 1);
    }
}
