//! Report submission with input validation.

use thiserror::Error;

use crate::client::{IpfsStatus, ReportClient};
use crate::error::ClientError;
use crate::report::Media;
use crate::types::TxHash;

/// Largest evidence file accepted, in bytes.
pub const MAX_MEDIA_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum DraftError {
    #[error("Description is required")]
    MissingDescription,

    #[error("Name is required unless reporting anonymously")]
    MissingName,

    #[error("Media file is too large ({size} bytes, max {max})")]
    MediaTooLarge { size: usize, max: usize },

    #[error("IPFS is not available: {0}")]
    StorageUnavailable(String),

    #[error("IPFS status has not been checked")]
    StorageUnchecked,

    #[error(transparent)]
    Submit(#[from] ClientError),
}

/// A report as entered by the user, before submission.
#[derive(Debug, Clone, Default)]
pub struct ReportDraft {
    pub name: String,
    pub description: String,
    pub location: String,
    pub is_anonymous: bool,
    pub media: Option<Media>,
}

impl ReportDraft {
    pub fn validate(&self, status: &IpfsStatus) -> Result<(), DraftError> {
        if self.description.trim().is_empty() {
            return Err(DraftError::MissingDescription);
        }
        if !self.is_anonymous && self.name.trim().is_empty() {
            return Err(DraftError::MissingName);
        }
        if let Some(media) = &self.media {
            if media.len() > MAX_MEDIA_BYTES {
                return Err(DraftError::MediaTooLarge {
                    size: media.len(),
                    max: MAX_MEDIA_BYTES,
                });
            }
        }
        if let IpfsStatus::Error { message } = status {
            return Err(DraftError::StorageUnavailable(message.clone()));
        }
        Ok(())
    }
}

/// Validate `draft` against the last storage health result, then submit it.
pub async fn submit_report(
    client: &ReportClient,
    draft: &ReportDraft,
    status: Option<&IpfsStatus>,
) -> Result<TxHash, DraftError> {
    let status = status.ok_or(DraftError::StorageUnchecked)?;
    draft.validate(status)?;

    let tx = client
        .report_crime(
            &draft.name,
            &draft.description,
            &draft.location,
            draft.is_anonymous,
            draft.media.as_ref(),
        )
        .await?;
    Ok(tx)
}
