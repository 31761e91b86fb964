//! Report documents and the merged report view.

use chrono::DateTime;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::contracts::OnChainReport;
use crate::types::{Address, ContentHash, ReportId};

/// Name stored for anonymous reports.
pub const ANONYMOUS_NAME: &str = "Anonymous";

/// Off-chain companion document pinned alongside each report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportDetails {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub is_anonymous: bool,
}

impl ReportDetails {
    /// Build the document; anonymous reports never carry the reporter's name.
    pub fn new(name: &str, description: &str, is_anonymous: bool) -> Self {
        Self {
            name: if is_anonymous {
                ANONYMOUS_NAME.to_string()
            } else {
                name.to_string()
            },
            description: description.to_string(),
            is_anonymous,
        }
    }
}

/// Evidence attached to a report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Media {
    pub file_name: Option<String>,
    pub bytes: Vec<u8>,
}

impl Media {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            file_name: None,
            bytes,
        }
    }

    /// Read evidence from disk.
    pub async fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        Ok(Self {
            file_name: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned()),
            bytes,
        })
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Render an on-chain epoch-seconds timestamp for display.
pub fn format_timestamp(secs: u64) -> String {
    i64::try_from(secs)
        .ok()
        .and_then(|s| DateTime::from_timestamp(s, 0))
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| secs.to_string())
}

/// Lifecycle state of a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportStatus {
    Pending,
    Resolved,
}

/// A report: on-chain fields merged with its off-chain document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: ReportId,
    #[serde(rename = "ipfsHash")]
    pub content_hash: ContentHash,
    pub location: String,
    #[serde(rename = "mediaIpfsHash")]
    pub media_hash: ContentHash,
    pub reporter: Address,
    /// Human-readable creation time
    pub timestamp: String,
    /// Creation time in seconds since the epoch
    pub created_at: u64,
    pub resolved: bool,
    pub resolved_by: Option<Address>,
    #[serde(rename = "resolutionIpfsHash")]
    pub resolution_hash: ContentHash,
    pub resolution_details: String,
    pub name: String,
    pub description: String,
    pub is_anonymous: bool,
    /// Gateway URL of the evidence; empty when none is attached
    pub media_url: String,
}

impl Report {
    pub fn assemble(
        id: ReportId,
        on_chain: OnChainReport,
        details: ReportDetails,
        media_url: String,
        resolution_details: String,
    ) -> Self {
        let resolved_by = (on_chain.resolved && !on_chain.resolved_by.is_zero())
            .then_some(on_chain.resolved_by);

        Self {
            id,
            content_hash: on_chain.content_hash,
            location: on_chain.location,
            media_hash: on_chain.media_hash,
            reporter: on_chain.reporter,
            timestamp: format_timestamp(on_chain.timestamp),
            created_at: on_chain.timestamp,
            resolved: on_chain.resolved,
            resolved_by,
            resolution_hash: on_chain.resolution_hash,
            resolution_details,
            name: details.name,
            description: details.description,
            is_anonymous: details.is_anonymous,
            media_url,
        }
    }

    pub fn status(&self) -> ReportStatus {
        if self.resolved {
            ReportStatus::Resolved
        } else {
            ReportStatus::Pending
        }
    }

    pub fn has_media(&self) -> bool {
        !self.media_url.is_empty()
    }

    /// Name to show for the reporter.
    pub fn display_name(&self) -> &str {
        if self.is_anonymous || self.name.trim().is_empty() {
            ANONYMOUS_NAME
        } else {
            &self.name
        }
    }
}
