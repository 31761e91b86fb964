//! Admin dashboard listing.

use serde::Serialize;
use tracing::{info, warn};

use crate::client::ReportClient;
use crate::error::Result;
use crate::report::Report;

pub const NO_DESCRIPTION: &str = "No description available";
pub const NO_LOCATION: &str = "Location not specified";

/// All reports, split by status. Both buckets keep id order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Dashboard {
    pub resolved: Vec<Report>,
    pub unresolved: Vec<Report>,
    /// Ids that could not be loaded
    pub skipped: Vec<u64>,
}

impl Dashboard {
    /// Bucket already-loaded reports.
    pub fn from_reports(reports: impl IntoIterator<Item = Report>) -> Self {
        let (resolved, unresolved): (Vec<Report>, Vec<Report>) =
            reports.into_iter().partition(|r| r.resolved);
        Self {
            resolved,
            unresolved,
            skipped: Vec::new(),
        }
    }

    pub fn total(&self) -> usize {
        self.resolved.len() + self.unresolved.len()
    }

    /// Case-insensitive match on description, location or name.
    pub fn search<'a>(reports: &'a [Report], term: &str) -> Vec<&'a Report> {
        let term = term.trim().to_lowercase();
        if term.is_empty() {
            return reports.iter().collect();
        }
        reports
            .iter()
            .filter(|r| {
                [&r.description, &r.location, &r.name]
                    .iter()
                    .any(|field| field.to_lowercase().contains(&term))
            })
            .collect()
    }
}

/// Load every report on the ledger, one at a time. Reports that fail to
/// load are skipped.
pub async fn load_dashboard(client: &ReportClient) -> Result<Dashboard> {
    let count = client.get_report_count().await?;

    let mut dashboard = Dashboard::default();
    for id in 0..count {
        match client.get_report(id).await {
            Ok(report) if report.resolved => dashboard.resolved.push(report),
            Ok(report) => dashboard.unresolved.push(report),
            Err(e) => {
                warn!(report_id = id, error = %e, "Skipping report");
                dashboard.skipped.push(id);
            }
        }
    }

    info!(
        count,
        resolved = dashboard.resolved.len(),
        unresolved = dashboard.unresolved.len(),
        skipped = dashboard.skipped.len(),
        "Dashboard loaded"
    );
    Ok(dashboard)
}

/// Description, or a placeholder when empty.
pub fn display_description(report: &Report) -> &str {
    non_empty_or(&report.description, NO_DESCRIPTION)
}

/// Location, or a placeholder when empty.
pub fn display_location(report: &Report) -> &str {
    non_empty_or(&report.location, NO_LOCATION)
}

fn non_empty_or<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.trim().is_empty() {
        fallback
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::OnChainReport;
    use crate::report::{ReportDetails, ANONYMOUS_NAME};
    use crate::types::{Address, ContentHash};

    fn report(id: u64, resolved: bool, description: &str, location: &str) -> Report {
        Report::assemble(
            id,
            OnChainReport {
                content_hash: ContentHash::new(format!("Qm{}", id)),
                location: location.to_string(),
                media_hash: ContentHash::empty(),
                reporter: Address::from_low_u64(5),
                timestamp: 0,
                resolved,
                resolved_by: Address::ZERO,
                resolution_hash: ContentHash::empty(),
            },
            ReportDetails::new("Sam", description, false),
            String::new(),
            String::new(),
        )
    }

    #[test]
    fn test_buckets_keep_order() {
        let dashboard = Dashboard::from_reports(vec![
            report(0, false, "a", ""),
            report(1, true, "b", ""),
            report(2, false, "c", ""),
        ]);
        let ids: Vec<_> = dashboard.unresolved.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![0, 2]);
        assert_eq!(dashboard.resolved[0].id, 1);
        assert_eq!(dashboard.total(), 3);
    }

    #[test]
    fn test_search_is_case_insensitive() {
        let reports = vec![
            report(0, false, "Broken window", "Elm Street"),
            report(1, false, "Stolen bike", "Market Square"),
        ];
        let hits = Dashboard::search(&reports, "ELM");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, 0);

        assert_eq!(Dashboard::search(&reports, "sam").len(), 2);
        assert_eq!(Dashboard::search(&reports, "  ").len(), 2);
        assert!(Dashboard::search(&reports, "arson").is_empty());
    }

    #[test]
    fn test_display_fallbacks() {
        let mut r = report(0, false, "", "");
        r.name.clear();
        assert_eq!(display_description(&r), NO_DESCRIPTION);
        assert_eq!(display_location(&r), NO_LOCATION);
        assert_eq!(r.display_name(), ANONYMOUS_NAME);
    }
}
