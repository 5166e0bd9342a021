//! Catalog reconciliation
//!
//! Replaces the whole remote catalog with the canonical set in two phases:
//!
//! 1. Delete everything. A single bulk `DELETE /jobs` is tried first; when the
//!    server does not offer it, every listing is enumerated and deleted one by
//!    one.
//! 2. Create every canonical listing, in order.
//!
//! Neither phase stops on a single item's failure. Calls are paced with fixed
//! delays to bound the request rate.

use reqwest::StatusCode;
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use tokio::time::sleep;

use crate::models::listing::{CreatedListing, DeleteMessage, ListingId, ListingRef};
use crate::services::catalog::CanonicalCatalog;
use crate::services::gateway::{ApiError, ApiGateway};

/// Delays between consecutive calls of the same kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    pub delete_interval: Duration,
    pub create_interval: Duration,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            delete_interval: Duration::from_millis(500),
            create_interval: Duration::from_millis(300),
        }
    }
}

impl Pacing {
    /// No waiting at all.
    pub fn none() -> Self {
        Self {
            delete_interval: Duration::ZERO,
            create_interval: Duration::ZERO,
        }
    }
}

/// How the delete phase emptied the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeletePath {
    /// Bulk delete accepted. The count is whatever the server's message
    /// claimed and is informational only.
    Bulk { reported: Option<u64> },
    /// Bulk delete unavailable; listings were deleted one at a time.
    Individual { bulk_failure: String },
}

/// A record the delete phase could not remove.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteFailure {
    pub listing_id: Option<ListingId>,
    pub title: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteSummary {
    pub path: DeletePath,
    /// Listings removed by individual deletes.
    pub deleted: usize,
    /// Listings that were already gone (404) when their delete arrived.
    pub already_gone: usize,
    pub failures: Vec<DeleteFailure>,
    pub calls: usize,
}

impl DeleteSummary {
    fn bulk(reported: Option<u64>) -> Self {
        Self {
            path: DeletePath::Bulk { reported },
            deleted: 0,
            already_gone: 0,
            failures: Vec::new(),
            calls: 1,
        }
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Listings removed, as best known. `None` when the bulk response carried
    /// no count.
    pub fn removed(&self) -> Option<u64> {
        match &self.path {
            DeletePath::Bulk { reported } => *reported,
            DeletePath::Individual { .. } => Some(self.deleted as u64),
        }
    }
}

/// Result of submitting one canonical listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListingOutcome {
    Created {
        title: String,
        /// Missing only when the server's `201` body lacked `job.id`.
        id: Option<ListingId>,
    },
    Rejected {
        title: String,
        reason: String,
    },
}

impl ListingOutcome {
    pub fn title(&self) -> &str {
        match self {
            ListingOutcome::Created { title, .. } | ListingOutcome::Rejected { title, .. } => title,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, ListingOutcome::Created { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciliationOutcome {
    pub delete: DeleteSummary,
    pub listings: Vec<ListingOutcome>,
    pub calls: usize,
}

impl ReconciliationOutcome {
    pub fn succeeded(&self) -> usize {
        self.listings.iter().filter(|o| o.is_created()).count()
    }

    pub fn failed(&self) -> usize {
        self.listings.len() - self.succeeded()
    }

    pub fn created_ids(&self) -> Vec<ListingId> {
        self.listings
            .iter()
            .filter_map(|o| match o {
                ListingOutcome::Created { id, .. } => *id,
                ListingOutcome::Rejected { .. } => None,
            })
            .collect()
    }
}

impl fmt::Display for ReconciliationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.delete.path {
            DeletePath::Bulk { reported: Some(n) } => {
                writeln!(f, "Delete phase: bulk delete removed {} listing(s)", n)?
            }
            DeletePath::Bulk { reported: None } => {
                writeln!(f, "Delete phase: bulk delete accepted")?
            }
            DeletePath::Individual { bulk_failure } => writeln!(
                f,
                "Delete phase: bulk delete unavailable ({}); deleted {}, already gone {}, failed {}",
                bulk_failure,
                self.delete.deleted,
                self.delete.already_gone,
                self.delete.failures.len()
            )?,
        }
        for failure in &self.delete.failures {
            match failure.listing_id {
                Some(id) => writeln!(f, "  ✗ listing {} ('{}'): {}", id, failure.title, failure.reason)?,
                None => writeln!(f, "  ✗ '{}': {}", failure.title, failure.reason)?,
            }
        }

        let total = self.listings.len();
        writeln!(f, "Create phase: {} listing(s)", total)?;
        for (i, outcome) in self.listings.iter().enumerate() {
            match outcome {
                ListingOutcome::Created { title, id } => {
                    let id = id.map_or_else(|| "unknown".to_string(), |id| id.to_string());
                    writeln!(f, "  ✓ {}/{} '{}' created (ID: {})", i + 1, total, title, id)?
                }
                ListingOutcome::Rejected { title, reason } => {
                    writeln!(f, "  ✗ {}/{} '{}' failed: {}", i + 1, total, title, reason)?
                }
            }
        }
        write!(
            f,
            "Summary: {} successful, {} failed, {} call(s)",
            self.succeeded(),
            self.failed(),
            self.calls
        )
    }
}

/// Runs the delete-then-create workflow against one gateway.
pub struct CatalogReconciler<'a> {
    gateway: &'a ApiGateway,
    pacing: Pacing,
}

impl<'a> CatalogReconciler<'a> {
    pub fn new(gateway: &'a ApiGateway, pacing: Pacing) -> Self {
        Self { gateway, pacing }
    }

    /// Empty the remote catalog, then submit every canonical listing.
    pub async fn reconcile(&self, catalog: &CanonicalCatalog) -> ReconciliationOutcome {
        tracing::info!(
            api = %self.gateway.base_url(),
            listings = catalog.len(),
            "Starting catalog reconciliation"
        );

        let delete = self.delete_all().await;
        let (listings, create_calls) = self.create_all(catalog).await;
        let calls = delete.calls + create_calls;

        let outcome = ReconciliationOutcome {
            delete,
            listings,
            calls,
        };

        tracing::info!(
            succeeded = outcome.succeeded(),
            failed = outcome.failed(),
            calls = outcome.calls,
            "Catalog reconciliation complete"
        );
        outcome
    }

    /// Phase 1: bulk delete, falling back to one delete per listing.
    pub async fn delete_all(&self) -> DeleteSummary {
        let bulk_failure = match self.gateway.bulk_delete_listings().await {
            Ok(response) if response.status == StatusCode::OK => {
                let message = response
                    .parse::<DeleteMessage>()
                    .ok()
                    .and_then(|m| m.message);
                let reported = message.as_deref().and_then(parse_deleted_count);
                tracing::info!(server_message = ?message, reported = ?reported, "Bulk delete accepted");
                return DeleteSummary::bulk(reported);
            }
            Ok(response) => response.describe(),
            Err(e) => e.to_string(),
        };

        tracing::warn!(reason = %bulk_failure, "Bulk delete unavailable, deleting individually");
        self.delete_individually(bulk_failure).await
    }

    async fn delete_individually(&self, bulk_failure: String) -> DeleteSummary {
        let mut summary = DeleteSummary {
            path: DeletePath::Individual { bulk_failure },
            deleted: 0,
            already_gone: 0,
            failures: Vec::new(),
            // The bulk attempt counts as a call.
            calls: 1,
        };

        summary.calls += 1;
        let listings = match self.fetch_listings().await {
            Ok(listings) => listings,
            Err(e) => {
                tracing::error!(error = %e, "Could not enumerate listings for deletion");
                summary.failures.push(DeleteFailure {
                    listing_id: None,
                    title: "GET /jobs".to_string(),
                    reason: e.to_string(),
                });
                return summary;
            }
        };

        if listings.is_empty() {
            tracing::info!("No listings to delete");
            return summary;
        }
        tracing::info!(count = listings.len(), "Deleting listings individually");

        let mut first = true;
        for listing in &listings {
            let title = listing.label();
            let Some(id) = listing.id else {
                tracing::warn!(title = %title, "Listing has no identifier, cannot delete");
                summary.failures.push(DeleteFailure {
                    listing_id: None,
                    title,
                    reason: "listing has no identifier".to_string(),
                });
                continue;
            };

            if !first {
                pause(self.pacing.delete_interval).await;
            }
            first = false;

            summary.calls += 1;
            match self.gateway.delete_listing(id).await {
                Ok(response) if response.status == StatusCode::OK => {
                    tracing::info!(listing_id = id, title = %title, "Deleted listing");
                    summary.deleted += 1;
                }
                Ok(response) if response.status == StatusCode::NOT_FOUND => {
                    tracing::info!(listing_id = id, "Listing already deleted");
                    summary.already_gone += 1;
                }
                Ok(response) => {
                    tracing::warn!(
                        listing_id = id,
                        status = response.status.as_u16(),
                        "Failed to delete listing"
                    );
                    summary.failures.push(DeleteFailure {
                        listing_id: Some(id),
                        title,
                        reason: response.describe(),
                    });
                }
                Err(e) => {
                    tracing::warn!(listing_id = id, error = %e, "Error deleting listing");
                    summary.failures.push(DeleteFailure {
                        listing_id: Some(id),
                        title,
                        reason: e.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            deleted = summary.deleted,
            already_gone = summary.already_gone,
            failed = summary.failures.len(),
            "Individual deletion finished"
        );
        summary
    }

    /// Identifiers of every remote listing. Entries are read one by one, so a
    /// malformed field elsewhere in a record never hides its id.
    async fn fetch_listings(&self) -> Result<Vec<ListingRef>, ApiError> {
        let entries: Vec<Value> = self
            .gateway
            .list_listings()
            .await?
            .expect_status(StatusCode::OK)?
            .parse()?;
        Ok(entries.iter().map(ListingRef::from_value).collect())
    }

    /// Phase 2: submit each canonical listing; returns outcomes and call count.
    pub async fn create_all(&self, catalog: &CanonicalCatalog) -> (Vec<ListingOutcome>, usize) {
        let total = catalog.len();
        let mut outcomes = Vec::with_capacity(total);

        for (i, listing) in catalog.listings().iter().enumerate() {
            if i > 0 {
                pause(self.pacing.create_interval).await;
            }

            let title = listing.title.clone();
            let outcome = match self.gateway.create_listing(listing).await {
                Ok(response) if response.status == StatusCode::CREATED => {
                    let id = response.parse::<CreatedListing>().ok().and_then(|c| c.job.id);
                    tracing::info!(
                        position = i + 1,
                        total,
                        title = %title,
                        listing_id = ?id,
                        "Listing created"
                    );
                    ListingOutcome::Created { title, id }
                }
                Ok(response) => {
                    tracing::warn!(
                        position = i + 1,
                        total,
                        title = %title,
                        status = response.status.as_u16(),
                        "Listing rejected"
                    );
                    ListingOutcome::Rejected {
                        title,
                        reason: response.describe(),
                    }
                }
                Err(e) => {
                    tracing::warn!(position = i + 1, total, title = %title, error = %e, "Listing create failed");
                    ListingOutcome::Rejected {
                        title,
                        reason: e.to_string(),
                    }
                }
            };
            outcomes.push(outcome);
        }

        (outcomes, total)
    }
}

async fn pause(interval: Duration) {
    if !interval.is_zero() {
        sleep(interval).await;
    }
}

/// Leading count of a `"<count> jobs deleted"` message, if there is one.
pub fn parse_deleted_count(message: &str) -> Option<u64> {
    message.split_whitespace().next()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome_with(listings: Vec<ListingOutcome>) -> ReconciliationOutcome {
        ReconciliationOutcome {
            delete: DeleteSummary::bulk(Some(3)),
            calls: 1 + listings.len(),
            listings,
        }
    }

    #[test]
    fn test_parse_deleted_count() {
        assert_eq!(parse_deleted_count("12 jobs deleted"), Some(12));
        assert_eq!(parse_deleted_count("  0 jobs deleted"), Some(0));
        assert_eq!(parse_deleted_count("All jobs deleted"), None);
        assert_eq!(parse_deleted_count(""), None);
    }

    #[test]
    fn test_default_pacing() {
        let pacing = Pacing::default();
        assert_eq!(pacing.delete_interval, Duration::from_millis(500));
        assert_eq!(pacing.create_interval, Duration::from_millis(300));
    }

    #[test]
    fn test_counts() {
        let outcome = outcome_with(vec![
            ListingOutcome::Created {
                title: "A".to_string(),
                id: Some(1),
            },
            ListingOutcome::Rejected {
                title: "B".to_string(),
                reason: "500: boom".to_string(),
            },
            ListingOutcome::Created {
                title: "C".to_string(),
                id: None,
            },
        ]);

        assert_eq!(outcome.succeeded(), 2);
        assert_eq!(outcome.failed(), 1);
        assert_eq!(outcome.created_ids(), vec![1]);
    }

    #[test]
    fn test_removed_count() {
        assert_eq!(DeleteSummary::bulk(Some(4)).removed(), Some(4));
        assert_eq!(DeleteSummary::bulk(None).removed(), None);

        let individual = DeleteSummary {
            path: DeletePath::Individual {
                bulk_failure: "404".to_string(),
            },
            deleted: 2,
            already_gone: 1,
            failures: Vec::new(),
            calls: 5,
        };
        assert_eq!(individual.removed(), Some(2));
        assert!(individual.is_clean());
    }

    #[test]
    fn test_display_summary() {
        let outcome = outcome_with(vec![
            ListingOutcome::Created {
                title: "Sous Chef".to_string(),
                id: Some(21),
            },
            ListingOutcome::Rejected {
                title: "Line Cook".to_string(),
                reason: "400: missing role".to_string(),
            },
        ]);
        let text = outcome.to_string();

        assert!(text.contains("bulk delete removed 3 listing(s)"));
        assert!(text.contains("1/2 'Sous Chef' created (ID: 21)"));
        assert!(text.contains("2/2 'Line Cook' failed: 400: missing role"));
        assert!(text.ends_with("Summary: 1 successful, 1 failed, 3 call(s)"));
    }
}
