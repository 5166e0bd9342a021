//! Application retrieval
//!
//! Fetches submitted applications (all of them, or those for one listing),
//! keeps an untouched snapshot of each successful response on disk and
//! renders a readable report.

use chrono::Local;
use reqwest::StatusCode;
use std::path::PathBuf;

use crate::models::application::Application;
use crate::models::listing::ListingId;
use crate::services::gateway::{ApiError, ApiGateway};
use crate::services::snapshot::{SnapshotError, SnapshotStore};

/// Free-text fields longer than this are cut in the report.
pub const COVER_LETTER_PREVIEW: usize = 200;

const TRUNCATION_MARKER: &str = "...";

/// A successful fetch. `applications` may be empty.
#[derive(Debug, Clone)]
pub struct FetchedApplications {
    pub applications: Vec<Application>,
    pub listing_id: Option<ListingId>,
    pub snapshot: PathBuf,
}

#[derive(Debug, thiserror::Error)]
pub enum ApplicationsError {
    #[error("Fetching applications failed: {0}")]
    Fetch(#[from] ApiError),

    #[error("Applications fetched but snapshot could not be written: {0}")]
    Snapshot(#[from] SnapshotError),
}

pub struct ApplicationClient<'a> {
    gateway: &'a ApiGateway,
    snapshots: &'a SnapshotStore,
}

impl<'a> ApplicationClient<'a> {
    pub fn new(gateway: &'a ApiGateway, snapshots: &'a SnapshotStore) -> Self {
        Self { gateway, snapshots }
    }

    /// Every application the server holds.
    pub async fn fetch_all(&self) -> Result<FetchedApplications, ApplicationsError> {
        self.fetch(None).await
    }

    /// Applications for one listing, filtered by the server via `job_id`.
    pub async fn fetch_by_listing(
        &self,
        listing_id: ListingId,
    ) -> Result<FetchedApplications, ApplicationsError> {
        self.fetch(Some(listing_id)).await
    }

    async fn fetch(
        &self,
        listing_id: Option<ListingId>,
    ) -> Result<FetchedApplications, ApplicationsError> {
        tracing::info!(
            api = %self.gateway.base_url(),
            listing_id = ?listing_id,
            "Fetching applications"
        );

        let response = self
            .gateway
            .list_applications(listing_id)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Error connecting to jobs API");
                e
            })?;

        let response = response.expect_status(StatusCode::OK).map_err(|e| {
            tracing::error!(error = %e, "Applications request rejected");
            e
        })?;

        let label = match listing_id {
            Some(id) => format!("applications_job{}", id),
            None => "applications".to_string(),
        };
        let snapshot = self.snapshots.write(&label, &response.raw, Local::now())?;

        let applications: Vec<Application> = response.parse().map_err(|e| {
            tracing::error!(error = %e, snapshot = %snapshot.display(), "Applications unreadable");
            e
        })?;

        tracing::info!(
            count = applications.len(),
            snapshot = %snapshot.display(),
            "Applications fetched"
        );

        Ok(FetchedApplications {
            applications,
            listing_id,
            snapshot,
        })
    }
}

/// Cut `text` to `limit` characters, marking the cut.
pub fn truncate_text(text: &str, limit: usize) -> String {
    if text.chars().count() > limit {
        let mut cut: String = text.chars().take(limit).collect();
        cut.push_str(TRUNCATION_MARKER);
        cut
    } else {
        text.to_string()
    }
}

fn join_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "None".to_string()
    } else {
        items.join(", ")
    }
}

fn or_na<T: ToString>(value: &Option<T>) -> String {
    value
        .as_ref()
        .map_or_else(|| "N/A".to_string(), |v| v.to_string())
}

/// Human-readable listing of applications.
pub fn render_applications(applications: &[Application]) -> String {
    let mut out = String::new();
    if applications.is_empty() {
        out.push_str("No applications found.\n");
        return out;
    }

    let total = applications.len();
    for (i, app) in applications.iter().enumerate() {
        let cover_letter = match app.cover_letter.as_deref() {
            Some(text) if !text.is_empty() => truncate_text(text, COVER_LETTER_PREVIEW),
            _ => "None".to_string(),
        };

        out.push_str(&format!("Application {}/{}:\n", i + 1, total));
        out.push_str(&format!("  ID: {}\n", or_na(&app.id)));
        out.push_str(&format!("  Job ID: {}\n", or_na(&app.job_id)));
        out.push_str(&format!("  User ID: {}\n", or_na(&app.user_id)));
        out.push_str(&format!("  Resume Link: {}\n", or_na(&app.resume_link)));
        out.push_str(&format!("  Skills: {}\n", join_or_none(&app.skills)));
        out.push_str(&format!("  Certifications: {}\n", join_or_none(&app.certifications)));
        out.push_str(&format!("  Created At: {}\n", or_na(&app.created_at)));
        out.push_str(&format!("  Cover Letter: {}\n", cover_letter));
        out.push_str(&"-".repeat(60));
        out.push('\n');
    }
    out
}
