use reqwest::StatusCode;

use crate::models::listing::{CreatedListing, DeleteMessage, JobListing, ListingId, NewListing};
use crate::services::gateway::{ApiError, ApiGateway};

/// One-off listing operations. Any unexpected status is an error.
pub struct ListingClient<'a> {
    gateway: &'a ApiGateway,
}

impl<'a> ListingClient<'a> {
    pub fn new(gateway: &'a ApiGateway) -> Self {
        Self { gateway }
    }

    pub async fn list(&self) -> Result<Vec<JobListing>, ApiError> {
        self.gateway
            .list_listings()
            .await?
            .expect_status(StatusCode::OK)?
            .parse()
    }

    pub async fn get(&self, id: ListingId) -> Result<JobListing, ApiError> {
        self.gateway
            .get_listing(id)
            .await?
            .expect_status(StatusCode::OK)?
            .parse()
    }

    /// Submit one listing and return the identifier the server assigned.
    pub async fn create(&self, listing: &NewListing) -> Result<ListingId, ApiError> {
        let created: CreatedListing = self
            .gateway
            .create_listing(listing)
            .await?
            .expect_status(StatusCode::CREATED)?
            .parse()?;

        created.job.id.ok_or_else(|| {
            ApiError::PreconditionUnmet("created listing came back without an id".to_string())
        })
    }

    /// Delete one listing; returns the server's message.
    pub async fn delete(&self, id: ListingId) -> Result<String, ApiError> {
        let response = self
            .gateway
            .delete_listing(id)
            .await?
            .expect_status(StatusCode::OK)?;
        let message = response
            .parse::<DeleteMessage>()
            .ok()
            .and_then(|m| m.message)
            .unwrap_or_else(|| format!("Listing {} deleted", id));
        Ok(message)
    }
}
