//! Canonical listing set
//!
//! The set of listings the remote catalog should hold after reconciliation.
//! Loaded from a JSON array on disk, or from the data set compiled into the
//! binary.

use garde::Validate;
use std::path::Path;

use crate::models::listing::NewListing;

const BUNDLED_CATALOG: &str = include_str!("../../data/catalog.json");

#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalCatalog {
    listings: Vec<NewListing>,
}

impl CanonicalCatalog {
    /// Build from in-memory listings, validating each one.
    pub fn new(listings: Vec<NewListing>) -> Result<Self, CatalogError> {
        for (index, listing) in listings.iter().enumerate() {
            listing.validate().map_err(|report| CatalogError::Invalid {
                index,
                title: listing.title.clone(),
                report: report.to_string(),
            })?;
        }
        Ok(Self { listings })
    }

    pub fn bundled() -> Result<Self, CatalogError> {
        Self::from_json(BUNDLED_CATALOG)
    }

    pub fn from_path(path: &Path) -> Result<Self, CatalogError> {
        let raw = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&raw)
    }

    /// Explicit file when given, bundled set otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self, CatalogError> {
        match path {
            Some(path) => Self::from_path(path),
            None => Self::bundled(),
        }
    }

    pub fn from_json(raw: &str) -> Result<Self, CatalogError> {
        let listings: Vec<NewListing> = serde_json::from_str(raw)?;
        Self::new(listings)
    }

    pub fn listings(&self) -> &[NewListing] {
        &self.listings
    }

    pub fn len(&self) -> usize {
        self.listings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listings.is_empty()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Failed to read catalog {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Catalog is not a JSON array of listings: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Listing #{index} ('{title}') is invalid: {report}")]
    Invalid {
        index: usize,
        title: String,
        report: String,
    },
}
