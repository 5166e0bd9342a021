use serde::{Deserialize, Serialize};

use crate::models::listing::ListingId;
use crate::models::null_as_default;

/// An application as returned by `GET /applications`. Read-only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Application {
    pub id: Option<i64>,
    pub job_id: Option<ListingId>,
    pub user_id: Option<i64>,
    pub resume_link: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub skills: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub certifications: Vec<String>,
    pub cover_letter: Option<String>,
    pub created_at: Option<String>,
}

/// Payload for `POST /applications`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewApplication {
    pub job_id: ListingId,
    pub user_id: i64,
    pub resume_link: String,
    pub skills: Vec<String>,
    pub certifications: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_letter: Option<String>,
}

/// Body of a `201` from `POST /applications`.
#[derive(Debug, Deserialize)]
pub struct CreatedApplication {
    #[serde(default)]
    pub application_id: Option<i64>,
}
