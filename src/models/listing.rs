use garde::Validate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::null_as_default;

/// Server-assigned listing identifier.
pub type ListingId = i64;

/// Listing payload as submitted to `POST /jobs`.
///
/// Identifier and creation timestamp are assigned by the server and are
/// therefore absent here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct NewListing {
    #[garde(length(min = 1, max = 200))]
    #[serde(deserialize_with = "null_as_default")]
    pub title: String,

    #[garde(length(min = 1, max = 200))]
    #[serde(deserialize_with = "null_as_default")]
    pub role: String,

    #[garde(length(min = 1, max = 200))]
    #[serde(deserialize_with = "null_as_default")]
    pub company: String,

    #[garde(length(min = 1, max = 200))]
    #[serde(deserialize_with = "null_as_default")]
    pub location: String,

    #[garde(length(min = 1, max = 5000))]
    #[serde(deserialize_with = "null_as_default")]
    pub description: String,

    #[garde(inner(length(min = 1, max = 100)))]
    #[serde(deserialize_with = "null_as_default")]
    pub required_skills: Vec<String>,

    #[garde(inner(length(min = 1, max = 100)))]
    #[serde(deserialize_with = "null_as_default")]
    pub required_certifications: Vec<String>,
}

/// A listing as stored in the remote catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobListing {
    #[serde(default)]
    pub id: Option<ListingId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub posted_at: Option<String>,

    #[serde(flatten)]
    pub details: NewListing,
}

/// Just enough of a stored listing to address it.
///
/// Read field by field, so a record whose other fields are malformed can
/// still be deleted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingRef {
    pub id: Option<ListingId>,
    pub title: Option<String>,
    pub company: Option<String>,
}

impl ListingRef {
    pub fn from_value(value: &Value) -> Self {
        let text = |key: &str| value.get(key).and_then(Value::as_str).map(str::to_string);
        Self {
            id: value.get("id").and_then(Value::as_i64),
            title: text("title"),
            company: text("company"),
        }
    }

    /// Title for reports; `"<untitled>"` when the record has none.
    pub fn label(&self) -> String {
        self.title
            .clone()
            .unwrap_or_else(|| "<untitled>".to_string())
    }
}

/// Body of a `201` from `POST /jobs`: `{"job": {"id": ..., ...}}`.
#[derive(Debug, Deserialize)]
pub struct CreatedListing {
    pub job: JobListing,
}

/// Body of a successful delete: `{"message": "..."}`.
#[derive(Debug, Default, Deserialize)]
pub struct DeleteMessage {
    #[serde(default)]
    pub message: Option<String>,
}
