//! Listing and application fixtures shared by the integration tests

use jobs_catalog_sync::models::listing::NewListing;
use jobs_catalog_sync::services::catalog::CanonicalCatalog;
use serde_json::{json, Value};

/// A valid listing whose other fields derive from `title`.
pub fn listing(title: &str) -> NewListing {
    NewListing {
        title: title.to_string(),
        role: "Chef".to_string(),
        company: format!("{} Company", title),
        location: "New York, NY".to_string(),
        description: format!("Description for {}.", title),
        required_skills: vec!["Cooking".to_string(), "Food Safety".to_string()],
        required_certifications: vec!["Food Handler Certification".to_string()],
    }
}

#[allow(dead_code)]
pub fn catalog(titles: &[&str]) -> CanonicalCatalog {
    CanonicalCatalog::new(titles.iter().map(|t| listing(t)).collect()).expect("valid catalog")
}

/// A listing as the server stores it.
#[allow(dead_code)]
pub fn stored_listing(id: i64, title: &str) -> Value {
    let mut value = serde_json::to_value(listing(title)).expect("serializable listing");
    value["id"] = json!(id);
    value["posted_at"] = json!("2024-12-01T09:00:00");
    value
}

#[allow(dead_code)]
pub fn stored_application(id: i64, job_id: i64, user_id: i64) -> Value {
    json!({
        "id": id,
        "job_id": job_id,
        "user_id": user_id,
        "resume_link": format!("https://example.com/resumes/{}.pdf", user_id),
        "skills": ["Cooking", "Food Safety"],
        "certifications": ["Food Handler Certification"],
        "cover_letter": "I have five years of line experience.",
        "created_at": "2025-01-05T10:15:00"
    })
}

#[allow(dead_code)]
pub fn sorted(titles: &[&str]) -> Vec<String> {
    let mut titles: Vec<String> = titles.iter().map(|t| t.to_string()).collect();
    titles.sort();
    titles
}
