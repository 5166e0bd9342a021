//! Jobs API gateway
//!
//! Thin wrapper around `reqwest` that every workflow talks through. It owns
//! the request timeout and the shared-secret header, decodes JSON bodies and
//! never retries.

use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

use crate::config::ApiKey;
use crate::models::application::NewApplication;
use crate::models::listing::{ListingId, NewListing};

/// Header carrying the shared secret.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Timeout for reconciliation, application retrieval and one-off calls.
pub const BULK_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout for verification probes.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Longest body excerpt kept in failure details.
const DETAIL_LIMIT: usize = 100;

/// Whether a request carries the shared secret.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Public,
    Privileged,
}

/// Decoded response body.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Json(Value),
    Text(String),
}

/// Status plus body of a completed exchange, whatever the status.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: ResponseBody,
    /// Body exactly as received.
    pub raw: String,
}

impl ApiResponse {
    pub fn new(status: StatusCode, raw: String) -> Self {
        let body = match serde_json::from_str::<Value>(&raw) {
            Ok(value) => ResponseBody::Json(value),
            Err(_) => ResponseBody::Text(raw.clone()),
        };
        Self { status, body, raw }
    }

    pub fn json(&self) -> Option<&Value> {
        match &self.body {
            ResponseBody::Json(value) => Some(value),
            ResponseBody::Text(_) => None,
        }
    }

    /// Decode the body into `T`.
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        Ok(serde_json::from_str(&self.raw)?)
    }

    /// Short human-readable excerpt of the body for failure reports.
    pub fn detail(&self) -> String {
        let trimmed = self.raw.trim();
        if trimmed.chars().count() > DETAIL_LIMIT {
            let excerpt: String = trimmed.chars().take(DETAIL_LIMIT).collect();
            format!("{}...", excerpt)
        } else {
            trimmed.to_string()
        }
    }

    /// `status: detail`, the form failures are recorded in.
    pub fn describe(&self) -> String {
        let detail = self.detail();
        if detail.is_empty() {
            self.status.as_u16().to_string()
        } else {
            format!("{}: {}", self.status.as_u16(), detail)
        }
    }

    /// Turn anything other than `expected` into a classified error.
    pub fn expect_status(self, expected: StatusCode) -> Result<Self, ApiError> {
        if self.status == expected {
            Ok(self)
        } else {
            Err(ApiError::from_status(self.status, self.detail()))
        }
    }
}

/// Error type for jobs API operations.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("request rejected with HTTP {status}: {detail}")]
    Client { status: u16, detail: String },

    #[error("server returned HTTP {status}: {detail}")]
    Server { status: u16, detail: String },

    #[error("precondition unmet: {0}")]
    PreconditionUnmet(String),

    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ApiError {
    /// 4xx is the caller's fault; everything else unexpected is the server's.
    pub fn from_status(status: StatusCode, detail: String) -> Self {
        if status.is_client_error() {
            ApiError::Client {
                status: status.as_u16(),
                detail,
            }
        } else {
            ApiError::Server {
                status: status.as_u16(),
                detail,
            }
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, ApiError::Transport(_))
    }
}

/// Client for the jobs API.
#[derive(Clone)]
pub struct ApiGateway {
    http: Client,
    base_url: String,
    api_key: ApiKey,
    timeout: Duration,
}

impl ApiGateway {
    pub fn new(base_url: &str, api_key: ApiKey, timeout: Duration) -> Result<Self, ApiError> {
        let http = Client::builder()
            .user_agent(concat!("jobs-catalog-sync/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            timeout,
        })
    }

    /// Same connection pool and credential, different timeout.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        Self {
            timeout,
            ..self.clone()
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Issue one request and return whatever status came back.
    ///
    /// Only connection errors and timeouts are errors here; interpreting the
    /// status is up to the caller.
    pub async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        access: Access,
        body: Option<&B>,
        query: &[(&str, String)],
    ) -> Result<ApiResponse, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(method = %method, url = %url, ?access, "Sending jobs API request");

        let mut request = self.http.request(method, &url).timeout(self.timeout);
        if access == Access::Privileged {
            request = request.header(API_KEY_HEADER, self.api_key.expose());
        }
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let raw = response.text().await?;

        tracing::debug!(status = status.as_u16(), url = %url, "Jobs API responded");
        Ok(ApiResponse::new(status, raw))
    }

    /// GET /health
    pub async fn health(&self) -> Result<ApiResponse, ApiError> {
        self.send::<()>(Method::GET, "/health", Access::Public, None, &[])
            .await
    }

    /// GET /jobs
    pub async fn list_listings(&self) -> Result<ApiResponse, ApiError> {
        self.send::<()>(Method::GET, "/jobs", Access::Public, None, &[])
            .await
    }

    /// GET /jobs/{id}
    pub async fn get_listing(&self, id: ListingId) -> Result<ApiResponse, ApiError> {
        self.send::<()>(Method::GET, &listing_path(id), Access::Public, None, &[])
            .await
    }

    /// POST /jobs
    pub async fn create_listing(&self, listing: &NewListing) -> Result<ApiResponse, ApiError> {
        self.send(Method::POST, "/jobs", Access::Privileged, Some(listing), &[])
            .await
    }

    /// DELETE /jobs/{id}
    pub async fn delete_listing(&self, id: ListingId) -> Result<ApiResponse, ApiError> {
        self.send::<()>(
            Method::DELETE,
            &listing_path(id),
            Access::Privileged,
            None,
            &[],
        )
        .await
    }

    /// DELETE /jobs
    pub async fn bulk_delete_listings(&self) -> Result<ApiResponse, ApiError> {
        self.send::<()>(Method::DELETE, "/jobs", Access::Privileged, None, &[])
            .await
    }

    /// GET /applications, optionally narrowed server-side by `job_id`.
    pub async fn list_applications(
        &self,
        listing_id: Option<ListingId>,
    ) -> Result<ApiResponse, ApiError> {
        let query: Vec<(&str, String)> = listing_id
            .map(|id| vec![("job_id", id.to_string())])
            .unwrap_or_default();
        self.send::<()>(
            Method::GET,
            "/applications",
            Access::Privileged,
            None,
            &query,
        )
        .await
    }

    /// POST /applications
    pub async fn create_application(
        &self,
        application: &NewApplication,
    ) -> Result<ApiResponse, ApiError> {
        self.send(
            Method::POST,
            "/applications",
            Access::Public,
            Some(application),
            &[],
        )
        .await
    }
}

fn listing_path(id: ListingId) -> String {
    format!("/jobs/{}", id)
}
