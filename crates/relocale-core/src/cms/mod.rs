//! CMS collaborator: fetch and update page content.
//!
//! The orchestrator only sees [`CmsClient`]; the HubSpot implementation and
//! its transport retry policy live behind it. Errors are opaque to callers
//! beyond "fetch failed" or "update failed".

mod hubspot;
mod retry;

use serde::{Deserialize, Serialize};
use std::future::Future;

pub use hubspot::HubSpotClient;
pub use retry::{classify, run_with_retry, ErrorKind, RetryDecision, RetryPolicy};

/// Page content as returned by the CMS.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Page {
    pub id: String,
    pub content: String,
}

/// Body of a page update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageUpdate {
    pub content: String,
}

/// Transport or protocol failure talking to the CMS.
#[derive(Debug, thiserror::Error)]
pub enum CmsError {
    #[error("{0}")]
    Curl(#[from] curl::Error),
    #[error("HTTP {status}: {body}")]
    Http { status: u32, body: String },
    #[error("decode response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("CMS request task failed: {0}")]
    Task(String),
    #[error("{0}")]
    Other(String),
}

/// Page-scoped fetch failure (network, not found, bad payload).
#[derive(Debug, thiserror::Error)]
#[error("fetch page {page_id}: {source}")]
pub struct FetchError {
    pub page_id: String,
    #[source]
    pub source: CmsError,
}

/// Page-scoped update failure (network, validation, conflict).
#[derive(Debug, thiserror::Error)]
#[error("update page {page_id}: {source}")]
pub struct UpdateError {
    pub page_id: String,
    #[source]
    pub source: CmsError,
}

/// Remote content store holding the pages to rewrite.
pub trait CmsClient {
    fn get_by_id(&self, page_id: &str) -> impl Future<Output = Result<Page, FetchError>> + Send;

    fn update(
        &self,
        page_id: &str,
        update: &PageUpdate,
    ) -> impl Future<Output = Result<(), UpdateError>> + Send;

    /// Every page id the CMS knows about, in listing order.
    fn list_page_ids(&self) -> impl Future<Output = Result<Vec<String>, CmsError>> + Send;
}
