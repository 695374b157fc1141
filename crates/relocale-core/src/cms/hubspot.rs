//! HubSpot CMS pages API over libcurl.
//!
//! Requests run on tokio's blocking pool; each one is retried per the
//! client's [`RetryPolicy`].

use serde::Deserialize;
use std::time::Duration;
use url::Url;

use super::retry::{run_with_retry, RetryPolicy};
use super::{CmsClient, CmsError, FetchError, Page, PageUpdate, UpdateError};

const PAGES_PATH: [&str; 4] = ["cms", "v3", "pages", "site-pages"];
const LIST_LIMIT: u32 = 100;
/// Error bodies are truncated to this many characters in messages.
const MAX_ERROR_BODY: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Method {
    Get,
    Patch,
}

#[derive(Debug, Clone)]
struct Request {
    method: Method,
    url: Url,
    token: String,
    body: Option<Vec<u8>>,
}

#[derive(Debug, Deserialize)]
struct ListResponse {
    #[serde(default)]
    results: Vec<ListedPage>,
    #[serde(default)]
    paging: Option<Paging>,
}

#[derive(Debug, Deserialize)]
struct ListedPage {
    id: String,
}

#[derive(Debug, Deserialize)]
struct Paging {
    next: Option<NextPage>,
}

#[derive(Debug, Deserialize)]
struct NextPage {
    after: String,
}

/// Client for `{base}/cms/v3/pages/site-pages`.
#[derive(Debug, Clone)]
pub struct HubSpotClient {
    base: Url,
    token: String,
    policy: RetryPolicy,
    timeout: Duration,
}

impl HubSpotClient {
    pub fn new(base_url: &str, token: impl Into<String>) -> Result<Self, CmsError> {
        let base = Url::parse(base_url)?;
        if base.cannot_be_a_base() {
            return Err(CmsError::Other(format!("not a base URL: {base_url}")));
        }
        Ok(Self {
            base,
            token: token.into(),
            policy: RetryPolicy::default(),
            timeout: Duration::from_secs(30),
        })
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn pages_url(&self, page_id: Option<&str>) -> Url {
        let mut url = self.base.clone();
        // cannot_be_a_base was rejected in new().
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().extend(PAGES_PATH);
            if let Some(id) = page_id {
                segments.push(id);
            }
        }
        url
    }

    fn request(&self, method: Method, url: Url, body: Option<Vec<u8>>) -> Request {
        Request {
            method,
            url,
            token: self.token.clone(),
            body,
        }
    }

    async fn send(&self, req: Request) -> Result<Vec<u8>, CmsError> {
        let policy = self.policy;
        let timeout = self.timeout;
        tokio::task::spawn_blocking(move || run_with_retry(&policy, || perform(&req, timeout)))
            .await
            .map_err(|e| CmsError::Task(e.to_string()))?
    }

    async fn fetch(&self, page_id: &str) -> Result<Page, CmsError> {
        let req = self.request(Method::Get, self.pages_url(Some(page_id)), None);
        let body = self.send(req).await?;
        Ok(serde_json::from_slice(&body)?)
    }

    async fn push(&self, page_id: &str, update: &PageUpdate) -> Result<(), CmsError> {
        let body = serde_json::to_vec(update)?;
        let req = self.request(Method::Patch, self.pages_url(Some(page_id)), Some(body));
        self.send(req).await?;
        Ok(())
    }
}

impl CmsClient for HubSpotClient {
    async fn get_by_id(&self, page_id: &str) -> Result<Page, FetchError> {
        self.fetch(page_id).await.map_err(|source| FetchError {
            page_id: page_id.to_string(),
            source,
        })
    }

    async fn update(&self, page_id: &str, update: &PageUpdate) -> Result<(), UpdateError> {
        self.push(page_id, update).await.map_err(|source| UpdateError {
            page_id: page_id.to_string(),
            source,
        })
    }

    async fn list_page_ids(&self) -> Result<Vec<String>, CmsError> {
        let mut ids = Vec::new();
        let mut after: Option<String> = None;
        loop {
            let mut url = self.pages_url(None);
            {
                let mut query = url.query_pairs_mut();
                query.append_pair("limit", &LIST_LIMIT.to_string());
                if let Some(cursor) = &after {
                    query.append_pair("after", cursor);
                }
            }
            let body = self.send(self.request(Method::Get, url, None)).await?;
            let page: ListResponse = serde_json::from_slice(&body)?;
            ids.extend(page.results.into_iter().map(|p| p.id));
            match page.paging.and_then(|p| p.next) {
                Some(next) if after.as_deref() != Some(next.after.as_str()) => {
                    after = Some(next.after)
                }
                _ => break,
            }
        }
        tracing::debug!(count = ids.len(), "listed CMS pages");
        Ok(ids)
    }
}

/// One HTTP exchange. Non-2xx statuses become [`CmsError::Http`].
fn perform(req: &Request, timeout: Duration) -> Result<Vec<u8>, CmsError> {
    let mut easy = curl::easy::Easy::new();
    easy.url(req.url.as_str())?;
    easy.connect_timeout(Duration::from_secs(15))?;
    easy.timeout(timeout)?;

    let mut headers = curl::easy::List::new();
    headers.append(&format!("Authorization: Bearer {}", req.token))?;
    headers.append("Accept: application/json")?;
    if let Some(body) = &req.body {
        headers.append("Content-Type: application/json")?;
        easy.post_fields_copy(body)?;
    }
    if req.method == Method::Patch {
        easy.custom_request("PATCH")?;
    }
    easy.http_headers(headers)?;

    let mut response = Vec::new();
    {
        let mut transfer = easy.transfer();
        transfer.write_function(|data| {
            response.extend_from_slice(data);
            Ok(data.len())
        })?;
        transfer.perform()?;
    }

    let status = easy.response_code()?;
    if !(200..300).contains(&status) {
        return Err(CmsError::Http {
            status,
            body: String::from_utf8_lossy(&response)
                .chars()
                .take(MAX_ERROR_BODY)
                .collect(),
        });
    }
    Ok(response)
}
