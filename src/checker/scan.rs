// src/checker/scan.rs
// =============================================================================
// Page-level link scans: fetch one page, extract its links, check them.
//
// Two callers use this with different caps:
// - the single-page broken-link scan checks the first N links (N = 20 by default)
// - the full website link scan checks every distinct link on the page
//
// Only one page is ever fetched. Links are checked, never followed.
// =============================================================================

use super::html::extract_links;
use super::http::{LinkCheckResult, LinkValidator};
use crate::client::ProbeClient;
use crate::error::describe_transport_error;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkScanReport {
    pub url: String,
    /// Distinct links found on the page
    pub total_links: usize,
    /// Links actually checked (smaller than total_links when capped)
    pub checked_links: usize,
    pub broken_links: Vec<LinkCheckResult>,
    pub working_links: Vec<LinkCheckResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl LinkScanReport {
    fn failed(url: &str, message: String) -> Self {
        LinkScanReport {
            url: url.to_string(),
            error: Some(message),
            ..Default::default()
        }
    }

    /// True when the page loaded and no checked link is broken
    pub fn is_clean(&self) -> bool {
        self.error.is_none() && self.broken_links.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct LinkScanner {
    client: ProbeClient,
    validator: LinkValidator,
}

impl LinkScanner {
    pub fn new(client: ProbeClient, validator: LinkValidator) -> Self {
        Self { client, validator }
    }

    // Scans one page for broken links.
    //
    // Parameters:
    //   url: normalized page URL
    //   limit: check only the first `limit` distinct links (None = all)
    pub async fn scan_page(&self, url: &str, limit: Option<usize>) -> LinkScanReport {
        info!("Scanning links on {}", url);

        // Relative links resolve against the page actually served, which
        // differs from `url` when the main page redirects
        let (page_url, html) = match self.fetch_page(url).await {
            Ok(page) => page,
            Err(message) => {
                warn!("Could not load {}: {}", url, message);
                return LinkScanReport::failed(url, message);
            }
        };

        let mut links = extract_links(&page_url, &html);
        let total_links = links.len();
        if let Some(limit) = limit {
            links.truncate(limit);
        }
        let checked_links = links.len();

        let results = self.validator.validate_all(links).await;
        let (working_links, broken_links): (Vec<_>, Vec<_>) =
            results.into_iter().partition(|r| r.ok);

        info!(
            "{}: {} links found, {} checked, {} broken",
            url,
            total_links,
            checked_links,
            broken_links.len()
        );

        LinkScanReport {
            url: url.to_string(),
            total_links,
            checked_links,
            broken_links,
            working_links,
            error: None,
        }
    }

    // Fetches the page body after following redirects.
    // Returns the final URL with the body; a non-2xx final answer means there
    // is nothing to scan.
    async fn fetch_page(&self, url: &str) -> Result<(String, String), String> {
        let response = self
            .client
            .get_following(url)
            .await
            .map_err(|e| describe_transport_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("Main page returned {}", status.as_u16()));
        }

        let page_url = response.url().to_string();
        let html = response.text().await.map_err(|e| describe_transport_error(&e))?;
        Ok((page_url, html))
    }
}
