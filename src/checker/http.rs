// src/checker/http.rs
// =============================================================================
// This module checks if URLs are alive by making HTTP requests.
//
// Key functionality:
// - Makes HTTP HEAD requests (lightweight, no body download)
// - Enforces a short per-link timeout (3 seconds by default)
// - Runs checks concurrently through a bounded pool
// - Never lets one failing link abort the others
//
// Classification:
// - 2xx and 3xx responses -> working
// - status >= 400          -> broken
// - timeout / DNS / TLS / connection failure -> broken, status 0 with message
//
// Rust concepts:
// - async/await: For concurrent network I/O
// - Streams: For processing many items concurrently
// =============================================================================

use super::html::LinkCandidate;
use crate::client::ProbeClient;
use crate::error::describe_transport_error;
use futures::stream::{self, StreamExt}; // StreamExt gives us .buffer_unordered()
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

// Represents the result of checking a single link
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkCheckResult {
    /// The URL that was checked
    pub url: String,
    /// HTTP status, or 0 when no response arrived
    pub status: u16,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anchor_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl LinkCheckResult {
    fn from_status(url: String, status: u16, anchor_text: Option<String>) -> Self {
        LinkCheckResult {
            url,
            status,
            ok: is_working_status(status),
            anchor_text,
            error: None,
        }
    }

    fn failed(url: String, message: String, anchor_text: Option<String>) -> Self {
        LinkCheckResult {
            url,
            status: 0,
            ok: false,
            anchor_text,
            error: Some(message),
        }
    }
}

// Checks links with a bounded number of HEAD requests in flight.
//
// The bound replaces an unbounded fan-out: a page with thousands of links
// still only opens `concurrency` connections at a time.
#[derive(Debug, Clone)]
pub struct LinkValidator {
    client: ProbeClient,
    timeout: Duration,
    concurrency: usize,
}

impl LinkValidator {
    pub fn new(client: ProbeClient, timeout: Duration, concurrency: usize) -> Self {
        Self {
            client,
            timeout,
            // buffer_unordered(0) would never poll anything
            concurrency: concurrency.max(1),
        }
    }

    // Checks multiple links concurrently
    //
    // Returns exactly one result per input link. Results come back in
    // completion order, not input order.
    pub async fn validate_all(&self, links: Vec<LinkCandidate>) -> Vec<LinkCheckResult> {
        let futures = links.into_iter().map(|link| {
            let anchor_text = Some(link.anchor_text).filter(|text| !text.is_empty());
            self.check_one(link.absolute_url, anchor_text)
        });

        stream::iter(futures)
            .buffer_unordered(self.concurrency)
            .collect()
            .await
    }

    /// Checks a single URL that did not come from a page scan.
    pub async fn check(&self, url: &str) -> LinkCheckResult {
        self.check_one(url.to_string(), None).await
    }

    async fn check_one(&self, url: String, anchor_text: Option<String>) -> LinkCheckResult {
        match self.client.head_with_timeout(&url, self.timeout).await {
            Ok(response) => {
                let status = response.status().as_u16();
                debug!("Checked {} -> {}", url, status);
                LinkCheckResult::from_status(url, status, anchor_text)
            }
            Err(e) => {
                let message = describe_transport_error(&e);
                debug!("Check failed for {}: {}", url, message);
                LinkCheckResult::failed(url, message, anchor_text)
            }
        }
    }
}

// 2xx and 3xx count as working. The probe client does not follow redirects,
// so a moved link reports its 3xx status here instead of the target's.
pub fn is_working_status(status: u16) -> bool {
    (200..400).contains(&status)
}
