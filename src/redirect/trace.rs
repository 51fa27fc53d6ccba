// src/redirect/trace.rs
// =============================================================================
// Hop-by-hop redirect tracing.
//
// How it works:
// 1. Request the current URL with redirect following disabled
// 2. Record a Hop (url, status, headers)
// 3. If the status is 3xx and a Location header exists, resolve it against
//    the current URL and go again
// 4. Otherwise stop
//
// A trace always contains at least one hop: either a real response or a
// status-0 hop carrying the transport error.
// =============================================================================

use crate::client::ProbeClient;
use crate::error::describe_transport_error;
use crate::target::normalize_url;
use reqwest::header::{HeaderMap, LOCATION};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};
use url::Url;

// One request/response pair in a redirect chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hop {
    /// The URL requested at this hop
    pub url: String,
    /// HTTP status, or 0 when the request never got a response
    pub status: u16,
    /// Response headers, lowercase names; repeated headers joined with ", "
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Hop {
    pub fn is_redirect(&self) -> bool {
        (300..400).contains(&self.status)
    }

    fn failed(url: &str, message: String) -> Self {
        Hop {
            url: url.to_string(),
            status: 0,
            headers: BTreeMap::new(),
            error: Some(message),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedirectTrace {
    pub requested_url: String,
    pub hops: Vec<Hop>,
}

impl RedirectTrace {
    /// The last URL reached (the requested URL itself when nothing redirected)
    pub fn final_url(&self) -> &str {
        self.hops
            .last()
            .map(|hop| hop.url.as_str())
            .unwrap_or(&self.requested_url)
    }

    /// Number of redirects followed, not counting the first request
    pub fn redirect_count(&self) -> usize {
        self.hops.iter().filter(|hop| hop.is_redirect()).count()
    }

    pub fn error(&self) -> Option<&str> {
        self.hops.last().and_then(|hop| hop.error.as_deref())
    }
}

// Result of tracing one entry of a batch.
//
// An entry that fails input validation never reaches the network; it comes
// back with no hops and the validation message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceOutcome {
    pub url: String,
    pub hops: Vec<Hop>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RedirectTracer {
    client: ProbeClient,
    max_redirects: usize,
}

impl RedirectTracer {
    pub fn new(client: ProbeClient, max_redirects: usize) -> Self {
        Self {
            client,
            max_redirects,
        }
    }

    // Traces the redirect chain starting at `url`.
    //
    // Never fails: transport errors become the final hop. Hitting the hop
    // limit is not an error either; callers can spot a probable loop from
    // hops.len() == max_redirects.
    pub async fn trace(&self, url: &str) -> RedirectTrace {
        let mut hops = Vec::new();
        let mut current_url = url.to_string();
        let mut count = 0;

        info!("Tracing redirects for {}", url);

        while count < self.max_redirects {
            let response = match self.client.get(&current_url).await {
                Ok(response) => response,
                Err(e) => {
                    let message = describe_transport_error(&e);
                    debug!("Hop {} failed for {}: {}", count, current_url, message);
                    hops.push(Hop::failed(&current_url, message));
                    break;
                }
            };

            let status = response.status().as_u16();
            let headers = collect_headers(response.headers());
            let location = response
                .headers()
                .get(LOCATION)
                .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned());

            debug!("Hop {}: {} -> {}", count, current_url, status);

            hops.push(Hop {
                url: current_url.clone(),
                status,
                headers,
                error: None,
            });

            if !(300..400).contains(&status) {
                break;
            }

            // A redirect status without a Location is where the chain ends
            let Some(location) = location else {
                break;
            };

            match resolve_location(&current_url, &location) {
                Some(next) => {
                    current_url = next;
                    count += 1;
                }
                None => {
                    hops.push(Hop::failed(
                        &current_url,
                        format!("Invalid redirect location: {}", location),
                    ));
                    break;
                }
            }
        }

        RedirectTrace {
            requested_url: url.to_string(),
            hops,
        }
    }

    // Traces several URLs at once.
    //
    // Each input is normalized first. Chains share nothing but the connection
    // pool, so one failing URL never affects another. Output order matches
    // input order.
    pub async fn trace_many(&self, urls: &[String]) -> Vec<TraceOutcome> {
        let futures = urls.iter().map(|raw| async move {
            match normalize_url(raw) {
                Ok(url) => {
                    let trace = self.trace(&url).await;
                    TraceOutcome {
                        url,
                        hops: trace.hops,
                        error: None,
                    }
                }
                Err(e) => TraceOutcome {
                    url: raw.clone(),
                    hops: Vec::new(),
                    error: Some(e.to_string()),
                },
            }
        });

        futures::future::join_all(futures).await
    }
}

// Copies response headers into a sorted map.
// reqwest stores repeated headers (Set-Cookie, Vary) as separate entries.
fn collect_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut map: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
        map.entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert(value);
    }
    map
}

// Resolves a Location header (absolute or relative) against the URL that sent it.
fn resolve_location(current: &str, location: &str) -> Option<String> {
    Url::parse(current)
        .and_then(|base| base.join(location.trim()))
        .map(|url| url.to_string())
        .ok()
}
