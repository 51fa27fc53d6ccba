// src/client.rs
// =============================================================================
// The shared HTTP transport used by every probe.
//
// Settings enforced on every request:
// - the configured User-Agent
// - a uniform per-request timeout (overridable per call for link checks)
//
// Two pools with different redirect policies:
// - `get` / `head_with_timeout` never follow redirects: the redirect tracer
//   has to see each hop, and link checks report the status the URL itself
//   returns
// - `get_following` / `head_following` follow up to `max_redirects` hops, for
//   fetches that care about the page finally served (page scans, robots.txt,
//   security headers)
//
// reqwest::Client keeps an internal connection pool behind an Arc, so cloning
// a ProbeClient is cheap and all clones share the same pool.
// =============================================================================

use crate::config::ProbeConfig;
use crate::error::ProbeError;
use reqwest::{redirect, Client, Response};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ProbeClient {
    http: Client,
    following: Client,
}

impl ProbeClient {
    pub fn new(config: &ProbeConfig) -> Result<Self, ProbeError> {
        let http = build_client(config, redirect::Policy::none())?;
        let following = build_client(config, redirect::Policy::limited(config.max_redirects))?;

        Ok(Self { http, following })
    }

    pub async fn get(&self, url: &str) -> Result<Response, reqwest::Error> {
        self.http.get(url).send().await
    }

    /// GET that ends on the page finally served; Response::url() is that page.
    pub async fn get_following(&self, url: &str) -> Result<Response, reqwest::Error> {
        self.following.get(url).send().await
    }

    pub async fn head_following(&self, url: &str) -> Result<Response, reqwest::Error> {
        self.following.head(url).send().await
    }

    // HEAD with a tighter deadline than the client default.
    // RequestBuilder::timeout replaces the client-wide timeout for this call only.
    pub async fn head_with_timeout(
        &self,
        url: &str,
        timeout: Duration,
    ) -> Result<Response, reqwest::Error> {
        self.http.head(url).timeout(timeout).send().await
    }
}

fn build_client(config: &ProbeConfig, policy: redirect::Policy) -> Result<Client, ProbeError> {
    Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(config.request_timeout())
        .redirect(policy)
        .build()
        .map_err(|e| ProbeError::Config(format!("Failed to create HTTP client: {}", e)))
}
