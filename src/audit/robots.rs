// src/audit/robots.rs
// =============================================================================
// robots.txt validation.
//
// Strategy:
// - Resolve "/robots.txt" against the site root (any path on the input URL is
//   ignored, robots.txt always lives at the root)
// - Fetch it, following redirects (http -> https, apex -> www)
// - Valid means the final answer is HTTP 200 exactly; anything else is
//   recorded as an issue
// =============================================================================

use crate::client::ProbeClient;
use crate::error::describe_transport_error;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RobotsReport {
    /// The robots.txt URL that was fetched
    pub url: String,
    /// File body, only kept when the fetch returned 200
    pub content: Option<String>,
    pub is_valid: bool,
    /// HTTP status, or 0 when no response arrived
    pub status: u16,
    pub issues: Vec<String>,
}

impl RobotsReport {
    fn failed(url: String, message: String) -> Self {
        RobotsReport {
            url,
            content: None,
            is_valid: false,
            status: 0,
            issues: vec![message],
        }
    }
}

#[derive(Debug, Clone)]
pub struct RobotsValidator {
    client: ProbeClient,
}

impl RobotsValidator {
    pub fn new(client: ProbeClient) -> Self {
        Self { client }
    }

    pub async fn check(&self, base_url: &str) -> RobotsReport {
        let robots_url = match robots_url(base_url) {
            Some(url) => url,
            None => {
                return RobotsReport::failed(
                    base_url.to_string(),
                    format!("Cannot build robots.txt URL from {}", base_url),
                )
            }
        };

        info!("Fetching {}", robots_url);

        let response = match self.client.get_following(&robots_url).await {
            Ok(response) => response,
            Err(e) => {
                let message = describe_transport_error(&e);
                warn!("robots.txt fetch failed for {}: {}", robots_url, message);
                return RobotsReport::failed(robots_url, message);
            }
        };

        let status = response.status().as_u16();
        if status != 200 {
            return RobotsReport {
                url: robots_url,
                content: None,
                is_valid: false,
                status,
                issues: vec![format!("Returned status {}", status)],
            };
        }

        match response.text().await {
            Ok(content) => RobotsReport {
                url: robots_url,
                content: Some(content),
                is_valid: true,
                status,
                issues: Vec::new(),
            },
            Err(e) => RobotsReport::failed(robots_url, describe_transport_error(&e)),
        }
    }
}

// "https://example.com/blog/post?x=1" -> "https://example.com/robots.txt"
fn robots_url(base_url: &str) -> Option<String> {
    Url::parse(base_url)
        .and_then(|base| base.join("/robots.txt"))
        .map(|url| url.to_string())
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProbeConfig;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn validator() -> RobotsValidator {
        RobotsValidator::new(ProbeClient::new(&ProbeConfig::default()).unwrap())
    }

    #[test]
    fn test_robots_url_uses_site_root() {
        assert_eq!(
            robots_url("https://example.com/blog/post?x=1").as_deref(),
            Some("https://example.com/robots.txt")
        );
        assert_eq!(robots_url("nonsense"), None);
    }

    #[tokio::test]
    async fn test_valid_robots() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow:\n"))
            .mount(&server)
            .await;

        let report = validator().check(&format!("{}/deep/page", server.uri())).await;
        assert!(report.is_valid);
        assert_eq!(report.status, 200);
        assert_eq!(report.content.as_deref(), Some("User-agent: *\nDisallow:\n"));
        assert!(report.issues.is_empty());
    }

    #[tokio::test]
    async fn test_missing_robots() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_string("not here"))
            .mount(&server)
            .await;

        let report = validator().check(&server.uri()).await;
        assert!(!report.is_valid);
        assert_eq!(report.status, 404);
        assert!(report.content.is_none());
        assert_eq!(report.issues, vec!["Returned status 404".to_string()]);
    }

    #[tokio::test]
    async fn test_redirected_robots_is_followed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(ResponseTemplate::new(301).insert_header("location", "/static/robots.txt"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/static/robots.txt"))
            .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nAllow: /\n"))
            .mount(&server)
            .await;

        let report = validator().check(&server.uri()).await;
        assert!(report.is_valid);
        assert_eq!(report.status, 200);
        assert_eq!(report.content.as_deref(), Some("User-agent: *\nAllow: /\n"));
    }

    #[tokio::test]
    async fn test_redirect_to_missing_robots_is_not_valid() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(ResponseTemplate::new(302).insert_header("location", "/gone"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/gone"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let report = validator().check(&server.uri()).await;
        assert!(!report.is_valid);
        assert_eq!(report.status, 404);
        assert_eq!(report.issues, vec!["Returned status 404".to_string()]);
    }

    #[tokio::test]
    async fn test_unreachable_site() {
        let report = validator().check("http://127.0.0.1:9").await;
        assert!(!report.is_valid);
        assert_eq!(report.status, 0);
        assert_eq!(report.issues.len(), 1);
    }
}
