// src/audit/headers.rs
// =============================================================================
// Security header audit.
//
// One HEAD request (redirects followed, so the headers are those of the page
// actually served), then a lookup of each header below in that single
// response. Header names are matched case-insensitively (HeaderMap does that
// for us).
// =============================================================================

use crate::client::ProbeClient;
use crate::error::describe_transport_error;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Headers checked, in report order
pub const SECURITY_HEADERS: [&str; 6] = [
    "Strict-Transport-Security",
    "Content-Security-Policy",
    "X-Frame-Options",
    "X-Content-Type-Options",
    "Referrer-Policy",
    "Permissions-Policy",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityHeaderFinding {
    pub header_name: String,
    pub value: Option<String>,
    pub present: bool,
    /// Only set on the synthetic finding returned when the request failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SecurityHeaderFinding {
    fn error(message: String) -> Self {
        SecurityHeaderFinding {
            header_name: "Error".to_string(),
            value: None,
            present: false,
            error: Some(message),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SecurityAuditor {
    client: ProbeClient,
}

impl SecurityAuditor {
    pub fn new(client: ProbeClient) -> Self {
        Self { client }
    }

    // Returns one finding per entry of SECURITY_HEADERS, or a single error
    // finding when the HEAD request itself failed.
    pub async fn audit(&self, url: &str) -> Vec<SecurityHeaderFinding> {
        info!("Auditing security headers for {}", url);

        let response = match self.client.head_following(url).await {
            Ok(response) => response,
            Err(e) => {
                let message = describe_transport_error(&e);
                warn!("Security header audit failed for {}: {}", url, message);
                return vec![SecurityHeaderFinding::error(message)];
            }
        };

        let headers = response.headers();
        SECURITY_HEADERS
            .iter()
            .map(|name| {
                let value = headers
                    .get(*name)
                    .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned());
                SecurityHeaderFinding {
                    header_name: name.to_string(),
                    present: value.is_some(),
                    value,
                    error: None,
                }
            })
            .collect()
    }
}
