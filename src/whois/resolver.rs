// src/whois/resolver.rs
// =============================================================================
// WHOIS first, RDAP as the fallback.
//
// Port-43 WHOIS is still the richest source for most TLDs, but some
// registries answer with a polite refusal instead of an error (rate limits,
// "this service is retired, use RDAP"). Those answers, and answers with
// almost nothing in them, are treated exactly like a failed lookup.
//
// resolve() never fails: the worst case is an empty record.
// =============================================================================

use super::port43::WhoisSource;
use super::rdap::{normalize_rdap, RdapSource};
use super::record::{populated_fields, RawWhois, WhoisRecord};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

// Matched case-insensitively against the whole serialized answer
pub const SOFT_FAILURE_PHRASES: [&str; 3] =
    ["rate limit exceeded", "retired", "use our rdap service"];

pub fn is_soft_failure(text: &str) -> bool {
    let text = text.to_lowercase();
    SOFT_FAILURE_PHRASES.iter().any(|phrase| text.contains(phrase))
}

/// Which source produced the record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WhoisOrigin {
    Whois,
    Rdap,
    None,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WhoisReport {
    pub domain: String,
    pub data: WhoisRecord,
    pub raw_text: String,
    pub source: WhoisOrigin,
}

#[derive(Clone)]
pub struct WhoisResolver {
    whois: Arc<dyn WhoisSource>,
    rdap: Arc<dyn RdapSource>,
}

impl WhoisResolver {
    pub fn new(whois: Arc<dyn WhoisSource>, rdap: Arc<dyn RdapSource>) -> Self {
        Self { whois, rdap }
    }

    pub async fn resolve(&self, domain: &str) -> WhoisRecord {
        self.resolve_with_origin(domain).await.0
    }

    pub async fn resolve_report(&self, domain: &str) -> WhoisReport {
        let (data, source) = self.resolve_with_origin(domain).await;
        WhoisReport {
            domain: domain.to_string(),
            raw_text: data.to_text(domain),
            data,
            source,
        }
    }

    async fn resolve_with_origin(&self, domain: &str) -> (WhoisRecord, WhoisOrigin) {
        info!("Resolving registration data for {}", domain);

        match self.whois.lookup(domain).await {
            Ok(raw) => match reject_reason(&raw) {
                None => return (WhoisRecord::from_raw(&raw), WhoisOrigin::Whois),
                Some(reason) => debug!("WHOIS answer for {} rejected: {}", domain, reason),
            },
            Err(e) => warn!("WHOIS lookup failed for {}: {}", domain, e),
        }

        match self.rdap.domain(domain).await {
            Ok(Some(json)) => (normalize_rdap(&json), WhoisOrigin::Rdap),
            Ok(None) => {
                debug!("RDAP has no record for {}", domain);
                (WhoisRecord::default(), WhoisOrigin::None)
            }
            Err(e) => {
                warn!("RDAP lookup failed for {}: {}", domain, e);
                (WhoisRecord::default(), WhoisOrigin::None)
            }
        }
    }
}

fn reject_reason(raw: &RawWhois) -> Option<&'static str> {
    if populated_fields(raw) <= 1 {
        return Some("response has at most one populated field");
    }
    // RawWhois always serializes; an empty string only skips the phrase check
    let serialized = serde_json::to_string(raw).unwrap_or_default();
    if is_soft_failure(&serialized) {
        return Some("response contains a soft-failure notice");
    }
    None
}
