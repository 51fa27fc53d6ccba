// src/scan.rs
// =============================================================================
// Runs several probes against one site and stores the combined snapshot.
//
// Flow:
// 1. Normalize the URL once; its host is the record key
// 2. Start every selected probe at the same time (they share nothing)
// 3. Put each probe's JSON output in its slot of a DomainScanRecord
// 4. Upsert the record, so slots from earlier scans survive
//
// The probes never fail (they encode errors in their own output), so the
// only errors a scan can return are bad input and storage problems.
// =============================================================================

use crate::audit::{RobotsValidator, SecurityAuditor};
use crate::checker::LinkScanner;
use crate::error::ProbeError;
use crate::redirect::RedirectTracer;
use crate::store::{DomainScanRecord, DomainStore};
use crate::target::{host_of, normalize_domain, normalize_url};
use crate::whois::WhoisResolver;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::future::Future;
use std::sync::Arc;
use tracing::{info, warn};

/// One probe a scan can run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanTool {
    Redirect,
    #[value(name = "broken_links")]
    BrokenLinks,
    Security,
    Robots,
    Whois,
}

pub struct Scanner {
    tracer: RedirectTracer,
    links: LinkScanner,
    page_link_limit: Option<usize>,
    auditor: SecurityAuditor,
    robots: RobotsValidator,
    resolver: WhoisResolver,
    store: Arc<dyn DomainStore>,
}

impl Scanner {
    pub fn new(
        tracer: RedirectTracer,
        links: LinkScanner,
        page_link_limit: Option<usize>,
        auditor: SecurityAuditor,
        robots: RobotsValidator,
        resolver: WhoisResolver,
        store: Arc<dyn DomainStore>,
    ) -> Self {
        Self {
            tracer,
            links,
            page_link_limit,
            auditor,
            robots,
            resolver,
            store,
        }
    }

    pub async fn scan(&self, input: &str, tools: &[ScanTool]) -> Result<DomainScanRecord, ProbeError> {
        if tools.is_empty() {
            return Err(ProbeError::invalid_input(input, "select at least one tool"));
        }

        let url = normalize_url(input)?;
        let host = host_of(&url)?;
        let wants = |tool: ScanTool| tools.contains(&tool);

        info!("Scanning {} with {:?}", host, tools);

        let (redirect, links, security, robots, whois) = tokio::join!(
            run_if(wants(ScanTool::Redirect), async {
                to_json(&self.tracer.trace(&url).await)
            }),
            run_if(wants(ScanTool::BrokenLinks), async {
                to_json(&self.links.scan_page(&url, self.page_link_limit).await)
            }),
            run_if(wants(ScanTool::Security), async {
                to_json(&self.auditor.audit(&url).await)
            }),
            run_if(wants(ScanTool::Robots), async {
                to_json(&self.robots.check(&url).await)
            }),
            run_if(wants(ScanTool::Whois), self.whois_slot(&host)),
        );

        let mut record = DomainScanRecord::new(host);
        record.redirect_data = redirect.transpose()?;
        record.broken_links_data = links.transpose()?;
        record.security_data = security.transpose()?;
        record.robots_data = robots.transpose()?;
        record.whois_data = whois.transpose()?;

        self.store.upsert_domain(record).await
    }

    // { "domain": ..., "data": WhoisRecord }
    async fn whois_slot(&self, host: &str) -> Result<Value, ProbeError> {
        let domain = match normalize_domain(host) {
            Ok(domain) => domain,
            Err(e) => {
                warn!("Skipping WHOIS for {}: {}", host, e);
                return Ok(json!({ "domain": host, "data": {} }));
            }
        };

        let data = self.resolver.resolve(&domain).await;
        Ok(json!({ "domain": domain, "data": to_json(&data)? }))
    }
}

async fn run_if<F, T>(enabled: bool, probe: F) -> Option<T>
where
    F: Future<Output = T>,
{
    if enabled {
        Some(probe.await)
    } else {
        None
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<Value, ProbeError> {
    Ok(serde_json::to_value(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checker::LinkValidator;
    use crate::client::ProbeClient;
    use crate::config::ProbeConfig;
    use crate::store::JsonFileStore;
    use crate::whois::{RdapSource, WhoisSource};
    use async_trait::async_trait;
    use std::collections::BTreeMap;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct StaticWhois;

    #[async_trait]
    impl WhoisSource for StaticWhois {
        async fn lookup(&self, _domain: &str) -> Result<BTreeMap<String, Vec<String>>, ProbeError> {
            let mut raw = BTreeMap::new();
            raw.insert("domainName".to_string(), vec!["SITE.TEST".to_string()]);
            raw.insert("registrar".to_string(), vec!["Test Registrar".to_string()]);
            Ok(raw)
        }
    }

    struct NoRdap;

    #[async_trait]
    impl RdapSource for NoRdap {
        async fn domain(&self, _domain: &str) -> Result<Option<Value>, ProbeError> {
            Ok(None)
        }
    }

    fn scanner(dir: &TempDir) -> Scanner {
        let config = ProbeConfig::default();
        let client = ProbeClient::new(&config).unwrap();
        let validator = LinkValidator::new(client.clone(), config.link_timeout(), 4);
        Scanner::new(
            RedirectTracer::new(client.clone(), config.max_redirects),
            LinkScanner::new(client.clone(), validator),
            config.page_link_limit,
            SecurityAuditor::new(client.clone()),
            RobotsValidator::new(client),
            WhoisResolver::new(Arc::new(StaticWhois), Arc::new(NoRdap)),
            Arc::new(JsonFileStore::new(dir.path().join("scans.json"))),
        )
    }

    async fn site() -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\n"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"<html><body><a href="/ok">ok</a></body></html>"#),
            )
            .mount(&server)
            .await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(200).insert_header("x-frame-options", "DENY"))
            .mount(&server)
            .await;
        server
    }

    #[test]
    fn test_tool_names() {
        assert_eq!(ScanTool::from_str("broken_links", true).unwrap(), ScanTool::BrokenLinks);
        assert_eq!(serde_json::to_value(ScanTool::BrokenLinks).unwrap(), "broken_links");
    }

    #[tokio::test]
    async fn test_scan_fills_selected_slots_only() {
        let dir = TempDir::new().unwrap();
        let server = site().await;

        let record = scanner(&dir)
            .scan(&format!("{}/", server.uri()), &[ScanTool::Security, ScanTool::Robots])
            .await
            .unwrap();

        assert_eq!(record.domain, "127.0.0.1");
        assert!(record.redirect_data.is_none());
        assert!(record.broken_links_data.is_none());
        assert!(record.whois_data.is_none());
        assert_eq!(record.robots_data.unwrap()["isValid"], true);
        assert_eq!(record.security_data.unwrap().as_array().unwrap().len(), 6);
    }

    #[tokio::test]
    async fn test_rescan_keeps_earlier_slots() {
        let dir = TempDir::new().unwrap();
        let server = site().await;
        let scanner = scanner(&dir);
        let url = format!("{}/", server.uri());

        scanner.scan(&url, &[ScanTool::Redirect]).await.unwrap();
        let record = scanner
            .scan(&url, &[ScanTool::BrokenLinks, ScanTool::Whois])
            .await
            .unwrap();

        assert_eq!(record.redirect_data.unwrap()["hops"].as_array().unwrap().len(), 1);
        assert_eq!(record.broken_links_data.unwrap()["totalLinks"], 1);
        let whois = record.whois_data.unwrap();
        assert_eq!(whois["domain"], "127.0.0.1");
        assert_eq!(whois["data"]["registrar"], "Test Registrar");
    }

    #[tokio::test]
    async fn test_scan_requires_a_tool() {
        let dir = TempDir::new().unwrap();
        let err = scanner(&dir).scan("example.com", &[]).await.unwrap_err();
        assert!(err.is_input_error());
    }

    #[tokio::test]
    async fn test_scan_rejects_bad_url_before_probing() {
        let dir = TempDir::new().unwrap();
        let err = scanner(&dir)
            .scan("https://", &[ScanTool::Redirect])
            .await
            .unwrap_err();
        assert!(err.is_input_error());
        assert!(!dir.path().join("scans.json").exists());
    }
}
