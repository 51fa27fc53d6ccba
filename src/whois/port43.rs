// src/whois/port43.rs
// =============================================================================
// Plain-text WHOIS over TCP port 43.
//
// How a lookup works:
// 1. Ask the starting server (whois.iana.org by default) about the domain
// 2. If the answer names a more specific server ("refer:", "whois:" or
//    "Registrar WHOIS Server:"), ask that one, up to `follow` times
// 3. Parse the most useful answer's "Key: Value" lines into a RawWhois map
//
// Only answers about the queried domain count. The root server answers with
// the TLD's own record ("domain: COM"), which is used for its referral and
// then discarded; when nothing else answers, the lookup comes back empty.
//
// There is no standard response format, so the parser is best effort:
// keys are camelCased ("Registry Expiry Date" -> "registryExpiryDate") and
// repeated keys keep every value.
// =============================================================================

use super::record::{populated_fields, RawWhois};
use crate::config::ProbeConfig;
use crate::error::ProbeError;
use async_trait::async_trait;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, warn};

// Anything that can answer a WHOIS query with a parsed key/value map
#[async_trait]
pub trait WhoisSource: Send + Sync {
    async fn lookup(&self, domain: &str) -> Result<RawWhois, ProbeError>;
}

// Caps a single response; real records are a few KB
const MAX_RESPONSE_BYTES: u64 = 256 * 1024;

// Keys longer than this are prose sentences that happen to contain a colon
const MAX_KEY_LEN: usize = 60;

#[derive(Debug, Clone)]
pub struct Port43Whois {
    server: String,
    port: u16,
    follow: usize,
    timeout: Duration,
}

impl Port43Whois {
    pub fn new(config: &ProbeConfig) -> Self {
        Self {
            server: config.whois_server.clone(),
            port: config.whois_port,
            follow: config.whois_follow,
            timeout: config.request_timeout(),
        }
    }

    // Sends one query and reads the whole answer.
    // The whole exchange (connect + write + read) shares one deadline.
    async fn query(&self, host: &str, port: u16, domain: &str) -> Result<String, ProbeError> {
        let exchange = async {
            let mut stream = TcpStream::connect((host, port)).await?;
            stream.write_all(format!("{}\r\n", domain).as_bytes()).await?;

            let mut buffer = Vec::new();
            stream.take(MAX_RESPONSE_BYTES).read_to_end(&mut buffer).await?;
            Ok::<_, std::io::Error>(String::from_utf8_lossy(&buffer).into_owned())
        };

        match tokio::time::timeout(self.timeout, exchange).await {
            Ok(Ok(text)) => Ok(text),
            Ok(Err(e)) => Err(ProbeError::whois(
                domain,
                format!("query to {}:{} failed: {}", host, port, e),
            )),
            Err(_) => Err(ProbeError::whois(
                domain,
                format!("query to {}:{} timed out after {:?}", host, port, self.timeout),
            )),
        }
    }
}

#[async_trait]
impl WhoisSource for Port43Whois {
    async fn lookup(&self, domain: &str) -> Result<RawWhois, ProbeError> {
        let mut host = self.server.clone();
        let mut port = self.port;
        let mut best: Option<RawWhois> = None;

        for hop in 0..=self.follow {
            debug!("WHOIS query for {} at {}:{}", domain, host, port);
            let text = match self.query(&host, port, domain).await {
                Ok(text) => text,
                // A dead registrar referral keeps the registry answer already in hand
                Err(e) if best.is_some() => {
                    warn!("WHOIS referral to {}:{} failed: {}", host, port, e);
                    break;
                }
                Err(e) => return Err(e),
            };
            let parsed = parse_whois_text(&text);
            let referral = find_referral(&parsed);

            // A registrar answer with real data beats the registry's thin record,
            // but a near-empty referral answer must not replace a good one.
            let keep = describes_domain(&parsed, domain, hop)
                && match &best {
                    Some(current) => {
                        populated_fields(&parsed) > 1 || populated_fields(current) <= 1
                    }
                    None => true,
                };
            if keep {
                best = Some(parsed);
            } else {
                debug!("Ignoring WHOIS answer from {}:{} for {}", host, port, domain);
            }

            let Some(next) = referral else { break };
            let (next_host, next_port) = split_host_port(&next, self.port);
            if hop == self.follow || (next_host.eq_ignore_ascii_case(&host) && next_port == port) {
                break;
            }
            host = next_host;
            port = next_port;
        }

        Ok(best.unwrap_or_default())
    }
}

// Parses "Key: Value" lines.
//
// Skips blank lines and the comment/footer styles registries use
// ("%", "#", ">>> Last update of WHOIS database"). Keys with empty values
// are ignored so redacted-but-empty fields do not count as data.
pub fn parse_whois_text(text: &str) -> RawWhois {
    let mut raw = RawWhois::new();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('%') || line.starts_with('#') || line.starts_with(">>>") {
            continue;
        }

        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim();
        let value = value.trim();
        if key.is_empty() || value.is_empty() || key.len() > MAX_KEY_LEN {
            continue;
        }

        let key = camel_case(key);
        if key.is_empty() {
            continue;
        }
        raw.entry(key).or_default().push(value.to_string());
    }

    raw
}

// "Registrar IANA ID" -> "registrarIanaId", "DNSSEC" -> "dnssec"
fn camel_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for word in key
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|word| !word.is_empty())
    {
        let lower = word.to_ascii_lowercase();
        if out.is_empty() {
            out.push_str(&lower);
        } else {
            let mut chars = lower.chars();
            if let Some(first) = chars.next() {
                out.push(first.to_ascii_uppercase());
                out.push_str(chars.as_str());
            }
        }
    }
    out
}

// Whether an answer is about `domain` itself.
//
// An answer naming a different object (the TLD, in a root server's answer)
// never is. An answer naming nothing is trusted only after a referral, since
// the first server is the root unless configured otherwise.
fn describes_domain(raw: &RawWhois, domain: &str, hop: usize) -> bool {
    let wanted = domain.trim_end_matches('.');
    let mut names = ["domainName", "domain"]
        .into_iter()
        .filter_map(|key| raw.get(key))
        .flatten()
        .map(|name| name.trim().trim_end_matches('.'))
        .peekable();

    if names.peek().is_none() {
        return hop > 0;
    }
    names.any(|name| name.eq_ignore_ascii_case(wanted))
}

// Next server to ask, if the response points somewhere more specific
fn find_referral(raw: &RawWhois) -> Option<String> {
    ["refer", "whois", "registrarWhoisServer"]
        .iter()
        .filter_map(|key| raw.get(*key))
        .flat_map(|values| values.iter())
        .map(|value| clean_server(value))
        .find(|server| !server.is_empty())
}

// Referrals sometimes come as "whois://host" or "http://host/"
fn clean_server(value: &str) -> String {
    let value = value.trim();
    let value = value
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(value);
    value.trim_end_matches('/').split('/').next().unwrap_or_default().to_string()
}

// "whois.example.net:4343" -> ("whois.example.net", 4343)
fn split_host_port(server: &str, default_port: u16) -> (String, u16) {
    match server.rsplit_once(':') {
        Some((host, port)) => match port.parse::<u16>() {
            Ok(port) => (host.to_string(), port),
            Err(_) => (server.to_string(), default_port),
        },
        None => (server.to_string(), default_port),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncBufReadExt, BufReader};
    use tokio::net::TcpListener;

    const VERISIGN_STYLE: &str = "   Domain Name: EXAMPLE.COM\r
   Registry Domain ID: 2336799_DOMAIN_COM-VRSN\r
   Updated Date: 2024-08-14T07:01:34Z\r
   Creation Date: 1995-08-14T04:00:00Z\r
   Registry Expiry Date: 2025-08-13T04:00:00Z\r
   Registrar: RESERVED-Internet Assigned Numbers Authority\r
   Registrar IANA ID: 376\r
   Domain Status: clientDeleteProhibited https://icann.org/epp#clientDeleteProhibited\r
   Domain Status: clientTransferProhibited https://icann.org/epp#clientTransferProhibited\r
   Name Server: A.IANA-SERVERS.NET\r
   Name Server: B.IANA-SERVERS.NET\r
   DNSSEC: signedDelegation\r
>>> Last update of whois database: 2024-09-01T00:00:00Z <<<\r
\r
% NOTICE: comment line\r
";

    // Serves one canned answer per connection, returns the bound port
    async fn serve(responses: Vec<String>) -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            for response in responses {
                let (mut socket, _) = listener.accept().await.unwrap();
                let mut line = String::new();
                let (reader, mut writer) = socket.split();
                BufReader::new(reader).read_line(&mut line).await.unwrap();
                writer.write_all(response.as_bytes()).await.unwrap();
            }
        });
        port
    }

    fn client(port: u16) -> Port43Whois {
        let config = ProbeConfig {
            whois_server: "127.0.0.1".to_string(),
            whois_port: port,
            request_timeout_secs: 2,
            ..ProbeConfig::default()
        };
        Port43Whois::new(&config)
    }

    #[test]
    fn test_camel_case_keys() {
        assert_eq!(camel_case("Registry Expiry Date"), "registryExpiryDate");
        assert_eq!(camel_case("Registrar IANA ID"), "registrarIanaId");
        assert_eq!(camel_case("DNSSEC"), "dnssec");
        assert_eq!(camel_case("nserver"), "nserver");
        assert_eq!(camel_case("Registrar WHOIS Server"), "registrarWhoisServer");
    }

    #[test]
    fn test_parse_collects_repeated_keys() {
        let raw = parse_whois_text(VERISIGN_STYLE);
        assert_eq!(raw.get("domainName").unwrap(), &vec!["EXAMPLE.COM".to_string()]);
        assert_eq!(raw.get("nameServer").unwrap().len(), 2);
        assert_eq!(raw.get("domainStatus").unwrap().len(), 2);
        assert!(!raw.keys().any(|k| k.contains("lastUpdate") || k.contains("notice")));
    }

    #[test]
    fn test_referral_cleanup() {
        assert_eq!(clean_server("whois://whois.nic.example/"), "whois.nic.example");
        assert_eq!(clean_server(" whois.markmonitor.com "), "whois.markmonitor.com");
        assert_eq!(
            split_host_port("127.0.0.1:4343", 43),
            ("127.0.0.1".to_string(), 4343)
        );
        assert_eq!(split_host_port("whois.nic.io", 43), ("whois.nic.io".to_string(), 43));
    }

    #[tokio::test]
    async fn test_lookup_single_server() {
        let port = serve(vec![VERISIGN_STYLE.to_string()]).await;
        let raw = client(port).lookup("example.com").await.unwrap();
        assert!(populated_fields(&raw) > 5);
        assert_eq!(raw.get("registrarIanaId").unwrap()[0], "376");
    }

    #[tokio::test]
    async fn test_lookup_follows_referral() {
        let registry_port = serve(vec![VERISIGN_STYLE.to_string()]).await;
        let iana = format!(
            "% IANA WHOIS server\r\n\r\nrefer:        127.0.0.1:{}\r\n\r\ndomain:       COM\r\n",
            registry_port
        );
        let iana_port = serve(vec![iana]).await;

        let raw = client(iana_port).lookup("example.com").await.unwrap();
        assert_eq!(raw.get("domainName").unwrap()[0], "EXAMPLE.COM");
        assert!(raw.get("refer").is_none());
    }

    // What whois.iana.org says about a TLD without a port-43 server
    const IANA_TLD_ONLY: &str = "% IANA WHOIS server\r
\r
domain:       VN\r
\r
organisation: Ministry of Information and Communications\r
\r
nserver:      A.DNS-SERVERS.VN 194.0.1.18\r
status:       ACTIVE\r
created:      1994-04-14\r
changed:      2023-01-01\r
";

    async fn closed_port() -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        port
    }

    #[test]
    fn test_describes_domain() {
        let registry = parse_whois_text(VERISIGN_STYLE);
        assert!(describes_domain(&registry, "example.com", 0));
        assert!(!describes_domain(&registry, "other.com", 1));

        let root = parse_whois_text(IANA_TLD_ONLY);
        assert!(!describes_domain(&root, "example.vn", 0));

        let unnamed = parse_whois_text("Registrar: Example Registrar\r\n");
        assert!(!describes_domain(&unnamed, "example.com", 0));
        assert!(describes_domain(&unnamed, "example.com", 1));
    }

    #[tokio::test]
    async fn test_root_answer_alone_is_empty() {
        let port = serve(vec![IANA_TLD_ONLY.to_string()]).await;
        let raw = client(port).lookup("example.vn").await.unwrap();
        assert!(raw.is_empty());
    }

    #[tokio::test]
    async fn test_dead_registry_referral_is_error() {
        let dead = closed_port().await;
        let iana = format!("refer:        127.0.0.1:{}\r\n\r\ndomain:       COM\r\n", dead);
        let port = serve(vec![iana]).await;

        let err = client(port).lookup("example.com").await.unwrap_err();
        assert!(matches!(err, ProbeError::Whois { .. }));
    }

    #[tokio::test]
    async fn test_dead_registrar_referral_keeps_registry_answer() {
        let dead = closed_port().await;
        let registry = format!(
            "{}   Registrar WHOIS Server: 127.0.0.1:{}\r\n",
            VERISIGN_STYLE, dead
        );
        let registry_port = serve(vec![registry]).await;
        let iana = format!(
            "refer:        127.0.0.1:{}\r\n\r\ndomain:       COM\r\n",
            registry_port
        );
        let iana_port = serve(vec![iana]).await;

        let raw = client(iana_port).lookup("example.com").await.unwrap();
        assert_eq!(raw.get("domainName").unwrap()[0], "EXAMPLE.COM");
    }

    #[tokio::test]
    async fn test_root_answer_falls_through_to_rdap() {
        use crate::whois::{RdapSource, WhoisOrigin, WhoisResolver};
        use serde_json::{json, Value};
        use std::sync::Arc;

        struct RegistryRdap;

        #[async_trait]
        impl RdapSource for RegistryRdap {
            async fn domain(&self, domain: &str) -> Result<Option<Value>, ProbeError> {
                Ok(Some(json!({
                    "ldhName": domain,
                    "status": ["active"],
                    "nameservers": [{ "ldhName": "ns1.example.vn" }]
                })))
            }
        }

        let port = serve(vec![IANA_TLD_ONLY.to_string()]).await;
        let resolver = WhoisResolver::new(Arc::new(client(port)), Arc::new(RegistryRdap));

        let report = resolver.resolve_report("example.vn").await;
        assert_eq!(report.source, WhoisOrigin::Rdap);
        assert_eq!(report.data.domain_name.as_deref(), Some("example.vn"));
        assert_eq!(report.data.name_server, Some(vec!["ns1.example.vn".to_string()]));
    }

    #[tokio::test]
    async fn test_connection_refused_is_error() {
        let port = closed_port().await;

        let err = client(port).lookup("example.com").await.unwrap_err();
        assert!(matches!(err, ProbeError::Whois { .. }));
    }
}
