// src/whois/rdap.rs
// =============================================================================
// RDAP (Registration Data Access Protocol) lookups.
//
// RDAP answers with structured JSON, so unlike port-43 WHOIS there is no text
// parsing; the work is picking the right entities and events out of the
// response and renaming them to the canonical WhoisRecord fields.
// =============================================================================

use super::record::WhoisRecord;
use crate::config::ProbeConfig;
use crate::error::ProbeError;
use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::{redirect, Client, StatusCode};
use serde_json::Value;
use tracing::debug;

#[async_trait]
pub trait RdapSource: Send + Sync {
    /// The raw RDAP domain object, or None when the registry has no record
    async fn domain(&self, domain: &str) -> Result<Option<Value>, ProbeError>;
}

// RDAP over HTTPS through a bootstrap service.
//
// rdap.org answers every query with a redirect to the authoritative
// registry, so this client (unlike the probe client) follows redirects.
#[derive(Debug, Clone)]
pub struct HttpRdap {
    http: Client,
    base_url: String,
}

impl HttpRdap {
    pub fn new(config: &ProbeConfig) -> Result<Self, ProbeError> {
        let http = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.request_timeout())
            .redirect(redirect::Policy::limited(5))
            .build()
            .map_err(|e| ProbeError::Config(format!("Failed to create RDAP HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.rdap_base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl RdapSource for HttpRdap {
    async fn domain(&self, domain: &str) -> Result<Option<Value>, ProbeError> {
        let url = format!("{}/domain/{}", self.base_url, domain);
        debug!("RDAP request to {}", url);

        let response = self
            .http
            .get(&url)
            .header(ACCEPT, "application/rdap+json, application/json")
            .send()
            .await
            .map_err(|e| ProbeError::rdap(domain, format!("Request failed: {}", e)))?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let json = response
                    .json::<Value>()
                    .await
                    .map_err(|e| ProbeError::rdap(domain, format!("Failed to parse JSON: {}", e)))?;
                Ok(Some(json))
            }
            status => Err(ProbeError::rdap(
                domain,
                format!("RDAP server returned {}", status.as_u16()),
            )),
        }
    }
}

// Maps an RDAP domain object onto the canonical record.
//
// - registrar: "fn" of the entity whose roles include "registrar"
// - registrant: "fn" and "org" of the entity whose roles include "registrant"
// - dates: events "registration", "last changed", "expiration"
// - status: first entry of the status list
// - name servers: every nameserver's ldhName, in response order
pub fn normalize_rdap(json: &Value) -> WhoisRecord {
    let entities = json.get("entities").and_then(Value::as_array);
    let registrar = entities.and_then(|list| find_entity(list, "registrar"));
    let registrant = entities.and_then(|list| find_entity(list, "registrant"));

    let name_server: Vec<String> = json
        .get("nameservers")
        .and_then(Value::as_array)
        .map(|servers| {
            servers
                .iter()
                .filter_map(|ns| ns.get("ldhName").and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    WhoisRecord {
        domain_name: string_field(json, "ldhName"),
        registrar: registrar.and_then(|e| vcard_value(e, "fn")),
        registrar_iana_id: registrar.and_then(iana_registrar_id),
        status: json
            .get("status")
            .and_then(Value::as_array)
            .and_then(|statuses| statuses.first())
            .and_then(Value::as_str)
            .map(str::to_string),
        creation_date: event_date(json, "registration"),
        updated_date: event_date(json, "last changed"),
        expiration_date: event_date(json, "expiration"),
        registrant_name: registrant.and_then(|e| vcard_value(e, "fn")),
        registrant_organization: registrant.and_then(|e| vcard_value(e, "org")),
        name_server: if name_server.is_empty() {
            None
        } else {
            Some(name_server)
        },
        dnssec: json
            .get("secureDNS")
            .and_then(|dns| dns.get("delegationSigned"))
            .and_then(Value::as_bool)
            .map(|signed| if signed { "signedDelegation" } else { "unsigned" }.to_string()),
        ..Default::default()
    }
}

fn string_field(json: &Value, key: &str) -> Option<String> {
    json.get(key).and_then(Value::as_str).map(str::to_string)
}

fn find_entity<'a>(entities: &'a [Value], role: &str) -> Option<&'a Value> {
    entities.iter().find(|entity| {
        entity
            .get("roles")
            .and_then(Value::as_array)
            .map(|roles| roles.iter().any(|r| r.as_str() == Some(role)))
            .unwrap_or(false)
    })
}

// Reads one property from a jCard: ["vcard", [[name, params, type, value], ...]]
//
// "org" may carry a list of organizational units; the first one is the name.
fn vcard_value(entity: &Value, property: &str) -> Option<String> {
    let items = entity.get("vcardArray")?.as_array()?.get(1)?.as_array()?;

    items
        .iter()
        .filter_map(Value::as_array)
        .find(|item| item.first().and_then(Value::as_str) == Some(property))
        .and_then(|item| item.get(3))
        .and_then(|value| match value {
            Value::String(s) => Some(s.clone()),
            Value::Array(parts) => parts.first().and_then(Value::as_str).map(str::to_string),
            _ => None,
        })
        .filter(|s| !s.is_empty())
}

fn iana_registrar_id(entity: &Value) -> Option<String> {
    entity
        .get("publicIds")?
        .as_array()?
        .iter()
        .find(|id| id.get("type").and_then(Value::as_str) == Some("IANA Registrar ID"))
        .and_then(|id| id.get("identifier"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn event_date(json: &Value, action: &str) -> Option<String> {
    json.get("events")?
        .as_array()?
        .iter()
        .find(|event| event.get("eventAction").and_then(Value::as_str) == Some(action))
        .and_then(|event| event.get("eventDate"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sample() -> Value {
        json!({
            "objectClassName": "domain",
            "ldhName": "EXAMPLE.COM",
            "status": ["client delete prohibited", "client transfer prohibited"],
            "entities": [
                {
                    "roles": ["registrar"],
                    "publicIds": [{ "type": "IANA Registrar ID", "identifier": "376" }],
                    "vcardArray": ["vcard", [
                        ["version", {}, "text", "4.0"],
                        ["fn", {}, "text", "RESERVED-Internet Assigned Numbers Authority"]
                    ]]
                },
                {
                    "roles": ["technical", "registrant"],
                    "vcardArray": ["vcard", [
                        ["fn", {}, "text", "Domain Administrator"],
                        ["org", {}, "text", "Example Org"]
                    ]]
                }
            ],
            "events": [
                { "eventAction": "registration", "eventDate": "1995-08-14T04:00:00Z" },
                { "eventAction": "expiration", "eventDate": "2025-08-13T04:00:00Z" },
                { "eventAction": "last changed", "eventDate": "2024-08-14T07:01:34Z" },
                { "eventAction": "last update of RDAP database", "eventDate": "2024-09-01T00:00:00Z" }
            ],
            "nameservers": [
                { "objectClassName": "nameserver", "ldhName": "A.IANA-SERVERS.NET" },
                { "objectClassName": "nameserver", "ldhName": "B.IANA-SERVERS.NET" }
            ],
            "secureDNS": { "delegationSigned": true }
        })
    }

    #[test]
    fn test_normalize_full_response() {
        let record = normalize_rdap(&sample());
        assert_eq!(record.domain_name.as_deref(), Some("EXAMPLE.COM"));
        assert_eq!(
            record.registrar.as_deref(),
            Some("RESERVED-Internet Assigned Numbers Authority")
        );
        assert_eq!(record.registrar_iana_id.as_deref(), Some("376"));
        assert_eq!(record.registrant_name.as_deref(), Some("Domain Administrator"));
        assert_eq!(record.registrant_organization.as_deref(), Some("Example Org"));
        assert_eq!(record.creation_date.as_deref(), Some("1995-08-14T04:00:00Z"));
        assert_eq!(record.expiration_date.as_deref(), Some("2025-08-13T04:00:00Z"));
        assert_eq!(record.updated_date.as_deref(), Some("2024-08-14T07:01:34Z"));
        assert_eq!(record.status.as_deref(), Some("client delete prohibited"));
        assert_eq!(
            record.name_server,
            Some(vec!["A.IANA-SERVERS.NET".to_string(), "B.IANA-SERVERS.NET".to_string()])
        );
        assert_eq!(record.dnssec.as_deref(), Some("signedDelegation"));
    }

    #[test]
    fn test_normalize_sparse_response() {
        let record = normalize_rdap(&json!({ "ldhName": "sparse.test" }));
        assert_eq!(record.domain_name.as_deref(), Some("sparse.test"));
        assert!(record.registrar.is_none());
        assert!(record.name_server.is_none());
        assert!(record.status.is_none());
    }

    #[test]
    fn test_vcard_org_as_list() {
        let entity = json!({
            "vcardArray": ["vcard", [["org", {}, "text", ["Example Org", "Unit"]]]]
        });
        assert_eq!(vcard_value(&entity, "org").as_deref(), Some("Example Org"));
        assert_eq!(vcard_value(&entity, "fn"), None);
    }

    fn rdap_for(server: &MockServer) -> HttpRdap {
        let config = ProbeConfig {
            rdap_base_url: format!("{}/", server.uri()),
            ..ProbeConfig::default()
        };
        HttpRdap::new(&config).unwrap()
    }

    #[tokio::test]
    async fn test_http_rdap_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/domain/example.com"))
            .respond_with(ResponseTemplate::new(200).set_body_json(sample()))
            .mount(&server)
            .await;

        let json = rdap_for(&server).domain("example.com").await.unwrap();
        assert_eq!(json.unwrap()["ldhName"], "EXAMPLE.COM");
    }

    #[tokio::test]
    async fn test_http_rdap_follows_bootstrap_redirect() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/domain/example.com"))
            .respond_with(
                ResponseTemplate::new(302).insert_header("location", "/registry/domain/example.com"),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/registry/domain/example.com"))
            .respond_with(ResponseTemplate::new(200).set_body_json(sample()))
            .mount(&server)
            .await;

        let json = rdap_for(&server).domain("example.com").await.unwrap();
        assert!(json.is_some());
    }

    #[tokio::test]
    async fn test_http_rdap_not_found_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        assert!(rdap_for(&server).domain("nope.test").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_http_rdap_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = rdap_for(&server).domain("example.com").await.unwrap_err();
        assert!(matches!(err, ProbeError::Rdap { .. }));
    }
}
