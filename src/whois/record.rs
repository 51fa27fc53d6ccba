// src/whois/record.rs
// =============================================================================
// The canonical WHOIS record.
//
// Two sources fill this record: port-43 WHOIS (free-form "Key: Value" text)
// and RDAP (structured JSON). Both are mapped onto the same fixed set of
// optional fields so callers never care where the data came from. Keys that
// have no canonical field are dropped, never passed through.
// =============================================================================

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Parsed port-43 response: camelCased key -> every value seen for that key
pub type RawWhois = BTreeMap<String, Vec<String>>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WhoisRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registrar: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registrar_iana_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creation_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiration_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registrant_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registrant_organization: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registrant_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registrant_country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tech_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tech_organization: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tech_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_organization: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_server: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dnssec: Option<String>,
}

// WHOIS-native spellings for each canonical field, most specific first.
// Keys are already camelCased by the port-43 parser.
const DOMAIN_NAME_KEYS: &[&str] = &["domainName", "domain"];
const REGISTRAR_KEYS: &[&str] = &["registrar", "registrarName", "sponsoringRegistrar"];
const REGISTRAR_ID_KEYS: &[&str] = &["registrarIanaId", "registrarId"];
const STATUS_KEYS: &[&str] = &["domainStatus", "status"];
const CREATION_KEYS: &[&str] = &["creationDate", "createdDate", "created", "registeredOn"];
const UPDATED_KEYS: &[&str] = &["updatedDate", "lastUpdated", "lastModified", "changed"];
const EXPIRATION_KEYS: &[&str] = &[
    "registryExpiryDate",
    "registrarRegistrationExpirationDate",
    "expirationDate",
    "expiryDate",
    "expiresOn",
    "paidTill",
];
const NAME_SERVER_KEYS: &[&str] = &["nameServer", "nameServers", "nserver"];

impl WhoisRecord {
    // Maps a parsed port-43 response onto the canonical fields.
    pub fn from_raw(raw: &RawWhois) -> Self {
        let first = |keys: &[&str]| first_value(raw, keys);

        WhoisRecord {
            domain_name: first(DOMAIN_NAME_KEYS),
            registrar: first(REGISTRAR_KEYS),
            registrar_iana_id: first(REGISTRAR_ID_KEYS),
            status: first(STATUS_KEYS).map(|s| strip_status_link(&s)),
            creation_date: first(CREATION_KEYS),
            updated_date: first(UPDATED_KEYS),
            expiration_date: first(EXPIRATION_KEYS),
            registrant_name: first_value(raw, &["registrantName"]),
            registrant_organization: first_value(raw, &["registrantOrganization"]),
            registrant_email: first_value(raw, &["registrantEmail"]),
            registrant_country: first_value(raw, &["registrantCountry"]),
            tech_name: first_value(raw, &["techName"]),
            tech_organization: first_value(raw, &["techOrganization"]),
            tech_email: first_value(raw, &["techEmail"]),
            admin_name: first_value(raw, &["adminName"]),
            admin_organization: first_value(raw, &["adminOrganization"]),
            admin_email: first_value(raw, &["adminEmail"]),
            name_server: collect_name_servers(raw),
            dnssec: first_value(raw, &["dnssec"]),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == WhoisRecord::default()
    }

    // Renders the record as the familiar column-aligned WHOIS text.
    //
    // Empty fields are left out; the blank separator lines between the
    // registration, registrant, tech, admin and name server sections stay.
    pub fn to_text(&self, domain: &str) -> String {
        let mut lines = vec![format!("WHOIS Information for {}", domain)];

        push_field(&mut lines, "Domain Name:", &self.domain_name);
        push_field(&mut lines, "Registrar ID:", &self.registrar_iana_id);
        push_field(&mut lines, "Registrar Name:", &self.registrar);
        push_field(&mut lines, "Status:", &self.status);
        push_field(&mut lines, "Creation Date:", &self.creation_date);
        push_field(&mut lines, "Updated Date:", &self.updated_date);
        push_field(&mut lines, "Expiration Date:", &self.expiration_date);
        lines.push(String::new());
        push_field(&mut lines, "Registrant Name:", &self.registrant_name);
        push_field(&mut lines, "Registrant Organization:", &self.registrant_organization);
        push_field(&mut lines, "Registrant Email:", &self.registrant_email);
        push_field(&mut lines, "Registrant Country:", &self.registrant_country);
        lines.push(String::new());
        push_field(&mut lines, "Tech Name:", &self.tech_name);
        push_field(&mut lines, "Tech Organization:", &self.tech_organization);
        push_field(&mut lines, "Tech Email:", &self.tech_email);
        lines.push(String::new());
        push_field(&mut lines, "Admin Name:", &self.admin_name);
        push_field(&mut lines, "Admin Organization:", &self.admin_organization);
        push_field(&mut lines, "Admin Email:", &self.admin_email);
        lines.push(String::new());
        for server in self.name_server.iter().flatten() {
            lines.push(format_line("Name Server:", server));
        }
        push_field(&mut lines, "DNSSEC:", &self.dnssec);

        lines.join("\n")
    }
}

// First non-blank value among `keys`, checked in order
fn first_value(raw: &RawWhois, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| raw.get(*key))
        .flat_map(|values| values.iter())
        .map(|value| value.trim())
        .find(|value| !value.is_empty())
        .map(str::to_string)
}

// Number of keys carrying at least one non-blank value.
// A WHOIS answer with one or zero of these is treated as no answer.
pub fn populated_fields(raw: &RawWhois) -> usize {
    raw.values()
        .filter(|values| values.iter().any(|v| !v.trim().is_empty()))
        .count()
}

// "clientTransferProhibited https://icann.org/epp#clientTransferProhibited"
//   -> "clientTransferProhibited"
fn strip_status_link(status: &str) -> String {
    status
        .split_whitespace()
        .take_while(|part| !part.starts_with("http://") && !part.starts_with("https://"))
        .collect::<Vec<_>>()
        .join(" ")
}

// Name servers from every alias, lowercased, duplicates dropped, order kept.
// Glue records ("ns1.example.ru. 192.0.2.1") carry addresses after the host
// name; only the host name is kept.
fn collect_name_servers(raw: &RawWhois) -> Option<Vec<String>> {
    let mut servers: Vec<String> = Vec::new();
    for key in NAME_SERVER_KEYS {
        for value in raw.get(*key).into_iter().flatten() {
            let Some(server) = value.split_whitespace().next() else {
                continue;
            };
            let server = server.trim_end_matches('.').to_lowercase();
            if !server.is_empty() && !servers.contains(&server) {
                servers.push(server);
            }
        }
    }
    if servers.is_empty() {
        None
    } else {
        Some(servers)
    }
}

const LABEL_WIDTH: usize = 33;

fn format_line(label: &str, value: &str) -> String {
    format!("{:<width$}{}", label, value, width = LABEL_WIDTH)
}

fn push_field(lines: &mut Vec<String>, label: &str, value: &Option<String>) {
    if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
        lines.push(format_line(label, value));
    }
}
