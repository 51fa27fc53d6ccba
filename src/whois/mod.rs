// src/whois/mod.rs
// =============================================================================
// Domain registration lookups.
//
// Two sources feed one canonical record:
// - port43: classic text WHOIS with referral following
// - rdap: JSON over HTTPS, used when WHOIS gives nothing useful
//
// resolver ties them together; record owns the canonical field names.
// =============================================================================

mod port43;
mod rdap;
mod record;
mod resolver;

pub use port43::{Port43Whois, WhoisSource};
pub use rdap::{HttpRdap, RdapSource};
pub use resolver::{WhoisOrigin, WhoisReport, WhoisResolver};
