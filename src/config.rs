// src/config.rs
// =============================================================================
// Runtime configuration for every probe.
//
// One ProbeConfig is built at startup (defaults -> optional TOML file -> CLI
// overrides) and handed to each component when it is constructed. Nothing
// reads configuration from global state.
//
// Example file:
//
//   request_timeout_secs = 15
//   link_concurrency = 8
//   page_link_limit = 50
//   rdap_base_url = "https://rdap.org"
// =============================================================================

use crate::error::ProbeError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (compatible; SiteProbe/1.0)";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// User-Agent header sent with every HTTP request
    pub user_agent: String,
    /// Timeout applied to every outbound call (page fetch, hop, HEAD, WHOIS, RDAP)
    pub request_timeout_secs: u64,
    /// Timeout for a single link existence check
    pub link_timeout_secs: u64,
    /// Maximum number of hops the redirect tracer records
    pub max_redirects: usize,
    /// How many link checks may be in flight at once
    pub link_concurrency: usize,
    /// Cap for the single-page broken-link scan (None = check everything)
    pub page_link_limit: Option<usize>,
    /// Cap for the full website link scan (None = check everything)
    pub site_link_limit: Option<usize>,
    /// First WHOIS server to ask; referrals are followed from here
    pub whois_server: String,
    pub whois_port: u16,
    /// How many WHOIS referrals to follow after the first server
    pub whois_follow: usize,
    /// RDAP bootstrap service; queried as {base}/domain/{name}
    pub rdap_base_url: String,
    /// JSON file holding persisted scan records
    pub store_path: PathBuf,
    /// Default size of the "recent domains" listing
    pub recent_limit: usize,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            request_timeout_secs: 10,
            link_timeout_secs: 3,
            max_redirects: 10,
            link_concurrency: 20,
            page_link_limit: Some(20),
            site_link_limit: None,
            whois_server: "whois.iana.org".to_string(),
            whois_port: 43,
            whois_follow: 2,
            rdap_base_url: "https://rdap.org".to_string(),
            store_path: PathBuf::from("site-probe-data.json"),
            recent_limit: 10,
        }
    }
}

impl ProbeConfig {
    // Loads a TOML file on top of the defaults.
    //
    // Keys missing from the file keep their default value thanks to
    // #[serde(default)] on the struct.
    pub fn load_file<P: AsRef<Path>>(path: P) -> Result<Self, ProbeError> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|e| {
            ProbeError::Config(format!(
                "Failed to read configuration file '{}': {}",
                path.display(),
                e
            ))
        })?;

        let config: ProbeConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects values that would make a probe hang or never run.
    pub fn validate(&self) -> Result<(), ProbeError> {
        if self.request_timeout_secs == 0 {
            return Err(ProbeError::Config(
                "request_timeout_secs must be greater than 0".to_string(),
            ));
        }
        if self.link_timeout_secs == 0 {
            return Err(ProbeError::Config(
                "link_timeout_secs must be greater than 0".to_string(),
            ));
        }
        if self.max_redirects == 0 {
            return Err(ProbeError::Config(
                "max_redirects must be greater than 0".to_string(),
            ));
        }
        if self.link_concurrency == 0 {
            return Err(ProbeError::Config(
                "link_concurrency must be greater than 0".to_string(),
            ));
        }
        if self.user_agent.trim().is_empty() {
            return Err(ProbeError::Config("user_agent must not be empty".to_string()));
        }
        if url::Url::parse(&self.rdap_base_url).is_err() {
            return Err(ProbeError::Config(format!(
                "rdap_base_url is not a valid URL: {}",
                self.rdap_base_url
            )));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn link_timeout(&self) -> Duration {
        Duration::from_secs(self.link_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = ProbeConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_redirects, 10);
        assert_eq!(config.link_timeout(), Duration::from_secs(3));
        assert_eq!(config.page_link_limit, Some(20));
        assert_eq!(config.site_link_limit, None);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "link_concurrency = 4\nrequest_timeout_secs = 15").unwrap();

        let config = ProbeConfig::load_file(file.path()).unwrap();
        assert_eq!(config.link_concurrency, 4);
        assert_eq!(config.request_timeout_secs, 15);
        assert_eq!(config.max_redirects, 10);
        assert_eq!(config.whois_server, "whois.iana.org");
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "link_concurrency = 0").unwrap();

        let err = ProbeConfig::load_file(file.path()).unwrap_err();
        assert!(matches!(err, ProbeError::Config(_)));
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = ProbeConfig::load_file("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, ProbeError::Config(_)));
    }
}
