// src/target.rs
// =============================================================================
// Input normalization, done once before any probe runs.
//
// - A bare "example.com" becomes "https://example.com"
// - A domain for WHOIS loses its scheme, path and leading "www."
// - Anything that still does not parse is rejected as an input error, so the
//   probes only ever see syntactically valid targets
// =============================================================================

use crate::error::ProbeError;
use url::Url;

// Cleans a user-supplied URL.
//
// Returns the cleaned string rather than Url::to_string(), which would add a
// trailing slash ("https://example.com/") the user never typed.
pub fn normalize_url(input: &str) -> Result<String, ProbeError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ProbeError::invalid_input(input, "URL is empty"));
    }

    let cleaned = if trimmed.starts_with("http") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    };

    let parsed = Url::parse(&cleaned)
        .map_err(|e| ProbeError::invalid_input(input, format!("not a valid URL: {}", e)))?;

    match parsed.host_str() {
        Some(host) if !host.is_empty() => Ok(cleaned),
        _ => Err(ProbeError::invalid_input(input, "URL has no host")),
    }
}

/// Reduces "https://www.Example.com/path" to "example.com".
pub fn normalize_domain(input: &str) -> Result<String, ProbeError> {
    let lowered = input.trim().to_lowercase();

    let without_scheme = lowered
        .strip_prefix("https://")
        .or_else(|| lowered.strip_prefix("http://"))
        .unwrap_or(&lowered);

    let host = without_scheme.split('/').next().unwrap_or_default();
    let host = host.strip_prefix("www.").unwrap_or(host);

    if host.is_empty() {
        return Err(ProbeError::invalid_input(input, "domain is empty"));
    }
    if !host.contains('.') {
        return Err(ProbeError::invalid_input(input, "domain has no TLD"));
    }
    if host.chars().any(char::is_whitespace) {
        return Err(ProbeError::invalid_input(input, "domain contains whitespace"));
    }

    Ok(host.to_string())
}

/// Hostname of an already-normalized URL; the key scan records are stored under.
pub fn host_of(url: &str) -> Result<String, ProbeError> {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .ok_or_else(|| ProbeError::invalid_input(url, "URL has no host"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_domain_gets_https() {
        assert_eq!(normalize_url("example.com").unwrap(), "https://example.com");
        assert_eq!(normalize_url("  example.com/a  ").unwrap(), "https://example.com/a");
    }

    #[test]
    fn test_existing_scheme_kept() {
        assert_eq!(normalize_url("http://example.com").unwrap(), "http://example.com");
    }

    #[test]
    fn test_empty_url_rejected() {
        assert!(normalize_url("   ").unwrap_err().is_input_error());
    }

    #[test]
    fn test_garbage_url_rejected() {
        assert!(normalize_url("https://").is_err());
        assert!(normalize_url("exa mple.com").is_err());
    }

    #[test]
    fn test_domain_cleanup() {
        assert_eq!(
            normalize_domain("https://www.Example.com/about").unwrap(),
            "example.com"
        );
        assert_eq!(normalize_domain("sub.example.org").unwrap(), "sub.example.org");
    }

    #[test]
    fn test_domain_rejections() {
        assert!(normalize_domain("").is_err());
        assert!(normalize_domain("localhost").is_err());
    }

    #[test]
    fn test_host_of() {
        assert_eq!(host_of("https://example.com/x?y=1").unwrap(), "example.com");
    }
}
