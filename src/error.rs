// src/error.rs
// =============================================================================
// Error types for the probing engine.
//
// Probes themselves never return these: a failed hop, link or header check is
// written into the probe's own result shape. ProbeError only travels through
// input validation, configuration loading, the WHOIS/RDAP data-source clients
// (the resolver swallows those) and the scan store.
// =============================================================================

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProbeError {
    /// Missing or malformed URL/domain, rejected before any network call
    #[error("Invalid input '{input}': {reason}")]
    InvalidInput { input: String, reason: String },

    /// Bad configuration file or value
    #[error("Configuration error: {0}")]
    Config(String),

    /// DNS, TLS, connection or timeout failure
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("WHOIS error for '{domain}': {message}")]
    Whois { domain: String, message: String },

    #[error("RDAP error for '{domain}': {message}")]
    Rdap { domain: String, message: String },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProbeError {
    pub fn invalid_input<I: Into<String>, R: Into<String>>(input: I, reason: R) -> Self {
        Self::InvalidInput {
            input: input.into(),
            reason: reason.into(),
        }
    }

    pub fn whois<D: Into<String>, M: Into<String>>(domain: D, message: M) -> Self {
        Self::Whois {
            domain: domain.into(),
            message: message.into(),
        }
    }

    pub fn rdap<D: Into<String>, M: Into<String>>(domain: D, message: M) -> Self {
        Self::Rdap {
            domain: domain.into(),
            message: message.into(),
        }
    }

    /// True for errors the caller caused (exit code 2 without a stack of context)
    pub fn is_input_error(&self) -> bool {
        matches!(self, Self::InvalidInput { .. } | Self::Config(_))
    }
}

impl From<reqwest::Error> for ProbeError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(describe_transport_error(&err))
    }
}

impl From<toml::de::Error> for ProbeError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(format!("Failed to parse TOML configuration: {}", err))
    }
}

// Turns a reqwest error into the message stored in hop/link/header results.
//
// reqwest's Display only names the outer failure ("error sending request for
// url ..."), so we walk the source chain to surface the DNS/TLS/connect cause.
pub fn describe_transport_error(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        return "Request timed out".to_string();
    }

    let mut message = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_input_message() {
        let err = ProbeError::invalid_input("", "URL is empty");
        assert_eq!(err.to_string(), "Invalid input '': URL is empty");
        assert!(err.is_input_error());
    }

    #[test]
    fn test_transport_is_not_input_error() {
        let err = ProbeError::Transport("connection refused".to_string());
        assert!(!err.is_input_error());
    }

    #[test]
    fn test_toml_error_becomes_config_error() {
        let parsed: Result<toml::Value, _> = toml::from_str("not = [valid");
        let err: ProbeError = parsed.unwrap_err().into();
        assert!(matches!(err, ProbeError::Config(_)));
    }
}
