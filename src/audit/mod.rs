// src/audit/mod.rs
// =============================================================================
// This module inspects a site's hardening signals.
//
// Currently implements:
// - Security headers: presence and value of six well-known response headers
// - robots.txt: whether /robots.txt exists and is reachable
//
// Both checks make a single request and never fail: transport problems are
// reported inside the result.
// =============================================================================

mod headers;
mod robots;

pub use headers::{SecurityAuditor, SecurityHeaderFinding};
pub use robots::{RobotsReport, RobotsValidator};
