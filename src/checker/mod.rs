// src/checker/mod.rs
// =============================================================================
// This module contains all link checking logic.
//
// Submodules:
// - html: Extracts and deduplicates links from HTML pages
// - http: Checks whether links are alive (HEAD requests, bounded concurrency)
// - scan: Fetches one page and runs the two steps above on it
//
// This file (mod.rs) is the module root - it ties everything together and
// exports the public API that other parts of our application can use.
// =============================================================================

// Declare submodules (tells Rust to include these files)
mod html;
mod http;
mod scan;

// Re-export public items from submodules
// This lets main write `checker::LinkScanner` instead of
// `checker::scan::LinkScanner`
pub use http::{LinkCheckResult, LinkValidator};
pub use scan::{LinkScanReport, LinkScanner};
