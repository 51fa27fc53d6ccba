// src/redirect/mod.rs
// =============================================================================
// This module follows HTTP redirect chains one hop at a time.
//
// Features:
// - Records status and response headers for every hop
// - Resolves relative Location headers against the current URL
// - Stops at a non-redirect status, a redirect with no Location, the hop
//   limit, or the first transport error
// - Traces a batch of URLs concurrently, each chain independent of the others
//
// Rust concepts:
// - Loops with explicit exit conditions
// - Collections: Vec for ordered hops, BTreeMap for sorted headers
// =============================================================================

mod trace;

pub use trace::{RedirectTrace, RedirectTracer, TraceOutcome};
