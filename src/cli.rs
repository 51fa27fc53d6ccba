// src/cli.rs
// =============================================================================
// This file defines our command-line interface using the `clap` crate.
//
// Every probe gets its own subcommand, plus three for the stored scan
// snapshots (scan, domains, report). All of them print a table by default
// and the raw result structure with --json.
//
// Rust concepts:
// - Structs and enums with derive macros (clap generates the parser)
// - Global flags: #[arg(global = true)] works before or after the subcommand
// - ValueEnum: a Rust enum accepted as a command-line value
// =============================================================================

use crate::scan::ScanTool;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "site-probe",
    version = "0.1.0",
    about = "Website diagnostics: redirects, links, security headers, robots.txt and WHOIS",
    long_about = "site-probe traces redirect chains, finds broken links, audits security \
                  headers, validates robots.txt and looks up domain registration data. \
                  Scan results can be stored per domain and reviewed later."
)]
pub struct Cli {
    /// TOML configuration file (defaults are used for anything it leaves out)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Show debug logging on stderr (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Follow the redirect chain of one or more URLs
    ///
    /// Example: site-probe redirects example.com http://old.example.com
    Redirects {
        /// URLs to trace; "https://" is added when no scheme is given
        #[arg(required = true)]
        urls: Vec<String>,

        /// Output results in JSON format instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Check the links found on one page (first 20 by default)
    ///
    /// Example: site-probe links https://example.com/blog --limit 50
    Links {
        url: String,

        /// Check at most this many links
        #[arg(long, conflicts_with = "all")]
        limit: Option<usize>,

        /// Check every link on the page
        #[arg(long)]
        all: bool,

        #[arg(long)]
        json: bool,
    },

    /// Check every link on a site's main page (no limit by default)
    ///
    /// Example: site-probe site example.com
    Site {
        url: String,

        /// Check at most this many links
        #[arg(long)]
        limit: Option<usize>,

        #[arg(long)]
        json: bool,
    },

    /// Check whether a single URL answers
    Check {
        url: String,

        #[arg(long)]
        json: bool,
    },

    /// Report which security headers a site sends
    Security {
        url: String,

        #[arg(long)]
        json: bool,
    },

    /// Fetch and validate robots.txt
    Robots {
        url: String,

        #[arg(long)]
        json: bool,
    },

    /// Look up domain registration data (WHOIS, falling back to RDAP)
    ///
    /// Example: site-probe whois www.example.com
    Whois {
        /// Domain or URL; scheme, path and "www." are stripped
        domain: String,

        #[arg(long)]
        json: bool,
    },

    /// Run several probes and store the results for the domain
    ///
    /// Example: site-probe scan example.com --tool redirect --tool whois
    Scan {
        url: String,

        /// Probe to run; repeat for more than one
        #[arg(long = "tool", value_enum, required = true)]
        tools: Vec<ScanTool>,

        #[arg(long)]
        json: bool,
    },

    /// List the most recently scanned domains
    Domains {
        /// How many to show (config `recent_limit` by default)
        #[arg(long)]
        limit: Option<usize>,

        #[arg(long)]
        json: bool,
    },

    /// Show the stored scan record for one domain
    Report {
        domain: String,

        #[arg(long)]
        json: bool,
    },
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why is --tool a Vec?
//    - clap collects every occurrence of a repeated flag into the Vec
//    - required = true makes clap reject a scan with no --tool at all
//
// 2. What does global = true do?
//    - The flag is defined once on Cli but accepted after any subcommand,
//      so both "site-probe --verbose whois x.com" and
//      "site-probe whois x.com --verbose" work
//
// 3. Option<usize> vs a default value
//    - None means "the user did not say", so the config file value applies
//    - default_value_t would hide that difference
// -----------------------------------------------------------------------------
