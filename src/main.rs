// src/main.rs
// =============================================================================
// This is the entry point of our CLI application.
//
// What happens here:
// 1. Parse command-line arguments using clap
// 2. Set up logging (stderr, so --json output on stdout stays clean)
// 3. Load the configuration and build the probes from it
// 4. Dispatch to the subcommand handler and print a table or JSON
// 5. Exit with proper code (0 = all good, 1 = problems found, 2 = error)
//
// Rust concepts used:
// - async/await: probes spend nearly all their time waiting on the network
// - Result<T, E> and ?: errors bubble up to run() and become exit code 2
// - Arc<dyn Trait>: data sources and the store are shared trait objects
// =============================================================================

mod audit; // src/audit/ - security headers and robots.txt
mod checker; // src/checker/ - link extraction and validation
mod cli; // src/cli.rs - command-line parsing
mod client; // src/client.rs - shared HTTP client
mod config; // src/config.rs - ProbeConfig and TOML loading
mod error; // src/error.rs - ProbeError
mod redirect; // src/redirect/ - redirect chain tracing
mod scan; // src/scan.rs - multi-probe scans
mod store; // src/store.rs - scan snapshot persistence
mod target; // src/target.rs - URL and domain normalization
mod whois; // src/whois/ - WHOIS and RDAP

use anyhow::{Context, Result};
use audit::{RobotsReport, RobotsValidator, SecurityAuditor, SecurityHeaderFinding};
use checker::{LinkCheckResult, LinkScanReport, LinkScanner, LinkValidator};
use clap::Parser;
use cli::{Cli, Commands};
use client::ProbeClient;
use config::ProbeConfig;
use redirect::{RedirectTrace, RedirectTracer, TraceOutcome};
use scan::{ScanTool, Scanner};
use serde::Serialize;
use std::sync::Arc;
use store::{DomainScanRecord, DomainStore, JsonFileStore};
use target::{host_of, normalize_domain, normalize_url};
use tracing_subscriber::EnvFilter;
use whois::{HttpRdap, Port43Whois, WhoisOrigin, WhoisReport, WhoisResolver};

#[tokio::main]
async fn main() {
    let exit_code = match run().await {
        Ok(code) => code,
        Err(e) => {
            // {:#} prints the whole context chain on one line
            eprintln!("Error: {:#}", e);
            let bad_input = e
                .chain()
                .filter_map(|cause| cause.downcast_ref::<error::ProbeError>())
                .any(|cause| cause.is_input_error());
            if bad_input {
                eprintln!("Run with --help to see the expected arguments.");
            }
            2
        }
    };

    std::process::exit(exit_code);
}

// Returns:
//   Ok(0) = nothing wrong found
//   Ok(1) = the probe found problems (broken links, missing headers, ...)
//   Err   = bad input, bad config or storage failure (exit code 2)
async fn run() -> Result<i32> {
    let cli = Cli::parse();
    init_logging(cli.verbose)?;

    let config = match &cli.config {
        Some(path) => ProbeConfig::load_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => {
            let config = ProbeConfig::default();
            config.validate()?;
            config
        }
    };

    let app = App::new(config)?;

    match cli.command {
        Commands::Redirects { urls, json } => app.redirects(&urls, json).await,
        Commands::Links { url, limit, all, json } => {
            let limit = if all { None } else { limit.or(app.config.page_link_limit) };
            app.links(&url, limit, json).await
        }
        Commands::Site { url, limit, json } => {
            let limit = limit.or(app.config.site_link_limit);
            app.links(&url, limit, json).await
        }
        Commands::Check { url, json } => app.check(&url, json).await,
        Commands::Security { url, json } => app.security(&url, json).await,
        Commands::Robots { url, json } => app.robots(&url, json).await,
        Commands::Whois { domain, json } => app.whois(&domain, json).await,
        Commands::Scan { url, tools, json } => app.scan(&url, &tools, json).await,
        Commands::Domains { limit, json } => {
            let limit = limit.unwrap_or(app.config.recent_limit);
            app.domains(limit, json).await
        }
        Commands::Report { domain, json } => app.report(&domain, json).await,
    }
}

// RUST_LOG wins when set; otherwise --verbose means debug and the default
// only shows warnings (absorbed failures, WHOIS fallbacks).
fn init_logging(verbose: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose { "site_probe=debug" } else { "site_probe=warn" })
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))
}

// Every probe, built once from the configuration
struct App {
    config: ProbeConfig,
    tracer: RedirectTracer,
    validator: LinkValidator,
    scanner: LinkScanner,
    auditor: SecurityAuditor,
    robots: RobotsValidator,
    resolver: WhoisResolver,
    store: Arc<dyn DomainStore>,
}

impl App {
    fn new(config: ProbeConfig) -> Result<Self> {
        let client = ProbeClient::new(&config)?;
        let validator =
            LinkValidator::new(client.clone(), config.link_timeout(), config.link_concurrency);
        let resolver = WhoisResolver::new(
            Arc::new(Port43Whois::new(&config)),
            Arc::new(HttpRdap::new(&config)?),
        );

        Ok(Self {
            tracer: RedirectTracer::new(client.clone(), config.max_redirects),
            scanner: LinkScanner::new(client.clone(), validator.clone()),
            validator,
            auditor: SecurityAuditor::new(client.clone()),
            robots: RobotsValidator::new(client),
            resolver,
            store: Arc::new(JsonFileStore::new(&config.store_path)),
            config,
        })
    }

    async fn redirects(&self, urls: &[String], json: bool) -> Result<i32> {
        let outcomes = self.tracer.trace_many(urls).await;

        if json {
            print_json(&outcomes)?;
        } else {
            print_traces(&outcomes);
        }

        let failed = outcomes.iter().any(|o| {
            o.error.is_some() || o.hops.last().map(|hop| hop.error.is_some()).unwrap_or(false)
        });
        Ok(if failed { 1 } else { 0 })
    }

    async fn links(&self, input: &str, limit: Option<usize>, json: bool) -> Result<i32> {
        let url = normalize_url(input)?;
        if !json {
            match limit {
                Some(limit) => println!("🔍 Scanning {} (first {} links)", url, limit),
                None => println!("🔍 Scanning {} (all links)", url),
            }
        }

        let report = self.scanner.scan_page(&url, limit).await;

        if json {
            print_json(&report)?;
        } else {
            print_link_report(&report);
        }

        Ok(if report.is_clean() { 0 } else { 1 })
    }

    async fn check(&self, input: &str, json: bool) -> Result<i32> {
        let url = normalize_url(input)?;
        let result = self.validator.check(&url).await;

        if json {
            print_json(&result)?;
        } else {
            print_link_table(std::slice::from_ref(&result));
        }

        Ok(if result.ok { 0 } else { 1 })
    }

    async fn security(&self, input: &str, json: bool) -> Result<i32> {
        let url = normalize_url(input)?;
        let findings = self.auditor.audit(&url).await;

        if json {
            print_json(&findings)?;
        } else {
            print_findings(&url, &findings);
        }

        Ok(if findings.iter().all(|f| f.present) { 0 } else { 1 })
    }

    async fn robots(&self, input: &str, json: bool) -> Result<i32> {
        let url = normalize_url(input)?;
        let report = self.robots.check(&url).await;

        if json {
            print_json(&report)?;
        } else {
            print_robots(&report);
        }

        Ok(if report.is_valid { 0 } else { 1 })
    }

    async fn whois(&self, input: &str, json: bool) -> Result<i32> {
        let domain = normalize_domain(input)?;
        let report = self.resolver.resolve_report(&domain).await;

        if json {
            print_json(&report)?;
        } else {
            print_whois(&report);
        }

        Ok(0)
    }

    async fn scan(&self, input: &str, tools: &[ScanTool], json: bool) -> Result<i32> {
        let scanner = Scanner::new(
            self.tracer.clone(),
            self.scanner.clone(),
            self.config.page_link_limit,
            self.auditor.clone(),
            self.robots.clone(),
            self.resolver.clone(),
            Arc::clone(&self.store),
        );

        let record = scanner
            .scan(input, tools)
            .await
            .context("Scan failed")?;

        if json {
            print_json(&record)?;
        } else {
            println!("💾 Stored scan of {}", record.domain);
            print_record(&record);
        }
        Ok(0)
    }

    async fn domains(&self, limit: usize, json: bool) -> Result<i32> {
        let records = self.store.recent_domains(limit).await?;

        if json {
            print_json(&records)?;
            return Ok(0);
        }

        if records.is_empty() {
            println!("No scans stored yet in {}", self.config.store_path.display());
            return Ok(0);
        }

        println!("{:<40} {:<25} {}", "DOMAIN", "LAST SCANNED", "PROBES");
        println!("{}", "=".repeat(90));
        for record in &records {
            println!(
                "{:<40} {:<25} {}",
                shorten(&record.domain, 40),
                record.last_scanned_at.format("%Y-%m-%d %H:%M:%S UTC"),
                stored_slots(record).join(", ")
            );
        }
        Ok(0)
    }

    async fn report(&self, input: &str, json: bool) -> Result<i32> {
        // Records are keyed by host, so "https://Example.com/x" finds "example.com"
        let key = host_of(&normalize_url(input)?)?;

        match self.store.get_domain(&key).await? {
            Some(record) => {
                if json {
                    print_json(&record)?;
                } else {
                    print_record(&record);
                }
                Ok(0)
            }
            None => {
                eprintln!("No stored scan for {}", key);
                Ok(1)
            }
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// Cuts long values for table columns, on char boundaries
fn shorten(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        text.to_string()
    } else {
        let cut: String = text.chars().take(width.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}

fn print_traces(outcomes: &[TraceOutcome]) {
    for outcome in outcomes {
        println!("🔀 {}", outcome.url);
        if let Some(error) = &outcome.error {
            println!("   ⚠️  {}", error);
        }
        for (i, hop) in outcome.hops.iter().enumerate() {
            match &hop.error {
                Some(error) => println!("   {:>2}. {:<60} ERROR {}", i + 1, shorten(&hop.url, 60), error),
                None => println!("   {:>2}. {:<60} {}", i + 1, shorten(&hop.url, 60), hop.status),
            }
        }
        println!();
    }
}

fn print_link_report(report: &LinkScanReport) {
    if let Some(error) = &report.error {
        println!("❌ {}", error);
        return;
    }

    let mut results: Vec<LinkCheckResult> = report.broken_links.clone();
    results.extend(report.working_links.iter().cloned());
    print_link_table(&results);

    println!("📊 Summary:");
    println!("   📋 Found: {}", report.total_links);
    println!("   🔎 Checked: {}", report.checked_links);
    println!("   ✅ OK: {}", report.working_links.len());
    println!("   ❌ Broken: {}", report.broken_links.len());
}

fn print_link_table(results: &[LinkCheckResult]) {
    println!("{:<60} {:<10} {:<30}", "URL", "STATUS", "MESSAGE");
    println!("{}", "=".repeat(100));

    for result in results {
        let status = match (result.ok, result.status) {
            (true, code) => format!("✅ {}", code),
            (false, 0) => "❌ ERROR".to_string(),
            (false, code) => format!("❌ {}", code),
        };
        let message = result
            .error
            .as_deref()
            .or(result.anchor_text.as_deref())
            .unwrap_or("");
        println!("{:<60} {:<10} {:<30}", shorten(&result.url, 60), status, message);
    }
    println!();
}

fn print_findings(url: &str, findings: &[SecurityHeaderFinding]) {
    println!("🔒 Security headers for {}\n", url);
    for finding in findings {
        if let Some(error) = &finding.error {
            println!("   ⚠️  {}", error);
            continue;
        }
        let mark = if finding.present { "✅" } else { "❌" };
        let value = finding.value.as_deref().unwrap_or("missing");
        println!("   {} {:<28} {}", mark, finding.header_name, shorten(value, 60));
    }
}

fn print_robots(report: &RobotsReport) {
    let mark = if report.is_valid { "✅" } else { "❌" };
    println!("{} {} (status {})", mark, report.url, report.status);
    for issue in &report.issues {
        println!("   ⚠️  {}", issue);
    }
    if let Some(content) = &report.content {
        println!("\n{}", content);
    }
}

fn print_whois(report: &WhoisReport) {
    if report.source == WhoisOrigin::None || report.data.is_empty() {
        println!("No registration data found for {}", report.domain);
        return;
    }
    println!("{}", report.raw_text);
}

fn stored_slots(record: &DomainScanRecord) -> Vec<&'static str> {
    [
        ("redirect", record.redirect_data.is_some()),
        ("broken_links", record.broken_links_data.is_some()),
        ("security", record.security_data.is_some()),
        ("robots", record.robots_data.is_some()),
        ("ai", record.ai_data.is_some()),
        ("whois", record.whois_data.is_some()),
    ]
    .into_iter()
    .filter(|(_, present)| *present)
    .map(|(name, _)| name)
    .collect()
}

fn print_record(record: &DomainScanRecord) {
    println!("🌐 {}", record.domain);
    println!(
        "   Last scanned: {}",
        record.last_scanned_at.format("%Y-%m-%d %H:%M:%S UTC")
    );

    if let Some(data) = &record.redirect_data {
        match serde_json::from_value::<RedirectTrace>(data.clone()) {
            Ok(trace) => {
                println!(
                    "   🔀 Redirects: {} -> {} ({} redirect(s))",
                    trace.requested_url,
                    trace.final_url(),
                    trace.redirect_count()
                );
                if let Some(error) = trace.error() {
                    println!("      ⚠️  {}", error);
                }
            }
            Err(_) => println!("   🔀 Redirects: unreadable stored data"),
        }
    }
    if let Some(data) = &record.broken_links_data {
        let broken = data["brokenLinks"].as_array().map(Vec::len).unwrap_or(0);
        println!(
            "   🔗 Links: {} checked, {} broken",
            data["checkedLinks"].as_u64().unwrap_or(0),
            broken
        );
    }
    if let Some(data) = &record.security_data {
        let present = data
            .as_array()
            .map(|findings| findings.iter().filter(|f| f["present"] == true).count())
            .unwrap_or(0);
        println!("   🔒 Security headers: {} of 6 present", present);
    }
    if let Some(data) = &record.robots_data {
        let valid = data["isValid"].as_bool().unwrap_or(false);
        println!("   🤖 robots.txt: {}", if valid { "valid" } else { "invalid" });
    }
    if let Some(data) = &record.whois_data {
        let registrar = data["data"]["registrar"].as_str().unwrap_or("unknown");
        println!("   📇 Registrar: {}", registrar);
    }
}
