// src/store.rs
// =============================================================================
// Persistence for scan snapshots, one record per domain.
//
// The store is a trait so the scan orchestration does not care where records
// live. The shipped implementation keeps everything in a single JSON file:
//
//   { "example.com": { "domain": "example.com", "redirectData": ..., ... } }
//
// Upserts merge: a scan that only ran the security probe keeps the redirect
// and WHOIS data from earlier scans. Every upsert refreshes lastScannedAt.
// =============================================================================

use crate::error::ProbeError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainScanRecord {
    /// Unique key: the scanned host name
    pub domain: String,
    pub redirect_data: Option<Value>,
    pub broken_links_data: Option<Value>,
    pub security_data: Option<Value>,
    pub robots_data: Option<Value>,
    /// Reserved for the page-summary enrichment; never written by this tool
    pub ai_data: Option<Value>,
    pub whois_data: Option<Value>,
    pub last_scanned_at: DateTime<Utc>,
}

impl DomainScanRecord {
    pub fn new(domain: impl Into<String>) -> Self {
        DomainScanRecord {
            domain: domain.into(),
            redirect_data: None,
            broken_links_data: None,
            security_data: None,
            robots_data: None,
            ai_data: None,
            whois_data: None,
            last_scanned_at: Utc::now(),
        }
    }

    // Copies every slot `update` carries; slots it leaves empty keep their value
    fn merge(&mut self, update: DomainScanRecord) {
        fn take(slot: &mut Option<Value>, new: Option<Value>) {
            if new.is_some() {
                *slot = new;
            }
        }

        take(&mut self.redirect_data, update.redirect_data);
        take(&mut self.broken_links_data, update.broken_links_data);
        take(&mut self.security_data, update.security_data);
        take(&mut self.robots_data, update.robots_data);
        take(&mut self.ai_data, update.ai_data);
        take(&mut self.whois_data, update.whois_data);
    }
}

#[async_trait]
pub trait DomainStore: Send + Sync {
    async fn get_domain(&self, domain: &str) -> Result<Option<DomainScanRecord>, ProbeError>;

    /// Most recently scanned first
    async fn recent_domains(&self, limit: usize) -> Result<Vec<DomainScanRecord>, ProbeError>;

    /// Inserts or merges by domain and returns the stored record
    async fn upsert_domain(&self, record: DomainScanRecord)
        -> Result<DomainScanRecord, ProbeError>;
}

type Document = BTreeMap<String, DomainScanRecord>;

pub struct JsonFileStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process
    lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    // A missing file is an empty store
    async fn load(&self) -> Result<Document, ProbeError> {
        if !fs::try_exists(&self.path).await? {
            return Ok(Document::new());
        }

        let text = fs::read_to_string(&self.path).await?;
        if text.trim().is_empty() {
            return Ok(Document::new());
        }
        serde_json::from_str(&text).map_err(|e| {
            ProbeError::Storage(format!("{} is not a valid store file: {}", self.path.display(), e))
        })
    }

    async fn save(&self, document: &Document) -> Result<(), ProbeError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_string_pretty(document)?;
        fs::write(&self.path, json).await?;
        Ok(())
    }
}

#[async_trait]
impl DomainStore for JsonFileStore {
    async fn get_domain(&self, domain: &str) -> Result<Option<DomainScanRecord>, ProbeError> {
        let _guard = self.lock.lock().await;
        Ok(self.load().await?.remove(domain))
    }

    async fn recent_domains(&self, limit: usize) -> Result<Vec<DomainScanRecord>, ProbeError> {
        let _guard = self.lock.lock().await;
        let mut records: Vec<DomainScanRecord> = self.load().await?.into_values().collect();
        records.sort_by(|a, b| b.last_scanned_at.cmp(&a.last_scanned_at));
        records.truncate(limit);
        Ok(records)
    }

    async fn upsert_domain(
        &self,
        record: DomainScanRecord,
    ) -> Result<DomainScanRecord, ProbeError> {
        let _guard = self.lock.lock().await;
        let mut document = self.load().await?;

        let stored = match document.remove(&record.domain) {
            Some(mut existing) => {
                existing.merge(record);
                existing
            }
            None => record,
        };
        let stored = DomainScanRecord {
            last_scanned_at: Utc::now(),
            ..stored
        };

        debug!("Storing scan record for {} in {}", stored.domain, self.path.display());
        document.insert(stored.domain.clone(), stored.clone());
        self.save(&document).await?;

        Ok(stored)
    }
}
