//! Test doubles and common utilities for contract tests
//!
//! [`RecordingStore`] is an in-memory registrar that keeps whole record sets
//! per (domain, type, name) and logs every call it receives.

#![allow(dead_code)]

use rrsync_core::error::{Error, Result};
use rrsync_core::{
    CancellationToken, DnsRecord, DnsUpdateRecord, RecordStore, RecordType, Reconciler,
    TokenBucket,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Barrier;

type SetKey = (String, RecordType, String);

/// One call received by the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Get {
        record_type: RecordType,
        name: String,
    },
    Add {
        records: Vec<DnsRecord>,
    },
    Set {
        record_type: RecordType,
        name: String,
        records: Vec<DnsUpdateRecord>,
    },
    Del {
        record_type: RecordType,
        name: String,
    },
}

impl Call {
    pub fn is_write(&self) -> bool {
        !matches!(self, Call::Get { .. })
    }
}

/// In-memory whole-set record store that records its calls
pub struct RecordingStore {
    sets: Arc<Mutex<HashMap<SetKey, Vec<DnsRecord>>>>,
    calls: Arc<Mutex<Vec<Call>>>,
    get_count: Arc<AtomicUsize>,
    /// When set, every write fails with a remote API error
    fail_writes: Arc<AtomicBool>,
    /// When set, every get waits here after taking its snapshot
    get_barrier: Option<Arc<Barrier>>,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self {
            sets: Arc::new(Mutex::new(HashMap::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
            get_count: Arc::new(AtomicUsize::new(0)),
            fail_writes: Arc::new(AtomicBool::new(false)),
            get_barrier: None,
        }
    }

    /// Hold every get until `parties` gets have read their snapshot
    pub fn with_get_barrier(mut self, parties: usize) -> Self {
        self.get_barrier = Some(Arc::new(Barrier::new(parties)));
        self
    }

    /// Put records in place without logging a call
    pub fn seed(&self, domain: &str, records: &[DnsRecord]) {
        let mut sets = self.sets.lock().unwrap();
        for rec in records {
            sets.entry((domain.to_string(), rec.record_type, rec.name.clone()))
                .or_default()
                .push(rec.clone());
        }
    }

    /// Current set under (domain, type, name)
    pub fn records(&self, domain: &str, record_type: RecordType, name: &str) -> Vec<DnsRecord> {
        self.sets
            .lock()
            .unwrap()
            .get(&(domain.to_string(), record_type, name.to_string()))
            .cloned()
            .unwrap_or_default()
    }

    /// Every call received so far
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of add/set/del calls received so far
    pub fn write_count(&self) -> usize {
        self.calls().iter().filter(|c| c.is_write()).count()
    }

    /// Number of get calls received so far
    pub fn get_count(&self) -> usize {
        self.get_count.load(Ordering::SeqCst)
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn log(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn check_writable(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::remote_api(
                500,
                Some("INTERNAL_SERVER_ERROR".to_string()),
                "backend unavailable",
            ));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl RecordStore for RecordingStore {
    async fn get_records(
        &self,
        domain: &str,
        record_type: RecordType,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<DnsRecord>> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        self.get_count.fetch_add(1, Ordering::SeqCst);
        self.log(Call::Get {
            record_type,
            name: name.to_string(),
        });
        let snapshot = self.records(domain, record_type, name);
        if let Some(barrier) = &self.get_barrier {
            barrier.wait().await;
        }
        Ok(snapshot)
    }

    async fn add_records(
        &self,
        domain: &str,
        records: &[DnsRecord],
        cancel: &CancellationToken,
    ) -> Result<()> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        self.log(Call::Add {
            records: records.to_vec(),
        });
        self.check_writable()?;

        let mut sets = self.sets.lock().unwrap();
        for rec in records {
            let set = sets
                .entry((domain.to_string(), rec.record_type, rec.name.clone()))
                .or_default();
            if rec.record_type == RecordType::Cname && !set.is_empty() {
                return Err(Error::remote_api(
                    422,
                    Some("DUPLICATE_RECORD".to_string()),
                    "Another record with the same attributes already exists",
                ));
            }
            if set.iter().any(|r| r.data == rec.data) {
                return Err(Error::remote_api(
                    422,
                    Some("DUPLICATE_RECORD".to_string()),
                    "Another record with the same attributes already exists",
                ));
            }
            set.push(rec.clone());
        }
        Ok(())
    }

    async fn set_records(
        &self,
        domain: &str,
        record_type: RecordType,
        name: &str,
        records: &[DnsUpdateRecord],
        cancel: &CancellationToken,
    ) -> Result<()> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        self.log(Call::Set {
            record_type,
            name: name.to_string(),
            records: records.to_vec(),
        });
        self.check_writable()?;

        let replacement: Vec<DnsRecord> = records
            .iter()
            .cloned()
            .map(|r| r.into_record(record_type, name))
            .collect();
        self.sets
            .lock()
            .unwrap()
            .insert((domain.to_string(), record_type, name.to_string()), replacement);
        Ok(())
    }

    async fn del_records(
        &self,
        domain: &str,
        record_type: RecordType,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<()> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        self.log(Call::Del {
            record_type,
            name: name.to_string(),
        });
        self.check_writable()?;

        self.sets
            .lock()
            .unwrap()
            .remove(&(domain.to_string(), record_type, name.to_string()));
        Ok(())
    }

    fn store_name(&self) -> &'static str {
        "recording"
    }
}

/// A bucket large enough that pacing never shows up in a test
pub fn roomy_limiter() -> Arc<TokenBucket> {
    Arc::new(TokenBucket::new(10_000, Duration::from_millis(1)).unwrap())
}

/// Reconciler over `store` with a roomy limiter
pub fn reconciler(store: &Arc<RecordingStore>) -> Reconciler {
    Reconciler::new(store.clone(), roomy_limiter())
}

pub fn txt(name: &str, data: &str, ttl: u32) -> DnsRecord {
    DnsRecord::new(RecordType::Txt, name, data).with_ttl(ttl)
}

pub fn upd(data: &str, ttl: u32) -> DnsUpdateRecord {
    DnsUpdateRecord {
        data: data.to_string(),
        ttl,
        ..Default::default()
    }
}
