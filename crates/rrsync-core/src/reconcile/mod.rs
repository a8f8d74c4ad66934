//! RRset reconciliation
//!
//! The [`Reconciler`] turns single-record intents into calls against a
//! [`RecordStore`] that only understands whole record sets.
//!
//! ## Operations
//!
//! ```text
//!            single-valued (CNAME)          multi-valued (A, AAAA, MX, NS, SRV, TXT)
//! create     add [record]                   add [record]
//! read       get, match                     get, match
//! update     set [new]                      get, partition, set kept + new
//! delete     del                            get, partition, set kept | del
//! ```
//!
//! "Partition" splits the fetched set into the records matching the intent
//! (by [`same_key`]) and the records to keep untouched. Kept records are
//! written back exactly as fetched, so co-located records survive.
//!
//! ## Concurrency
//!
//! Operations on different keys are independent. Operations on the *same*
//! key are not serialized: update and delete read the set and write it back
//! later, and a concurrent writer in between is overwritten. The registrar
//! offers no conditional writes, so this window is not closed here.
//!
//! Every store call is first admitted by the shared [`RateLimiter`].

use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::model::{DnsRecord, DnsUpdateRecord, RecordType, same_key};
use crate::ratelimit::RateLimiter;
use crate::traits::RecordStore;

/// Result of looking up one record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// No record matches; it was removed outside of our control
    Absent,
    /// Exactly one record matches
    Found(DnsRecord),
    /// Several records match; the last one in store order was picked
    ///
    /// Store order is not guaranteed, so which record is picked may change
    /// between reads.
    Ambiguous {
        /// The picked record
        record: DnsRecord,
        /// Number of matching records
        matches: usize,
    },
}

impl ReadOutcome {
    /// The found record, if any
    pub fn record(&self) -> Option<&DnsRecord> {
        match self {
            ReadOutcome::Absent => None,
            ReadOutcome::Found(record) | ReadOutcome::Ambiguous { record, .. } => Some(record),
        }
    }

    /// Consume the outcome, returning the found record, if any
    pub fn into_record(self) -> Option<DnsRecord> {
        match self {
            ReadOutcome::Absent => None,
            ReadOutcome::Found(record) | ReadOutcome::Ambiguous { record, .. } => Some(record),
        }
    }
}

/// Result of an update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The set was replaced
    Replaced,
    /// The set already had the desired content; nothing was written
    Unchanged,
    /// The record to update no longer exists; nothing was written
    ///
    /// Callers decide whether to recreate it or accept the drift.
    Gone,
}

/// Result of a delete
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The whole (type, name) set was deleted
    Deleted,
    /// The set was replaced by the records that did not match
    Replaced {
        /// Number of records written back
        kept: usize,
    },
    /// No record matched; nothing was written
    AlreadyGone,
}

/// Records fetched for one key, split by whether they match an intent
#[derive(Debug, Default)]
struct Partition {
    matches: usize,
    kept: Vec<DnsUpdateRecord>,
}

impl Partition {
    fn split(rrset: &[DnsRecord], intent: &DnsRecord) -> Self {
        let mut partition = Partition::default();
        for rec in rrset {
            debug!(
                "got record: data {}, prio {}, ttl {}",
                rec.data, rec.priority, rec.ttl
            );
            if same_key(rec, intent) {
                partition.matches += 1;
            } else {
                partition.kept.push(rec.to_update_record());
            }
        }
        debug!(
            "{} matching, {} to keep",
            partition.matches,
            partition.kept.len()
        );
        partition
    }
}

/// Whether `a` and `b` hold the same records, ignoring order
fn same_members(a: &[DnsUpdateRecord], b: &[DnsUpdateRecord]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut used = vec![false; b.len()];
    a.iter().all(|x| {
        match b
            .iter()
            .enumerate()
            .position(|(i, y)| !used[i] && x == y)
        {
            Some(i) => {
                used[i] = true;
                true
            }
            None => false,
        }
    })
}

/// Single-record lifecycle operations over a whole-set record store
///
/// Cheap to clone: clones share the store and the rate limiter.
#[derive(Clone)]
pub struct Reconciler {
    store: Arc<dyn RecordStore>,
    limiter: Arc<dyn RateLimiter>,
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("store", &self.store.store_name())
            .field("limiter", &self.limiter)
            .finish()
    }
}

impl Reconciler {
    /// Create a reconciler issuing calls to `store`, paced by `limiter`
    pub fn new(store: Arc<dyn RecordStore>, limiter: Arc<dyn RateLimiter>) -> Self {
        Self { store, limiter }
    }

    /// The rate limiter shared by this reconciler
    pub fn limiter(&self) -> &Arc<dyn RateLimiter> {
        &self.limiter
    }

    /// Create a record
    ///
    /// Nothing is read first: uniqueness (e.g. a second CNAME for a name) is
    /// left to the store, which rejects the call with a remote API error.
    #[tracing::instrument(
        name = "create",
        skip_all,
        fields(operation = "create", domain = %domain, record_type = %record.record_type, name = %record.name)
    )]
    pub async fn create(
        &self,
        domain: &str,
        record: &DnsRecord,
        cancel: &CancellationToken,
    ) -> Result<()> {
        info!("create: start");
        let result = async {
            record.validate()?;
            self.add(domain, std::slice::from_ref(record), cancel).await
        }
        .await;
        info!("create: end");
        result.map_err(|e| e.in_operation("create", domain, record.record_type, &record.name))
    }

    /// Look up the record matching `template`
    ///
    /// Fetches the set for the template's type and name and picks the entry
    /// with the same key.
    #[tracing::instrument(
        name = "read",
        skip_all,
        fields(operation = "read", domain = %domain, record_type = %template.record_type, name = %template.name)
    )]
    pub async fn read(
        &self,
        domain: &str,
        template: &DnsRecord,
        cancel: &CancellationToken,
    ) -> Result<ReadOutcome> {
        info!("read: start");
        let result = self.read_matching(domain, template, cancel).await;
        info!("read: end");
        result.map_err(|e| e.in_operation("read", domain, template.record_type, &template.name))
    }

    async fn read_matching(
        &self,
        domain: &str,
        template: &DnsRecord,
        cancel: &CancellationToken,
    ) -> Result<ReadOutcome> {
        let rrset = self
            .get(domain, template.record_type, &template.name, cancel)
            .await?;
        if rrset.is_empty() {
            debug!("read: currently absent");
            return Ok(ReadOutcome::Absent);
        }
        info!("read: got {} answers", rrset.len());

        let mut found = None;
        let mut matches = 0;
        for rec in rrset {
            debug!("got record: {}", rec);
            if same_key(&rec, template) {
                matches += 1;
                found = Some(rec);
            }
        }

        Ok(match found {
            None => {
                info!("read: no matching record found");
                ReadOutcome::Absent
            }
            Some(record) if matches == 1 => ReadOutcome::Found(record),
            Some(record) => {
                warn!("read: {} matching records found, using last", matches);
                ReadOutcome::Ambiguous { record, matches }
            }
        })
    }

    /// Replace the record matching `old` with `new`
    ///
    /// `old` and `new` must have the same type and name.
    #[tracing::instrument(
        name = "update",
        skip_all,
        fields(operation = "update", domain = %domain, record_type = %new.record_type, name = %new.name)
    )]
    pub async fn update(
        &self,
        domain: &str,
        old: &DnsRecord,
        new: &DnsRecord,
        cancel: &CancellationToken,
    ) -> Result<UpdateOutcome> {
        info!("update: start");
        let result = self.replace_matching(domain, old, new, cancel).await;
        info!("update: end");
        result.map_err(|e| e.in_operation("update", domain, new.record_type, &new.name))
    }

    async fn replace_matching(
        &self,
        domain: &str,
        old: &DnsRecord,
        new: &DnsRecord,
        cancel: &CancellationToken,
    ) -> Result<UpdateOutcome> {
        if old.record_type != new.record_type || old.name != new.name {
            return Err(Error::validation(format!(
                "update cannot move a record from {} '{}' to {} '{}'; delete and create instead",
                old.record_type, old.name, new.record_type, new.name
            )));
        }
        new.validate()?;
        let record_type = new.record_type;

        // only one value can exist, so replacing the set replaces the record
        if record_type.is_single_value() {
            self.set(domain, record_type, &new.name, &[new.to_update_record()], cancel)
                .await?;
            return Ok(UpdateOutcome::Replaced);
        }

        let current = self.get(domain, record_type, &new.name, cancel).await?;
        let Partition { matches, mut kept } = Partition::split(&current, old);
        match matches {
            0 => {
                warn!("update: record to update is gone, nothing to do");
                return Ok(UpdateOutcome::Gone);
            }
            1 => {}
            n => warn!("update: want 1 matching record, got {}; replacing all of them", n),
        }
        info!("update: got {} records to keep", kept.len());

        let ours = new.to_update_record();
        if !kept.contains(&ours) {
            kept.push(ours);
        }

        let current: Vec<DnsUpdateRecord> = current.iter().map(DnsRecord::to_update_record).collect();
        if same_members(&kept, &current) {
            info!("update: record is already up to date, nothing to do");
            return Ok(UpdateOutcome::Unchanged);
        }

        self.set(domain, record_type, &new.name, &kept, cancel).await?;
        Ok(UpdateOutcome::Replaced)
    }

    /// Delete the record matching `intent`
    #[tracing::instrument(
        name = "delete",
        skip_all,
        fields(operation = "delete", domain = %domain, record_type = %intent.record_type, name = %intent.name)
    )]
    pub async fn delete(
        &self,
        domain: &str,
        intent: &DnsRecord,
        cancel: &CancellationToken,
    ) -> Result<DeleteOutcome> {
        info!("delete: start");
        let result = self.remove_matching(domain, intent, cancel).await;
        info!("delete: end");
        result.map_err(|e| e.in_operation("delete", domain, intent.record_type, &intent.name))
    }

    async fn remove_matching(
        &self,
        domain: &str,
        intent: &DnsRecord,
        cancel: &CancellationToken,
    ) -> Result<DeleteOutcome> {
        if intent.record_type == RecordType::Soa {
            return Err(Error::validation(
                "SOA records are maintained by the registrar and cannot be deleted",
            ));
        }
        if intent.name.is_empty() {
            return Err(Error::validation("record name cannot be empty (use '@' for the apex)"));
        }
        let record_type = intent.record_type;

        if record_type.is_single_value() {
            self.del(domain, record_type, &intent.name, cancel).await?;
            return Ok(DeleteOutcome::Deleted);
        }

        let current = self.get(domain, record_type, &intent.name, cancel).await?;
        let Partition { matches, kept } = Partition::split(&current, intent);
        match matches {
            0 => {
                info!("delete: record already gone");
                return Ok(DeleteOutcome::AlreadyGone);
            }
            1 => {}
            n => warn!("delete: want 1 matching record, got {}; removing all of them", n),
        }

        if kept.is_empty() {
            self.del(domain, record_type, &intent.name, cancel).await?;
            Ok(DeleteOutcome::Deleted)
        } else {
            info!("delete: keeping {} records", kept.len());
            self.set(domain, record_type, &intent.name, &kept, cancel).await?;
            Ok(DeleteOutcome::Replaced { kept: kept.len() })
        }
    }

    async fn get(
        &self,
        domain: &str,
        record_type: RecordType,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<DnsRecord>> {
        self.limiter.acquire_cancellable(cancel).await?;
        self.store.get_records(domain, record_type, name, cancel).await
    }

    async fn add(
        &self,
        domain: &str,
        records: &[DnsRecord],
        cancel: &CancellationToken,
    ) -> Result<()> {
        self.limiter.acquire_cancellable(cancel).await?;
        self.store.add_records(domain, records, cancel).await
    }

    async fn set(
        &self,
        domain: &str,
        record_type: RecordType,
        name: &str,
        records: &[DnsUpdateRecord],
        cancel: &CancellationToken,
    ) -> Result<()> {
        self.limiter.acquire_cancellable(cancel).await?;
        self.store
            .set_records(domain, record_type, name, records, cancel)
            .await
    }

    async fn del(
        &self,
        domain: &str,
        record_type: RecordType,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<()> {
        self.limiter.acquire_cancellable(cancel).await?;
        self.store
            .del_records(domain, record_type, name, cancel)
            .await
    }
}
