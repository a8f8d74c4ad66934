// # Record Store Trait
//
// The remote side of reconciliation: a registrar API that exposes records
// only as whole sets keyed by (domain, type, name).
//
// ## Implementations
//
// - GoDaddy v1 domains API: `rrsync-provider-godaddy` crate
//
// ## Usage
//
// ```rust,ignore
// use rrsync_core::{CancellationToken, RecordStore, RecordType};
//
// let cancel = CancellationToken::new();
// let rrset = store.get_records("example.com", RecordType::Txt, "@", &cancel).await?;
// ```

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::model::{DnsRecord, DnsUpdateRecord, RecordType};

/// Whole-set record API of a registrar
///
/// Every call takes a cancellation token; a cancelled call returns
/// [`crate::Error::Cancelled`]. Implementations do not retry and do not rate
/// limit: pacing is done by the caller through a shared
/// [`crate::TokenBucket`], and whether to try again is the caller's decision.
///
/// # Thread Safety
///
/// Implementations must be usable from concurrent tasks.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Fetch every record under (domain, type, name)
    ///
    /// An absent key yields an empty list. Order is whatever the remote
    /// returns and is not guaranteed.
    async fn get_records(
        &self,
        domain: &str,
        record_type: RecordType,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<DnsRecord>>;

    /// Append records, leaving existing ones in place
    ///
    /// The remote may reject records that violate uniqueness, such as a
    /// second CNAME for the same name.
    async fn add_records(
        &self,
        domain: &str,
        records: &[DnsRecord],
        cancel: &CancellationToken,
    ) -> Result<()>;

    /// Replace every record under (domain, type, name) with `records`
    async fn set_records(
        &self,
        domain: &str,
        record_type: RecordType,
        name: &str,
        records: &[DnsUpdateRecord],
        cancel: &CancellationToken,
    ) -> Result<()>;

    /// Delete every record under (domain, type, name)
    async fn del_records(
        &self,
        domain: &str,
        record_type: RecordType,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<()>;

    /// Store name for logging, like "godaddy"
    fn store_name(&self) -> &'static str;
}
