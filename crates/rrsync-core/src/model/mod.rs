//! Record model
//!
//! - [`DnsRecord`]: one resource record as the registrar reports it
//! - [`DnsUpdateRecord`]: payload shape for whole-set replace calls
//! - [`RecordType`]: the record types the registrar understands
//! - [`same_key`]: whether two records denote the same remote object
//! - [`RecordLocator`]: `domain:TYPE:name:data` identifiers

pub mod key;
pub mod locator;
pub mod record;

pub use key::{KeyRule, same_key};
pub use locator::RecordLocator;
pub use record::{
    DEFAULT_TTL, DnsRecord, DnsUpdateRecord, MAX_TTL, RECOMMENDED_MIN_TTL, RecordType,
};
