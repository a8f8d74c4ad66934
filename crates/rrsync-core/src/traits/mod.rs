//! Core traits for rrsync
//!
//! - [`RecordStore`]: Whole-set record API of a registrar

pub mod record_store;

pub use record_store::RecordStore;
