// # rrsync-core
//
// Core library for managing individual DNS records against registrar APIs
// that only expose whole record sets.
//
// ## Architecture Overview
//
// A registrar keys its records by (domain, type, name) and only lets callers
// fetch, replace or delete the entire set under such a key. This crate bridges
// that to single-record create/read/update/delete:
//
// - **model**: `DnsRecord`, `DnsUpdateRecord`, `RecordType` and the per-type
//   key matcher (`same_key`) that decides whether two records are the same
//   remote object
// - **RecordStore**: Trait for the whole-set remote API (get/add/set/del)
// - **RateLimiter**: Gates every outbound store call (`TokenBucket` or
//   `FixedWindow`)
// - **Reconciler**: Turns one-record intents into minimal whole-set calls
//   without touching co-located records
//
// ## Design Principles
//
// 1. **Remote is the source of truth**: nothing is cached between operations
// 2. **Non-destructive writes**: only records matching the intent are replaced
// 3. **Explicit sharing**: the rate limiter is constructed once and injected
// 4. **No retries**: failures surface immediately, the limiter only paces

pub mod config;
pub mod error;
pub mod model;
pub mod ratelimit;
pub mod reconcile;
pub mod traits;

// Re-export core types for convenience
pub use config::{RateLimitConfig, RateLimitStrategy, StoreConfig, StoreMode};
pub use error::{Error, Result};
pub use model::{DnsRecord, DnsUpdateRecord, KeyRule, RecordLocator, RecordType, same_key};
pub use ratelimit::{FixedWindow, RateLimiter, TokenBucket};
pub use reconcile::{DeleteOutcome, ReadOutcome, Reconciler, UpdateOutcome};
pub use traits::RecordStore;

// Cancellation is part of every store call signature
pub use tokio_util::sync::CancellationToken;
