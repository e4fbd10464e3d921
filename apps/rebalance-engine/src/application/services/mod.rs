//! Application Services
//!
//! Request hashing and the idempotency cache shared by the use cases.

mod canonical;
mod idempotency;

pub use canonical::{HASH_PREFIX, canonical_json, correlation_id, request_hash, run_id};
pub use idempotency::{IdempotencyCache, IdempotencyLookup};
