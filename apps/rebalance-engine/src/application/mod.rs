//! Application Layer
//!
//! The application layer orchestrates domain logic through use cases.
//! It defines:
//!
//! - **DTOs**: Request envelopes and boundary validation
//! - **Services**: Canonical request hashing and the idempotency cache
//! - **Use Cases**: Rebalance runs and proposal simulations

pub mod dto;
pub mod services;
pub mod use_cases;

pub use dto::*;
pub use use_cases::*;
