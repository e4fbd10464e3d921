//! Data Transfer Objects (DTOs)
//!
//! DTOs are used for API boundaries and use case inputs.

mod request_dto;

pub use request_dto::{ProposalRequest, RebalanceRequest, VOLATILE_FIELDS};
