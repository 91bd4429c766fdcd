//! Shared domain types for the Anvaya lead tracker.
//!
//! Everything in here is free of I/O: identifiers, entity records, request
//! validation and the in-memory report aggregations. The HTTP service and the
//! persistence adapter live in `anvaya-api`.

pub mod agents;
pub mod comments;
pub mod error;
pub mod id;
pub mod leads;
pub mod reports;
pub mod tags;
pub mod validation;
