//! DB-compatible (e.g. de/serialisable) types, and the operations on them.
//!
//! The types in this module are serialised in a DB-friendly way, e.g.:
//!
//! - IDs and datetimes are serialised in MongoDB's own format.
//! - Field names are snake_case, as they appear in indexes and filters.

pub mod account;
pub mod admin;
pub mod ballot;
pub mod candidate;
pub mod citizen;
pub mod complaint;
pub mod notice;
pub mod otp;
pub mod vote;
