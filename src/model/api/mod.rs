//! API-compatible types.
//!
//! The types in this module are serialised in an API-friendly way, e.g.:
//!
//! - IDs are serialised as hex strings.
//! - Datetimes are serialised as RFC 3339 strings.
//! - Field names are camelCase.

pub mod account;
pub mod admin;
pub mod auth;
pub mod ballot;
pub mod candidate;
pub mod citizen;
pub mod complaint;
pub mod id;
pub mod notice;
pub mod vote;
