//! OpsDesk Types - Shared domain types
//!
//! This crate contains domain types used across OpsDesk services:
//! - Webhook event sources
//! - Payment, invoice, and estimate statuses

pub mod source;
pub mod status;

pub use source::*;
pub use status::*;
