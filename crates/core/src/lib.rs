//! Urban Fable Core - Shared types library.
//!
//! This crate provides the common types used by the Urban Fable order
//! service:
//! - `api` - REST backend for carts, orders and payment notifications
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access, no HTTP
//! clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, order identifiers and
//!   statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
