//! Core types for Urban Fable.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod id;
pub mod order_id;
pub mod status;

pub use id::*;
pub use order_id::OrderId;
pub use status::{OrderStatus, ShippingStatus};
