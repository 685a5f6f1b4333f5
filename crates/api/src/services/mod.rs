//! Business logic services.

pub mod orders;

pub use orders::{CreatedOrder, OrderService, StatusUpdate};
