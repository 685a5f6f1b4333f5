//! Domain models for the order service.

pub mod cart;
pub mod order;
pub mod user;

pub use cart::{CartLine, CartSnapshot};
pub use order::{NewOrder, Order, OrderItemDetail, OrderWithItems};
pub use user::{ShippingDetails, User};
