//! User profile as consumed by order creation.

use serde::Deserialize;

use urban_fable_core::UserId;

/// The slice of the user directory this service reads.
///
/// Only the email matters at checkout; the displayed customer name comes
/// from the submitted shipping details.
#[derive(Debug, Clone)]
pub struct User {
    pub id: UserId,
    pub email: String,
}

/// Shipping details submitted with an order-creation request.
///
/// Upserted onto the user profile before the order is created, so the most
/// recent checkout always reflects the address on file.
#[derive(Debug, Clone, Deserialize)]
pub struct ShippingDetails {
    pub first_name: String,
    pub last_name: String,
    pub address: String,
    pub phone_number: String,
    pub city: String,
    pub postal_code: String,
}
