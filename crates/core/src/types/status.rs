//! Status enums for the order lifecycle.
//!
//! Payment and fulfillment progress are independent axes: `status` tracks
//! what the payment gateway reported, `shipping_status` tracks warehouse
//! progress and only advances once an order is paid.

use serde::{Deserialize, Serialize};

/// Payment state of an order.
///
/// `PENDING_PAYMENT` is the only non-terminal state; `PAID` and `CANCELED`
/// are terminal on this axis (the admin update path may still overwrite
/// them, see the order service).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    #[default]
    PendingPayment,
    Paid,
    Canceled,
}

impl OrderStatus {
    /// Canonical database/wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PendingPayment => "PENDING_PAYMENT",
            Self::Paid => "PAID",
            Self::Canceled => "CANCELED",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING_PAYMENT" => Ok(Self::PendingPayment),
            "PAID" => Ok(Self::Paid),
            "CANCELED" => Ok(Self::Canceled),
            _ => Err(format!("invalid order status: {s}")),
        }
    }
}

/// Fulfillment state of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShippingStatus {
    #[default]
    Processing,
    Shipping,
    Shipped,
}

impl ShippingStatus {
    /// Canonical database/wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Processing => "PROCESSING",
            Self::Shipping => "SHIPPING",
            Self::Shipped => "SHIPPED",
        }
    }
}

impl std::fmt::Display for ShippingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ShippingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PROCESSING" => Ok(Self::Processing),
            "SHIPPING" => Ok(Self::Shipping),
            "SHIPPED" => Ok(Self::Shipped),
            _ => Err(format!("invalid shipping status: {s}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_status_roundtrip() {
        for status in [
            OrderStatus::PendingPayment,
            OrderStatus::Paid,
            OrderStatus::Canceled,
        ] {
            assert_eq!(status.as_str().parse::<OrderStatus>(), Ok(status));
        }
    }

    #[test]
    fn test_shipping_status_roundtrip() {
        for status in [
            ShippingStatus::Processing,
            ShippingStatus::Shipping,
            ShippingStatus::Shipped,
        ] {
            assert_eq!(status.as_str().parse::<ShippingStatus>(), Ok(status));
        }
    }

    #[test]
    fn test_serde_uses_screaming_snake_case() {
        let json = serde_json::to_string(&OrderStatus::PendingPayment).expect("serialize");
        assert_eq!(json, "\"PENDING_PAYMENT\"");
        let json = serde_json::to_string(&ShippingStatus::Shipping).expect("serialize");
        assert_eq!(json, "\"SHIPPING\"");
    }
}
