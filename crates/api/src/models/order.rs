//! Order aggregate: the order row plus its line items.

use chrono::{DateTime, Utc};
use serde::Serialize;

use urban_fable_core::{OrderId, OrderItemId, OrderStatus, ProductId, ShippingStatus, UserId};

/// A persisted order.
///
/// Apart from `status`, `shipping_status` and `payment_method`, every field
/// is immutable once the row exists. `total_price` is in the smallest
/// currency unit and already includes the shipping surcharge.
#[derive(Debug, Clone, Serialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub total_price: i64,
    pub status: OrderStatus,
    pub shipping_status: ShippingStatus,
    /// Opaque session token returned by the payment gateway at creation.
    pub payment_token: Option<String>,
    /// Hosted payment page URL returned by the gateway at creation.
    pub payment_redirect_url: Option<String>,
    /// Payment method the payer actually used; set when the gateway reports
    /// a successful payment, null until then.
    pub payment_method: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields required to insert a new order row.
///
/// Status always starts at `PENDING_PAYMENT` / `PROCESSING`, so the statuses
/// are not part of the insert request.
#[derive(Debug)]
pub struct NewOrder {
    pub id: OrderId,
    pub user_id: UserId,
    pub total_price: i64,
    pub payment_token: String,
    pub payment_redirect_url: String,
}

/// A line item projected together with its product's current display data.
///
/// `quantity` is the order-time snapshot; `title`, `image_url` and `price`
/// come from the product row at read time and are for display only - the
/// money the customer owed is frozen in `Order::total_price`.
#[derive(Debug, Clone, Serialize)]
pub struct OrderItemDetail {
    pub id: OrderItemId,
    pub product_id: ProductId,
    pub quantity: i32,
    pub title: String,
    pub image_url: Option<String>,
    pub price: i64,
}

/// An order with its line items, the shape returned by all read paths.
#[derive(Debug, Clone, Serialize)]
pub struct OrderWithItems {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItemDetail>,
}
