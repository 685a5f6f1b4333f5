//! Order lifecycle coordination.
//!
//! Writes to an order run inside a single database transaction, and
//! gateway calls never overlap row locks: order creation reads the user
//! and cart without locking, talks to Snap with no database resources
//! held, and only then opens the write transaction; cancellation
//! confirms with the gateway before locking the order row. A gateway
//! failure therefore persists nothing and pins no connections.

use serde::Serialize;

use urban_fable_core::{OrderId, OrderStatus, ShippingStatus, UserId};

use crate::db::{CartRepository, OrderRepository, RepositoryError, UserRepository};
use crate::error::{ApiError, Result};
use crate::midtrans::{CustomerDetails, PaymentNotification, SnapCheckout, SnapItem};
use crate::models::{CartSnapshot, NewOrder, OrderWithItems, ShippingDetails};
use crate::state::AppState;

/// Response body for a successfully created order.
#[derive(Debug, Clone, Serialize)]
pub struct CreatedOrder {
    pub order_id: OrderId,
    pub token: String,
    pub redirect_url: String,
}

/// A manual status change requested over the admin surface.
///
/// Fields left `None` keep their stored value.
#[derive(Debug, Clone, Copy)]
pub struct StatusUpdate {
    pub status: Option<OrderStatus>,
    pub shipping_status: Option<ShippingStatus>,
}

/// Coordinates order creation, payment callbacks, and status changes.
#[derive(Clone)]
pub struct OrderService {
    state: AppState,
}

impl OrderService {
    #[must_use]
    pub const fn new(state: AppState) -> Self {
        Self { state }
    }

    /// Create an order from the user's cart and open a payment session.
    ///
    /// Runs in three phases: a lock-free read of the user and cart, the
    /// Snap call with nothing held, and one write transaction covering
    /// the shipping-profile update, the order with its line items, and
    /// cart consumption. The order commits only after the gateway
    /// accepted the transaction; if the gateway call fails nothing is
    /// persisted, and a slow gateway holds no row locks or connections.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` if the user doesn't exist or their
    /// cart is empty, and `ApiError::Gateway` if Snap rejects the
    /// transaction.
    pub async fn create(
        &self,
        user_id: UserId,
        shipping: &ShippingDetails,
    ) -> Result<CreatedOrder> {
        let pool = self.state.pool();

        let user = UserRepository::find(pool, user_id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("user {user_id}")))?;
        let cart = match CartRepository::snapshot(pool, user_id).await {
            Ok(cart) => cart,
            Err(RepositoryError::NotFound) => return Err(cart_not_found(user_id)),
            Err(e) => return Err(e.into()),
        };

        if cart.lines_total() != cart.total_price {
            // The cart service maintains total_price; a mismatch means a
            // price changed after the cart was built. The lines decide
            // what the customer is charged.
            tracing::warn!(
                %user_id,
                cart_total = cart.total_price,
                lines_total = cart.lines_total(),
                "Cart total out of sync with line prices"
            );
        }

        let shipping_fee = self.state.config().shipping_flat_rate;
        let order_id = OrderId::generate();
        let checkout = build_checkout(order_id.clone(), &cart, shipping, &user.email, shipping_fee);

        // No transaction is open and no connection is held here; a slow
        // gateway ties up nothing but this request.
        let session = self.state.midtrans().create_transaction(&checkout).await?;

        let new_order = NewOrder {
            id: order_id.clone(),
            user_id,
            total_price: checkout.gross_amount,
            payment_token: session.token.clone(),
            payment_redirect_url: session.redirect_url.clone(),
        };

        let mut tx = pool.begin().await.map_err(RepositoryError::from)?;
        UserRepository::update_shipping_profile(&mut *tx, user_id, shipping).await?;
        OrderRepository::insert(&mut *tx, &new_order).await?;
        OrderRepository::insert_items(&mut *tx, &order_id, &cart.lines).await?;
        CartRepository::delete(&mut *tx, cart.id).await?;

        if let Err(e) = tx.commit().await {
            // The Snap transaction now exists with no local order; it will
            // expire on its own, but flag it for reconciliation.
            tracing::warn!(
                order_id = %order_id,
                error = %e,
                "Order commit failed after gateway transaction was created"
            );
            return Err(RepositoryError::from(e).into());
        }

        tracing::info!(
            order_id = %order_id,
            %user_id,
            gross_amount = checkout.gross_amount,
            "Order created"
        );

        Ok(CreatedOrder {
            order_id,
            token: session.token,
            redirect_url: session.redirect_url,
        })
    }

    /// List the orders belonging to a user, newest first.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Database` if a query fails.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<OrderWithItems>> {
        Ok(OrderRepository::list_by_user(self.state.pool(), user_id).await?)
    }

    /// List all orders in a payment status, newest first.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Database` if a query fails.
    pub async fn list_by_status(&self, status: OrderStatus) -> Result<Vec<OrderWithItems>> {
        Ok(OrderRepository::list_by_status(self.state.pool(), status).await?)
    }

    /// Fetch one order with its line items.
    ///
    /// `scope_user` restricts the lookup to that owner; admin callers pass
    /// `None`. An order outside the scope reads as missing, not forbidden.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` if no matching order exists.
    pub async fn get(
        &self,
        id: &OrderId,
        scope_user: Option<UserId>,
    ) -> Result<OrderWithItems> {
        OrderRepository::get_with_items(self.state.pool(), id, scope_user)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("order {id}")))
    }

    /// Manually change an order's status (admin surface).
    ///
    /// Any combination of statuses is accepted; this is the escape hatch
    /// for fulfillment updates (marking SHIPPED) and support corrections,
    /// so every change is logged with its before and after values.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` if the order doesn't exist and
    /// `ApiError::BadRequest` if no field was provided.
    pub async fn update_status(&self, id: &OrderId, update: StatusUpdate) -> Result<()> {
        if update.status.is_none() && update.shipping_status.is_none() {
            return Err(ApiError::BadRequest(
                "provide status and/or shipping_status".to_string(),
            ));
        }

        let mut tx = self.state.pool().begin().await.map_err(RepositoryError::from)?;

        let order = OrderRepository::find_for_update(&mut *tx, id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("order {id}")))?;

        let status = update.status.unwrap_or(order.status);
        let shipping_status = update.shipping_status.unwrap_or(order.shipping_status);

        OrderRepository::update_payment_state(&mut *tx, id, status, shipping_status, None).await?;
        tx.commit().await.map_err(RepositoryError::from)?;

        tracing::info!(
            order_id = %id,
            old_status = %order.status,
            new_status = %status,
            old_shipping = %order.shipping_status,
            new_shipping = %shipping_status,
            "Order status updated manually"
        );

        Ok(())
    }

    /// Apply a verified payment notification to its order.
    ///
    /// The row lock serializes concurrent notifications for the same
    /// order; the write itself is idempotent, so gateway re-delivery is
    /// harmless. Notifications for unknown orders and statuses outside
    /// the mapping table are logged and dropped.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::InvalidSignature` if the payload signature
    /// doesn't match and `ApiError::Database` if a write fails. The
    /// caller decides how those surface; the gateway itself must always
    /// be answered with 200.
    pub async fn apply_notification(&self, notification: &PaymentNotification) -> Result<()> {
        notification.verify_signature(&self.state.config().midtrans.server_key)?;

        let Some(transition) = notification.transition() else {
            tracing::debug!(
                order_id = %notification.order_id,
                transaction_status = %notification.transaction_status,
                "Notification status outside mapping table, ignoring"
            );
            return Ok(());
        };

        let mut tx = self.state.pool().begin().await.map_err(RepositoryError::from)?;

        let order_id = OrderId::new(notification.order_id.clone());
        let Some(order) = OrderRepository::find_for_update(&mut *tx, &order_id).await? else {
            tracing::warn!(
                order_id = %order_id,
                "Notification for unknown order, ignoring"
            );
            return Ok(());
        };

        let (status, shipping_status, payment_method) =
            transition.apply(&order, notification.payment_type.as_deref());

        OrderRepository::update_payment_state(
            &mut *tx,
            &order_id,
            status,
            shipping_status,
            payment_method.as_deref(),
        )
        .await?;
        tx.commit().await.map_err(RepositoryError::from)?;

        tracing::info!(
            order_id = %order_id,
            transaction_status = %notification.transaction_status,
            new_status = %status,
            "Payment notification applied"
        );

        Ok(())
    }

    /// Cancel a pending order on the gateway and locally.
    ///
    /// Existence and ownership are checked with a plain read, then the
    /// gateway cancel runs with no transaction open; only after the
    /// gateway confirmed is the order row locked and marked CANCELED. A
    /// failed upstream cancel never leaves a payable session behind a
    /// locally-canceled order, and a slow gateway holds no row locks.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` if the order doesn't exist (or is
    /// outside `scope_user`) and `ApiError::Gateway` if the upstream
    /// cancel fails.
    pub async fn cancel(&self, id: &OrderId, scope_user: Option<UserId>) -> Result<()> {
        self.get(id, scope_user).await?;

        self.state.midtrans().cancel_transaction(id).await?;

        let mut tx = self.state.pool().begin().await.map_err(RepositoryError::from)?;
        let order = OrderRepository::find_for_update(&mut *tx, id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("order {id}")))?;
        OrderRepository::update_payment_state(
            &mut *tx,
            id,
            OrderStatus::Canceled,
            order.shipping_status,
            None,
        )
        .await?;
        tx.commit().await.map_err(RepositoryError::from)?;

        tracing::info!(order_id = %id, "Order canceled");

        Ok(())
    }

    /// Permanently delete an order and its line items (admin surface).
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` if the order doesn't exist.
    pub async fn delete(&self, id: &OrderId) -> Result<()> {
        let mut tx = self.state.pool().begin().await.map_err(RepositoryError::from)?;

        match OrderRepository::delete(&mut *tx, id).await {
            Ok(()) => {}
            Err(RepositoryError::NotFound) => {
                return Err(ApiError::NotFound(format!("order {id}")));
            }
            Err(e) => return Err(e.into()),
        }
        tx.commit().await.map_err(RepositoryError::from)?;

        tracing::info!(order_id = %id, "Order deleted");

        Ok(())
    }
}

/// The 404 produced when checkout finds no cart to consume.
fn cart_not_found(user_id: UserId) -> ApiError {
    ApiError::NotFound(format!("cart for user {user_id}"))
}

/// Assemble the gateway checkout from a cart snapshot.
///
/// Unit prices follow the discount rule in `CartLine::unit_price`;
/// `gross_amount` is recomputed from the lines rather than trusted from
/// the cart row, because Snap validates that the item details sum to it.
fn build_checkout(
    order_id: OrderId,
    cart: &CartSnapshot,
    shipping: &ShippingDetails,
    email: &str,
    shipping_fee: i64,
) -> SnapCheckout {
    let items: Vec<SnapItem> = cart
        .lines
        .iter()
        .map(|line| SnapItem {
            id: line.product_id.to_string(),
            price: line.unit_price(),
            quantity: line.quantity,
            name: line.title.clone(),
        })
        .collect();

    SnapCheckout {
        order_id,
        gross_amount: cart.lines_total() + shipping_fee,
        items,
        shipping_fee,
        customer: CustomerDetails {
            first_name: shipping.first_name.clone(),
            last_name: shipping.last_name.clone(),
            email: email.to_owned(),
            phone: shipping.phone_number.clone(),
            address: shipping.address.clone(),
            city: shipping.city.clone(),
            postal_code: shipping.postal_code.clone(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::http::StatusCode;
    use axum::response::IntoResponse;

    use urban_fable_core::{CartId, ProductId};

    use crate::models::CartLine;

    fn cart() -> CartSnapshot {
        CartSnapshot {
            id: CartId::new(1),
            total_price: 25_000,
            lines: vec![
                CartLine {
                    product_id: ProductId::new(1),
                    quantity: 2,
                    title: "Linen shirt".to_string(),
                    image_url: None,
                    price: 10_000,
                    discount_percentage: 0,
                    discounted_price: 0,
                },
                CartLine {
                    product_id: ProductId::new(2),
                    quantity: 1,
                    title: "Canvas tote".to_string(),
                    image_url: None,
                    price: 8_000,
                    discount_percentage: 25,
                    discounted_price: 5_000,
                },
            ],
        }
    }

    fn shipping() -> ShippingDetails {
        ShippingDetails {
            first_name: "Ayu".to_string(),
            last_name: "Pratiwi".to_string(),
            address: "Jl. Kenanga 5".to_string(),
            phone_number: "+62811111111".to_string(),
            city: "Jakarta".to_string(),
            postal_code: "10110".to_string(),
        }
    }

    #[test]
    fn test_missing_cart_maps_to_404() {
        let response = cart_not_found(UserId::new(3)).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_checkout_gross_amount_includes_shipping() {
        let checkout = build_checkout(
            OrderId::new("UFS-ab12-cd34ef56"),
            &cart(),
            &shipping(),
            "ayu@example.com",
            15_000,
        );
        assert_eq!(checkout.gross_amount, 40_000);
        assert_eq!(checkout.shipping_fee, 15_000);
        assert_eq!(checkout.items.len(), 2);
    }

    #[test]
    fn test_checkout_items_use_discounted_prices() {
        let checkout = build_checkout(
            OrderId::new("UFS-ab12-cd34ef56"),
            &cart(),
            &shipping(),
            "ayu@example.com",
            15_000,
        );
        let discounted = checkout.items.last().expect("discounted line");
        assert_eq!(discounted.price, 5_000);
    }
}
