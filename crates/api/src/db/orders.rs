//! Order repository: the aggregate this service owns.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};

use urban_fable_core::{
    OrderId, OrderItemId, OrderStatus, ProductId, ShippingStatus, UserId,
};

use super::RepositoryError;
use crate::models::{CartLine, NewOrder, Order, OrderItemDetail, OrderWithItems};

/// Raw order row; statuses are parsed into enums on the way out.
#[derive(sqlx::FromRow)]
struct OrderRow {
    id: String,
    user_id: i32,
    total_price: i64,
    status: String,
    shipping_status: String,
    payment_token: Option<String>,
    payment_redirect_url: Option<String>,
    payment_method: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl OrderRow {
    fn into_order(self) -> Result<Order, RepositoryError> {
        let status = self.status.parse::<OrderStatus>().map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid status in database: {e}"))
        })?;
        let shipping_status = self.shipping_status.parse::<ShippingStatus>().map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid shipping status in database: {e}"))
        })?;

        Ok(Order {
            id: OrderId::new(self.id),
            user_id: UserId::new(self.user_id),
            total_price: self.total_price,
            status,
            shipping_status,
            payment_token: self.payment_token,
            payment_redirect_url: self.payment_redirect_url,
            payment_method: self.payment_method,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Line item joined to its product for read projections.
#[derive(sqlx::FromRow)]
struct OrderItemRow {
    id: i32,
    order_id: String,
    product_id: i32,
    quantity: i32,
    title: String,
    image_url: Option<String>,
    price: i64,
}

impl OrderItemRow {
    fn into_detail(self) -> OrderItemDetail {
        OrderItemDetail {
            id: OrderItemId::new(self.id),
            product_id: ProductId::new(self.product_id),
            quantity: self.quantity,
            title: self.title,
            image_url: self.image_url,
            price: self.price,
        }
    }
}

const SELECT_ORDER: &str = r"
    SELECT id, user_id, total_price, status, shipping_status,
           payment_token, payment_redirect_url, payment_method,
           created_at, updated_at
    FROM orders
";

/// Repository for order and line-item persistence.
pub struct OrderRepository;

impl OrderRepository {
    /// Insert a new order row with the initial
    /// `PENDING_PAYMENT` / `PROCESSING` statuses.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn insert(conn: &mut PgConnection, order: &NewOrder) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO orders
                (id, user_id, total_price, status, shipping_status,
                 payment_token, payment_redirect_url)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ",
        )
        .bind(order.id.as_str())
        .bind(order.user_id)
        .bind(order.total_price)
        .bind(OrderStatus::PendingPayment.as_str())
        .bind(ShippingStatus::Processing.as_str())
        .bind(&order.payment_token)
        .bind(&order.payment_redirect_url)
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Bulk-insert the line items snapshotted from a cart.
    ///
    /// A single multi-row insert, so the items land all-or-nothing even
    /// before the enclosing transaction commits.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn insert_items(
        conn: &mut PgConnection,
        order_id: &OrderId,
        lines: &[CartLine],
    ) -> Result<(), RepositoryError> {
        let product_ids: Vec<i32> = lines.iter().map(|l| l.product_id.as_i32()).collect();
        let quantities: Vec<i32> = lines.iter().map(|l| l.quantity).collect();

        sqlx::query(
            r"
            INSERT INTO order_items (order_id, product_id, quantity)
            SELECT $1, product_id, quantity
            FROM UNNEST($2::INT4[], $3::INT4[]) AS t (product_id, quantity)
            ",
        )
        .bind(order_id.as_str())
        .bind(product_ids)
        .bind(quantities)
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Fetch an order row and lock it for the rest of the transaction.
    ///
    /// Used by the webhook and cancel paths so concurrent status writes for
    /// the same order serialize instead of interleaving.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored status is invalid.
    pub async fn find_for_update(
        conn: &mut PgConnection,
        id: &OrderId,
    ) -> Result<Option<Order>, RepositoryError> {
        let sql = format!("{SELECT_ORDER} WHERE id = $1 FOR UPDATE");
        let row: Option<OrderRow> = sqlx::query_as(&sql)
            .bind(id.as_str())
            .fetch_optional(conn)
            .await?;

        row.map(OrderRow::into_order).transpose()
    }

    /// Fetch one order with its line items.
    ///
    /// When `scope_user` is set the lookup is restricted to that owner, so
    /// customers cannot address other users' orders; the admin paths pass
    /// `None`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored status is invalid.
    pub async fn get_with_items(
        pool: &PgPool,
        id: &OrderId,
        scope_user: Option<UserId>,
    ) -> Result<Option<OrderWithItems>, RepositoryError> {
        let row: Option<OrderRow> = match scope_user {
            Some(user_id) => {
                let sql = format!("{SELECT_ORDER} WHERE id = $1 AND user_id = $2");
                sqlx::query_as(&sql)
                    .bind(id.as_str())
                    .bind(user_id)
                    .fetch_optional(pool)
                    .await?
            }
            None => {
                let sql = format!("{SELECT_ORDER} WHERE id = $1");
                sqlx::query_as(&sql)
                    .bind(id.as_str())
                    .fetch_optional(pool)
                    .await?
            }
        };

        let Some(row) = row else {
            return Ok(None);
        };

        let order = row.into_order()?;
        let mut items = Self::items_for(pool, &[order.id.as_str().to_owned()]).await?;
        let items = items.remove(order.id.as_str()).unwrap_or_default();

        Ok(Some(OrderWithItems { order, items }))
    }

    /// List all orders in a payment status, newest first (admin projection).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored status is invalid.
    pub async fn list_by_status(
        pool: &PgPool,
        status: OrderStatus,
    ) -> Result<Vec<OrderWithItems>, RepositoryError> {
        let sql = format!("{SELECT_ORDER} WHERE status = $1 ORDER BY created_at DESC");
        let rows: Vec<OrderRow> = sqlx::query_as(&sql)
            .bind(status.as_str())
            .fetch_all(pool)
            .await?;

        Self::attach_items(pool, rows).await
    }

    /// List a user's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored status is invalid.
    pub async fn list_by_user(
        pool: &PgPool,
        user_id: UserId,
    ) -> Result<Vec<OrderWithItems>, RepositoryError> {
        let sql = format!("{SELECT_ORDER} WHERE user_id = $1 ORDER BY created_at DESC");
        let rows: Vec<OrderRow> = sqlx::query_as(&sql)
            .bind(user_id)
            .fetch_all(pool)
            .await?;

        Self::attach_items(pool, rows).await
    }

    /// Overwrite an order's payment state in one atomic statement.
    ///
    /// `payment_method` is only ever set, never cleared: `COALESCE` keeps
    /// the stored value when the caller passes `None`. Re-applying the same
    /// values is a no-op, which is what makes webhook re-delivery safe.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order doesn't exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn update_payment_state(
        conn: &mut PgConnection,
        id: &OrderId,
        status: OrderStatus,
        shipping_status: ShippingStatus,
        payment_method: Option<&str>,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE orders
            SET status = $2,
                shipping_status = $3,
                payment_method = COALESCE($4, payment_method),
                updated_at = now()
            WHERE id = $1
            ",
        )
        .bind(id.as_str())
        .bind(status.as_str())
        .bind(shipping_status.as_str())
        .bind(payment_method)
        .execute(conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    /// Delete an order together with its line items.
    ///
    /// Both deletes run on the caller's transaction; partial deletion is
    /// never observable.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order doesn't exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn delete(conn: &mut PgConnection, id: &OrderId) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM order_items WHERE order_id = $1")
            .bind(id.as_str())
            .execute(&mut *conn)
            .await?;

        let result = sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(id.as_str())
            .execute(conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    /// Attach line items to a page of order rows with one items query.
    async fn attach_items(
        pool: &PgPool,
        rows: Vec<OrderRow>,
    ) -> Result<Vec<OrderWithItems>, RepositoryError> {
        let ids: Vec<String> = rows.iter().map(|r| r.id.clone()).collect();
        let mut items = Self::items_for(pool, &ids).await?;

        rows.into_iter()
            .map(|row| {
                let order = row.into_order()?;
                let items = items.remove(order.id.as_str()).unwrap_or_default();
                Ok(OrderWithItems { order, items })
            })
            .collect()
    }

    /// Fetch the line items for a set of orders, grouped by order id.
    async fn items_for(
        pool: &PgPool,
        order_ids: &[String],
    ) -> Result<HashMap<String, Vec<OrderItemDetail>>, RepositoryError> {
        if order_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows: Vec<OrderItemRow> = sqlx::query_as(
            r"
            SELECT oi.id, oi.order_id, oi.product_id, oi.quantity,
                   p.title, p.image_url, p.price
            FROM order_items oi
            JOIN products p ON p.id = oi.product_id
            WHERE oi.order_id = ANY($1)
            ORDER BY oi.id
            ",
        )
        .bind(order_ids)
        .fetch_all(pool)
        .await?;

        let mut grouped: HashMap<String, Vec<OrderItemDetail>> = HashMap::new();
        for row in rows {
            let order_id = row.order_id.clone();
            grouped.entry(order_id).or_default().push(row.into_detail());
        }

        Ok(grouped)
    }
}
