//! Cart repository: snapshot reads and consumption.

use sqlx::{PgConnection, PgPool};

use urban_fable_core::{CartId, ProductId, UserId};

use super::RepositoryError;
use crate::models::{CartLine, CartSnapshot};

/// Row shape for the cart/product join.
#[derive(sqlx::FromRow)]
struct CartLineRow {
    cart_id: i32,
    total_price: i64,
    product_id: i32,
    quantity: i32,
    title: String,
    image_url: Option<String>,
    price: i64,
    discount_percentage: i32,
    discounted_price: i64,
}

/// Repository for the cart a checkout consumes.
pub struct CartRepository;

impl CartRepository {
    /// Read a user's cart and all its items in one query, joined to the
    /// products' current pricing fields.
    ///
    /// A plain read - no row locks are taken, so callers are free to run
    /// it before long network calls. The cart is consumed afterwards by
    /// [`CartRepository::delete`] on the write transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user has no cart or the
    /// cart has no items - callers treat this as "nothing to order".
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn snapshot(
        pool: &PgPool,
        user_id: UserId,
    ) -> Result<CartSnapshot, RepositoryError> {
        let rows: Vec<CartLineRow> = sqlx::query_as(
            r"
            SELECT c.id AS cart_id, c.total_price,
                   ci.product_id, ci.quantity,
                   p.title, p.image_url, p.price,
                   p.discount_percentage, p.discounted_price
            FROM carts c
            JOIN cart_items ci ON ci.cart_id = c.id
            JOIN products p ON p.id = ci.product_id
            WHERE c.user_id = $1
            ORDER BY ci.id
            ",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        let Some(first) = rows.first() else {
            return Err(RepositoryError::NotFound);
        };

        let id = CartId::new(first.cart_id);
        let total_price = first.total_price;
        let lines = rows
            .into_iter()
            .map(|r| CartLine {
                product_id: ProductId::new(r.product_id),
                quantity: r.quantity,
                title: r.title,
                image_url: r.image_url,
                price: r.price,
                discount_percentage: r.discount_percentage,
                discounted_price: r.discounted_price,
            })
            .collect();

        Ok(CartSnapshot {
            id,
            total_price,
            lines,
        })
    }

    /// Delete a cart and its items.
    ///
    /// Runs on the order-creation transaction: the cart disappears only if
    /// the order commit succeeds. Deleting a cart that vanished in the
    /// meantime affects zero rows and is not an error.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a statement fails.
    pub async fn delete(conn: &mut PgConnection, id: CartId) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM cart_items WHERE cart_id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?;

        sqlx::query("DELETE FROM carts WHERE id = $1")
            .bind(id)
            .execute(conn)
            .await?;

        Ok(())
    }
}
