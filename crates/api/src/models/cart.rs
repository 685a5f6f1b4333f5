//! Cart snapshot consumed during order creation.

use serde::Serialize;

use urban_fable_core::{CartId, ProductId};

/// A user's cart read atomically together with its items.
///
/// The snapshot is consumed exactly once: order creation turns it into
/// order line items and deletes the cart in the same transaction.
#[derive(Debug, Clone)]
pub struct CartSnapshot {
    pub id: CartId,
    /// Running total maintained by the cart service; excludes shipping.
    /// Kept for cross-checking against [`Self::lines_total`] - the lines
    /// are authoritative for what the customer is charged.
    pub total_price: i64,
    pub lines: Vec<CartLine>,
}

impl CartSnapshot {
    /// Total recomputed from the lines at their effective unit prices.
    #[must_use]
    pub fn lines_total(&self) -> i64 {
        self.lines
            .iter()
            .map(|line| line.unit_price() * i64::from(line.quantity))
            .sum()
    }
}

/// One cart item joined to its product's pricing fields.
#[derive(Debug, Clone, Serialize)]
pub struct CartLine {
    pub product_id: ProductId,
    pub quantity: i32,
    pub title: String,
    pub image_url: Option<String>,
    pub price: i64,
    pub discount_percentage: i32,
    pub discounted_price: i64,
}

impl CartLine {
    /// Unit price in effect for this line.
    ///
    /// A product with an active discount sells at `discounted_price`,
    /// otherwise at `price`. This is the single place the rule lives; the
    /// gateway payload and any future price math must go through it.
    #[must_use]
    pub const fn unit_price(&self) -> i64 {
        if self.discount_percentage > 0 {
            self.discounted_price
        } else {
            self.price
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(price: i64, discount_percentage: i32, discounted_price: i64) -> CartLine {
        CartLine {
            product_id: ProductId::new(1),
            quantity: 1,
            title: "Linen shirt".to_string(),
            image_url: None,
            price,
            discount_percentage,
            discounted_price,
        }
    }

    #[test]
    fn test_unit_price_without_discount() {
        assert_eq!(line(10_000, 0, 8_000).unit_price(), 10_000);
    }

    #[test]
    fn test_unit_price_with_discount() {
        assert_eq!(line(10_000, 20, 8_000).unit_price(), 8_000);
    }

    #[test]
    fn test_unit_price_ignores_stale_discounted_price() {
        // discounted_price may hold a leftover value while no discount is
        // active; the percentage decides.
        assert_eq!(line(5_000, 0, 1).unit_price(), 5_000);
    }

    #[test]
    fn test_lines_total_uses_effective_unit_prices() {
        let mut first = line(10_000, 0, 0);
        first.quantity = 2;
        let cart = CartSnapshot {
            id: CartId::new(1),
            total_price: 25_000,
            lines: vec![first, line(8_000, 25, 5_000)],
        };
        assert_eq!(cart.lines_total(), 25_000);
        assert_eq!(cart.lines_total(), cart.total_price);
    }

    #[test]
    fn test_lines_total_exposes_stale_cart_total() {
        // A price change after the cart was built leaves total_price
        // behind; the recomputed total diverges and callers can flag it.
        let cart = CartSnapshot {
            id: CartId::new(1),
            total_price: 99_000,
            lines: vec![line(5_000, 0, 0)],
        };
        assert_ne!(cart.lines_total(), cart.total_price);
    }
}
