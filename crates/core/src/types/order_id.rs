//! Order identifier value type.
//!
//! Order ids are generated at order-creation time, sent to the payment
//! gateway as the external `order_id`, and used as the primary key of the
//! orders table. The format is human-inspectable:
//! `UFS-<4 random>-<8 random>` over an alphanumeric alphabet, e.g.
//! `UFS-x9Qf-J2mVp0Ka`.

use rand::Rng;
use rand::distr::Alphanumeric;
use serde::{Deserialize, Serialize};

/// Prefix shared by every Urban Fable order id.
const ORDER_ID_PREFIX: &str = "UFS";

/// Length of the short random segment.
const SHORT_SEGMENT_LEN: usize = 4;

/// Length of the long random segment.
const LONG_SEGMENT_LEN: usize = 8;

/// Globally unique order identifier.
///
/// Immutable once generated. Treated as an opaque string everywhere except
/// [`OrderId::generate`], which owns the format.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(String);

impl OrderId {
    /// Wrap an existing order id, e.g. one read back from the database or
    /// echoed by the payment gateway.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh order id.
    #[must_use]
    pub fn generate() -> Self {
        let mut rng = rand::rng();
        let short = random_segment(&mut rng, SHORT_SEGMENT_LEN);
        let long = random_segment(&mut rng, LONG_SEGMENT_LEN);
        Self(format!("{ORDER_ID_PREFIX}-{short}-{long}"))
    }

    /// Get the order id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for OrderId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<OrderId> for String {
    fn from(id: OrderId) -> Self {
        id.0
    }
}

fn random_segment<R: Rng>(rng: &mut R, len: usize) -> String {
    rng.sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_id_format() {
        let id = OrderId::generate();
        let parts: Vec<&str> = id.as_str().split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "UFS");
        assert_eq!(parts[1].len(), 4);
        assert_eq!(parts[2].len(), 8);
        assert!(
            parts[1..]
                .iter()
                .all(|p| p.chars().all(char::is_alphanumeric))
        );
    }

    #[test]
    fn test_generated_ids_are_unique() {
        let a = OrderId::generate();
        let b = OrderId::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn test_roundtrip_through_string() {
        let id = OrderId::new("UFS-ab12-cd34ef56");
        assert_eq!(String::from(id.clone()), "UFS-ab12-cd34ef56");
        assert_eq!(id.to_string(), "UFS-ab12-cd34ef56");
    }
}
