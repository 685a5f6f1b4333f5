//! Payment notification verification and status mapping.
//!
//! Midtrans pushes server-to-server notifications whenever a transaction
//! changes state. Each payload carries a `signature_key` that must equal
//! `sha512(order_id + status_code + gross_amount + server_key)` hex-encoded;
//! anything that fails that check is discarded without touching order state.

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use sha2::{Digest, Sha512};

use urban_fable_core::{OrderStatus, ShippingStatus};

use crate::models::Order;

/// Webhook payload fields this service consumes.
///
/// `status_code` and `gross_amount` stay as the raw strings from the wire:
/// they are hashed byte-for-byte for signature verification, so any
/// normalization would break the check.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentNotification {
    pub order_id: String,
    pub status_code: String,
    pub gross_amount: String,
    pub signature_key: String,
    pub transaction_status: String,
    #[serde(default)]
    pub fraud_status: Option<String>,
    #[serde(default)]
    pub payment_type: Option<String>,
}

/// Signature verification failure.
#[derive(Debug, thiserror::Error)]
#[error("invalid notification signature for order {order_id}")]
pub struct InvalidSignature {
    pub order_id: String,
}

/// The state change a verified notification maps to.
///
/// `shipping_status` is `None` when the notification leaves fulfillment
/// untouched; `set_payment_method` is true only on transitions to PAID.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusTransition {
    pub status: OrderStatus,
    pub shipping_status: Option<ShippingStatus>,
    pub set_payment_method: bool,
}

impl StatusTransition {
    /// Apply this transition to an order, yielding the target
    /// `(status, shipping_status, payment_method)` triple.
    ///
    /// Pure: applying the same transition twice yields the same triple, so
    /// duplicate webhook delivery reduces to an idempotent write.
    #[must_use]
    pub fn apply(
        &self,
        order: &Order,
        payment_type: Option<&str>,
    ) -> (OrderStatus, ShippingStatus, Option<String>) {
        let shipping_status = self.shipping_status.unwrap_or(order.shipping_status);
        let payment_method = if self.set_payment_method {
            payment_type
                .map(str::to_owned)
                .or_else(|| order.payment_method.clone())
        } else {
            order.payment_method.clone()
        };

        (self.status, shipping_status, payment_method)
    }
}

impl PaymentNotification {
    /// Verify the payload signature against the configured server key.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidSignature`] on mismatch; the caller must not mutate
    /// any order state in that case.
    pub fn verify_signature(&self, server_key: &SecretString) -> Result<(), InvalidSignature> {
        let material = format!(
            "{}{}{}{}",
            self.order_id,
            self.status_code,
            self.gross_amount,
            server_key.expose_secret()
        );
        let expected = hex::encode(Sha512::digest(material.as_bytes()));

        if constant_time_eq(expected.as_bytes(), self.signature_key.as_bytes()) {
            Ok(())
        } else {
            Err(InvalidSignature {
                order_id: self.order_id.clone(),
            })
        }
    }

    /// Map the gateway status vocabulary to an internal transition.
    ///
    /// First match wins; combinations outside the table (including
    /// `capture` with a non-`accept` fraud status) change nothing and
    /// return `None`.
    #[must_use]
    pub fn transition(&self) -> Option<StatusTransition> {
        match self.transaction_status.as_str() {
            "capture" => match self.fraud_status.as_deref() {
                Some("accept") => Some(StatusTransition {
                    status: OrderStatus::Paid,
                    shipping_status: Some(ShippingStatus::Shipping),
                    set_payment_method: true,
                }),
                _ => None,
            },
            "settlement" => Some(StatusTransition {
                status: OrderStatus::Paid,
                shipping_status: Some(ShippingStatus::Shipping),
                set_payment_method: true,
            }),
            "cancel" | "deny" | "expire" => Some(StatusTransition {
                status: OrderStatus::Canceled,
                shipping_status: None,
                set_payment_method: false,
            }),
            "pending" => Some(StatusTransition {
                status: OrderStatus::PendingPayment,
                shipping_status: None,
                set_payment_method: false,
            }),
            _ => None,
        }
    }
}

/// Compare two byte strings without short-circuiting on the first mismatch.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::Utc;
    use urban_fable_core::{OrderId, UserId};

    fn server_key() -> SecretString {
        SecretString::from("test-server-key")
    }

    fn signed_notification(transaction_status: &str, fraud_status: Option<&str>) -> PaymentNotification {
        let mut n = PaymentNotification {
            order_id: "UFS-ab12-cd34ef56".to_string(),
            status_code: "200".to_string(),
            gross_amount: "40000.00".to_string(),
            signature_key: String::new(),
            transaction_status: transaction_status.to_string(),
            fraud_status: fraud_status.map(str::to_owned),
            payment_type: Some("gopay".to_string()),
        };
        let material = format!(
            "{}{}{}{}",
            n.order_id,
            n.status_code,
            n.gross_amount,
            server_key().expose_secret()
        );
        n.signature_key = hex::encode(Sha512::digest(material.as_bytes()));
        n
    }

    fn pending_order() -> Order {
        let now = Utc::now();
        Order {
            id: OrderId::new("UFS-ab12-cd34ef56"),
            user_id: UserId::new(1),
            total_price: 40_000,
            status: OrderStatus::PendingPayment,
            shipping_status: ShippingStatus::Processing,
            payment_token: Some("token".to_string()),
            payment_redirect_url: Some("https://app.example.com/pay".to_string()),
            payment_method: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_valid_signature_accepted() {
        let n = signed_notification("settlement", None);
        assert!(n.verify_signature(&server_key()).is_ok());
    }

    #[test]
    fn test_tampered_signature_rejected() {
        let mut n = signed_notification("settlement", None);
        n.signature_key = format!("{}00", &n.signature_key[..n.signature_key.len() - 2]);
        assert!(n.verify_signature(&server_key()).is_err());
    }

    #[test]
    fn test_tampered_gross_amount_rejected() {
        let mut n = signed_notification("settlement", None);
        n.gross_amount = "1.00".to_string();
        assert!(n.verify_signature(&server_key()).is_err());
    }

    #[test]
    fn test_wrong_length_signature_rejected() {
        let mut n = signed_notification("settlement", None);
        n.signature_key.push('a');
        assert!(n.verify_signature(&server_key()).is_err());
    }

    #[test]
    fn test_capture_accept_maps_to_paid_shipping() {
        let t = signed_notification("capture", Some("accept"))
            .transition()
            .expect("transition");
        assert_eq!(t.status, OrderStatus::Paid);
        assert_eq!(t.shipping_status, Some(ShippingStatus::Shipping));
        assert!(t.set_payment_method);
    }

    #[test]
    fn test_capture_challenge_changes_nothing() {
        assert!(
            signed_notification("capture", Some("challenge"))
                .transition()
                .is_none()
        );
        assert!(signed_notification("capture", None).transition().is_none());
    }

    #[test]
    fn test_settlement_maps_to_paid_shipping() {
        let t = signed_notification("settlement", None)
            .transition()
            .expect("transition");
        assert_eq!(t.status, OrderStatus::Paid);
        assert_eq!(t.shipping_status, Some(ShippingStatus::Shipping));
        assert!(t.set_payment_method);
    }

    #[test]
    fn test_cancel_deny_expire_map_to_canceled() {
        for status in ["cancel", "deny", "expire"] {
            let t = signed_notification(status, None)
                .transition()
                .expect("transition");
            assert_eq!(t.status, OrderStatus::Canceled);
            assert_eq!(t.shipping_status, None);
            assert!(!t.set_payment_method);
        }
    }

    #[test]
    fn test_pending_maps_to_pending_payment() {
        let t = signed_notification("pending", None)
            .transition()
            .expect("transition");
        assert_eq!(t.status, OrderStatus::PendingPayment);
        assert_eq!(t.shipping_status, None);
    }

    #[test]
    fn test_unknown_status_changes_nothing() {
        assert!(signed_notification("refund", None).transition().is_none());
        assert!(signed_notification("", None).transition().is_none());
    }

    #[test]
    fn test_apply_is_idempotent() {
        let order = pending_order();
        let n = signed_notification("settlement", None);
        let t = n.transition().expect("transition");

        let (status, shipping, method) = t.apply(&order, n.payment_type.as_deref());
        assert_eq!(status, OrderStatus::Paid);
        assert_eq!(shipping, ShippingStatus::Shipping);
        assert_eq!(method.as_deref(), Some("gopay"));

        // Re-apply to the order as it looks after the first write.
        let mut settled = order;
        settled.status = status;
        settled.shipping_status = shipping;
        settled.payment_method = method.clone();

        let second = t.apply(&settled, n.payment_type.as_deref());
        assert_eq!(second, (status, shipping, method));
    }

    #[test]
    fn test_cancel_preserves_shipping_and_method() {
        let mut order = pending_order();
        order.shipping_status = ShippingStatus::Shipping;
        order.payment_method = Some("bank_transfer".to_string());

        let t = signed_notification("expire", None)
            .transition()
            .expect("transition");
        let (status, shipping, method) = t.apply(&order, Some("gopay"));

        assert_eq!(status, OrderStatus::Canceled);
        assert_eq!(shipping, ShippingStatus::Shipping);
        assert_eq!(method.as_deref(), Some("bank_transfer"));
    }
}
