//! Midtrans Snap API client.
//!
//! Creates hosted payment sessions for new orders and cancels pending
//! transactions. The asynchronous side of the integration - signed status
//! notifications - lives in [`notification`].

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::Deserialize;
use serde_json::json;

use urban_fable_core::OrderId;

use crate::config::MidtransConfig;

pub mod notification;

pub use notification::{InvalidSignature, PaymentNotification, StatusTransition};

/// Request timeout for gateway calls; a hung gateway must not pin the
/// order-creation transaction open indefinitely.
const REQUEST_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(10);

/// Errors that can occur when talking to Midtrans.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// HTTP request failed (network error, timeout).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Gateway returned a non-success response.
    #[error("gateway error: {status} - {body}")]
    Api { status: u16, body: String },

    /// Failed to build the client or parse a response.
    #[error("parse error: {0}")]
    Parse(String),
}

/// Opaque payment session returned by Snap on success.
#[derive(Debug, Clone, Deserialize)]
pub struct SnapSession {
    pub token: String,
    pub redirect_url: String,
}

/// One item row of the Snap payload.
#[derive(Debug, Clone)]
pub struct SnapItem {
    pub id: String,
    pub price: i64,
    pub quantity: i32,
    pub name: String,
}

/// Customer identity and address block sent with a checkout.
#[derive(Debug, Clone)]
pub struct CustomerDetails {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub postal_code: String,
}

/// Everything needed to open a payment session for one order.
#[derive(Debug, Clone)]
pub struct SnapCheckout {
    pub order_id: OrderId,
    /// Cart total plus the flat shipping surcharge, smallest currency unit.
    pub gross_amount: i64,
    /// Cart lines at their order-time unit prices; the shipping surcharge
    /// is appended as a synthetic line by the payload builder.
    pub items: Vec<SnapItem>,
    pub shipping_fee: i64,
    pub customer: CustomerDetails,
}

/// Midtrans Snap API client.
#[derive(Clone)]
pub struct MidtransClient {
    client: reqwest::Client,
    api_url: String,
    frontend_base_url: String,
}

impl MidtransClient {
    /// Create a new Snap client.
    ///
    /// The server key is sent as HTTP basic auth with an empty password,
    /// pre-encoded into a default header.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn new(config: &MidtransConfig, frontend_base_url: &str) -> Result<Self, GatewayError> {
        let mut headers = HeaderMap::new();

        let credentials = BASE64.encode(format!("{}:", config.server_key.expose_secret()));
        let mut auth_value = HeaderValue::from_str(&format!("Basic {credentials}"))
            .map_err(|e| GatewayError::Parse(format!("invalid server key format: {e}")))?;
        auth_value.set_sensitive(true);
        headers.insert("Authorization", auth_value);

        headers.insert("Accept", HeaderValue::from_static("application/json"));
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_owned(),
            frontend_base_url: frontend_base_url.trim_end_matches('/').to_owned(),
        })
    }

    /// Create a Snap transaction for a checkout.
    ///
    /// Snap answers HTTP 201 with `{token, redirect_url}` on success; any
    /// other status is surfaced as [`GatewayError::Api`] with the raw body
    /// so the caller can mirror the upstream failure.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::Http` on network failure or timeout and
    /// `GatewayError::Api` on a non-201 response.
    pub async fn create_transaction(
        &self,
        checkout: &SnapCheckout,
    ) -> Result<SnapSession, GatewayError> {
        let url = format!("{}/snap/v1/transactions", self.api_url);
        let payload = build_snap_payload(checkout, &self.frontend_base_url);

        let response = self.client.post(&url).json(&payload).send().await?;
        let status = response.status();

        if status.as_u16() != 201 {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Api {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<SnapSession>()
            .await
            .map_err(|e| GatewayError::Parse(e.to_string()))
    }

    /// Cancel a pending transaction on the gateway.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::Http` on network failure and
    /// `GatewayError::Api` on a non-success response; the caller must not
    /// mark the order canceled locally in that case.
    pub async fn cancel_transaction(&self, order_id: &OrderId) -> Result<(), GatewayError> {
        let url = format!("{}/v2/{}/cancel", self.api_url, order_id);

        let response = self.client.post(&url).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Api {
                status: status.as_u16(),
                body,
            });
        }

        Ok(())
    }
}

/// Build the Snap transaction-creation payload.
///
/// The shipping surcharge rides along as a synthetic `SHIPPING` line so the
/// item details sum to `gross_amount`, which Snap validates.
fn build_snap_payload(checkout: &SnapCheckout, frontend_base_url: &str) -> serde_json::Value {
    let order_id = checkout.order_id.as_str();
    let status_url = format!("{frontend_base_url}/order-status?transaction_id={order_id}");

    let mut item_details: Vec<serde_json::Value> = checkout
        .items
        .iter()
        .map(|item| {
            json!({
                "id": item.id,
                "price": item.price,
                "quantity": item.quantity,
                "name": item.name,
            })
        })
        .collect();
    item_details.push(json!({
        "id": "SHIPPING",
        "price": checkout.shipping_fee,
        "quantity": 1,
        "name": "Shipping",
    }));

    let customer = &checkout.customer;
    let address_block = json!({
        "first_name": customer.first_name,
        "last_name": customer.last_name,
        "email": customer.email,
        "phone": customer.phone,
        "address": customer.address,
        "city": customer.city,
        "postal_code": customer.postal_code,
        "country_code": "IDN",
    });

    json!({
        "transaction_details": {
            "order_id": order_id,
            "gross_amount": checkout.gross_amount,
        },
        "credit_card": {
            "secure": true,
        },
        "item_details": item_details,
        "customer_details": {
            "first_name": customer.first_name,
            "last_name": customer.last_name,
            "email": customer.email,
            "phone": customer.phone,
            "billing_address": address_block,
            "shipping_address": address_block,
        },
        "callbacks": {
            "finish": status_url,
            "error": status_url,
            "pending": status_url,
        },
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn checkout() -> SnapCheckout {
        SnapCheckout {
            order_id: OrderId::new("UFS-ab12-cd34ef56"),
            gross_amount: 40_000,
            items: vec![
                SnapItem {
                    id: "1".to_string(),
                    price: 10_000,
                    quantity: 2,
                    name: "Linen shirt".to_string(),
                },
                SnapItem {
                    id: "2".to_string(),
                    price: 5_000,
                    quantity: 1,
                    name: "Canvas tote".to_string(),
                },
            ],
            shipping_fee: 15_000,
            customer: CustomerDetails {
                first_name: "Ayu".to_string(),
                last_name: "Pratiwi".to_string(),
                email: "ayu@example.com".to_string(),
                phone: "+62811111111".to_string(),
                address: "Jl. Kenanga 5".to_string(),
                city: "Jakarta".to_string(),
                postal_code: "10110".to_string(),
            },
        }
    }

    #[test]
    fn test_payload_echoes_order_id_and_gross_amount() {
        let payload = build_snap_payload(&checkout(), "https://shop.example.com");
        assert_eq!(
            payload["transaction_details"]["order_id"],
            "UFS-ab12-cd34ef56"
        );
        assert_eq!(payload["transaction_details"]["gross_amount"], 40_000);
    }

    #[test]
    fn test_payload_appends_shipping_line() {
        let payload = build_snap_payload(&checkout(), "https://shop.example.com");
        let items = payload["item_details"].as_array().expect("item_details");
        assert_eq!(items.len(), 3);
        let shipping = items.last().expect("shipping line");
        assert_eq!(shipping["id"], "SHIPPING");
        assert_eq!(shipping["price"], 15_000);
        assert_eq!(shipping["quantity"], 1);
        assert_eq!(shipping["name"], "Shipping");
    }

    #[test]
    fn test_payload_items_sum_to_gross_amount() {
        let payload = build_snap_payload(&checkout(), "https://shop.example.com");
        let sum: i64 = payload["item_details"]
            .as_array()
            .expect("item_details")
            .iter()
            .map(|i| i["price"].as_i64().unwrap() * i["quantity"].as_i64().unwrap())
            .sum();
        assert_eq!(sum, 40_000);
    }

    #[test]
    fn test_payload_callbacks_use_frontend_base_url() {
        let payload = build_snap_payload(&checkout(), "https://shop.example.com");
        let expected = "https://shop.example.com/order-status?transaction_id=UFS-ab12-cd34ef56";
        for key in ["finish", "error", "pending"] {
            assert_eq!(payload["callbacks"][key], expected);
        }
    }

    #[test]
    fn test_payload_addresses_carry_country_code() {
        let payload = build_snap_payload(&checkout(), "https://shop.example.com");
        assert_eq!(
            payload["customer_details"]["billing_address"]["country_code"],
            "IDN"
        );
        assert_eq!(
            payload["customer_details"]["shipping_address"]["country_code"],
            "IDN"
        );
    }
}
