//! Transaction route handlers.
//!
//! Customer endpoints act as the authenticated caller; admin endpoints
//! require the admin role. The gateway notification endpoint is the one
//! unauthenticated route, guarded by its payload signature instead.

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use urban_fable_core::{OrderId, OrderStatus, ShippingStatus};

use crate::error::{ApiError, Result};
use crate::middleware::AuthUser;
use crate::midtrans::PaymentNotification;
use crate::models::ShippingDetails;
use crate::services::StatusUpdate;
use crate::state::AppState;

/// Success envelope wrapping every response body.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub status: &'static str,
    pub message: String,
    pub data: T,
}

impl<T> ApiResponse<T> {
    fn success(message: impl Into<String>, data: T) -> Json<Self> {
        Json(Self {
            status: "success",
            message: message.into(),
            data,
        })
    }
}

/// Transaction routes under `/v1/transactions`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_transaction))
        .route("/user", get(get_user_transactions))
        .route("/status/{status}", get(get_transactions_by_status))
        .route("/cancel", post(cancel_transaction))
        .route("/notification", post(payment_notification))
        .route(
            "/{transaction_id}",
            get(get_transaction)
                .put(update_transaction)
                .delete(delete_transaction),
        )
}

/// Create an order from the caller's cart.
#[instrument(skip(state, shipping), fields(user_id = %user.id))]
async fn create_transaction(
    State(state): State<AppState>,
    user: AuthUser,
    Json(shipping): Json<ShippingDetails>,
) -> Result<impl IntoResponse> {
    let created = state.orders().create(user.id, &shipping).await?;

    Ok((
        StatusCode::CREATED,
        ApiResponse::success("Transaction created", created),
    ))
}

/// List the caller's orders, newest first.
#[instrument(skip(state), fields(user_id = %user.id))]
async fn get_user_transactions(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse> {
    let orders = state.orders().list_for_user(user.id).await?;

    Ok(ApiResponse::success("Transactions retrieved", orders))
}

/// List all orders in a payment status (admin).
#[instrument(skip(state), fields(user_id = %user.id))]
async fn get_transactions_by_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(status): Path<String>,
) -> Result<impl IntoResponse> {
    user.require_admin()?;

    let status = status
        .parse::<OrderStatus>()
        .map_err(ApiError::BadRequest)?;
    let orders = state.orders().list_by_status(status).await?;

    Ok(ApiResponse::success("Transactions retrieved", orders))
}

/// Fetch one order. Customers only see their own; admins see all.
#[instrument(skip(state), fields(user_id = %user.id))]
async fn get_transaction(
    State(state): State<AppState>,
    user: AuthUser,
    Path(transaction_id): Path<String>,
) -> Result<impl IntoResponse> {
    let scope = if user.is_admin() { None } else { Some(user.id) };
    let order = state
        .orders()
        .get(&OrderId::new(transaction_id), scope)
        .await?;

    Ok(ApiResponse::success("Transaction retrieved", order))
}

/// Manual status change request body.
#[derive(Debug, Deserialize)]
struct UpdateTransactionRequest {
    status: Option<OrderStatus>,
    shipping_status: Option<ShippingStatus>,
}

/// Manually change an order's status (admin).
#[instrument(skip(state), fields(user_id = %user.id))]
async fn update_transaction(
    State(state): State<AppState>,
    user: AuthUser,
    Path(transaction_id): Path<String>,
    Json(body): Json<UpdateTransactionRequest>,
) -> Result<impl IntoResponse> {
    user.require_admin()?;

    let id = OrderId::new(transaction_id);
    state
        .orders()
        .update_status(
            &id,
            StatusUpdate {
                status: body.status,
                shipping_status: body.shipping_status,
            },
        )
        .await?;

    Ok(ApiResponse::success("Transaction updated", ()))
}

/// Cancel request body.
#[derive(Debug, Deserialize)]
struct CancelTransactionRequest {
    transaction_id: String,
}

/// Cancel a pending order on the gateway and locally.
///
/// Customers can cancel their own orders; admins can cancel any.
#[instrument(skip(state), fields(user_id = %user.id))]
async fn cancel_transaction(
    State(state): State<AppState>,
    user: AuthUser,
    Json(body): Json<CancelTransactionRequest>,
) -> Result<impl IntoResponse> {
    let scope = if user.is_admin() { None } else { Some(user.id) };
    let id = OrderId::new(body.transaction_id);
    state.orders().cancel(&id, scope).await?;

    Ok(ApiResponse::success("Transaction canceled", ()))
}

/// Receive a payment status notification from the gateway.
///
/// Always answers 200: the gateway retries non-200 responses, and a
/// malformed or unverifiable payload will not get better on retry. The
/// body is taken as raw bytes and parsed here, so invalid JSON and a
/// missing `content-type` header cannot produce an extractor rejection.
#[instrument(skip_all)]
async fn payment_notification(
    State(state): State<AppState>,
    body: Bytes,
) -> impl IntoResponse {
    match serde_json::from_slice::<PaymentNotification>(&body) {
        Ok(notification) => {
            if let Err(e) = state.orders().apply_notification(&notification).await {
                tracing::warn!(
                    order_id = %notification.order_id,
                    error = %e,
                    "Payment notification rejected"
                );
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "Malformed payment notification payload");
        }
    }

    ApiResponse::success("OK", ())
}

/// Permanently delete an order (admin).
#[instrument(skip(state), fields(user_id = %user.id))]
async fn delete_transaction(
    State(state): State<AppState>,
    user: AuthUser,
    Path(transaction_id): Path<String>,
) -> Result<impl IntoResponse> {
    user.require_admin()?;

    state
        .orders()
        .delete(&OrderId::new(transaction_id))
        .await?;

    Ok(ApiResponse::success("Transaction deleted", ()))
}
