//! Mobile-money payment endpoints: push initiation, status polling, and the
//! provider webhook.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use checkout::WebhookNotice;
use common::OrderId;
use domain::{AttemptState, Money, PaymentAttempt, PaymentMethod};
use gateway::{InitiateOutcome, PushRequest};
use serde::{Deserialize, Serialize};
use store::Store;
use uuid::Uuid;

use crate::error::ApiError;
use crate::routes::orders::AppState;

// -- Request types --

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MobilePushRequest {
    pub amount: f64,
    pub phone: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    /// The order this payment settles; drives background reconciliation.
    pub order_id: String,
}

// -- Response types --

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MobilePushResponse {
    pub configured: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MobileStatusResponse {
    pub invoice_id: String,
    pub state: String,
    pub is_paid: bool,
    pub is_failed: bool,
}

#[derive(Serialize)]
pub struct WebhookResponse {
    pub received: bool,
}

// -- Handlers --

/// POST /payments/mobile-push — initiate a payment prompt on the buyer's
/// phone and start background reconciliation for it.
#[tracing::instrument(skip(state, req))]
pub async fn push<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<MobilePushRequest>,
) -> Result<Json<MobilePushResponse>, ApiError> {
    if req.amount <= 0.0 {
        return Err(ApiError::BadRequest("Amount is required".to_string()));
    }
    if req.phone.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "Phone number is required for a mobile-money push".to_string(),
        ));
    }

    let order_id = parse_order_id(&req.order_id)?;
    let order = state
        .store
        .get_order(order_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Order {order_id} not found")))?;

    let push_request = PushRequest {
        amount: Money::from_major(req.amount),
        phone: req.phone,
        email: req.email.unwrap_or_else(|| order.guest_email.clone()),
        full_name: req
            .full_name
            .unwrap_or_else(|| order.shipping_address.full_name.clone()),
        api_ref: order_id.to_string(),
    };

    match state.gateway.initiate_push(push_request).await? {
        InitiateOutcome::NotConfigured => Ok(Json(MobilePushResponse {
            configured: false,
            message: Some(
                "Payment provider keys are missing; mobile-money payment is unavailable."
                    .to_string(),
            ),
            invoice_id: None,
            status: None,
        })),
        InitiateOutcome::Initiated(receipt) => {
            state
                .store
                .insert_attempt(PaymentAttempt::initiated(
                    receipt.invoice_id.clone(),
                    order_id,
                    PaymentMethod::MobileMoney,
                ))
                .await?;

            // Reconciliation runs off the request path; the client polls the
            // status endpoint below.
            state.reconciler.spawn(receipt.invoice_id.clone(), order_id);

            Ok(Json(MobilePushResponse {
                configured: true,
                message: None,
                invoice_id: Some(receipt.invoice_id),
                status: Some(receipt.state.to_string()),
            }))
        }
    }
}

/// GET /payments/mobile-status/:invoiceId — report a payment attempt's state.
///
/// Terminal attempts answer from the store; a live attempt also consults the
/// provider so the buyer sees settlement as soon as it happens.
#[tracing::instrument(skip(state))]
pub async fn status<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(invoice_id): Path<String>,
) -> Result<Json<MobileStatusResponse>, ApiError> {
    let attempt = state
        .store
        .get_attempt(&invoice_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Payment attempt {invoice_id} not found")))?;

    if attempt.state.is_terminal() {
        return Ok(Json(MobileStatusResponse {
            invoice_id,
            state: attempt.state.to_string(),
            is_paid: attempt.state == AttemptState::Confirmed,
            is_failed: attempt.state == AttemptState::Failed,
        }));
    }

    let snapshot = state.gateway.poll_status(&invoice_id).await?;
    Ok(Json(MobileStatusResponse {
        invoice_id,
        state: snapshot.state.to_string(),
        is_paid: snapshot.state.is_paid(),
        is_failed: snapshot.state.is_failed(),
    }))
}

/// POST /payments/webhook — provider server-to-server callback.
///
/// Anomalies (unknown order, already-paid order, non-success status) are
/// acknowledged successfully so the provider does not retry forever on
/// conditions that are not actually wrong.
#[tracing::instrument(skip(state, payload))]
pub async fn webhook<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(payload): Json<serde_json::Value>,
) -> Result<Json<WebhookResponse>, ApiError> {
    let order_id_raw = payload
        .get("orderId")
        .or_else(|| payload.get("order_id"))
        .and_then(|v| v.as_str())
        .ok_or_else(|| ApiError::BadRequest("orderId is required in webhook payload".to_string()))?;
    let order_id = parse_order_id(order_id_raw)?;

    let status = payload
        .get("status")
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string();
    let payment_id = payload
        .get("paymentId")
        .or_else(|| payload.get("payment_id"))
        .and_then(|v| v.as_str())
        .map(str::to_string);

    state
        .reconciler
        .apply_webhook(WebhookNotice {
            order_id,
            status,
            payment_id,
            raw: payload,
        })
        .await?;

    Ok(Json(WebhookResponse { received: true }))
}

fn parse_order_id(id: &str) -> Result<OrderId, ApiError> {
    let uuid = Uuid::parse_str(id)
        .map_err(|e| ApiError::BadRequest(format!("Invalid order ID format: {e}")))?;
    Ok(OrderId::from_uuid(uuid))
}
