//! Order endpoints: creation, retrieval, and the paid/delivered transitions.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use common::{OrderId, ProductId};
use checkout::{OrderService, Reconciler};
use domain::{
    DraftLine, Money, Order, OrderDraft, OrderStatus, OrderTotals, PaymentMethod, ShippingAddress,
};
use gateway::PaymentGateway;
use serde::{Deserialize, Serialize};
use store::Store;
use uuid::Uuid;

use crate::auth::BuyerContext;
use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState<S: Store + Clone + 'static> {
    pub orders: OrderService<S>,
    pub reconciler: Reconciler<S>,
    pub gateway: Arc<dyn PaymentGateway>,
    pub store: S,
}

// -- Request types --

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub order_items: Vec<OrderItemRequest>,
    pub shipping_address: ShippingAddress,
    pub payment_method: String,
    pub items_price: f64,
    #[serde(default)]
    pub tax_price: f64,
    #[serde(default)]
    pub shipping_price: f64,
    #[serde(default)]
    pub discount_price: f64,
    pub total_price: f64,
    #[serde(default)]
    pub guest_email: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemRequest {
    /// Product ID. The accompanying display fields some clients send
    /// (`price`, `name`, `image`) are ignored; snapshots come from the
    /// catalog.
    pub product: String,
    pub quantity: u32,
}

#[derive(Debug, Deserialize)]
pub struct ListOrdersQuery {
    pub status: Option<String>,
}

// -- Response types --

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemResponse {
    pub product: String,
    pub name: String,
    pub image: String,
    pub price: f64,
    pub quantity: u32,
    pub gross_amount: f64,
    pub platform_commission: f64,
    pub seller_earning: f64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub id: String,
    pub user: Option<String>,
    pub is_guest: bool,
    pub guest_email: String,
    pub order_items: Vec<OrderItemResponse>,
    pub shipping_address: ShippingAddress,
    pub payment_method: String,
    pub payment_result: Option<serde_json::Value>,
    pub items_price: f64,
    pub tax_price: f64,
    pub shipping_price: f64,
    pub discount_price: f64,
    pub total_price: f64,
    pub is_paid: bool,
    pub paid_at: Option<String>,
    pub is_delivered: bool,
    pub delivered_at: Option<String>,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

impl OrderResponse {
    pub fn from_order(order: &Order) -> Self {
        let order_items = order
            .lines
            .iter()
            .map(|line| {
                let split = line.commission();
                OrderItemResponse {
                    product: line.product_id.to_string(),
                    name: line.name.clone(),
                    image: line.image.clone(),
                    price: line.unit_price.as_major(),
                    quantity: line.quantity,
                    gross_amount: line.gross_amount().as_major(),
                    platform_commission: split.platform_fee.as_major(),
                    seller_earning: split.seller_earning.as_major(),
                }
            })
            .collect();

        Self {
            id: order.id.to_string(),
            user: order.user_id.map(|id| id.to_string()),
            is_guest: order.is_guest,
            guest_email: order.guest_email.clone(),
            order_items,
            shipping_address: order.shipping_address.clone(),
            payment_method: order.payment_method.as_str().to_string(),
            payment_result: order.payment_result.clone(),
            items_price: order.totals.items_price.as_major(),
            tax_price: order.totals.tax_price.as_major(),
            shipping_price: order.totals.shipping_price.as_major(),
            discount_price: order.totals.discount_price.as_major(),
            total_price: order.totals.total_price.as_major(),
            is_paid: order.is_paid,
            paid_at: order.paid_at.map(|t| t.to_rfc3339()),
            is_delivered: order.is_delivered,
            delivered_at: order.delivered_at.map(|t| t.to_rfc3339()),
            status: order.status.to_string(),
            created_at: order.created_at.to_rfc3339(),
            updated_at: order.updated_at.to_rfc3339(),
        }
    }
}

// -- Handlers --

/// POST /orders — create an order for a guest or authenticated buyer.
#[tracing::instrument(skip(state, buyer, req))]
pub async fn create<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    buyer: BuyerContext,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(axum::http::StatusCode, Json<OrderResponse>), ApiError> {
    let payment_method = PaymentMethod::parse(&req.payment_method)
        .ok_or_else(|| ApiError::BadRequest(format!("Unknown payment method: {}", req.payment_method)))?;

    let lines = req
        .order_items
        .iter()
        .map(|item| {
            Ok(DraftLine {
                product_id: parse_product_id(&item.product)?,
                quantity: item.quantity,
            })
        })
        .collect::<Result<Vec<_>, ApiError>>()?;

    let draft = OrderDraft {
        buyer: buyer.0,
        guest_email: req.guest_email,
        lines,
        shipping_address: req.shipping_address,
        payment_method,
        declared: OrderTotals {
            items_price: Money::from_major(req.items_price),
            tax_price: Money::from_major(req.tax_price),
            shipping_price: Money::from_major(req.shipping_price),
            discount_price: Money::from_major(req.discount_price),
            total_price: Money::from_major(req.total_price),
        },
    };

    let order = state.orders.create_order(draft).await?;

    Ok((
        axum::http::StatusCode::CREATED,
        Json(OrderResponse::from_order(&order)),
    ))
}

/// GET /orders — list orders, optionally filtered by status.
#[tracing::instrument(skip(state))]
pub async fn list<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Query(query): Query<ListOrdersQuery>,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let status = query
        .status
        .as_deref()
        .map(|raw| {
            OrderStatus::parse(raw)
                .ok_or_else(|| ApiError::BadRequest(format!("Unknown status: {raw}")))
        })
        .transpose()?;

    let orders = state.store.list_orders(status).await?;
    Ok(Json(orders.iter().map(OrderResponse::from_order).collect()))
}

/// GET /orders/mine — the authenticated buyer's orders.
#[tracing::instrument(skip(state, buyer))]
pub async fn mine<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    buyer: BuyerContext,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let buyer = buyer.require()?;
    let orders = state.store.orders_for_user(buyer.id).await?;
    Ok(Json(orders.iter().map(OrderResponse::from_order).collect()))
}

/// GET /orders/:id — load one order with its lines.
#[tracing::instrument(skip(state))]
pub async fn get<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let order = state
        .store
        .get_order(order_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Order {id} not found")))?;

    Ok(Json(OrderResponse::from_order(&order)))
}

/// PUT /orders/:id/pay — client-driven mark-paid confirmation path.
///
/// Idempotent: a repeat call returns the stored order unchanged.
#[tracing::instrument(skip(state, payment_result))]
pub async fn pay<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Json(payment_result): Json<serde_json::Value>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let order = state.orders.mark_paid(order_id, payment_result).await?;
    Ok(Json(OrderResponse::from_order(&order)))
}

/// PUT /orders/:id/deliver — mark a paid order delivered.
#[tracing::instrument(skip(state))]
pub async fn deliver<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let order = state.orders.mark_delivered(order_id).await?;
    Ok(Json(OrderResponse::from_order(&order)))
}

fn parse_order_id(id: &str) -> Result<OrderId, ApiError> {
    let uuid = Uuid::parse_str(id)
        .map_err(|e| ApiError::BadRequest(format!("Invalid order ID format: {e}")))?;
    Ok(OrderId::from_uuid(uuid))
}

fn parse_product_id(id: &str) -> Result<ProductId, ApiError> {
    let uuid = Uuid::parse_str(id)
        .map_err(|e| ApiError::BadRequest(format!("Invalid product ID format: {e}")))?;
    Ok(ProductId::from_uuid(uuid))
}
