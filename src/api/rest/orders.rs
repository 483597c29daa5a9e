use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::engine::ledger;
use crate::error::AppError;
use crate::models::order::{Order, OrderDraft, OrderStatus, TransitionRequest};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/orders", post(create_order).get(list_orders))
        .route("/orders/:id", get(get_order))
        .route("/orders/:id/events", post(apply_event))
        .route("/orders/:id/pix", get(get_pix_payload))
}

#[derive(Deserialize)]
pub struct ListOrdersQuery {
    pub status: Option<OrderStatus>,
}

#[derive(Serialize)]
pub struct PixPayloadResponse {
    pub order_id: Uuid,
    pub payload: String,
}

async fn create_order(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<OrderDraft>,
) -> Result<Json<Order>, AppError> {
    let order = ledger::create_order(&state, payload, Utc::now())?;
    Ok(Json(order))
}

async fn list_orders(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListOrdersQuery>,
) -> Json<Vec<Order>> {
    let mut orders: Vec<Order> = state
        .orders
        .iter()
        .filter(|entry| query.status.is_none_or(|status| entry.status == status))
        .map(|entry| entry.value().clone())
        .collect();
    orders.sort_by(|a, b| a.created_at.cmp(&b.created_at));

    Json(orders)
}

async fn get_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    Ok(Json(ledger::get_order(&state, id)?))
}

async fn apply_event(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<TransitionRequest>,
) -> Result<Json<Order>, AppError> {
    let order = ledger::apply_transition(&state, id, payload, Utc::now())?;
    Ok(Json(order))
}

async fn get_pix_payload(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<PixPayloadResponse>, AppError> {
    let order = ledger::get_order(&state, id)?;

    if !order.pays_with_pix() {
        return Err(AppError::BadRequest(format!(
            "order {id} does not pay with pix"
        )));
    }
    if order.status == OrderStatus::Cancelled {
        return Err(AppError::BadRequest(format!("order {id} is cancelled")));
    }

    let payload = ledger::pix_payload(&state, &order)?
        .ok_or_else(|| AppError::NotFound("no pix key configured".to_string()))?;

    Ok(Json(PixPayloadResponse {
        order_id: order.id,
        payload,
    }))
}
