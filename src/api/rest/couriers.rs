use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, patch, post};
use axum::Json;
use axum::Router;
use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::engine::ledger;
use crate::error::AppError;
use crate::models::advance::CashAdvance;
use crate::models::courier::{Courier, CourierStatus, PaymentModel};
use crate::models::settlement::{CycleSummary, Settlement};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/couriers", post(create_courier).get(list_couriers))
        .route("/couriers/:id/status", patch(update_courier_status))
        .route(
            "/couriers/:id/advances",
            post(create_advance).get(list_advances),
        )
        .route(
            "/couriers/:id/settlement",
            get(preview_settlement).post(close_settlement),
        )
        .route("/couriers/:id/settlements", get(list_settlements))
}

#[derive(Deserialize)]
pub struct CreateCourierRequest {
    pub name: String,
    pub payment_model: PaymentModel,
    #[serde(default)]
    pub payment_rate: Option<Decimal>,
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: CourierStatus,
}

#[derive(Deserialize)]
pub struct CreateAdvanceRequest {
    pub amount: Decimal,
    #[serde(default)]
    pub note: Option<String>,
}

async fn create_courier(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateCourierRequest>,
) -> Result<Json<Courier>, AppError> {
    let courier = ledger::create_courier(
        &state,
        payload.name,
        payload.payment_model,
        payload.payment_rate,
        Utc::now(),
    )?;
    Ok(Json(courier))
}

async fn list_couriers(State(state): State<Arc<AppState>>) -> Json<Vec<Courier>> {
    let couriers = state
        .couriers
        .iter()
        .map(|entry| entry.value().clone())
        .collect();
    Json(couriers)
}

async fn update_courier_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<Json<Courier>, AppError> {
    let mut courier = state
        .couriers
        .get_mut(&id)
        .ok_or_else(|| AppError::NotFound(format!("courier {} not found", id)))?;

    courier.status = payload.status;
    courier.updated_at = Utc::now();

    Ok(Json(courier.clone()))
}

async fn create_advance(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CreateAdvanceRequest>,
) -> Result<Json<CashAdvance>, AppError> {
    let advance = ledger::record_advance(&state, id, payload.amount, payload.note, Utc::now())?;
    Ok(Json(advance))
}

async fn list_advances(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<CashAdvance>>, AppError> {
    ledger::get_courier(&state, id)?;

    let mut advances: Vec<CashAdvance> = state
        .advances
        .iter()
        .filter(|entry| entry.driver_id == id)
        .map(|entry| entry.value().clone())
        .collect();
    advances.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    Ok(Json(advances))
}

async fn preview_settlement(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<CycleSummary>, AppError> {
    Ok(Json(ledger::preview_cycle(&state, id, Utc::now())?))
}

async fn close_settlement(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Settlement>, AppError> {
    Ok(Json(ledger::close_cycle(&state, id, Utc::now())?))
}

async fn list_settlements(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Settlement>>, AppError> {
    Ok(Json(ledger::settlement_history(&state, id)?))
}
