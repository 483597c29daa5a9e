//! Reads and writes against the record store.
//!
//! The pure engine modules never touch `AppState`; everything that needs a
//! consistent snapshot or an all-or-nothing write goes through here.

use chrono::{DateTime, Utc};
use dashmap::DashSet;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::engine::{lifecycle, matching, settlement};
use crate::error::AppError;
use crate::models::advance::CashAdvance;
use crate::models::courier::{Courier, CourierStatus, PaymentModel};
use crate::models::order::{
    Order, OrderDraft, OrderEvent, OrderEventKind, OrderEventMessage, OrderStatus,
    TransitionRequest,
};
use crate::models::settlement::{CycleSummary, Settlement};
use crate::pix;
use crate::state::AppState;

pub fn create_order(
    state: &AppState,
    draft: OrderDraft,
    now: DateTime<Utc>,
) -> Result<Order, AppError> {
    let order = Order::from_draft(draft, now)?;
    state.orders.insert(order.id, order.clone());
    state.metrics.orders_created_total.inc();

    info!(order_id = %order.id, value = %order.value, "order created");
    Ok(order)
}

pub fn get_order(state: &AppState, order_id: Uuid) -> Result<Order, AppError> {
    state
        .orders
        .get(&order_id)
        .map(|entry| entry.value().clone())
        .ok_or_else(|| AppError::NotFound(format!("order {order_id} not found")))
}

/// Applies one transition under the order's write guard.
pub fn apply_transition(
    state: &AppState,
    order_id: Uuid,
    request: TransitionRequest,
    now: DateTime<Utc>,
) -> Result<Order, AppError> {
    let kind = request.event;
    let result = transition(state, order_id, request, now);

    let outcome = match &result {
        Ok(_) => "applied",
        Err(err) => {
            warn!(order_id = %order_id, event = %kind, error = %err, "transition rejected");
            err.kind()
        }
    };
    state
        .metrics
        .order_transitions_total
        .with_label_values(&[kind.as_str(), outcome])
        .inc();

    result
}

fn transition(
    state: &AppState,
    order_id: Uuid,
    request: TransitionRequest,
    now: DateTime<Utc>,
) -> Result<Order, AppError> {
    let event = resolve_event(state, order_id, &request)?;

    let mut entry = state
        .orders
        .get_mut(&order_id)
        .ok_or_else(|| AppError::NotFound(format!("order {order_id} not found")))?;

    if let Some(expected) = request.expected_status {
        if entry.status != expected {
            return Err(AppError::ConcurrentModification {
                expected,
                found: entry.status,
            });
        }
    }

    let previous_status = entry.status;
    let next = lifecycle::apply(&entry, &event, now, &mut rand::thread_rng())?;
    *entry = next.clone();
    drop(entry);

    let pix_payload = if next.status != previous_status
        && matches!(next.status, OrderStatus::Preparing | OrderStatus::Delivering)
    {
        hand_off_payload(state, &next)
    } else {
        None
    };

    info!(
        order_id = %next.id,
        event = %request.event,
        from = %previous_status,
        to = %next.status,
        "order transition applied"
    );

    let _ = state.order_events_tx.send(OrderEventMessage {
        order_id: next.id,
        event: request.event,
        previous_status,
        status: next.status,
        driver_id: next.driver_id,
        pix_payload,
        occurred_at: now,
    });

    Ok(next)
}

/// Turns a request into an event, looking up whatever it references.
/// Runs before the order is locked so courier and order scans never
/// contend with the write guard.
fn resolve_event(
    state: &AppState,
    order_id: Uuid,
    request: &TransitionRequest,
) -> Result<OrderEvent, AppError> {
    let code = || {
        request
            .input_code
            .clone()
            .ok_or_else(|| AppError::BadRequest(format!("{} requires input_code", request.event)))
    };

    let event = match request.event {
        OrderEventKind::StartPreparation => OrderEvent::StartPreparation,
        OrderEventKind::MarkReady => OrderEvent::MarkReady,
        OrderEventKind::Assign => {
            let driver_id = request
                .driver_id
                .ok_or_else(|| AppError::BadRequest("assign requires driver_id".to_string()))?;
            ensure_available(state, driver_id)?;
            OrderEvent::Assign { driver_id }
        }
        OrderEventKind::AutoAssign => {
            let status = get_order(state, order_id)?.status;
            if !matches!(status, OrderStatus::Preparing | OrderStatus::Ready) {
                return Err(AppError::InvalidTransition {
                    status,
                    event: OrderEventKind::AutoAssign,
                });
            }

            let orders: Vec<Order> = state
                .orders
                .iter()
                .map(|entry| entry.value().clone())
                .collect();
            let couriers: Vec<Courier> = state
                .couriers
                .iter()
                .map(|entry| entry.value().clone())
                .collect();
            let driver_id = matching::pick_courier(&couriers, &orders)?;

            info!(order_id = %order_id, courier_id = %driver_id, "courier auto-matched");
            OrderEvent::Assign { driver_id }
        }
        OrderEventKind::ConfirmPickup => OrderEvent::ConfirmPickup { code: code()? },
        OrderEventKind::StartDelivery => OrderEvent::StartDelivery,
        OrderEventKind::ConfirmDelivery => OrderEvent::ConfirmDelivery { code: code()? },
        OrderEventKind::CompleteManually => OrderEvent::CompleteManually,
        OrderEventKind::Cancel => OrderEvent::Cancel,
    };

    Ok(event)
}

fn ensure_available(state: &AppState, courier_id: Uuid) -> Result<(), AppError> {
    let courier = state
        .couriers
        .get(&courier_id)
        .ok_or_else(|| AppError::NotFound(format!("courier {courier_id} not found")))?;

    if courier.status != CourierStatus::Available {
        return Err(AppError::BadRequest(format!(
            "courier {courier_id} is offline"
        )));
    }
    Ok(())
}

/// Charge payload for a pix order, or `None` when the order does not pay by
/// pix or no house key is configured.
pub fn pix_payload(state: &AppState, order: &Order) -> Result<Option<String>, AppError> {
    if !order.pays_with_pix() {
        return Ok(None);
    }
    let Some(key) = state.pix.key.as_deref() else {
        warn!(order_id = %order.id, "pix order but no PIX_KEY configured");
        return Ok(None);
    };

    let payload = pix::build_payload(
        key,
        &state.pix.merchant_name,
        &state.pix.merchant_city,
        order.value,
        Some(&order.pix_reference()),
    )?;
    Ok(Some(payload))
}

fn hand_off_payload(state: &AppState, order: &Order) -> Option<String> {
    match pix_payload(state, order) {
        Ok(Some(payload)) => {
            state.metrics.pix_payloads_total.inc();
            Some(payload)
        }
        Ok(None) => None,
        Err(err) => {
            error!(order_id = %order.id, error = %err, "failed to build pix payload");
            None
        }
    }
}

pub fn create_courier(
    state: &AppState,
    name: String,
    payment_model: PaymentModel,
    payment_rate: Option<Decimal>,
    now: DateTime<Utc>,
) -> Result<Courier, AppError> {
    if name.trim().is_empty() {
        return Err(AppError::BadRequest("name cannot be empty".to_string()));
    }
    if let Some(rate) = payment_rate {
        if rate < Decimal::ZERO {
            return Err(AppError::InvalidAmount(format!(
                "payment_rate must be non-negative, got {rate}"
            )));
        }
        if payment_model == PaymentModel::Percentage && rate > Decimal::ONE_HUNDRED {
            return Err(AppError::InvalidAmount(format!(
                "percentage rate must be within 0..=100, got {rate}"
            )));
        }
    }

    let courier = Courier {
        id: Uuid::new_v4(),
        name,
        status: CourierStatus::Available,
        payment_model,
        payment_rate,
        last_settlement_at: None,
        updated_at: now,
    };

    state.couriers.insert(courier.id, courier.clone());
    info!(courier_id = %courier.id, model = courier.payment_model.as_str(), "courier registered");
    Ok(courier)
}

pub fn record_advance(
    state: &AppState,
    courier_id: Uuid,
    amount: Decimal,
    note: Option<String>,
    now: DateTime<Utc>,
) -> Result<CashAdvance, AppError> {
    if !state.couriers.contains_key(&courier_id) {
        return Err(AppError::NotFound(format!("courier {courier_id} not found")));
    }

    let advance = CashAdvance::new(courier_id, amount, note, now)?;
    state.advances.insert(advance.id, advance.clone());

    info!(courier_id = %courier_id, amount = %advance.amount, "cash advance recorded");
    Ok(advance)
}

pub fn preview_cycle(
    state: &AppState,
    courier_id: Uuid,
    now: DateTime<Utc>,
) -> Result<CycleSummary, AppError> {
    let courier = get_courier(state, courier_id)?;
    let (orders, advances) = cycle_inputs(state, courier_id);
    settlement::compute_cycle(&courier, &orders, &advances, now, &state.policy)
}

/// Closes the courier's cycle at `now`: the settlement record and the
/// courier's new `last_settlement_at` land together or not at all.
pub fn close_cycle(
    state: &AppState,
    courier_id: Uuid,
    now: DateTime<Utc>,
) -> Result<Settlement, AppError> {
    let _guard = ClosingGuard::acquire(&state.closing, courier_id)?;

    let courier = get_courier(state, courier_id)?;
    let (orders, advances) = cycle_inputs(state, courier_id);
    let summary = settlement::compute_cycle(&courier, &orders, &advances, now, &state.policy)?;
    let (record, closed) = settlement::close_cycle(&courier, &summary);

    {
        let mut stored = state
            .couriers
            .get_mut(&courier_id)
            .ok_or_else(|| AppError::NotFound(format!("courier {courier_id} not found")))?;

        if stored.last_settlement_at != courier.last_settlement_at {
            return Err(AppError::SettlementInProgress(courier_id));
        }

        state.settlements.insert(record.id, record.clone());
        stored.last_settlement_at = closed.last_settlement_at;
        stored.updated_at = closed.updated_at;
    }

    state.metrics.settlements_closed_total.inc();
    state
        .metrics
        .settlement_last_payable
        .with_label_values(&[&courier_id.to_string()])
        .set(record.final_amount.to_f64().unwrap_or_default());

    info!(
        courier_id = %courier_id,
        settlement_id = %record.id,
        deliveries = record.deliveries_count,
        final_amount = %record.final_amount,
        "settlement closed"
    );

    Ok(record)
}

pub fn settlement_history(state: &AppState, courier_id: Uuid) -> Result<Vec<Settlement>, AppError> {
    get_courier(state, courier_id)?;

    let mut history: Vec<Settlement> = state
        .settlements
        .iter()
        .filter(|entry| entry.driver_id == courier_id)
        .map(|entry| entry.value().clone())
        .collect();
    history.sort_by(|a, b| b.end_at.cmp(&a.end_at));
    Ok(history)
}

pub fn get_courier(state: &AppState, courier_id: Uuid) -> Result<Courier, AppError> {
    state
        .couriers
        .get(&courier_id)
        .map(|entry| entry.value().clone())
        .ok_or_else(|| AppError::NotFound(format!("courier {courier_id} not found")))
}

fn cycle_inputs(state: &AppState, courier_id: Uuid) -> (Vec<Order>, Vec<CashAdvance>) {
    let orders = state
        .orders
        .iter()
        .filter(|entry| entry.driver_id == Some(courier_id))
        .map(|entry| entry.value().clone())
        .collect();
    let advances = state
        .advances
        .iter()
        .filter(|entry| entry.driver_id == courier_id)
        .map(|entry| entry.value().clone())
        .collect();
    (orders, advances)
}

/// Marks a courier as closing for as long as it lives.
struct ClosingGuard<'a> {
    closing: &'a DashSet<Uuid>,
    courier_id: Uuid,
}

impl<'a> ClosingGuard<'a> {
    fn acquire(closing: &'a DashSet<Uuid>, courier_id: Uuid) -> Result<Self, AppError> {
        if !closing.insert(courier_id) {
            return Err(AppError::SettlementInProgress(courier_id));
        }
        Ok(Self {
            closing,
            courier_id,
        })
    }
}

impl Drop for ClosingGuard<'_> {
    fn drop(&mut self) {
        self.closing.remove(&self.courier_id);
    }
}
