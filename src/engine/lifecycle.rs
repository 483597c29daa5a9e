//! Order lifecycle.
//!
//! `pending -> preparing -> ready -> assigned -> accepted -> delivering -> completed`,
//! with `cancelled` and a manual `completed` reachable from every non-terminal
//! status. Transitions are pure: they take a snapshot and return the next one,
//! leaving the input untouched when they fail.

use chrono::{DateTime, Utc};
use rand::Rng;

use crate::codes::mint_if_absent;
use crate::error::AppError;
use crate::models::order::{Order, OrderEvent, OrderStatus};

pub fn apply<R: Rng + ?Sized>(
    order: &Order,
    event: &OrderEvent,
    now: DateTime<Utc>,
    rng: &mut R,
) -> Result<Order, AppError> {
    let invalid = || AppError::InvalidTransition {
        status: order.status,
        event: event.kind(),
    };

    if order.status.is_terminal() {
        return Err(invalid());
    }

    let now = now.max(latest_timestamp(order));
    let mut next = order.clone();

    match (order.status, event) {
        (OrderStatus::Pending, OrderEvent::StartPreparation) => {
            mint_codes(&mut next, rng);
            next.status = OrderStatus::Preparing;
            next.preparing_at.get_or_insert(now);
        }

        (OrderStatus::Preparing, OrderEvent::MarkReady) if order.driver_id.is_none() => {
            mint_codes(&mut next, rng);
            next.status = OrderStatus::Ready;
            next.ready_at.get_or_insert(now);
        }
        (
            OrderStatus::Preparing | OrderStatus::Assigned | OrderStatus::Accepted,
            OrderEvent::MarkReady,
        ) => {
            mint_codes(&mut next, rng);
            next.ready_at.get_or_insert(now);
        }

        (OrderStatus::Preparing | OrderStatus::Ready, OrderEvent::Assign { driver_id }) => {
            next.driver_id = Some(*driver_id);
            next.status = OrderStatus::Assigned;
            next.assigned_at.get_or_insert(now);
        }

        (OrderStatus::Assigned, OrderEvent::ConfirmPickup { code }) => {
            check_code(order.restaurant_code.as_deref(), code, "restaurant")?;
            next.status = OrderStatus::Accepted;
        }

        (OrderStatus::Accepted, OrderEvent::StartDelivery) => {
            if order.delivery_confirmation_code.is_none() {
                return Err(invalid());
            }
            next.status = OrderStatus::Delivering;
        }

        (OrderStatus::Delivering, OrderEvent::ConfirmDelivery { code }) => {
            check_code(
                order.delivery_confirmation_code.as_deref(),
                code,
                "delivery confirmation",
            )?;
            next.status = OrderStatus::Completed;
            next.completed_at = Some(now);
        }

        (_, OrderEvent::CompleteManually) => {
            next.status = OrderStatus::Completed;
            next.completed_at = Some(now);
        }

        (_, OrderEvent::Cancel) => {
            next.status = OrderStatus::Cancelled;
            next.cancelled_at = Some(now);
        }

        _ => return Err(invalid()),
    }

    Ok(next)
}

/// Mints whichever of the two codes is still missing.
pub fn mint_codes<R: Rng + ?Sized>(order: &mut Order, rng: &mut R) {
    mint_if_absent(&mut order.restaurant_code, rng);
    mint_if_absent(&mut order.delivery_confirmation_code, rng);
}

fn check_code(expected: Option<&str>, supplied: &str, slot: &'static str) -> Result<(), AppError> {
    match expected {
        Some(expected) if expected == supplied.trim() => Ok(()),
        _ => Err(AppError::CodeMismatch { slot }),
    }
}

fn latest_timestamp(order: &Order) -> DateTime<Utc> {
    [
        order.preparing_at,
        order.ready_at,
        order.assigned_at,
        order.completed_at,
        order.cancelled_at,
    ]
    .into_iter()
    .flatten()
    .fold(order.created_at, |latest, at| latest.max(at))
}
