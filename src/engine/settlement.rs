use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::AppError;
use crate::models::advance::CashAdvance;
use crate::models::courier::{Courier, PaymentModel};
use crate::models::order::{Order, OrderStatus};
use crate::models::settlement::{CycleSummary, Settlement};

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

#[derive(Debug, Clone, Copy)]
pub struct SettlementPolicy {
    /// Per-delivery rate for fixed-model couriers that have none configured.
    pub default_delivery_fee: Decimal,
}

/// Sums what `courier` earned and drew since the last close, up to `now`.
///
/// Orders and advances stamped after `now` belong to the next cycle, so a
/// close at `now` can never swallow them.
pub fn compute_cycle<'a>(
    courier: &Courier,
    orders: impl IntoIterator<Item = &'a Order>,
    advances: impl IntoIterator<Item = &'a CashAdvance>,
    now: DateTime<Utc>,
    policy: &SettlementPolicy,
) -> Result<CycleSummary, AppError> {
    let cycle_start = courier.last_settlement_at.unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
    let in_cycle = |at: DateTime<Utc>| at > cycle_start && at <= now;

    let mut cycle_orders: Vec<&Order> = orders
        .into_iter()
        .filter(|order| {
            order.driver_id == Some(courier.id)
                && order.status == OrderStatus::Completed
                && order.completed_at.is_some_and(in_cycle)
        })
        .collect();
    cycle_orders.sort_by_key(|order| (order.completed_at, order.id));

    let mut cycle_advances: Vec<&CashAdvance> = advances
        .into_iter()
        .filter(|advance| advance.driver_id == courier.id && in_cycle(advance.created_at))
        .collect();
    cycle_advances.sort_by_key(|advance| (advance.created_at, advance.id));

    let earnings = earnings(courier, &cycle_orders, policy)?;

    let mut advances_total = Decimal::ZERO;
    for advance in &cycle_advances {
        if advance.amount <= Decimal::ZERO {
            return Err(AppError::InvalidAmount(format!(
                "advance {} has non-positive amount {}",
                advance.id, advance.amount
            )));
        }
        advances_total = advances_total
            .checked_add(advance.amount)
            .ok_or_else(|| overflow("advances total"))?;
    }
    let payable = earnings
        .checked_sub(advances_total)
        .ok_or_else(|| overflow("payable"))?;

    Ok(CycleSummary {
        driver_id: courier.id,
        payment_model: courier.payment_model,
        cycle_start,
        cycle_end: now,
        order_ids: cycle_orders.iter().map(|order| order.id).collect(),
        advance_ids: cycle_advances.iter().map(|advance| advance.id).collect(),
        deliveries_count: cycle_orders.len(),
        earnings: to_cents(earnings),
        advances_total: to_cents(advances_total),
        payable: to_cents(payable),
    })
}

/// Builds the immutable settlement record and the courier as it must look
/// once the close is committed. Both have to be persisted together.
pub fn close_cycle(courier: &Courier, summary: &CycleSummary) -> (Settlement, Courier) {
    let settlement = Settlement::from_summary(summary);

    let mut closed = courier.clone();
    closed.last_settlement_at = Some(summary.cycle_end);
    closed.updated_at = summary.cycle_end;

    (settlement, closed)
}

fn overflow(what: &str) -> AppError {
    AppError::InvalidAmount(format!("{what} is out of range"))
}

fn to_cents(amount: Decimal) -> Decimal {
    let mut cents = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    cents.rescale(2);
    cents
}

fn earnings(
    courier: &Courier,
    orders: &[&Order],
    policy: &SettlementPolicy,
) -> Result<Decimal, AppError> {
    match courier.payment_model {
        PaymentModel::FixedPerDelivery => {
            let rate = courier.payment_rate.unwrap_or(policy.default_delivery_fee);
            if rate.is_sign_negative() && !rate.is_zero() {
                return Err(AppError::InvalidAmount(format!(
                    "delivery rate must be non-negative, got {rate}"
                )));
            }
            rate
                .checked_mul(Decimal::from(orders.len()))
                .ok_or_else(|| overflow("delivery earnings"))
        }
        PaymentModel::Percentage => {
            let rate = courier.payment_rate.unwrap_or(Decimal::ZERO);
            if rate < Decimal::ZERO || rate > HUNDRED {
                return Err(AppError::InvalidAmount(format!(
                    "percentage rate must be within 0..=100, got {rate}"
                )));
            }

            let mut total = Decimal::ZERO;
            for order in orders {
                if order.value.is_sign_negative() && !order.value.is_zero() {
                    return Err(AppError::InvalidAmount(format!(
                        "order {} has negative value {}",
                        order.id, order.value
                    )));
                }
                let share = order
                    .value
                    .checked_mul(rate)
                    .and_then(|scaled| scaled.checked_div(HUNDRED))
                    .ok_or_else(|| overflow("delivery earnings"))?
                    .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
                total = total
                    .checked_add(share)
                    .ok_or_else(|| overflow("delivery earnings"))?;
            }
            Ok(total)
        }
        PaymentModel::Salary => Ok(Decimal::ZERO),
    }
}
