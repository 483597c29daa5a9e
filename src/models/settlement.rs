use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::courier::PaymentModel;

/// Result of `compute_cycle`, shown to staff before a close is committed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CycleSummary {
    pub driver_id: Uuid,
    pub payment_model: PaymentModel,
    pub cycle_start: DateTime<Utc>,
    pub cycle_end: DateTime<Utc>,
    pub order_ids: Vec<Uuid>,
    pub advance_ids: Vec<Uuid>,
    pub deliveries_count: usize,
    pub earnings: Decimal,
    pub advances_total: Decimal,
    pub payable: Decimal,
}

/// Closed cycle. Written once, never updated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Settlement {
    pub id: Uuid,
    pub driver_id: Uuid,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub deliveries_count: usize,
    pub deliveries_total: Decimal,
    pub vales_total: Decimal,
    pub final_amount: Decimal,
    pub order_ids: Vec<Uuid>,
    pub advance_ids: Vec<Uuid>,
}

impl Settlement {
    pub fn from_summary(summary: &CycleSummary) -> Self {
        Self {
            id: Uuid::new_v4(),
            driver_id: summary.driver_id,
            start_at: summary.cycle_start,
            end_at: summary.cycle_end,
            deliveries_count: summary.deliveries_count,
            deliveries_total: summary.earnings,
            vales_total: summary.advances_total,
            final_amount: summary.payable,
            order_ids: summary.order_ids.clone(),
            advance_ids: summary.advance_ids.clone(),
        }
    }
}
