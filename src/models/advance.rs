use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

/// A "vale": money handed to a courier ahead of settlement.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CashAdvance {
    pub id: Uuid,
    pub driver_id: Uuid,
    pub amount: Decimal,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl CashAdvance {
    pub fn new(
        driver_id: Uuid,
        amount: Decimal,
        note: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Self, AppError> {
        if amount <= Decimal::ZERO {
            return Err(AppError::InvalidAmount(format!(
                "advance amount must be positive, got {amount}"
            )));
        }

        Ok(Self {
            id: Uuid::new_v4(),
            driver_id,
            amount,
            note,
            created_at: now,
        })
    }
}
