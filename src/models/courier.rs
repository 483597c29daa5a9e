use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CourierStatus {
    Available,
    Offline,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentModel {
    /// `payment_rate` is a currency amount per completed delivery.
    FixedPerDelivery,
    /// `payment_rate` is a percentage (0-100) of each order value.
    Percentage,
    /// Paid outside the settlement cycle; earns nothing per delivery.
    Salary,
}

impl PaymentModel {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentModel::FixedPerDelivery => "fixed_per_delivery",
            PaymentModel::Percentage => "percentage",
            PaymentModel::Salary => "salary",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Courier {
    pub id: Uuid,
    pub name: String,
    pub status: CourierStatus,
    pub payment_model: PaymentModel,
    pub payment_rate: Option<Decimal>,
    /// Start of the current earning cycle; `None` until the first close.
    pub last_settlement_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}
