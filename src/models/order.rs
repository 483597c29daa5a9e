use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Preparing,
    Ready,
    Assigned,
    Accepted,
    Delivering,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 8] = [
        OrderStatus::Pending,
        OrderStatus::Preparing,
        OrderStatus::Ready,
        OrderStatus::Assigned,
        OrderStatus::Accepted,
        OrderStatus::Delivering,
        OrderStatus::Completed,
        OrderStatus::Cancelled,
    ];

    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }

    /// A courier is working the order.
    pub fn is_active_delivery(self) -> bool {
        matches!(
            self,
            OrderStatus::Assigned | OrderStatus::Accepted | OrderStatus::Delivering
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Preparing => "preparing",
            OrderStatus::Ready => "ready",
            OrderStatus::Assigned => "assigned",
            OrderStatus::Accepted => "accepted",
            OrderStatus::Delivering => "delivering",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ServiceType {
    #[default]
    Delivery,
    Pickup,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderItem {
    pub name: String,
    pub quantity: u32,
    pub unit_price: Decimal,
}

/// What order intake hands over; becomes a `pending` order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderDraft {
    pub customer_name: String,
    #[serde(default)]
    pub customer_phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub items: Vec<OrderItem>,
    #[serde(default)]
    pub value: Option<Decimal>,
    pub payment_method: String,
    #[serde(default)]
    pub service_type: ServiceType,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Order {
    pub id: Uuid,
    pub customer_name: String,
    pub customer_phone: Option<String>,
    pub address: Option<String>,
    pub items: Vec<OrderItem>,
    pub notes: Option<String>,
    pub service_type: ServiceType,
    pub status: OrderStatus,
    pub value: Decimal,
    pub payment_method: String,
    pub restaurant_code: Option<String>,
    pub delivery_confirmation_code: Option<String>,
    pub driver_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub preparing_at: Option<DateTime<Utc>>,
    pub ready_at: Option<DateTime<Utc>>,
    pub assigned_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl Order {
    pub fn from_draft(draft: OrderDraft, now: DateTime<Utc>) -> Result<Self, AppError> {
        if draft.customer_name.trim().is_empty() {
            return Err(AppError::BadRequest(
                "customer_name cannot be empty".to_string(),
            ));
        }

        for item in &draft.items {
            if item.unit_price.is_sign_negative() && !item.unit_price.is_zero() {
                return Err(AppError::InvalidAmount(format!(
                    "item {} has negative price {}",
                    item.name, item.unit_price
                )));
            }
        }

        let value = match draft.value {
            Some(value) => value,
            None => draft.items.iter().try_fold(Decimal::ZERO, |total, item| {
                item.unit_price
                    .checked_mul(Decimal::from(item.quantity))
                    .and_then(|line| total.checked_add(line))
                    .ok_or_else(|| {
                        AppError::InvalidAmount(format!(
                            "order total overflows at item {}",
                            item.name
                        ))
                    })
            })?,
        };

        if value.is_sign_negative() && !value.is_zero() {
            return Err(AppError::InvalidAmount(format!(
                "order value must be non-negative, got {value}"
            )));
        }

        Ok(Self {
            id: Uuid::new_v4(),
            customer_name: draft.customer_name,
            customer_phone: draft.customer_phone,
            address: draft.address,
            items: draft.items,
            notes: draft.notes,
            service_type: draft.service_type,
            status: OrderStatus::Pending,
            value: value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero),
            payment_method: draft.payment_method,
            restaurant_code: None,
            delivery_confirmation_code: None,
            driver_id: None,
            created_at: now,
            preparing_at: None,
            ready_at: None,
            assigned_at: None,
            completed_at: None,
            cancelled_at: None,
        })
    }

    pub fn pays_with_pix(&self) -> bool {
        self.payment_method.to_lowercase().contains("pix")
    }

    /// Transaction reference carried in the charge payload.
    pub fn pix_reference(&self) -> String {
        let simple = self.id.simple().to_string();
        format!("PED{}", simple[..8].to_uppercase())
    }
}

/// Event kinds as requested by kitchen and courier clients.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum OrderEventKind {
    StartPreparation,
    MarkReady,
    Assign,
    AutoAssign,
    ConfirmPickup,
    StartDelivery,
    ConfirmDelivery,
    CompleteManually,
    Cancel,
}

impl OrderEventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            OrderEventKind::StartPreparation => "start_preparation",
            OrderEventKind::MarkReady => "mark_ready",
            OrderEventKind::Assign => "assign",
            OrderEventKind::AutoAssign => "auto_assign",
            OrderEventKind::ConfirmPickup => "confirm_pickup",
            OrderEventKind::StartDelivery => "start_delivery",
            OrderEventKind::ConfirmDelivery => "confirm_delivery",
            OrderEventKind::CompleteManually => "complete_manually",
            OrderEventKind::Cancel => "cancel",
        }
    }
}

impl fmt::Display for OrderEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transition request as sent by kitchen and courier clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionRequest {
    pub event: OrderEventKind,
    /// Status the caller last saw; a mismatch means someone else moved the order.
    #[serde(default)]
    pub expected_status: Option<OrderStatus>,
    #[serde(default)]
    pub input_code: Option<String>,
    #[serde(default)]
    pub driver_id: Option<Uuid>,
}

impl TransitionRequest {
    pub fn new(event: OrderEventKind) -> Self {
        Self {
            event,
            expected_status: None,
            input_code: None,
            driver_id: None,
        }
    }
}

/// A resolved event, carrying whatever input its transition needs.
#[derive(Debug, Clone, PartialEq)]
pub enum OrderEvent {
    StartPreparation,
    MarkReady,
    Assign { driver_id: Uuid },
    ConfirmPickup { code: String },
    StartDelivery,
    ConfirmDelivery { code: String },
    CompleteManually,
    Cancel,
}

impl OrderEvent {
    pub fn kind(&self) -> OrderEventKind {
        match self {
            OrderEvent::StartPreparation => OrderEventKind::StartPreparation,
            OrderEvent::MarkReady => OrderEventKind::MarkReady,
            OrderEvent::Assign { .. } => OrderEventKind::Assign,
            OrderEvent::ConfirmPickup { .. } => OrderEventKind::ConfirmPickup,
            OrderEvent::StartDelivery => OrderEventKind::StartDelivery,
            OrderEvent::ConfirmDelivery { .. } => OrderEventKind::ConfirmDelivery,
            OrderEvent::CompleteManually => OrderEventKind::CompleteManually,
            OrderEvent::Cancel => OrderEventKind::Cancel,
        }
    }
}

/// Broadcast after every applied transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderEventMessage {
    pub order_id: Uuid,
    pub event: OrderEventKind,
    pub previous_status: OrderStatus,
    pub status: OrderStatus,
    pub driver_id: Option<Uuid>,
    pub pix_payload: Option<String>,
    pub occurred_at: DateTime<Utc>,
}
