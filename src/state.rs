use dashmap::{DashMap, DashSet};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::config::{Config, PixSettings};
use crate::engine::settlement::SettlementPolicy;
use crate::models::advance::CashAdvance;
use crate::models::courier::Courier;
use crate::models::order::{Order, OrderEventMessage};
use crate::models::settlement::Settlement;
use crate::observability::metrics::Metrics;

/// In-memory record store. Each map entry is one document; a write guard on
/// an order serializes transitions on that order.
pub struct AppState {
    pub orders: DashMap<Uuid, Order>,
    pub couriers: DashMap<Uuid, Courier>,
    pub advances: DashMap<Uuid, CashAdvance>,
    pub settlements: DashMap<Uuid, Settlement>,
    /// Couriers with a close underway.
    pub closing: DashSet<Uuid>,
    pub order_events_tx: broadcast::Sender<OrderEventMessage>,
    pub pix: PixSettings,
    pub policy: SettlementPolicy,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(config: &Config) -> Self {
        let (order_events_tx, _unused_rx) = broadcast::channel(config.event_buffer_size);

        Self {
            orders: DashMap::new(),
            couriers: DashMap::new(),
            advances: DashMap::new(),
            settlements: DashMap::new(),
            closing: DashSet::new(),
            order_events_tx,
            pix: config.pix.clone(),
            policy: SettlementPolicy {
                default_delivery_fee: config.default_delivery_fee,
            },
            metrics: Metrics::new(),
        }
    }
}
