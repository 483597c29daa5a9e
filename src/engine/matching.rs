use uuid::Uuid;

use crate::error::AppError;
use crate::models::courier::{Courier, CourierStatus};
use crate::models::order::Order;

/// Picks the available courier carrying the fewest active deliveries.
/// Ties go to whoever has been idle longest (oldest `updated_at`), then id.
pub fn pick_courier<'a>(
    couriers: impl IntoIterator<Item = &'a Courier>,
    orders: impl IntoIterator<Item = &'a Order>,
) -> Result<Uuid, AppError> {
    let orders: Vec<&Order> = orders.into_iter().collect();

    couriers
        .into_iter()
        .filter(|courier| courier.status == CourierStatus::Available)
        .map(|courier| (active_load(courier.id, &orders), courier.updated_at, courier.id))
        .min()
        .map(|(_, _, id)| id)
        .ok_or(AppError::NoAvailableCouriers)
}

pub fn active_load(courier_id: Uuid, orders: &[&Order]) -> usize {
    orders
        .iter()
        .filter(|order| order.driver_id == Some(courier_id) && order.status.is_active_delivery())
        .count()
}
