use diesel::dsl::exists;
use diesel::prelude::*;
use rand::Rng;

use crate::domain::{DeliveryStatus, Role};
use crate::error::{AppError, AppResult};
use crate::models::{DeliveryInfo, NewDriverDeliveryInfo, User};
use crate::schema::{delivery_info, driver_delivery_info, orders, users};

pub const TRACKING_MIN: i32 = 100_000;
pub const TRACKING_MAX: i32 = 999_999;

/// Cap on rejection-sampling attempts. The 900k value space is large relative
/// to the active delivery set, so hitting this means the store is in trouble;
/// the unique constraint on `tracking_number` is the authoritative guard.
const MAX_TRACKING_ATTEMPTS: u32 = 64;

pub struct LogisticAssignment {
    pub order_id: i32,
    pub logistic_id: i32,
    pub status: DeliveryStatus,
    pub tracking_number: i32,
}

/// Seller step: routes an order to a logistic handler. Assigns a tracking
/// number on first assignment and mirrors the handler onto the order row.
pub fn assign_logistic(
    conn: &mut PgConnection,
    order_id: i32,
    logistic_id: i32,
) -> AppResult<LogisticAssignment> {
    conn.transaction(|conn| {
        let delivery: DeliveryInfo = delivery_info::table
            .filter(delivery_info::order_id.eq(order_id))
            .first(conn)
            .optional()?
            .ok_or_else(|| AppError::not_found("no delivery record for order"))?;

        let handler: User = users::table
            .find(logistic_id)
            .first(conn)
            .optional()?
            .ok_or_else(|| AppError::not_found("logistic handler not found"))?;
        if handler.role != Role::Logistic {
            return Err(AppError::invalid_state("user is not a logistic handler"));
        }

        let tracking_number = match delivery.tracking_number {
            Some(existing) => existing,
            None => sample_tracking_number(|candidate| {
                let taken: bool = diesel::select(exists(
                    delivery_info::table.filter(delivery_info::tracking_number.eq(candidate)),
                ))
                .get_result(conn)?;
                Ok(taken)
            })?,
        };

        diesel::update(delivery_info::table.find(delivery.delivery_id))
            .set((
                delivery_info::logistic_id.eq(logistic_id),
                delivery_info::delivery_status.eq(DeliveryStatus::Processing),
                delivery_info::tracking_number.eq(tracking_number),
            ))
            .execute(conn)?;

        let order_rows = diesel::update(orders::table.find(order_id))
            .set(orders::logistic_id.eq(logistic_id))
            .execute(conn)?;
        if order_rows == 0 {
            return Err(AppError::not_found("order not found"));
        }

        tracing::info!(order_id, logistic_id, tracking_number, "logistic assigned");
        Ok(LogisticAssignment {
            order_id,
            logistic_id,
            status: DeliveryStatus::Processing,
            tracking_number,
        })
    })
}

/// Logistic step: hands the delivery to a driver and opens the active
/// work-queue entry. Re-assignment overwrites the driver in place; the
/// unique key on `delivery_id` keeps at most one active row per delivery.
pub fn assign_driver(
    conn: &mut PgConnection,
    delivery_id: i32,
    driver_id: i32,
) -> AppResult<DeliveryStatus> {
    conn.transaction(|conn| {
        let delivery_exists: bool = diesel::select(exists(
            delivery_info::table.filter(delivery_info::delivery_id.eq(delivery_id)),
        ))
        .get_result(conn)?;
        if !delivery_exists {
            return Err(AppError::not_found("delivery not found"));
        }

        let driver: User = users::table
            .find(driver_id)
            .first(conn)
            .optional()?
            .ok_or_else(|| AppError::not_found("driver not found"))?;
        if driver.role != Role::Driver {
            return Err(AppError::invalid_state("user is not a driver"));
        }

        diesel::update(delivery_info::table.find(delivery_id))
            .set((
                delivery_info::driver_id.eq(driver_id),
                delivery_info::delivery_status.eq(DeliveryStatus::Shipped),
            ))
            .execute(conn)?;

        diesel::insert_into(driver_delivery_info::table)
            .values(&NewDriverDeliveryInfo {
                driver_id,
                delivery_id,
            })
            .on_conflict(driver_delivery_info::delivery_id)
            .do_update()
            .set((
                driver_delivery_info::driver_id.eq(driver_id),
                driver_delivery_info::assigned_at.eq(diesel::dsl::now),
            ))
            .execute(conn)?;

        tracing::info!(delivery_id, driver_id, "driver assigned");
        Ok(DeliveryStatus::Shipped)
    })
}

/// Driver step: terminal transition. Deleting the work-queue entry is
/// idempotent; a second call succeeds and changes nothing.
pub fn mark_delivered(conn: &mut PgConnection, delivery_id: i32) -> AppResult<DeliveryStatus> {
    conn.transaction(|conn| {
        let updated = diesel::update(delivery_info::table.find(delivery_id))
            .set(delivery_info::delivery_status.eq(DeliveryStatus::Delivered))
            .execute(conn)?;
        if updated == 0 {
            return Err(AppError::not_found("delivery not found"));
        }

        diesel::delete(
            driver_delivery_info::table.filter(driver_delivery_info::delivery_id.eq(delivery_id)),
        )
        .execute(conn)?;

        tracing::info!(delivery_id, "delivery completed");
        Ok(DeliveryStatus::Delivered)
    })
}

/// Rejection sampling over the 6-digit space: draw, re-check against the
/// store inside the active transaction, retry on collision up to the cap.
fn sample_tracking_number<F>(mut is_taken: F) -> AppResult<i32>
where
    F: FnMut(i32) -> AppResult<bool>,
{
    let mut rng = rand::thread_rng();
    for _ in 0..MAX_TRACKING_ATTEMPTS {
        let candidate = rng.gen_range(TRACKING_MIN..=TRACKING_MAX);
        if !is_taken(candidate)? {
            return Ok(candidate);
        }
    }
    Err(AppError::internal(
        "could not find an unused tracking number",
    ))
}

#[cfg(test)]
mod tests {
    use super::{sample_tracking_number, TRACKING_MAX, TRACKING_MIN};

    #[test]
    fn sampled_numbers_are_six_digits() {
        for _ in 0..100 {
            let n = sample_tracking_number(|_| Ok(false)).unwrap();
            assert!((TRACKING_MIN..=TRACKING_MAX).contains(&n));
        }
    }

    #[test]
    fn retries_past_collisions() {
        let mut seen = 0;
        let n = sample_tracking_number(|_| {
            seen += 1;
            Ok(seen <= 3)
        })
        .unwrap();
        assert_eq!(seen, 4);
        assert!((TRACKING_MIN..=TRACKING_MAX).contains(&n));
    }

    #[test]
    fn gives_up_after_the_attempt_cap() {
        let result = sample_tracking_number(|_| Ok(true));
        assert!(result.is_err());
    }
}
