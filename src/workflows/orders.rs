use diesel::prelude::*;

use crate::domain::DeliveryStatus;
use crate::error::{AppError, AppResult};
use crate::models::{NewDeliveryInfo, NewOrder, Product, User};
use crate::schema::{delivery_info, orders, products, users};

/// Creates an order together with its delivery record. The delivery address
/// is a snapshot of the customer's address at purchase time.
pub fn place_order(conn: &mut PgConnection, customer_id: i32, product_id: i32) -> AppResult<i32> {
    conn.transaction(|conn| {
        let customer: User = users::table
            .find(customer_id)
            .first(conn)
            .optional()?
            .ok_or_else(|| AppError::not_found("customer not found"))?;

        let product: Product = products::table
            .find(product_id)
            .first(conn)
            .optional()?
            .ok_or_else(|| AppError::not_found("product not found"))?;

        let address_id = customer
            .address_id
            .ok_or_else(|| AppError::invalid_state("customer has no address on file"))?;

        let order_id: i32 = diesel::insert_into(orders::table)
            .values(&NewOrder {
                customer_id: customer.user_id,
                logistic_id: None,
                product_id: product.product_id,
                address_id,
            })
            .returning(orders::order_id)
            .get_result(conn)?;

        diesel::insert_into(delivery_info::table)
            .values(&NewDeliveryInfo {
                order_id,
                driver_id: None,
                logistic_id: None,
                tracking_number: None,
                delivery_status: DeliveryStatus::Ready,
                delivery_address: address_id,
            })
            .execute(conn)?;

        tracing::info!(order_id, customer_id, product_id, "order placed");
        Ok(order_id)
    })
}
