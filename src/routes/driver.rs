use axum::{extract::State, Json};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{
    auth::AuthenticatedUser,
    domain::{DeliveryStatus, Role},
    error::{AppError, AppResult},
    models::{Address, DeliveryInfo, Product, User},
    schema::{address, delivery_info, driver_delivery_info, orders, products, users},
    state::AppState,
    workflows,
};

#[derive(Serialize)]
pub struct DriverDeliveryEntry {
    pub delivery_id: i32,
    pub order_id: i32,
    pub tracking_number: Option<i32>,
    pub delivery_status: DeliveryStatus,
    pub product_name: String,
    pub customer_name: String,
    pub customer_phone: String,
    pub detailed_address: String,
}

#[derive(Serialize)]
pub struct DriverDeliveriesResponse {
    pub driver_id: i32,
    pub deliveries: Vec<DriverDeliveryEntry>,
}

/// The driver's active work queue: only deliveries with a live
/// driver_delivery_info row appear here.
pub async fn list_deliveries(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<DriverDeliveriesResponse>> {
    user.require_role(Role::Driver)?;
    let mut conn = state.db()?;

    let rows: Vec<(DeliveryInfo, Address, Product, User)> = driver_delivery_info::table
        .inner_join(delivery_info::table)
        .inner_join(orders::table.on(orders::order_id.eq(delivery_info::order_id)))
        .inner_join(address::table.on(address::address_id.eq(delivery_info::delivery_address)))
        .inner_join(products::table.on(products::product_id.eq(orders::product_id)))
        .inner_join(users::table.on(users::user_id.eq(orders::customer_id)))
        .filter(driver_delivery_info::driver_id.eq(user.user_id))
        .select((
            delivery_info::all_columns,
            address::all_columns,
            products::all_columns,
            users::all_columns,
        ))
        .load(&mut conn)?;

    if rows.is_empty() {
        return Err(AppError::not_found("no deliveries found for this driver"));
    }

    let deliveries = rows
        .into_iter()
        .map(|(delivery, addr, product, customer)| DriverDeliveryEntry {
            delivery_id: delivery.delivery_id,
            order_id: delivery.order_id,
            tracking_number: delivery.tracking_number,
            delivery_status: delivery.delivery_status,
            product_name: product.name,
            customer_name: customer.name,
            customer_phone: customer.phone_number,
            detailed_address: format!("{}, {}, {}", addr.city, addr.town, addr.village),
        })
        .collect();

    Ok(Json(DriverDeliveriesResponse {
        driver_id: user.user_id,
        deliveries,
    }))
}

#[derive(Deserialize)]
pub struct MarkDeliveredRequest {
    pub delivery_id: i32,
}

#[derive(Serialize)]
pub struct MarkDeliveredResponse {
    pub delivery_id: i32,
    pub status: DeliveryStatus,
}

pub async fn mark_delivered(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<MarkDeliveredRequest>,
) -> AppResult<Json<MarkDeliveredResponse>> {
    user.require_role(Role::Driver)?;
    let mut conn = state.db()?;

    let status = workflows::delivery::mark_delivered(&mut conn, payload.delivery_id)?;

    Ok(Json(MarkDeliveredResponse {
        delivery_id: payload.delivery_id,
        status,
    }))
}
