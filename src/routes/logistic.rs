use std::collections::BTreeMap;

use axum::{
    extract::{Query, State},
    Json,
};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{
    auth::AuthenticatedUser,
    domain::{DeliveryStatus, Role},
    error::{AppError, AppResult},
    models::{Address, DeliveryInfo, Product, User},
    schema::{address, delivery_info, orders, products, users},
    state::AppState,
    workflows,
};

#[derive(Serialize)]
pub struct LogisticDeliveryEntry {
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
pub struct CityGroup {
    pub city: String,
    pub deliveries: Vec<LogisticDeliveryEntry>,
}

#[derive(Serialize)]
pub struct LogisticDeliveriesResponse {
    pub logistic_id: i32,
    pub grouped_deliveries: Vec<CityGroup>,
}

/// Deliveries routed through this logistic handler, grouped by destination
/// city for dispatch planning.
pub async fn list_deliveries(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<LogisticDeliveriesResponse>> {
    user.require_role(Role::Logistic)?;
    let mut conn = state.db()?;

    let rows: Vec<(DeliveryInfo, Address, Product, User)> = delivery_info::table
        .inner_join(orders::table)
        .inner_join(address::table.on(address::address_id.eq(delivery_info::delivery_address)))
        .inner_join(products::table.on(products::product_id.eq(orders::product_id)))
        .inner_join(users::table.on(users::user_id.eq(orders::customer_id)))
        .filter(delivery_info::logistic_id.eq(user.user_id))
        .select((
            delivery_info::all_columns,
            address::all_columns,
            products::all_columns,
            users::all_columns,
        ))
        .load(&mut conn)?;

    if rows.is_empty() {
        return Err(AppError::not_found(
            "no deliveries found for this logistic handler",
        ));
    }

    let mut grouped: BTreeMap<String, Vec<LogisticDeliveryEntry>> = BTreeMap::new();
    for (delivery, addr, product, customer) in rows {
        grouped
            .entry(addr.city.clone())
            .or_default()
            .push(LogisticDeliveryEntry {
                delivery_id: delivery.delivery_id,
                order_id: delivery.order_id,
                tracking_number: delivery.tracking_number,
                delivery_status: delivery.delivery_status,
                product_name: product.name,
                customer_name: customer.name,
                customer_phone: customer.phone_number,
                detailed_address: format!("{}, {}", addr.town, addr.village),
            });
    }

    let grouped_deliveries = grouped
        .into_iter()
        .map(|(city, deliveries)| CityGroup { city, deliveries })
        .collect();

    Ok(Json(LogisticDeliveriesResponse {
        logistic_id: user.user_id,
        grouped_deliveries,
    }))
}

#[derive(Deserialize)]
pub struct ByCityQuery {
    pub city: String,
}

#[derive(Serialize)]
pub struct DriverEntry {
    pub user_id: i32,
    pub name: String,
    pub phone_number: String,
    pub city: String,
}

#[derive(Serialize)]
pub struct DriversByCityResponse {
    pub city: String,
    pub drivers: Vec<DriverEntry>,
}

pub async fn drivers_by_city(
    State(state): State<AppState>,
    Query(query): Query<ByCityQuery>,
) -> AppResult<Json<DriversByCityResponse>> {
    let mut conn = state.db()?;

    let rows: Vec<User> = users::table
        .inner_join(address::table.on(address::address_id.nullable().eq(users::address_id)))
        .filter(users::role.eq(Role::Driver))
        .filter(address::city.eq(&query.city))
        .select(users::all_columns)
        .load(&mut conn)?;

    if rows.is_empty() {
        return Err(AppError::not_found(
            "no drivers found for the specified city",
        ));
    }

    let drivers = rows
        .into_iter()
        .map(|driver| DriverEntry {
            user_id: driver.user_id,
            name: driver.name,
            phone_number: driver.phone_number,
            city: query.city.clone(),
        })
        .collect();

    Ok(Json(DriversByCityResponse {
        city: query.city,
        drivers,
    }))
}

#[derive(Deserialize)]
pub struct AssignDriverRequest {
    pub delivery_id: i32,
    pub driver_id: i32,
}

#[derive(Serialize)]
pub struct AssignDriverResponse {
    pub delivery_id: i32,
    pub driver_id: i32,
    pub status: DeliveryStatus,
}

pub async fn assign_driver(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<AssignDriverRequest>,
) -> AppResult<Json<AssignDriverResponse>> {
    user.require_role(Role::Logistic)?;
    let mut conn = state.db()?;

    let status =
        workflows::delivery::assign_driver(&mut conn, payload.delivery_id, payload.driver_id)?;

    Ok(Json(AssignDriverResponse {
        delivery_id: payload.delivery_id,
        driver_id: payload.driver_id,
        status,
    }))
}
