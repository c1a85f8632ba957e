use axum::{extract::State, Json};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{
    auth::AuthenticatedUser,
    domain::{DeliveryStatus, Role},
    error::{AppError, AppResult},
    models::{Address, Order, Product, User},
    schema::{address, delivery_info, orders, products, users},
    state::AppState,
    workflows,
};

#[derive(Serialize)]
pub struct ProductEntry {
    pub product_id: i32,
    pub name: String,
    pub description: String,
    pub price: i32,
}

#[derive(Serialize)]
pub struct ProductListResponse {
    pub products: Vec<ProductEntry>,
}

pub async fn product_list(State(state): State<AppState>) -> AppResult<Json<ProductListResponse>> {
    let mut conn = state.db()?;

    let rows: Vec<Product> = products::table
        .order(products::product_id.asc())
        .load(&mut conn)?;

    let products = rows
        .into_iter()
        .map(|product| ProductEntry {
            product_id: product.product_id,
            name: product.name,
            description: product.description,
            price: product.price,
        })
        .collect();

    Ok(Json(ProductListResponse { products }))
}

#[derive(Deserialize)]
pub struct BuyRequest {
    pub product_id: i32,
}

#[derive(Serialize)]
pub struct BuyResponse {
    pub order_id: i32,
}

pub async fn buy(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<BuyRequest>,
) -> AppResult<Json<BuyResponse>> {
    user.require_role(Role::Customer)?;
    let mut conn = state.db()?;

    let order_id = workflows::orders::place_order(&mut conn, user.user_id, payload.product_id)?;
    Ok(Json(BuyResponse { order_id }))
}

pub async fn purchased_products(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<ProductListResponse>> {
    user.require_role(Role::Customer)?;
    let mut conn = state.db()?;

    let rows: Vec<Product> = orders::table
        .inner_join(products::table)
        .filter(orders::customer_id.eq(user.user_id))
        .select(products::all_columns)
        .load(&mut conn)?;

    let products = rows
        .into_iter()
        .map(|product| ProductEntry {
            product_id: product.product_id,
            name: product.name,
            description: product.description,
            price: product.price,
        })
        .collect();

    Ok(Json(ProductListResponse { products }))
}

#[derive(Deserialize)]
pub struct BoughtListRequest {
    pub name: String,
    pub phone_number: String,
}

#[derive(Serialize)]
pub struct BoughtOrderEntry {
    pub order_id: i32,
    pub product_name: String,
    pub product_price: i32,
    pub customer_name: String,
    pub customer_phone_number: String,
    pub city: String,
    pub town: String,
    pub village: String,
}

#[derive(Serialize)]
pub struct BoughtListResponse {
    pub orders: Vec<BoughtOrderEntry>,
}

/// Public purchase-history lookup keyed by name + phone number, kept from the
/// original contract.
pub async fn bought_list(
    State(state): State<AppState>,
    Json(payload): Json<BoughtListRequest>,
) -> AppResult<Json<BoughtListResponse>> {
    let mut conn = state.db()?;

    let customer: User = users::table
        .filter(users::name.eq(&payload.name))
        .filter(users::phone_number.eq(&payload.phone_number))
        .first(&mut conn)
        .optional()?
        .ok_or_else(|| AppError::not_found("customer not found"))?;

    let rows: Vec<(Order, Product, Address)> = orders::table
        .inner_join(products::table)
        .inner_join(address::table.on(address::address_id.eq(orders::address_id)))
        .filter(orders::customer_id.eq(customer.user_id))
        .select((
            orders::all_columns,
            products::all_columns,
            address::all_columns,
        ))
        .load(&mut conn)?;

    if rows.is_empty() {
        return Err(AppError::not_found("no orders found for this customer"));
    }

    let orders = rows
        .into_iter()
        .map(|(order, product, addr)| BoughtOrderEntry {
            order_id: order.order_id,
            product_name: product.name,
            product_price: product.price,
            customer_name: customer.name.clone(),
            customer_phone_number: customer.phone_number.clone(),
            city: addr.city,
            town: addr.town,
            village: addr.village,
        })
        .collect();

    Ok(Json(BoughtListResponse { orders }))
}

#[derive(Serialize)]
pub struct DeliveryStatusEntry {
    pub order_id: i32,
    pub delivery_status: DeliveryStatus,
}

#[derive(Serialize)]
pub struct DeliveryStatusResponse {
    pub user_id: i32,
    pub delivery_statuses: Vec<DeliveryStatusEntry>,
}

pub async fn delivery_status(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<DeliveryStatusResponse>> {
    user.require_role(Role::Customer)?;
    let mut conn = state.db()?;

    let rows: Vec<(i32, DeliveryStatus)> = delivery_info::table
        .inner_join(orders::table)
        .filter(orders::customer_id.eq(user.user_id))
        .select((delivery_info::order_id, delivery_info::delivery_status))
        .load(&mut conn)?;

    if rows.is_empty() {
        return Err(AppError::not_found("no orders found for this customer"));
    }

    let delivery_statuses = rows
        .into_iter()
        .map(|(order_id, delivery_status)| DeliveryStatusEntry {
            order_id,
            delivery_status,
        })
        .collect();

    Ok(Json(DeliveryStatusResponse {
        user_id: user.user_id,
        delivery_statuses,
    }))
}
