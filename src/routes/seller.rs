use std::collections::HashMap;

use axum::{extract::State, Json};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{
    auth::AuthenticatedUser,
    domain::{DeliveryStatus, Role},
    error::{AppError, AppResult},
    models::{NewProduct, Order, Product},
    schema::{delivery_info, orders, products},
    state::AppState,
    workflows,
};

#[derive(Deserialize)]
pub struct CreateProductRequest {
    pub name: String,
    pub description: String,
    pub price: i32,
}

#[derive(Serialize)]
pub struct CreateProductResponse {
    pub product_id: i32,
}

pub async fn create_product(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<CreateProductRequest>,
) -> AppResult<Json<CreateProductResponse>> {
    user.require_role(Role::Seller)?;

    if payload.name.trim().is_empty() {
        return Err(AppError::invalid_state("product name must not be empty"));
    }
    if payload.price < 0 {
        return Err(AppError::invalid_state("price must not be negative"));
    }

    let mut conn = state.db()?;
    let product_id: i32 = diesel::insert_into(products::table)
        .values(&NewProduct {
            user_id: user.user_id,
            name: payload.name.trim().to_string(),
            description: payload.description,
            price: payload.price,
        })
        .returning(products::product_id)
        .get_result(&mut conn)?;

    Ok(Json(CreateProductResponse { product_id }))
}

#[derive(Serialize)]
pub struct SellerOrderEntry {
    pub order_id: i32,
    pub customer_id: i32,
    pub logistic_id: Option<i32>,
    pub address_id: i32,
}

#[derive(Serialize)]
pub struct SellerProductEntry {
    pub product_id: i32,
    pub name: String,
    pub description: String,
    pub price: i32,
    pub orders: Vec<SellerOrderEntry>,
}

#[derive(Serialize)]
pub struct SellerOrdersResponse {
    pub seller_id: i32,
    pub products: Vec<SellerProductEntry>,
}

/// The seller's catalog with the orders placed against each product.
pub async fn list_orders(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<SellerOrdersResponse>> {
    user.require_role(Role::Seller)?;
    let mut conn = state.db()?;

    let own_products: Vec<Product> = products::table
        .filter(products::user_id.eq(user.user_id))
        .order(products::product_id.asc())
        .load(&mut conn)?;

    if own_products.is_empty() {
        return Err(AppError::not_found("no products found for this seller"));
    }

    let product_ids: Vec<i32> = own_products.iter().map(|p| p.product_id).collect();
    let related_orders: Vec<Order> = orders::table
        .filter(orders::product_id.eq_any(&product_ids))
        .load(&mut conn)?;

    let mut orders_by_product: HashMap<i32, Vec<SellerOrderEntry>> = HashMap::new();
    for order in related_orders {
        orders_by_product
            .entry(order.product_id)
            .or_default()
            .push(SellerOrderEntry {
                order_id: order.order_id,
                customer_id: order.customer_id,
                logistic_id: order.logistic_id,
                address_id: order.address_id,
            });
    }

    let products = own_products
        .into_iter()
        .map(|product| SellerProductEntry {
            orders: orders_by_product
                .remove(&product.product_id)
                .unwrap_or_default(),
            product_id: product.product_id,
            name: product.name,
            description: product.description,
            price: product.price,
        })
        .collect();

    Ok(Json(SellerOrdersResponse {
        seller_id: user.user_id,
        products,
    }))
}

#[derive(Deserialize)]
pub struct SelectLogisticRequest {
    pub order_id: i32,
    pub logistic_id: i32,
}

#[derive(Serialize)]
pub struct SelectLogisticResponse {
    pub order_id: i32,
    pub logistic_id: i32,
    pub status: DeliveryStatus,
    pub tracking_number: i32,
}

pub async fn select_logistic(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<SelectLogisticRequest>,
) -> AppResult<Json<SelectLogisticResponse>> {
    user.require_role(Role::Seller)?;
    let mut conn = state.db()?;

    let assignment =
        workflows::delivery::assign_logistic(&mut conn, payload.order_id, payload.logistic_id)?;

    Ok(Json(SelectLogisticResponse {
        order_id: assignment.order_id,
        logistic_id: assignment.logistic_id,
        status: assignment.status,
        tracking_number: assignment.tracking_number,
    }))
}

#[derive(Deserialize)]
pub struct TrackingLookupRequest {
    pub tracking_number: i32,
}

#[derive(Serialize)]
pub struct TrackingLookupResponse {
    pub tracking_number: i32,
    pub status: DeliveryStatus,
}

/// Public status lookup. The tracking number acts as a capability token, so
/// no bearer auth is required here.
pub async fn get_delivery_status(
    State(state): State<AppState>,
    Json(payload): Json<TrackingLookupRequest>,
) -> AppResult<Json<TrackingLookupResponse>> {
    let mut conn = state.db()?;

    let status: DeliveryStatus = delivery_info::table
        .filter(delivery_info::tracking_number.eq(payload.tracking_number))
        .select(delivery_info::delivery_status)
        .first(&mut conn)
        .optional()?
        .ok_or_else(|| {
            AppError::not_found(format!(
                "no delivery found for tracking number {}",
                payload.tracking_number
            ))
        })?;

    Ok(Json(TrackingLookupResponse {
        tracking_number: payload.tracking_number,
        status,
    }))
}
