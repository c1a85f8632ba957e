use chrono::NaiveDateTime;
use diesel::prelude::*;

use crate::domain::{DeliveryStatus, Role};
use crate::schema::*;

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = address)]
#[diesel(primary_key(address_id))]
pub struct Address {
    pub address_id: i32,
    pub city: String,
    pub town: String,
    pub village: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = address)]
pub struct NewAddress<'a> {
    pub city: &'a str,
    pub town: &'a str,
    pub village: &'a str,
}

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = users)]
#[diesel(primary_key(user_id))]
pub struct User {
    pub user_id: i32,
    pub name: String,
    pub phone_number: String,
    pub role: Role,
    pub address_id: Option<i32>,
    pub login_id: String,
    pub password_hash: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = users)]
pub struct NewUser {
    pub name: String,
    pub phone_number: String,
    pub role: Role,
    pub address_id: Option<i32>,
    pub login_id: String,
    pub password_hash: String,
}

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = products)]
#[diesel(primary_key(product_id))]
pub struct Product {
    pub product_id: i32,
    pub user_id: i32,
    pub name: String,
    pub description: String,
    pub price: i32,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = products)]
pub struct NewProduct {
    pub user_id: i32,
    pub name: String,
    pub description: String,
    pub price: i32,
}

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = orders)]
#[diesel(primary_key(order_id))]
pub struct Order {
    pub order_id: i32,
    pub customer_id: i32,
    pub logistic_id: Option<i32>,
    pub product_id: i32,
    pub address_id: i32,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = orders)]
pub struct NewOrder {
    pub customer_id: i32,
    pub logistic_id: Option<i32>,
    pub product_id: i32,
    pub address_id: i32,
}

/// One delivery record per order, created in the same transaction as the
/// order itself. `tracking_number` stays null until a logistic handler is
/// assigned.
#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = delivery_info)]
#[diesel(primary_key(delivery_id))]
#[diesel(belongs_to(Order, foreign_key = order_id))]
pub struct DeliveryInfo {
    pub delivery_id: i32,
    pub order_id: i32,
    pub driver_id: Option<i32>,
    pub logistic_id: Option<i32>,
    pub tracking_number: Option<i32>,
    pub delivery_status: DeliveryStatus,
    pub delivery_address: i32,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = delivery_info)]
pub struct NewDeliveryInfo {
    pub order_id: i32,
    pub driver_id: Option<i32>,
    pub logistic_id: Option<i32>,
    pub tracking_number: Option<i32>,
    pub delivery_status: DeliveryStatus,
    pub delivery_address: i32,
}

/// Active-assignment link between a driver and a delivery. Exists only while
/// the delivery is shipped and not yet delivered; the unique constraint on
/// `delivery_id` keeps it to at most one row per delivery.
#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = driver_delivery_info)]
#[diesel(belongs_to(DeliveryInfo, foreign_key = delivery_id))]
pub struct DriverDeliveryInfo {
    pub id: i32,
    pub driver_id: i32,
    pub delivery_id: i32,
    pub assigned_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = driver_delivery_info)]
pub struct NewDriverDeliveryInfo {
    pub driver_id: i32,
    pub delivery_id: i32,
}
