use axum::http::HeaderValue;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub mod customers;
pub mod driver;
pub mod health;
pub mod logistic;
pub mod seller;
pub mod users;

pub fn create_router(state: AppState) -> Router<()> {
    let cors = if let Some(origins) = state.config.cors_allowed_origin.as_ref() {
        let headers: Vec<HeaderValue> = origins
            .split(',')
            .filter_map(|value| {
                let trimmed = value.trim();
                (!trimmed.is_empty()).then(|| {
                    trimmed
                        .parse::<HeaderValue>()
                        .expect("invalid CORS allowed origin")
                })
            })
            .collect();

        CorsLayer::new()
            .allow_origin(AllowOrigin::list(headers))
            .allow_methods(tower_http::cors::AllowMethods::mirror_request())
            .allow_headers(tower_http::cors::AllowHeaders::mirror_request())
            .allow_credentials(true)
    } else {
        CorsLayer::new()
            .allow_origin(AllowOrigin::mirror_request())
            .allow_methods(tower_http::cors::AllowMethods::mirror_request())
            .allow_headers(tower_http::cors::AllowHeaders::mirror_request())
            .allow_credentials(true)
    };

    let users_routes = Router::new()
        .route("/signup", post(users::signup))
        .route("/signup/address", post(users::create_address))
        .route("/login", post(users::login))
        .route("/me", get(users::me));

    let customers_routes = Router::new()
        .route("/product_list", get(customers::product_list))
        .route("/buy", post(customers::buy))
        .route("/purchased_products", get(customers::purchased_products))
        .route("/bought_list", post(customers::bought_list))
        .route("/delivery_status", get(customers::delivery_status));

    let seller_routes = Router::new()
        .route("/products", post(seller::create_product))
        .route("/orders", get(seller::list_orders))
        .route("/select_logistic", post(seller::select_logistic))
        .route("/get_delivery_status", post(seller::get_delivery_status));

    let logistic_routes = Router::new()
        .route("/deliveries", get(logistic::list_deliveries))
        .route("/by_city", get(logistic::drivers_by_city))
        .route("/assign_driver", post(logistic::assign_driver));

    let driver_routes = Router::new()
        .route("/deliveries", get(driver::list_deliveries))
        .route("/mark_delivered", post(driver::mark_delivered));

    Router::new()
        .nest("/users", users_routes)
        .nest("/customers", customers_routes)
        .nest("/seller", seller_routes)
        .nest("/logistic", logistic_routes)
        .nest("/driver", driver_routes)
        .route("/health", get(health::health_check))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
