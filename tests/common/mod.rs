use std::env;

use anyhow::{anyhow, ensure, Context, Result};
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::PgConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use http_body_util::BodyExt;
use once_cell::sync::Lazy;
use serde::Serialize;
use tokio::sync::Mutex;
use tower::util::ServiceExt;

use lastmile::auth::jwt::JwtService;
use lastmile::auth::password;
use lastmile::config::AppConfig;
use lastmile::db::{self, PgPool};
use lastmile::domain::Role;
use lastmile::models::{DeliveryInfo, NewProduct, NewUser, Order};
use lastmile::routes;
use lastmile::state::AppState;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

static DB_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

pub struct TestApp {
    pub state: AppState,
    router: Router,
}

impl TestApp {
    /// Returns None when TEST_DATABASE_URL is unset, so suites can skip
    /// cleanly on machines without a Postgres instance.
    pub async fn try_new() -> Result<Option<Self>> {
        let Ok(database_url) = env::var("TEST_DATABASE_URL") else {
            eprintln!("TEST_DATABASE_URL not set; skipping integration test");
            return Ok(None);
        };

        let config = AppConfig {
            database_url,
            database_max_pool_size: db::DEFAULT_MAX_POOL_SIZE,
            server_host: "127.0.0.1".to_string(),
            server_port: 0,
            jwt_secret: "test-secret".to_string(),
            jwt_issuer: "test-issuer".to_string(),
            jwt_audience: "test-audience".to_string(),
            jwt_expiry_minutes: 30,
            cors_allowed_origin: None,
        };

        let pool = db::init_pool_with_size(&config.database_url, config.database_max_pool_size)?;
        prepare_database(&pool).await?;

        let jwt = JwtService::from_config(&config)?;
        let state = AppState::new(pool, config, jwt);
        let router = routes::create_router(state.clone());

        Ok(Some(Self { state, router }))
    }

    pub async fn cleanup(&self) -> Result<()> {
        let pool = self.state.pool.clone();
        tokio::task::spawn_blocking(move || -> Result<()> {
            let mut conn = pool
                .get()
                .map_err(|err| anyhow!("failed to get cleanup connection: {err}"))?;
            truncate_all(&mut conn)?;
            Ok(())
        })
        .await
        .context("cleanup task panicked")?
    }

    pub async fn insert_address(&self, city: &str, town: &str, village: &str) -> Result<i32> {
        let city = city.to_string();
        let town = town.to_string();
        let village = village.to_string();
        self.with_conn(move |conn| {
            use lastmile::schema::address;
            let id = diesel::insert_into(address::table)
                .values((
                    address::city.eq(&city),
                    address::town.eq(&town),
                    address::village.eq(&village),
                ))
                .returning(address::address_id)
                .get_result(conn)
                .context("failed to insert address")?;
            Ok(id)
        })
        .await
    }

    pub async fn insert_user(
        &self,
        name: &str,
        role: Role,
        address_id: Option<i32>,
        login_id: &str,
        plain_password: &str,
    ) -> Result<i32> {
        let user = NewUser {
            name: name.to_string(),
            phone_number: "010-0000-0000".to_string(),
            role,
            address_id,
            login_id: login_id.to_string(),
            password_hash: password::hash_password(plain_password)?,
        };
        self.with_conn(move |conn| {
            use lastmile::schema::users;
            let id = diesel::insert_into(users::table)
                .values(&user)
                .returning(users::user_id)
                .get_result(conn)
                .context("failed to insert user")?;
            Ok(id)
        })
        .await
    }

    #[allow(dead_code)]
    pub async fn insert_product(&self, seller_id: i32, name: &str, price: i32) -> Result<i32> {
        let product = NewProduct {
            user_id: seller_id,
            name: name.to_string(),
            description: format!("{name} description"),
            price,
        };
        self.with_conn(move |conn| {
            use lastmile::schema::products;
            let id = diesel::insert_into(products::table)
                .values(&product)
                .returning(products::product_id)
                .get_result(conn)
                .context("failed to insert product")?;
            Ok(id)
        })
        .await
    }

    #[allow(dead_code)]
    pub async fn order(&self, order_id: i32) -> Result<Order> {
        self.with_conn(move |conn| {
            use lastmile::schema::orders;
            orders::table
                .find(order_id)
                .first(conn)
                .context("order not found")
        })
        .await
    }

    #[allow(dead_code)]
    pub async fn delivery_for_order(&self, order_id: i32) -> Result<DeliveryInfo> {
        self.with_conn(move |conn| {
            use lastmile::schema::delivery_info;
            delivery_info::table
                .filter(delivery_info::order_id.eq(order_id))
                .first(conn)
                .context("delivery record not found")
        })
        .await
    }

    #[allow(dead_code)]
    pub async fn delivery_count_for_order(&self, order_id: i32) -> Result<i64> {
        self.with_conn(move |conn| {
            use diesel::dsl::count_star;
            use lastmile::schema::delivery_info;
            delivery_info::table
                .filter(delivery_info::order_id.eq(order_id))
                .select(count_star())
                .first(conn)
                .context("failed to count delivery records")
        })
        .await
    }

    #[allow(dead_code)]
    pub async fn driver_links(&self, delivery_id: i32) -> Result<Vec<(i32, i32)>> {
        self.with_conn(move |conn| {
            use lastmile::schema::driver_delivery_info;
            driver_delivery_info::table
                .filter(driver_delivery_info::delivery_id.eq(delivery_id))
                .select((
                    driver_delivery_info::driver_id,
                    driver_delivery_info::delivery_id,
                ))
                .load(conn)
                .context("failed to load driver links")
        })
        .await
    }

    #[allow(dead_code)]
    pub async fn address_count(&self, city: &str, town: &str, village: &str) -> Result<i64> {
        let city = city.to_string();
        let town = town.to_string();
        let village = village.to_string();
        self.with_conn(move |conn| {
            use diesel::dsl::count_star;
            use lastmile::schema::address;
            address::table
                .filter(address::city.eq(&city))
                .filter(address::town.eq(&town))
                .filter(address::village.eq(&village))
                .select(count_star())
                .first(conn)
                .context("failed to count addresses")
        })
        .await
    }

    pub async fn login_token(&self, login_id: &str, plain_password: &str) -> Result<String> {
        #[derive(Serialize)]
        struct LoginPayload<'a> {
            login_id: &'a str,
            password: &'a str,
        }

        let response = self
            .post_json(
                "/users/login",
                &LoginPayload {
                    login_id,
                    password: plain_password,
                },
                None,
            )
            .await?;

        ensure!(
            response.status() == StatusCode::OK,
            "login failed with status {}",
            response.status()
        );

        let body = body_to_vec(response.into_body()).await?;
        #[derive(serde::Deserialize)]
        struct LoginResponse {
            access_token: String,
        }
        let parsed: LoginResponse = serde_json::from_slice(&body)?;
        Ok(parsed.access_token)
    }

    pub async fn post_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        payload: &T,
        token: Option<&str>,
    ) -> Result<hyper::Response<Body>> {
        let body = serde_json::to_vec(payload)?;
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri(path)
            .header("content-type", "application/json");
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let request = builder.body(Body::from(body))?;
        Ok(self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible response"))
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> Result<hyper::Response<Body>> {
        let mut builder = Request::builder().method(Method::GET).uri(path);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let request = builder.body(Body::empty())?;
        Ok(self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible response"))
    }

    async fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut PgConnection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.state.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool
                .get()
                .map_err(|err| anyhow!("failed to get database connection: {err}"))?;
            f(&mut conn)
        })
        .await
        .context("connection task panicked")?
    }
}

pub async fn acquire_db_lock() -> tokio::sync::MutexGuard<'static, ()> {
    DB_LOCK.lock().await
}

pub async fn body_to_vec(body: Body) -> Result<Vec<u8>> {
    let collected = body
        .collect()
        .await
        .map_err(|err| anyhow!("failed to read response body: {err}"))?;
    Ok(collected.to_bytes().to_vec())
}

pub async fn body_to_json(body: Body) -> Result<serde_json::Value> {
    let bytes = body_to_vec(body).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

async fn prepare_database(pool: &PgPool) -> Result<()> {
    let pool = pool.clone();
    tokio::task::spawn_blocking(move || -> Result<()> {
        let mut conn = pool
            .get()
            .map_err(|err| anyhow!("failed to acquire connection: {err}"))?;
        conn.run_pending_migrations(MIGRATIONS)
            .map_err(|err| anyhow!("failed to run migrations: {err}"))?;
        truncate_all(&mut conn)?;
        Ok(())
    })
    .await
    .context("migration task panicked")?
}

fn truncate_all(conn: &mut PgConnection) -> Result<()> {
    conn.batch_execute(
        "TRUNCATE TABLE driver_delivery_info, delivery_info, orders, products, users, address RESTART IDENTITY CASCADE;",
    )
    .context("failed to truncate tables")?;
    Ok(())
}
