use axum::{extract::State, Json};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{
    auth::{password, AuthenticatedUser},
    domain::Role,
    error::{AppError, AppResult},
    models::{Address, NewAddress, NewUser, User},
    schema::{address, users},
    state::AppState,
};

#[derive(Deserialize)]
pub struct SignupRequest {
    pub name: String,
    pub phone_number: String,
    pub role: String,
    pub address_id: i32,
    pub login_id: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct SignupResponse {
    pub user_id: i32,
}

pub async fn signup(
    State(state): State<AppState>,
    Json(payload): Json<SignupRequest>,
) -> AppResult<Json<SignupResponse>> {
    let role: Role = payload
        .role
        .parse()
        .map_err(|_| AppError::invalid_state(format!("unknown role: {}", payload.role)))?;

    if payload.login_id.trim().is_empty() {
        return Err(AppError::invalid_state("login_id must not be empty"));
    }

    let mut conn = state.db()?;

    let address_exists: bool = diesel::select(diesel::dsl::exists(
        address::table.filter(address::address_id.eq(payload.address_id)),
    ))
    .get_result(&mut conn)?;
    if !address_exists {
        return Err(AppError::not_found("address not found"));
    }

    let password_hash = password::hash_password(&payload.password)?;
    let new_user = NewUser {
        name: payload.name,
        phone_number: payload.phone_number,
        role,
        address_id: Some(payload.address_id),
        login_id: payload.login_id,
        password_hash,
    };

    let user_id: i32 = match diesel::insert_into(users::table)
        .values(&new_user)
        .returning(users::user_id)
        .get_result(&mut conn)
    {
        Ok(id) => id,
        Err(diesel::result::Error::DatabaseError(
            diesel::result::DatabaseErrorKind::UniqueViolation,
            _,
        )) => {
            return Err(AppError::conflict("login_id already exists"));
        }
        Err(err) => return Err(AppError::from(err)),
    };

    Ok(Json(SignupResponse { user_id }))
}

#[derive(Deserialize)]
pub struct AddressRequest {
    pub city: String,
    pub town: String,
    pub village: String,
}

#[derive(Serialize)]
pub struct AddressResponse {
    pub address_id: i32,
}

/// Addresses are immutable and deduplicated by exact match; a duplicate
/// request is an idempotent success that returns the existing row.
pub async fn create_address(
    State(state): State<AppState>,
    Json(payload): Json<AddressRequest>,
) -> AppResult<Json<AddressResponse>> {
    let mut conn = state.db()?;

    let existing: Option<Address> = address::table
        .filter(address::city.eq(&payload.city))
        .filter(address::town.eq(&payload.town))
        .filter(address::village.eq(&payload.village))
        .first(&mut conn)
        .optional()?;

    if let Some(found) = existing {
        return Ok(Json(AddressResponse {
            address_id: found.address_id,
        }));
    }

    let inserted = diesel::insert_into(address::table)
        .values(&NewAddress {
            city: &payload.city,
            town: &payload.town,
            village: &payload.village,
        })
        .returning(address::address_id)
        .get_result(&mut conn);

    let address_id: i32 = match inserted {
        Ok(id) => id,
        // Lost the race against a concurrent identical insert; the unique
        // constraint guarantees the row is there now.
        Err(diesel::result::Error::DatabaseError(
            diesel::result::DatabaseErrorKind::UniqueViolation,
            _,
        )) => address::table
            .filter(address::city.eq(&payload.city))
            .filter(address::town.eq(&payload.town))
            .filter(address::village.eq(&payload.village))
            .select(address::address_id)
            .first(&mut conn)?,
        Err(err) => return Err(AppError::from(err)),
    };

    Ok(Json(AddressResponse { address_id }))
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub login_id: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: String,
    pub user_id: i32,
    pub user: String,
    pub role: Role,
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let mut conn = state.db()?;

    let user: User = users::table
        .filter(users::login_id.eq(&payload.login_id))
        .first(&mut conn)
        .optional()?
        .ok_or_else(AppError::unauthorized)?;

    let valid = password::verify_password(&payload.password, &user.password_hash)
        .map_err(|_| AppError::unauthorized())?;
    if !valid {
        return Err(AppError::unauthorized());
    }

    let access_token = state
        .jwt
        .generate_token(user.user_id, &user.name, user.role)
        .map_err(AppError::from)?;

    Ok(Json(LoginResponse {
        access_token,
        token_type: "Bearer".to_string(),
        user_id: user.user_id,
        user: user.name,
        role: user.role,
    }))
}

pub async fn me(user: AuthenticatedUser) -> Json<AuthenticatedUser> {
    Json(user)
}
