use axum::extract::{Path, State};
use axum::Extension;
use serde_json::Value;
use sqlx::{PgPool, Row};

use crate::crud::{self, ColumnValues};
use crate::db::AppState;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, CurrentUser, ValidatedJson};
use crate::models::{scrub_secrets, AdminUpdateUserRequest, UpdateMeRequest};
use crate::query::Table;

/// GET /api/v1/users - active accounts only
pub async fn get_all_users(State(state): State<AppState>) -> ApiResult {
    let sql = "SELECT row_to_json(t) AS row FROM ( \
               SELECT id, name, email, photo, role, active FROM users \
               WHERE active = TRUE) t";

    let rows = sqlx::query(sql).fetch_all(&state.pool).await?;
    if rows.is_empty() {
        return Err(ApiError::not_found("No active users"));
    }
    let users = rows
        .iter()
        .map(|row| row.try_get("row"))
        .collect::<Result<Vec<Value>, _>>()?;

    Ok(ApiResponse::ok().results(users.len()).data("users", users))
}

/// GET /api/v1/users/:id
pub async fn get_user(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult {
    let id = crud::parse_id(Table::Users, &id)?;
    let user = fetch_user_projection(&state.pool, id).await?;
    Ok(ApiResponse::ok().data("user", user))
}

/// GET /api/v1/users/me - the logged-in user's own profile
pub async fn get_me(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> ApiResult {
    let user = fetch_user_projection(&state.pool, user.id.into()).await?;
    Ok(ApiResponse::ok().data("user", user))
}

async fn fetch_user_projection(pool: &PgPool, id: i64) -> Result<Value, ApiError> {
    let sql = "SELECT row_to_json(t) AS row FROM ( \
               SELECT id, name, email, photo, role, active FROM users WHERE id = $1) t";
    let row = sqlx::query(sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    Ok(row.try_get("row")?)
}

/// PATCH /api/v1/users/me - profile fields only, never passwords
pub async fn update_me(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    ValidatedJson(payload): ValidatedJson<UpdateMeRequest>,
) -> ApiResult {
    if payload.attempts_password_change() {
        return Err(ApiError::bad_request(
            "This route is not for password updates. Please use /updateMyPassword",
        ));
    }

    let columns = payload.column_values();
    if columns.is_empty() {
        return Err(ApiError::bad_request("No valid fields provided to update."));
    }

    let updated = crud::update_one(&state.pool, Table::Users, user.id.into(), columns).await?;
    Ok(ApiResponse::ok().data("user", scrub_secrets(updated)))
}

/// DELETE /api/v1/users/me - soft delete; the account goes inactive
pub async fn delete_me(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> ApiResult {
    sqlx::query("UPDATE users SET active = FALSE WHERE id = $1")
        .bind(user.id)
        .execute(&state.pool)
        .await?;
    Ok(ApiResponse::no_content())
}

/// POST /api/v1/users - accounts are created through signup only
pub async fn create_user() -> ApiResult {
    Err(ApiError::internal(
        "This route is not defined! Please use /signup instead",
    ))
}

/// PATCH /api/v1/users/:id - admin update of profile fields and role
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidatedJson(payload): ValidatedJson<AdminUpdateUserRequest>,
) -> ApiResult {
    let id = crud::parse_id(Table::Users, &id)?;
    let user = crud::update_one(&state.pool, Table::Users, id, payload.column_values()).await?;
    Ok(ApiResponse::ok().data("user", scrub_secrets(user)))
}

/// DELETE /api/v1/users/:id - admin hard delete
pub async fn delete_user(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult {
    let id = crud::parse_id(Table::Users, &id)?;
    crud::delete_one(&state.pool, Table::Users, id).await?;
    Ok(ApiResponse::no_content())
}
