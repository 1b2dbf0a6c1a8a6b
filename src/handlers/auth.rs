use axum::extract::State;
use axum::Extension;
use chrono::{Duration, Utc};

use crate::auth::{self, password};
use crate::config;
use crate::db::AppState;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, CurrentUser, ValidatedJson};
use crate::models::{
    ForgotPasswordRequest, LoginRequest, ResetPasswordRequest, Role, SignupRequest,
    UpdatePasswordRequest, User,
};

/// POST /api/v1/users/signup - create an account and issue a session token
pub async fn signup(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<SignupRequest>,
) -> ApiResult {
    let password_hash = password::hash_password(&payload.password)?;
    let role = payload.role.unwrap_or(Role::User);

    let user = sqlx::query_as::<_, User>(
        "INSERT INTO users (name, email, photo, role, password) \
         VALUES ($1, $2, $3, $4, $5) RETURNING *",
    )
    .bind(&payload.name)
    .bind(&payload.email)
    .bind(&payload.photo)
    .bind(role.as_str())
    .bind(&password_hash)
    .fetch_one(&state.pool)
    .await?;

    let token = auth::sign_token(user.id)?;
    Ok(ApiResponse::created().token(token).data("user", &user))
}

/// POST /api/v1/users/login - exchange credentials for a session token
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<LoginRequest>,
) -> ApiResult {
    let (email, provided) = match (payload.email, payload.password) {
        (Some(email), Some(pass)) if !email.is_empty() && !pass.is_empty() => (email, pass),
        _ => return Err(ApiError::bad_request("Please provide email and password!")),
    };

    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1 AND active = TRUE")
        .bind(&email)
        .fetch_optional(&state.pool)
        .await?;

    // One message for unknown email and wrong password alike.
    let user = match user {
        Some(user) if password::verify_password(&provided, &user.password) => user,
        _ => return Err(ApiError::unauthorized("Incorrect email or password")),
    };

    let token = auth::sign_token(user.id)?;
    Ok(ApiResponse::ok().token(token).data("user", &user))
}

/// POST /api/v1/users/forgotPassword - mint a password-reset token
///
/// There is no mailer in this deployment, so the raw token comes back in the
/// response body and the caller forwards it out of band.
pub async fn forgot_password(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<ForgotPasswordRequest>,
) -> ApiResult {
    let email = payload
        .email
        .filter(|e| !e.is_empty())
        .ok_or_else(|| ApiError::not_found("There is no user with email address."))?;

    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1 AND active = TRUE")
        .bind(&email)
        .fetch_optional(&state.pool)
        .await?
        .ok_or_else(|| ApiError::not_found("There is no user with email address."))?;

    let (reset_token, hashed) = password::generate_reset_token();
    let expires = Utc::now()
        + Duration::minutes(config::config().security.password_reset_expiry_minutes);

    sqlx::query(
        "UPDATE users SET password_reset_token = $1, password_reset_expires = $2 WHERE id = $3",
    )
    .bind(&hashed)
    .bind(expires)
    .bind(user.id)
    .execute(&state.pool)
    .await?;

    Ok(ApiResponse::ok().data("reset_token", reset_token))
}

/// POST /api/v1/users/resetPassword - set a new password with a reset token
pub async fn reset_password(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<ResetPasswordRequest>,
) -> ApiResult {
    let hashed_token = password::hash_reset_token(&payload.token);

    let user = sqlx::query_as::<_, User>(
        "SELECT * FROM users WHERE password_reset_token = $1 AND password_reset_expires > $2",
    )
    .bind(&hashed_token)
    .bind(Utc::now())
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| ApiError::bad_request("Token is invalid or has expired"))?;

    let password_hash = password::hash_password(&payload.password)?;
    // Back-dated one second so the token issued below postdates the change.
    let changed_at = Utc::now() - Duration::seconds(1);

    sqlx::query(
        "UPDATE users SET password = $1, password_changed_at = $2, \
         password_reset_token = NULL, password_reset_expires = NULL WHERE id = $3",
    )
    .bind(&password_hash)
    .bind(changed_at)
    .bind(user.id)
    .execute(&state.pool)
    .await?;

    let token = auth::sign_token(user.id)?;
    Ok(ApiResponse::ok().token(token))
}

/// PATCH /api/v1/users/updateMyPassword - change the logged-in user's password
pub async fn update_my_password(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    ValidatedJson(payload): ValidatedJson<UpdatePasswordRequest>,
) -> ApiResult {
    if !password::verify_password(&payload.password_current, &user.password) {
        return Err(ApiError::unauthorized("Your current password is wrong."));
    }

    let password_hash = password::hash_password(&payload.password)?;
    let changed_at = Utc::now() - Duration::seconds(1);

    sqlx::query("UPDATE users SET password = $1, password_changed_at = $2 WHERE id = $3")
        .bind(&password_hash)
        .bind(changed_at)
        .bind(user.id)
        .execute(&state.pool)
        .await?;

    let token = auth::sign_token(user.id)?;
    Ok(ApiResponse::ok().token(token))
}
