use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};

use crate::auth;
use crate::db::AppState;
use crate::error::ApiError;
use crate::models::User;

/// Roles allowed to manage tour content.
pub const MANAGER_ROLES: &[&str] = &["admin", "lead-guide"];

/// Roles with access to operational reports.
pub const STAFF_ROLES: &[&str] = &["admin", "lead-guide", "guide"];

pub const ADMIN_ONLY: &[&str] = &["admin"];

/// Authenticated user attached to the request by [`protect`].
#[derive(Clone, Debug)]
pub struct CurrentUser(pub User);

/// Session middleware: requires a valid Bearer token whose user still exists
/// (and is active) and has not changed their password since the token was
/// issued.
pub async fn protect(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer_token(&headers).ok_or_else(|| {
        ApiError::unauthorized("You are not logged in! Please log in to get access.")
    })?;

    let claims = auth::decode_token(&token)?;

    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1 AND active = TRUE")
        .bind(claims.id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or_else(|| {
            ApiError::unauthorized("The user belonging to this token does no longer exist.")
        })?;

    if user.changed_password_after(claims.iat) {
        return Err(ApiError::unauthorized(
            "User recently changed password! Please log in again.",
        ));
    }

    request.extensions_mut().insert(CurrentUser(user));
    Ok(next.run(request).await)
}

/// Role gate. Must be layered inside [`protect`] so the user extension is
/// present.
async fn restrict_to(
    roles: &'static [&'static str],
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user = request.extensions().get::<CurrentUser>().ok_or_else(|| {
        ApiError::unauthorized("You are not logged in! Please log in to get access.")
    })?;

    if !roles.contains(&user.0.role.as_str()) {
        return Err(ApiError::forbidden(
            "You do not have permission to perform this action",
        ));
    }

    Ok(next.run(request).await)
}

pub async fn restrict_to_managers(request: Request, next: Next) -> Result<Response, ApiError> {
    restrict_to(MANAGER_ROLES, request, next).await
}

pub async fn restrict_to_staff(request: Request, next: Next) -> Result<Response, ApiError> {
    restrict_to(STAFF_ROLES, request, next).await
}

pub async fn restrict_to_admin(request: Request, next: Next) -> Result<Response, ApiError> {
    restrict_to(ADMIN_ONLY, request, next).await
}

/// Extract the token from an `Authorization: Bearer <token>` header. Any
/// missing or malformed header reads as "no token".
fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        return None;
    }
    Some(token.to_string())
}
