use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use validator::Validate;

use crate::crud::ColumnValues;
use crate::query::BindValue;

/// Account roles, least to most privileged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    User,
    Guide,
    LeadGuide,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Guide => "guide",
            Role::LeadGuide => "lead-guide",
            Role::Admin => "admin",
        }
    }
}

/// Full account row. Credential columns never serialize.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub photo: Option<String>,
    pub role: String,
    #[serde(skip_serializing)]
    pub password: String,
    #[serde(skip_serializing)]
    pub password_changed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing)]
    pub password_reset_token: Option<String>,
    #[serde(skip_serializing)]
    pub password_reset_expires: Option<DateTime<Utc>>,
    pub active: bool,
}

impl User {
    /// True when the password changed strictly after the token was issued.
    pub fn changed_password_after(&self, token_issued_at: i64) -> bool {
        match self.password_changed_at {
            Some(changed_at) => changed_at.timestamp() > token_issued_at,
            None => false,
        }
    }
}

// Columns stripped from user rows that reach clients as raw JSON
// (RETURNING * paths).
const SECRET_COLUMNS: &[&str] = &[
    "password",
    "password_changed_at",
    "password_reset_token",
    "password_reset_expires",
];

pub fn scrub_secrets(mut value: Value) -> Value {
    if let Value::Object(ref mut map) = value {
        for column in SECRET_COLUMNS {
            map.remove(*column);
        }
    }
    value
}

#[derive(Debug, Deserialize, Validate)]
pub struct SignupRequest {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[validate(email(message = "Please provide a valid email"))]
    pub email: String,
    pub photo: Option<String>,
    pub role: Option<Role>,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
    #[serde(rename = "passwordConfirm")]
    #[validate(must_match(other = "password", message = "Passwords are not the same"))]
    pub password_confirm: String,
}

/// Both fields optional so a missing one produces the dedicated 400 rather
/// than a deserialization error.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ForgotPasswordRequest {
    pub email: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ResetPasswordRequest {
    pub token: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
    #[serde(rename = "passwordConfirm")]
    #[validate(must_match(other = "password", message = "Passwords are not the same"))]
    pub password_confirm: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdatePasswordRequest {
    #[serde(rename = "passwordCurrent")]
    pub password_current: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
    #[serde(rename = "passwordConfirm")]
    #[validate(must_match(other = "password", message = "Passwords are not the same"))]
    pub password_confirm: String,
}

/// Profile self-service payload: name/email only. The password fields are
/// captured untyped purely to detect a misdirected password change.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateMeRequest {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: Option<String>,
    #[validate(email(message = "Please provide a valid email"))]
    pub email: Option<String>,
    pub password: Option<Value>,
    #[serde(rename = "passwordConfirm")]
    pub password_confirm: Option<Value>,
}

impl UpdateMeRequest {
    pub fn attempts_password_change(&self) -> bool {
        self.password.is_some() || self.password_confirm.is_some()
    }
}

impl ColumnValues for UpdateMeRequest {
    fn column_values(&self) -> Vec<(&'static str, BindValue)> {
        let mut columns = Vec::new();
        if let Some(name) = &self.name {
            columns.push(("name", BindValue::Text(name.clone())));
        }
        if let Some(email) = &self.email {
            columns.push(("email", BindValue::Text(email.clone())));
        }
        columns
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct AdminUpdateUserRequest {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: Option<String>,
    #[validate(email(message = "Please provide a valid email"))]
    pub email: Option<String>,
    pub role: Option<Role>,
}

impl ColumnValues for AdminUpdateUserRequest {
    fn column_values(&self) -> Vec<(&'static str, BindValue)> {
        let mut columns = Vec::new();
        if let Some(name) = &self.name {
            columns.push(("name", BindValue::Text(name.clone())));
        }
        if let Some(email) = &self.email {
            columns.push(("email", BindValue::Text(email.clone())));
        }
        if let Some(role) = &self.role {
            columns.push(("role", BindValue::Text(role.as_str().to_string())));
        }
        columns
    }
}
