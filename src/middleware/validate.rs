use async_trait::async_trait;
use axum::extract::{FromRequest, Request};
use axum::Json;
use serde::de::DeserializeOwned;
use validator::{Validate, ValidationErrors};

use crate::error::ApiError;

/// JSON body extractor that also runs the payload's validation rules.
///
/// Both a body that fails to deserialize and one that breaks a rule come
/// back as a 400 whose message starts with `Invalid input data.`, so clients
/// see one shape for every kind of bad payload.
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(payload) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| invalid_input(&rejection.body_text()))?;

        payload.validate().map_err(|errors| validation_error(&errors))?;

        Ok(ValidatedJson(payload))
    }
}

/// Build the `Invalid input data.` 400 for a single handler-side reason.
pub fn invalid_input(reason: &str) -> ApiError {
    ApiError::bad_request(format!("Invalid input data. {}", reason))
}

fn validation_error(errors: &ValidationErrors) -> ApiError {
    let mut reasons: Vec<String> = Vec::new();
    for (field, field_errors) in errors.field_errors() {
        for error in field_errors {
            match &error.message {
                Some(message) => reasons.push(message.to_string()),
                None => reasons.push(format!("Invalid value for {}", field)),
            }
        }
    }
    // field_errors() iterates a HashMap, so pin the order down.
    reasons.sort();
    invalid_input(&reasons.join(". "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SignupRequest;
    use serde_json::json;

    #[test]
    fn rule_breaks_collect_into_one_message() {
        let payload: SignupRequest = serde_json::from_value(json!({
            "name": "",
            "email": "not-an-email",
            "password": "123",
            "passwordConfirm": "456"
        }))
        .unwrap();
        let err = validation_error(&payload.validate().unwrap_err());

        assert_eq!(err.status_code(), 400);
        let message = err.message();
        assert!(message.starts_with("Invalid input data. "));
        assert!(message.contains("Name is required"));
        assert!(message.contains("Please provide a valid email"));
        assert!(message.contains("Password must be at least 8 characters"));
        assert!(message.contains("Passwords are not the same"));
    }

    #[test]
    fn handler_side_reasons_share_the_prefix() {
        let err = invalid_input("Discount price must be lower than the price");
        assert_eq!(
            err.message(),
            "Invalid input data. Discount price must be lower than the price"
        );
    }
}
