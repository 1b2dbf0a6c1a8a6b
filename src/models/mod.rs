//! Request/response types for the API resources.
//!
//! Each resource gets a model file with its row type (where handlers read
//! typed data back out of Postgres) and the request payloads accepted over
//! the wire. Payloads double as column sources for the generic CRUD layer
//! via [`crate::crud::ColumnValues`], so the set of writable columns is
//! fixed at compile time.

pub mod review;
pub mod tour;
pub mod user;

pub use review::{CreateReviewRequest, UpdateReviewRequest};
pub use tour::{CreateTourRequest, Difficulty, Location, UpdateTourRequest};
pub use user::{
    scrub_secrets, AdminUpdateUserRequest, ForgotPasswordRequest, LoginRequest, ResetPasswordRequest,
    Role, SignupRequest, UpdateMeRequest, UpdatePasswordRequest, User,
};
