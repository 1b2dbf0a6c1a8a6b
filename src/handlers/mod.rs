//! Route handlers, one module per resource.

pub mod auth;
pub mod reviews;
pub mod tours;
pub mod users;
