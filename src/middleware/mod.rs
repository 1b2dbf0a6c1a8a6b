pub mod auth;
pub mod response;
pub mod validate;

pub use auth::{
    protect, restrict_to_admin, restrict_to_managers, restrict_to_staff, CurrentUser,
    ADMIN_ONLY, MANAGER_ROLES, STAFF_ROLES,
};
pub use response::{ApiResponse, ApiResult};
pub use validate::{invalid_input, ValidatedJson};
