pub mod error;
pub mod list;
pub mod table;
pub mod value;

pub use error::QueryError;
pub use list::{ListQuery, RawParams, SqlResult};
pub use table::Table;
pub use value::{bind_value, BindValue};
