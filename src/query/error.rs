use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    #[error("Invalid sort field: {0}")]
    InvalidSortField(String),

    #[error("Invalid filter value for {field}: {value}")]
    InvalidFilterValue { field: String, value: String },
}
