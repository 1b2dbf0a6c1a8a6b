use std::fmt;
use std::str::FromStr;

/// Postgres type a whitelisted column binds as. Query-string filter values
/// arrive as text and are parsed to this kind before binding, so a bad value
/// is a client error instead of a database error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Int,
    Float,
    Text,
    Bool,
    Timestamp,
}

/// A column exposed to query-string filtering, sorting and field selection.
#[derive(Debug, Clone, Copy)]
pub struct Column {
    pub name: &'static str,
    pub kind: ColumnKind,
}

const fn col(name: &'static str, kind: ColumnKind) -> Column {
    Column { name, kind }
}

const TOUR_COLUMNS: &[Column] = &[
    col("id", ColumnKind::Int),
    col("name", ColumnKind::Text),
    col("duration", ColumnKind::Int),
    col("max_group_size", ColumnKind::Int),
    col("difficulty", ColumnKind::Text),
    col("rating", ColumnKind::Float),
    col("ratings_quantity", ColumnKind::Int),
    col("price", ColumnKind::Float),
];

const USER_COLUMNS: &[Column] = &[
    col("id", ColumnKind::Int),
    col("name", ColumnKind::Text),
    col("email", ColumnKind::Text),
    col("role", ColumnKind::Text),
];

const REVIEW_COLUMNS: &[Column] = &[
    col("id", ColumnKind::Int),
    col("rating", ColumnKind::Int),
    col("created_at", ColumnKind::Timestamp),
    col("tour_id", ColumnKind::Int),
    col("user_id", ColumnKind::Int),
];

/// The closed set of tables the query builder and CRUD layer operate on.
/// SQL identifiers only ever come from this enum, never from request input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Tours,
    Reviews,
    Users,
}

impl Table {
    pub fn name(&self) -> &'static str {
        match self {
            Table::Tours => "tours",
            Table::Reviews => "reviews",
            Table::Users => "users",
        }
    }

    /// Singular form used for response data keys and not-found messages.
    pub fn singular(&self) -> &'static str {
        match self {
            Table::Tours => "tour",
            Table::Reviews => "review",
            Table::Users => "user",
        }
    }

    pub fn columns(&self) -> &'static [Column] {
        match self {
            Table::Tours => TOUR_COLUMNS,
            Table::Reviews => REVIEW_COLUMNS,
            Table::Users => USER_COLUMNS,
        }
    }

    pub fn column(&self, name: &str) -> Option<&'static Column> {
        self.columns().iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Table {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tours" => Ok(Table::Tours),
            "reviews" => Ok(Table::Reviews),
            "users" => Ok(Table::Users),
            other => Err(format!("unknown table: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tour_whitelist_matches_filterable_columns() {
        let names: Vec<&str> = Table::Tours.columns().iter().map(|c| c.name).collect();
        assert_eq!(
            names,
            vec![
                "id",
                "name",
                "duration",
                "max_group_size",
                "difficulty",
                "rating",
                "ratings_quantity",
                "price"
            ]
        );
    }

    #[test]
    fn review_whitelist_includes_foreign_keys() {
        assert!(Table::Reviews.has_column("tour_id"));
        assert!(Table::Reviews.has_column("user_id"));
        assert!(!Table::Reviews.has_column("review"));
    }

    #[test]
    fn user_whitelist_excludes_password() {
        assert!(!Table::Users.has_column("password"));
        assert!(!Table::Users.has_column("password_reset_token"));
        assert!(Table::Users.has_column("email"));
    }

    #[test]
    fn column_lookup_carries_kind() {
        let price = Table::Tours.column("price").unwrap();
        assert_eq!(price.kind, ColumnKind::Float);
        let created = Table::Reviews.column("created_at").unwrap();
        assert_eq!(created.kind, ColumnKind::Timestamp);
    }

    #[test]
    fn from_str_round_trips() {
        for table in [Table::Tours, Table::Reviews, Table::Users] {
            assert_eq!(table.name().parse::<Table>().unwrap(), table);
        }
        assert!("bookings".parse::<Table>().is_err());
    }
}
