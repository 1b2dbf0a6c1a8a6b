use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;
use sqlx::postgres::PgArguments;

use super::table::ColumnKind;

/// A value destined for a positional SQL parameter. Dynamic statements carry
/// these alongside the SQL text so every request-controlled value goes through
/// a bind, never string interpolation.
#[derive(Debug, Clone, PartialEq)]
pub enum BindValue {
    Int(i64),
    Float(f64),
    Text(String),
    Bool(bool),
    Timestamp(DateTime<Utc>),
    Json(Value),
    TextArray(Vec<String>),
    IntArray(Vec<i32>),
    FloatArray(Vec<f64>),
    DateArray(Vec<NaiveDate>),
}

impl BindValue {
    /// Parse a raw query-string value according to the column's declared kind.
    /// `None` means the value does not fit the column type.
    pub fn parse(kind: ColumnKind, raw: &str) -> Option<BindValue> {
        match kind {
            ColumnKind::Int => raw.parse::<i64>().ok().map(BindValue::Int),
            ColumnKind::Float => raw.parse::<f64>().ok().map(BindValue::Float),
            ColumnKind::Text => Some(BindValue::Text(raw.to_string())),
            ColumnKind::Bool => match raw {
                "true" => Some(BindValue::Bool(true)),
                "false" => Some(BindValue::Bool(false)),
                _ => None,
            },
            ColumnKind::Timestamp => {
                if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
                    return Some(BindValue::Timestamp(ts.with_timezone(&Utc)));
                }
                // Bare dates are common in query strings: treat as UTC midnight
                let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()?;
                let midnight = date.and_hms_opt(0, 0, 0)?;
                Some(BindValue::Timestamp(DateTime::from_naive_utc_and_offset(
                    midnight, Utc,
                )))
            }
        }
    }
}

/// Attach a [`BindValue`] to a query as the next positional parameter.
pub fn bind_value<'q>(
    q: sqlx::query::Query<'q, sqlx::Postgres, PgArguments>,
    v: &'q BindValue,
) -> sqlx::query::Query<'q, sqlx::Postgres, PgArguments> {
    match v {
        BindValue::Int(i) => q.bind(*i),
        BindValue::Float(f) => q.bind(*f),
        BindValue::Text(s) => q.bind(s),
        BindValue::Bool(b) => q.bind(*b),
        BindValue::Timestamp(ts) => q.bind(*ts),
        BindValue::Json(j) => q.bind(j),
        BindValue::TextArray(a) => q.bind(a),
        BindValue::IntArray(a) => q.bind(a),
        BindValue::FloatArray(a) => q.bind(a),
        BindValue::DateArray(a) => q.bind(a),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ints_and_floats() {
        assert_eq!(BindValue::parse(ColumnKind::Int, "5"), Some(BindValue::Int(5)));
        assert_eq!(
            BindValue::parse(ColumnKind::Float, "499.99"),
            Some(BindValue::Float(499.99))
        );
        assert_eq!(BindValue::parse(ColumnKind::Int, "five"), None);
        assert_eq!(BindValue::parse(ColumnKind::Float, ""), None);
    }

    #[test]
    fn text_always_parses() {
        assert_eq!(
            BindValue::parse(ColumnKind::Text, "easy"),
            Some(BindValue::Text("easy".to_string()))
        );
    }

    #[test]
    fn bools_are_strict() {
        assert_eq!(BindValue::parse(ColumnKind::Bool, "true"), Some(BindValue::Bool(true)));
        assert_eq!(BindValue::parse(ColumnKind::Bool, "1"), None);
    }

    #[test]
    fn timestamps_accept_dates_and_rfc3339() {
        let midnight = BindValue::parse(ColumnKind::Timestamp, "2024-07-01").unwrap();
        match midnight {
            BindValue::Timestamp(ts) => assert_eq!(ts.to_rfc3339(), "2024-07-01T00:00:00+00:00"),
            other => panic!("expected timestamp, got {:?}", other),
        }
        assert!(BindValue::parse(ColumnKind::Timestamp, "2024-07-01T12:30:00Z").is_some());
        assert_eq!(BindValue::parse(ColumnKind::Timestamp, "July 1st"), None);
    }
}
