use std::collections::BTreeMap;

use super::error::QueryError;
use super::table::Table;
use super::value::BindValue;
use crate::config;

/// Flat query-string parameters. A BTreeMap keeps iteration order (and with
/// it, parameter numbering) deterministic.
pub type RawParams = BTreeMap<String, String>;

/// Keys consumed by the pipeline itself; everything else is a filter candidate.
pub const RESERVED_PARAMS: &[&str] = &["page", "sort", "limit", "fields"];

/// Generated SQL plus its positional parameters, in placeholder order.
#[derive(Debug, Clone)]
pub struct SqlResult {
    pub query: String,
    pub params: Vec<BindValue>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FilterOp {
    Eq,
    Gte,
    Gt,
    Lte,
    Lt,
}

impl FilterOp {
    fn sql(self) -> &'static str {
        match self {
            FilterOp::Eq => "=",
            FilterOp::Gte => ">=",
            FilterOp::Gt => ">",
            FilterOp::Lte => "<=",
            FilterOp::Lt => "<",
        }
    }

    fn from_key(key: &str) -> Option<FilterOp> {
        match key {
            "gte" => Some(FilterOp::Gte),
            "gt" => Some(FilterOp::Gt),
            "lte" => Some(FilterOp::Lte),
            "lt" => Some(FilterOp::Lt),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SortDir {
    Asc,
    Desc,
}

impl SortDir {
    fn sql(self) -> &'static str {
        match self {
            SortDir::Asc => "ASC",
            SortDir::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone)]
struct Condition {
    column: &'static str,
    op: FilterOp,
    value: BindValue,
}

/// A paginated list SELECT built from query-string parameters, applying the
/// filter → sort → fields → paginate pipeline over a table's column
/// whitelist. Identifiers in the output only ever come from the whitelist;
/// values only ever travel as bound parameters.
#[derive(Debug)]
pub struct ListQuery {
    table: Table,
    conditions: Vec<Condition>,
    order: Vec<(&'static str, SortDir)>,
    select: Vec<&'static str>,
    projection: Option<&'static [&'static str]>,
    page: i64,
    limit: i64,
    offset: i64,
}

impl ListQuery {
    pub fn from_params(table: Table, params: &RawParams) -> Result<Self, QueryError> {
        let mut query = Self {
            table,
            conditions: Vec::new(),
            order: Vec::new(),
            select: Vec::new(),
            projection: None,
            page: 1,
            limit: 1,
            offset: 0,
        };
        query.filter(params)?;
        query.sort(params)?;
        query.fields(params);
        query.paginate(params);
        Ok(query)
    }

    /// Fixed projection supplied by the route. Wins over any user `fields`
    /// selection, mirroring how the original only honored `fields` when the
    /// route had not set its own column list.
    pub fn with_projection(mut self, columns: &'static [&'static str]) -> Self {
        self.projection = Some(columns);
        self
    }

    /// The 1-based page that was requested (after parsing/flooring).
    pub fn page(&self) -> i64 {
        self.page
    }

    fn filter(&mut self, params: &RawParams) -> Result<(), QueryError> {
        for (key, raw) in params {
            if RESERVED_PARAMS.contains(&key.as_str()) {
                continue;
            }
            // Unsupported operators and malformed brackets are silently
            // skipped, like non-whitelisted fields.
            let (field, op) = match split_operator(key) {
                Some(parts) => parts,
                None => continue,
            };
            let column = match self.table.column(field) {
                Some(column) => column,
                None => continue,
            };
            let value = BindValue::parse(column.kind, raw).ok_or_else(|| {
                QueryError::InvalidFilterValue {
                    field: field.to_string(),
                    value: raw.clone(),
                }
            })?;
            self.conditions.push(Condition {
                column: column.name,
                op,
                value,
            });
        }
        Ok(())
    }

    fn sort(&mut self, params: &RawParams) -> Result<(), QueryError> {
        let raw = match params.get("sort") {
            Some(raw) if !raw.is_empty() => raw,
            // No user ordering: sort by id so LIMIT/OFFSET pages are stable.
            _ => {
                self.order.push(("id", SortDir::Asc));
                return Ok(());
            }
        };
        // Tokens are taken verbatim; a stray space makes the token
        // non-whitelisted and therefore an error.
        for token in raw.split(',') {
            let (dir, name) = match token.strip_prefix('-') {
                Some(rest) => (SortDir::Desc, rest),
                None => (SortDir::Asc, token),
            };
            let column = self
                .table
                .column(name)
                .ok_or_else(|| QueryError::InvalidSortField(name.to_string()))?;
            self.order.push((column.name, dir));
        }
        Ok(())
    }

    fn fields(&mut self, params: &RawParams) {
        let raw = match params.get("fields") {
            Some(raw) if !raw.is_empty() => raw,
            _ => return,
        };
        let mut selected: Vec<&'static str> = Vec::new();
        for token in raw.split(',') {
            if let Some(column) = self.table.column(token) {
                if !selected.contains(&column.name) {
                    selected.push(column.name);
                }
            }
        }
        // Nothing whitelisted survived: fall back to the full row.
        if selected.is_empty() {
            return;
        }
        if !selected.contains(&"id") {
            selected.push("id");
        }
        self.select = selected;
    }

    fn paginate(&mut self, params: &RawParams) {
        let api = &config::config().api;
        self.page = parse_positive(params.get("page"), 1);
        let mut limit = parse_positive(params.get("limit"), api.default_page_size);
        if let Some(max) = api.max_page_size {
            limit = limit.min(max);
        }
        self.limit = limit;
        self.offset = (self.page - 1) * self.limit;
    }

    fn select_clause(&self) -> String {
        let columns = match self.projection {
            Some(projection) => projection,
            None if self.select.is_empty() => return "*".to_string(),
            None => self.select.as_slice(),
        };
        columns
            .iter()
            .map(|c| format!("\"{}\"", c))
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn to_sql(&self) -> SqlResult {
        let mut params: Vec<BindValue> = Vec::with_capacity(self.conditions.len() + 2);

        let mut where_parts: Vec<String> = Vec::with_capacity(self.conditions.len());
        for cond in &self.conditions {
            params.push(cond.value.clone());
            where_parts.push(format!("\"{}\" {} ${}", cond.column, cond.op.sql(), params.len()));
        }

        let order_clause = self
            .order
            .iter()
            .map(|(name, dir)| format!("\"{}\" {}", name, dir.sql()))
            .collect::<Vec<_>>()
            .join(", ");

        params.push(BindValue::Int(self.limit));
        let limit_clause = format!("LIMIT ${}", params.len());
        params.push(BindValue::Int(self.offset));
        let offset_clause = format!("OFFSET ${}", params.len());

        let query = [
            format!("SELECT {}", self.select_clause()),
            format!("FROM \"{}\"", self.table.name()),
            if where_parts.is_empty() {
                String::new()
            } else {
                format!("WHERE {}", where_parts.join(" AND "))
            },
            if order_clause.is_empty() {
                String::new()
            } else {
                format!("ORDER BY {}", order_clause)
            },
            limit_clause,
            offset_clause,
        ]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

        SqlResult { query, params }
    }
}

fn split_operator(key: &str) -> Option<(&str, FilterOp)> {
    match key.find('[') {
        None => Some((key, FilterOp::Eq)),
        Some(open) => {
            if !key.ends_with(']') {
                return None;
            }
            let field = &key[..open];
            let op = &key[open + 1..key.len() - 1];
            FilterOp::from_key(op).map(|op| (field, op))
        }
    }
}

fn parse_positive(raw: Option<&String>, default: i64) -> i64 {
    raw.and_then(|v| v.parse::<i64>().ok())
        .filter(|v| *v != 0)
        .unwrap_or(default)
        .max(1)
}
