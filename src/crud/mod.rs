// Generic CRUD over whitelisted tables, shared by the tour, review and user
// routes.
use serde_json::{Map, Value};
use sqlx::{PgPool, Row};

use crate::error::ApiError;
use crate::query::{bind_value, BindValue, ListQuery, RawParams, SqlResult, Table};

/// Write payloads enumerate the columns they set; absent optional fields
/// contribute nothing. The field set of each payload type is the write
/// whitelist for its route.
pub trait ColumnValues {
    fn column_values(&self) -> Vec<(&'static str, BindValue)>;
}

/// Related rows to embed when fetching a single record.
#[derive(Debug, Clone, Copy)]
pub enum Populate {
    /// Attach the tour's reviews, each carrying its author's name and photo
    /// as `user_name`/`user_photo`.
    Reviews,
}

/// Per-route options for list queries.
#[derive(Debug, Default, Clone, Copy)]
pub struct ListOptions {
    /// Fixed projection; overrides any user `fields` selection.
    pub select: Option<&'static [&'static str]>,
    /// Computed fields appended to each returned row.
    pub virtuals: Option<fn(&mut Map<String, Value>)>,
}

pub async fn get_all(
    pool: &PgPool,
    table: Table,
    params: &RawParams,
    options: ListOptions,
) -> Result<Vec<Value>, ApiError> {
    let mut list = ListQuery::from_params(table, params)?;
    if let Some(select) = options.select {
        list = list.with_projection(select);
    }
    let page = list.page();
    let mut rows = fetch_rows(pool, &list.to_sql()).await?;

    // An empty page past the first means the client paged beyond the data.
    if rows.is_empty() && page > 1 {
        return Err(ApiError::not_found("This page does not exist"));
    }

    if let Some(virtuals) = options.virtuals {
        for row in &mut rows {
            if let Value::Object(map) = row {
                virtuals(map);
            }
        }
    }
    Ok(rows)
}

pub async fn get_one(
    pool: &PgPool,
    table: Table,
    id: i64,
    populate: Option<Populate>,
) -> Result<Value, ApiError> {
    let sql = format!(
        "SELECT row_to_json(t) AS row FROM (SELECT * FROM \"{}\" WHERE \"id\" = $1) t",
        table.name()
    );
    let row = sqlx::query(&sql).bind(id).fetch_optional(pool).await?;
    let row = row.ok_or_else(|| not_found(table))?;
    let mut value: Value = row.try_get("row")?;

    if let Some(populate) = populate {
        apply_populate(pool, id, populate, &mut value).await?;
    }
    Ok(value)
}

pub async fn create_one(
    pool: &PgPool,
    table: Table,
    columns: Vec<(&'static str, BindValue)>,
) -> Result<Value, ApiError> {
    let sql = build_insert(table, &columns)
        .ok_or_else(|| ApiError::bad_request("No valid fields provided"))?;
    let mut query = sqlx::query(&sql.query);
    for param in &sql.params {
        query = bind_value(query, param);
    }
    let row = query.fetch_one(pool).await?;
    Ok(row.try_get("row")?)
}

pub async fn update_one(
    pool: &PgPool,
    table: Table,
    id: i64,
    columns: Vec<(&'static str, BindValue)>,
) -> Result<Value, ApiError> {
    let sql = build_update(table, &columns, id)
        .ok_or_else(|| ApiError::bad_request("No valid fields provided to update"))?;
    let mut query = sqlx::query(&sql.query);
    for param in &sql.params {
        query = bind_value(query, param);
    }
    let row = query.fetch_optional(pool).await?;
    let row = row.ok_or_else(|| not_found(table))?;
    Ok(row.try_get("row")?)
}

pub async fn delete_one(pool: &PgPool, table: Table, id: i64) -> Result<(), ApiError> {
    let sql = format!("DELETE FROM \"{}\" WHERE \"id\" = $1", table.name());
    let result = sqlx::query(&sql).bind(id).execute(pool).await?;
    if result.rows_affected() == 0 {
        return Err(not_found(table));
    }
    Ok(())
}

/// Route ids arrive as text; anything that does not parse as an integer
/// cannot match a row, so it reports the same 404 as a missing row.
pub fn parse_id(table: Table, raw: &str) -> Result<i64, ApiError> {
    raw.parse::<i64>().map_err(|_| not_found(table))
}

fn not_found(table: Table) -> ApiError {
    ApiError::not_found(format!("No {} found with that ID", table.singular()))
}

/// Parameterized INSERT returning the new row as JSON. None when the payload
/// set no columns.
pub fn build_insert(table: Table, columns: &[(&'static str, BindValue)]) -> Option<SqlResult> {
    if columns.is_empty() {
        return None;
    }
    let field_list = columns
        .iter()
        .map(|(name, _)| format!("\"{}\"", name))
        .collect::<Vec<_>>()
        .join(", ");
    let placeholders = (1..=columns.len())
        .map(|i| format!("${}", i))
        .collect::<Vec<_>>()
        .join(", ");
    let query = format!(
        "INSERT INTO \"{0}\" ({1}) VALUES ({2}) RETURNING row_to_json(\"{0}\".*) AS row",
        table.name(),
        field_list,
        placeholders
    );
    let params = columns.iter().map(|(_, value)| value.clone()).collect();
    Some(SqlResult { query, params })
}

/// Parameterized UPDATE by id returning the new row as JSON. None when the
/// payload set no columns.
pub fn build_update(
    table: Table,
    columns: &[(&'static str, BindValue)],
    id: i64,
) -> Option<SqlResult> {
    if columns.is_empty() {
        return None;
    }
    let set_clauses = columns
        .iter()
        .enumerate()
        .map(|(i, (name, _))| format!("\"{}\" = ${}", name, i + 1))
        .collect::<Vec<_>>()
        .join(", ");
    let query = format!(
        "UPDATE \"{0}\" SET {1} WHERE \"id\" = ${2} RETURNING row_to_json(\"{0}\".*) AS row",
        table.name(),
        set_clauses,
        columns.len() + 1
    );
    let mut params: Vec<BindValue> = columns.iter().map(|(_, value)| value.clone()).collect();
    params.push(BindValue::Int(id));
    Some(SqlResult { query, params })
}

async fn fetch_rows(pool: &PgPool, sql: &SqlResult) -> Result<Vec<Value>, ApiError> {
    // row_to_json avoids hand-mapping columns for arbitrary projections.
    let wrapped = format!("SELECT row_to_json(t) AS row FROM ({}) t", sql.query);
    let mut query = sqlx::query(&wrapped);
    for param in &sql.params {
        query = bind_value(query, param);
    }
    let rows = query.fetch_all(pool).await?;
    let mut values = Vec::with_capacity(rows.len());
    for row in rows {
        values.push(row.try_get("row")?);
    }
    Ok(values)
}

async fn apply_populate(
    pool: &PgPool,
    id: i64,
    populate: Populate,
    value: &mut Value,
) -> Result<(), ApiError> {
    match populate {
        Populate::Reviews => {
            let sql = "SELECT row_to_json(t) AS row FROM (\
                 SELECT r.*, u.name AS user_name, u.photo AS user_photo \
                 FROM \"reviews\" r JOIN \"users\" u ON r.user_id = u.id \
                 WHERE r.tour_id = $1) t";
            let rows = sqlx::query(sql).bind(id).fetch_all(pool).await?;
            let mut reviews = Vec::with_capacity(rows.len());
            for row in rows {
                reviews.push(row.try_get::<Value, _>("row")?);
            }
            if let Value::Object(map) = value {
                map.insert("reviews".to_string(), Value::Array(reviews));
            }
        }
    }
    Ok(())
}
