use axum::extract::{Path, Query, State};
use serde_json::{Map, Value};
use sqlx::Row;

use crate::crud::{self, ColumnValues, ListOptions, Populate};
use crate::db::AppState;
use crate::error::ApiError;
use crate::middleware::{invalid_input, ApiResponse, ApiResult, ValidatedJson};
use crate::models::{CreateTourRequest, UpdateTourRequest};
use crate::query::{RawParams, Table};

fn tour_list_options() -> ListOptions {
    ListOptions {
        select: None,
        virtuals: Some(add_duration_in_weeks),
    }
}

/// Computed field carried by tour list payloads. Skipped when a `fields`
/// selection dropped `duration`.
fn add_duration_in_weeks(row: &mut Map<String, Value>) {
    if let Some(duration) = row.get("duration").and_then(Value::as_f64) {
        if let Some(weeks) = serde_json::Number::from_f64(duration / 7.0) {
            row.insert("duration_in_weeks".to_string(), Value::Number(weeks));
        }
    }
}

/// GET /api/v1/tours - list through the filter/sort/fields/paginate pipeline
pub async fn get_all_tours(
    State(state): State<AppState>,
    Query(params): Query<RawParams>,
) -> ApiResult {
    let tours = crud::get_all(&state.pool, Table::Tours, &params, tour_list_options()).await?;
    Ok(ApiResponse::ok().results(tours.len()).data("tours", tours))
}

/// GET /api/v1/tours/top-2-cheap - canned best-value listing
pub async fn alias_top_tours(
    State(state): State<AppState>,
    Query(mut params): Query<RawParams>,
) -> ApiResult {
    params.insert("limit".to_string(), "2".to_string());
    params.insert("sort".to_string(), "-rating,price".to_string());
    params.insert(
        "fields".to_string(),
        "name,price,rating,summary,difficulty".to_string(),
    );

    let tours = crud::get_all(&state.pool, Table::Tours, &params, tour_list_options()).await?;
    Ok(ApiResponse::ok().results(tours.len()).data("tours", tours))
}

/// GET /api/v1/tours/:id - single tour with its reviews attached
pub async fn get_tour(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult {
    let id = crud::parse_id(Table::Tours, &id)?;
    let tour = crud::get_one(&state.pool, Table::Tours, id, Some(Populate::Reviews)).await?;
    Ok(ApiResponse::ok().data("tour", tour))
}

/// POST /api/v1/tours
pub async fn create_tour(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<CreateTourRequest>,
) -> ApiResult {
    if let Some(reason) = payload.discount_error() {
        return Err(invalid_input(reason));
    }

    let tour = crud::create_one(&state.pool, Table::Tours, payload.column_values()).await?;
    Ok(ApiResponse::created().data("tour", tour))
}

/// PATCH /api/v1/tours/:id
pub async fn update_tour(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidatedJson(payload): ValidatedJson<UpdateTourRequest>,
) -> ApiResult {
    let id = crud::parse_id(Table::Tours, &id)?;
    let tour = crud::update_one(&state.pool, Table::Tours, id, payload.column_values()).await?;
    Ok(ApiResponse::ok().data("tour", tour))
}

/// DELETE /api/v1/tours/:id
pub async fn delete_tour(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult {
    let id = crud::parse_id(Table::Tours, &id)?;
    crud::delete_one(&state.pool, Table::Tours, id).await?;
    Ok(ApiResponse::no_content())
}

/// GET /api/v1/tours/tour-stats - per-difficulty aggregates over tours rated 4.5+
pub async fn get_tour_stats(State(state): State<AppState>) -> ApiResult {
    let sql = "SELECT row_to_json(t) AS row FROM ( \
               SELECT difficulty, COUNT(*) AS total_tours, AVG(rating) AS avg_rating, \
                      AVG(price) AS avg_price, MIN(price) AS min_price, MAX(price) AS max_price \
               FROM tours WHERE rating >= 4.5 \
               GROUP BY difficulty ORDER BY difficulty) t";

    let rows = sqlx::query(sql).fetch_all(&state.pool).await?;
    let stats = rows
        .iter()
        .map(|row| row.try_get("row"))
        .collect::<Result<Vec<Value>, _>>()?;

    Ok(ApiResponse::ok().data_value(stats))
}

/// GET /api/v1/tours/monthly-plan/:year - busiest months of the given year
pub async fn get_monthly_plan(
    State(state): State<AppState>,
    Path(year): Path<String>,
) -> ApiResult {
    let year: i32 = year
        .parse()
        .map_err(|_| ApiError::bad_request("Please provide a valid year"))?;
    let from = chrono::NaiveDate::from_ymd_opt(year, 1, 1)
        .ok_or_else(|| ApiError::bad_request("Please provide a valid year"))?;
    let to = chrono::NaiveDate::from_ymd_opt(year, 12, 31)
        .ok_or_else(|| ApiError::bad_request("Please provide a valid year"))?;

    let sql = "SELECT row_to_json(m) AS row FROM ( \
               SELECT EXTRACT(MONTH FROM sd) AS month, COUNT(*) AS num_tour_starts, \
                      ARRAY_AGG(t.name) AS tours \
               FROM tours t, UNNEST(t.start_dates) AS sd \
               WHERE sd BETWEEN $1 AND $2 \
               GROUP BY month ORDER BY num_tour_starts DESC LIMIT 12) m";

    let rows = sqlx::query(sql)
        .bind(from)
        .bind(to)
        .fetch_all(&state.pool)
        .await?;
    let plan = rows
        .iter()
        .map(|row| row.try_get("row"))
        .collect::<Result<Vec<Value>, _>>()?;

    Ok(ApiResponse::ok().results(plan.len()).data_value(plan))
}

/// GET /api/v1/tours/tours-within/:distance/center/:latlng/unit/:unit
pub async fn get_tours_within(
    State(state): State<AppState>,
    Path((distance, latlng, unit)): Path<(String, String, String)>,
) -> ApiResult {
    let (lat, lng) = parse_latlng(&latlng)?;
    let distance: f64 = distance
        .parse()
        .map_err(|_| ApiError::bad_request("Please provide a valid distance"))?;
    let earth_radius = if unit == "mi" { 3958.8 } else { 6371.0 };

    let sql = "SELECT row_to_json(t) AS row FROM (SELECT * FROM tours WHERE ( \
               $4 * acos( \
                 cos(radians($1)) * cos(radians(start_location_coordinates[2])) * \
                 cos(radians(start_location_coordinates[1]) - radians($2)) + \
                 sin(radians($1)) * sin(radians(start_location_coordinates[2])) \
               )) <= $3) t";

    let rows = sqlx::query(sql)
        .bind(lat)
        .bind(lng)
        .bind(distance)
        .bind(earth_radius)
        .fetch_all(&state.pool)
        .await?;
    let tours = rows
        .iter()
        .map(|row| row.try_get("row"))
        .collect::<Result<Vec<Value>, _>>()?;

    Ok(ApiResponse::ok().results(tours.len()).data("tours", tours))
}

/// GET /api/v1/tours/distances/:latlng/unit/:unit - distance to every tour
pub async fn get_distances(
    State(state): State<AppState>,
    Path((latlng, unit)): Path<(String, String)>,
) -> ApiResult {
    let (lat, lng) = parse_latlng(&latlng)?;
    let earth_radius = if unit == "mi" { 3958.8 } else { 6371.0 };

    let sql = "SELECT row_to_json(t) AS row FROM (SELECT name, ( \
               $3 * acos( \
                 cos(radians($1)) * cos(radians(start_location_coordinates[2])) * \
                 cos(radians(start_location_coordinates[1]) - radians($2)) + \
                 sin(radians($1)) * sin(radians(start_location_coordinates[2])) \
               )) AS distance FROM tours ORDER BY distance ASC) t";

    let rows = sqlx::query(sql)
        .bind(lat)
        .bind(lng)
        .bind(earth_radius)
        .fetch_all(&state.pool)
        .await?;
    let distances = rows
        .iter()
        .map(|row| row.try_get("row"))
        .collect::<Result<Vec<Value>, _>>()?;

    Ok(ApiResponse::ok().data("data", distances))
}

/// The coordinate pair arrives as `lat,lng`. A zero coordinate reads as
/// missing, same as the service this mirrors.
fn parse_latlng(raw: &str) -> Result<(f64, f64), ApiError> {
    let mut parts = raw.split(',');
    let lat = parts.next().and_then(|p| p.parse::<f64>().ok());
    let lng = parts.next().and_then(|p| p.parse::<f64>().ok());
    match (lat, lng) {
        (Some(lat), Some(lng)) if lat != 0.0 && lng != 0.0 => Ok((lat, lng)),
        _ => Err(ApiError::bad_request(
            "Please provide latitude and longitude in the format lat,lng.",
        )),
    }
}
