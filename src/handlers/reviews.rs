use axum::extract::{Path, State};
use axum::Extension;
use serde_json::Value;
use sqlx::{PgPool, Row};

use crate::crud::{self, ColumnValues};
use crate::db::AppState;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, CurrentUser, ValidatedJson};
use crate::models::{CreateReviewRequest, UpdateReviewRequest};
use crate::query::Table;

/// GET /api/v1/reviews - every review with its author's name and photo
pub async fn get_all_reviews(State(state): State<AppState>) -> ApiResult {
    list_reviews(&state.pool, None).await
}

/// GET /api/v1/tours/:tour_id/reviews - reviews scoped to one tour
pub async fn get_tour_reviews(
    State(state): State<AppState>,
    Path(tour_id): Path<String>,
) -> ApiResult {
    let tour_id = crud::parse_id(Table::Tours, &tour_id)?;
    list_reviews(&state.pool, Some(tour_id)).await
}

async fn list_reviews(pool: &PgPool, tour_id: Option<i64>) -> ApiResult {
    let mut sql = String::from(
        "SELECT row_to_json(t) AS row FROM ( \
         SELECT r.*, u.name AS user_name, u.photo AS user_photo \
         FROM reviews r JOIN users u ON r.user_id = u.id",
    );
    if tour_id.is_some() {
        sql.push_str(" WHERE r.tour_id = $1");
    }
    sql.push_str(") t");

    let mut query = sqlx::query(&sql);
    if let Some(id) = tour_id {
        query = query.bind(id);
    }

    let rows = query.fetch_all(pool).await?;
    let reviews = rows
        .iter()
        .map(|row| row.try_get("row"))
        .collect::<Result<Vec<Value>, _>>()?;

    Ok(ApiResponse::ok()
        .results(reviews.len())
        .data("reviews", reviews))
}

/// POST /api/v1/reviews
pub async fn create_review(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    ValidatedJson(payload): ValidatedJson<CreateReviewRequest>,
) -> ApiResult {
    insert_review(&state.pool, payload, None, user.id).await
}

/// POST /api/v1/tours/:tour_id/reviews - review the tour in the path
pub async fn create_tour_review(
    State(state): State<AppState>,
    Path(tour_id): Path<String>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    ValidatedJson(payload): ValidatedJson<CreateReviewRequest>,
) -> ApiResult {
    let tour_id = crud::parse_id(Table::Tours, &tour_id)?;
    insert_review(&state.pool, payload, Some(tour_id), user.id).await
}

async fn insert_review(
    pool: &PgPool,
    payload: CreateReviewRequest,
    path_tour_id: Option<i64>,
    user_id: i32,
) -> ApiResult {
    let columns = payload.column_values_with(path_tour_id, user_id);
    let review = crud::create_one(pool, Table::Reviews, columns).await?;

    if let Some(tour_id) = review.get("tour_id").and_then(Value::as_i64) {
        recalc_tour_ratings(pool, tour_id).await?;
    }
    Ok(ApiResponse::created().data("review", review))
}

/// GET /api/v1/reviews/:id
pub async fn get_review(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult {
    let id = crud::parse_id(Table::Reviews, &id)?;
    let review = crud::get_one(&state.pool, Table::Reviews, id, None).await?;
    Ok(ApiResponse::ok().data("review", review))
}

/// PATCH /api/v1/reviews/:id
pub async fn update_review(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidatedJson(payload): ValidatedJson<UpdateReviewRequest>,
) -> ApiResult {
    let id = crud::parse_id(Table::Reviews, &id)?;
    let review = crud::update_one(&state.pool, Table::Reviews, id, payload.column_values()).await?;

    if let Some(tour_id) = review.get("tour_id").and_then(Value::as_i64) {
        recalc_tour_ratings(&state.pool, tour_id).await?;
    }
    Ok(ApiResponse::ok().data("review", review))
}

/// DELETE /api/v1/reviews/:id
pub async fn delete_review(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult {
    let id = crud::parse_id(Table::Reviews, &id)?;
    // Read first: the owning tour id is needed after the row is gone.
    let review = crud::get_one(&state.pool, Table::Reviews, id, None).await?;
    crud::delete_one(&state.pool, Table::Reviews, id).await?;

    if let Some(tour_id) = review.get("tour_id").and_then(Value::as_i64) {
        recalc_tour_ratings(&state.pool, tour_id).await?;
    }
    Ok(ApiResponse::no_content())
}

/// Refresh the owning tour's rating aggregates after a review mutation. A
/// tour with no reviews left returns to the 4.5 default.
async fn recalc_tour_ratings(pool: &PgPool, tour_id: i64) -> Result<(), ApiError> {
    let row = sqlx::query(
        "SELECT COUNT(*)::int AS quantity, COALESCE(AVG(rating), 4.5)::float8 AS average \
         FROM reviews WHERE tour_id = $1",
    )
    .bind(tour_id)
    .fetch_one(pool)
    .await?;
    let quantity: i32 = row.try_get("quantity")?;
    let average: f64 = row.try_get("average")?;

    sqlx::query("UPDATE tours SET ratings_quantity = $1, rating = $2 WHERE id = $3")
        .bind(quantity)
        .bind(average)
        .bind(tour_id)
        .execute(pool)
        .await?;
    Ok(())
}
