use axum::extract::{DefaultBodyLimit, State};
use axum::http::{StatusCode, Uri};
use axum::middleware::{from_fn, from_fn_with_state};
use axum::{routing::get, Json, Router};
use serde_json::json;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::EnvFilter;

mod auth;
mod config;
mod crud;
mod db;
mod error;
mod handlers;
mod middleware;
mod models;
mod query;

use db::AppState;
use error::ApiError;
use middleware::{protect, restrict_to_admin, restrict_to_managers, restrict_to_staff};

#[tokio::main]
async fn main() {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    // Initialize configuration (this loads the config singleton)
    let config = config::config();

    let default_directives = if crate::is_development!() {
        "natours_api=debug,tower_http=debug"
    } else {
        "natours_api=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives)),
        )
        .init();

    tracing::info!("Starting Natours API in {:?} mode", config.environment);

    let state = match db::connect().await {
        Ok(state) => state,
        Err(e) => {
            eprintln!("Failed to connect to Postgres: {}", e);
            std::process::exit(1);
        }
    };

    let app = app(state);

    // PORT is folded into the config overrides, so tests can pick a free port
    let bind_addr = format!("0.0.0.0:{}", config.api.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {}: {}", bind_addr, e));

    println!("🚀 Natours API server listening on http://{}", bind_addr);

    axum::serve(listener, app).await.expect("server");
}

fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api/v1/tours", tour_routes(state.clone()))
        .nest("/api/v1/users", user_routes(state.clone()))
        .nest("/api/v1/reviews", review_routes(state.clone()))
        .fallback(not_found)
        // Global middleware
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(config::config().api.max_request_size_bytes))
        .with_state(state)
}

fn tour_routes(state: AppState) -> Router<AppState> {
    use axum::routing::{patch, post};
    use handlers::{reviews, tours};

    // Reads stay public so the storefront can browse without a session
    let public = Router::new()
        .route("/", get(tours::get_all_tours))
        .route("/top-2-cheap", get(tours::alias_top_tours))
        .route("/tour-stats", get(tours::get_tour_stats))
        .route(
            "/tours-within/:distance/center/:latlng/unit/:unit",
            get(tours::get_tours_within),
        )
        .route("/distances/:latlng/unit/:unit", get(tours::get_distances))
        .route("/:id", get(tours::get_tour));

    // Catalog management: admins and lead guides only
    let managed = Router::new()
        .route("/", post(tours::create_tour))
        .route("/:id", patch(tours::update_tour).delete(tours::delete_tour))
        .route_layer(from_fn(restrict_to_managers))
        .route_layer(from_fn_with_state(state.clone(), protect));

    // Planning report is open to regular guides as well
    let staff = Router::new()
        .route("/monthly-plan/:year", get(tours::get_monthly_plan))
        .route_layer(from_fn(restrict_to_staff))
        .route_layer(from_fn_with_state(state.clone(), protect));

    // Reviews nested under a tour; any signed-in user
    let tour_reviews = Router::new()
        .route(
            "/:id/reviews",
            get(reviews::get_tour_reviews).post(reviews::create_tour_review),
        )
        .route_layer(from_fn_with_state(state, protect));

    public.merge(managed).merge(staff).merge(tour_reviews)
}

fn user_routes(state: AppState) -> Router<AppState> {
    use axum::routing::{patch, post};
    use handlers::{auth, users};

    let public = Router::new()
        .route("/signup", post(auth::signup))
        .route("/login", post(auth::login))
        .route("/forgotPassword", post(auth::forgot_password))
        .route("/resetPassword", post(auth::reset_password));

    // Self-service routes for the signed-in account
    let me = Router::new()
        .route("/updateMyPassword", patch(auth::update_my_password))
        .route(
            "/me",
            get(users::get_me)
                .patch(users::update_me)
                .delete(users::delete_me),
        )
        .route_layer(from_fn_with_state(state.clone(), protect));

    // Account administration
    let admin = Router::new()
        .route("/", get(users::get_all_users).post(users::create_user))
        .route(
            "/:id",
            get(users::get_user)
                .patch(users::update_user)
                .delete(users::delete_user),
        )
        .route_layer(from_fn(restrict_to_admin))
        .route_layer(from_fn_with_state(state, protect));

    public.merge(me).merge(admin)
}

fn review_routes(state: AppState) -> Router<AppState> {
    use handlers::reviews;

    Router::new()
        .route("/", get(reviews::get_all_reviews).post(reviews::create_review))
        .route(
            "/:id",
            get(reviews::get_review)
                .patch(reviews::update_review)
                .delete(reviews::delete_review),
        )
        .route_layer(from_fn_with_state(state, protect))
}

async fn health(State(state): State<AppState>) -> impl axum::response::IntoResponse {
    let now = chrono::Utc::now();

    match db::health_check(&state.pool).await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "status": "success",
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "error",
                "message": "database unavailable",
                "data": {
                    "status": "degraded",
                    "timestamp": now,
                    "database_error": e.to_string()
                }
            })),
        ),
    }
}

async fn not_found(uri: Uri) -> ApiError {
    ApiError::not_found(format!("Can't find {} on this server!", uri))
}
