use std::fs;
use std::path::PathBuf;

use clap::Subcommand;
use serde::Deserialize;
use serde_json::json;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::auth::password;
use crate::cli::{utils, OutputFormat};
use crate::crud::{self, ColumnValues};
use crate::models::{CreateTourRequest, Role};
use crate::query::Table;

/// Applied by `db init`; lives next to Cargo.toml so it stays reviewable.
const SCHEMA: &str = include_str!("../../../schema.sql");

#[derive(Subcommand)]
pub enum DbCommands {
    #[command(about = "Apply the schema to the target database")]
    Init {
        #[arg(long, help = "Database URL override (defaults to DATABASE_URL)")]
        database_url: Option<String>,
    },

    #[command(about = "Replace table contents with the JSON fixtures")]
    Seed {
        #[arg(long, help = "Custom fixtures directory path")]
        fixtures_dir: Option<PathBuf>,

        #[arg(long, help = "Seed a single table (users, tours or reviews)")]
        only: Option<Table>,

        #[arg(long, help = "Database URL override (defaults to DATABASE_URL)")]
        database_url: Option<String>,
    },
}

pub async fn handle(cmd: DbCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        DbCommands::Init { database_url } => handle_init(database_url, output_format).await,
        DbCommands::Seed {
            fixtures_dir,
            only,
            database_url,
        } => handle_seed(fixtures_dir, only, database_url, output_format).await,
    }
}

async fn open_pool(database_url: Option<String>) -> anyhow::Result<PgPool> {
    let url = match database_url {
        Some(url) => url,
        None => std::env::var("DATABASE_URL").map_err(|_| {
            anyhow::anyhow!("DATABASE_URL is not set; export it or pass --database-url")
        })?,
    };

    let pool = PgPoolOptions::new().max_connections(2).connect(&url).await?;
    Ok(pool)
}

async fn handle_init(
    database_url: Option<String>,
    output_format: OutputFormat,
) -> anyhow::Result<()> {
    let pool = open_pool(database_url).await?;

    // The schema is plain CREATE TABLE statements, so splitting on ';' is safe.
    let mut executed = 0usize;
    for statement in SCHEMA.split(';') {
        let statement = statement.trim();
        if statement.is_empty() {
            continue;
        }
        sqlx::query(statement).execute(&pool).await?;
        executed += 1;
    }

    utils::output_success(
        &output_format,
        "Schema applied",
        Some(json!({ "statements": executed })),
    )
}

/// Fixture account row. Passwords arrive in the clear and are hashed here,
/// so fixture files never carry bcrypt output.
#[derive(Deserialize)]
struct SeedUser {
    name: String,
    email: String,
    #[serde(default)]
    photo: Option<String>,
    #[serde(default)]
    role: Option<Role>,
    password: String,
}

#[derive(Deserialize)]
struct SeedReview {
    review: String,
    rating: i32,
    tour_id: i32,
    user_id: i32,
}

#[derive(Deserialize)]
struct SeedBooking {
    tour_id: i32,
    user_id: i32,
    price: f64,
    #[serde(default)]
    paid: Option<bool>,
}

async fn handle_seed(
    fixtures_dir: Option<PathBuf>,
    only: Option<Table>,
    database_url: Option<String>,
    output_format: OutputFormat,
) -> anyhow::Result<()> {
    let fixtures_dir = fixtures_dir.unwrap_or_else(|| {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join("fixtures")
    });
    if !fixtures_dir.exists() {
        return Err(anyhow::anyhow!(
            "Fixtures directory not found: {}",
            fixtures_dir.display()
        ));
    }

    let pool = open_pool(database_url).await?;

    let wants = |table: Table| only.is_none() || only == Some(table);
    let mut counts = serde_json::Map::new();

    // Referencing tables cascade, so parents can be truncated first.
    if wants(Table::Users) {
        truncate(&pool, "users").await?;
        let loaded = seed_users(&pool, &fixtures_dir).await?;
        counts.insert("users".into(), json!(loaded));
    }
    if wants(Table::Tours) {
        truncate(&pool, "tours").await?;
        let loaded = seed_tours(&pool, &fixtures_dir).await?;
        counts.insert("tours".into(), json!(loaded));
    }
    if wants(Table::Reviews) {
        truncate(&pool, "reviews").await?;
        let loaded = seed_reviews(&pool, &fixtures_dir).await?;
        counts.insert("reviews".into(), json!(loaded));
    }
    if only.is_none() {
        truncate(&pool, "bookings").await?;
        let loaded = seed_bookings(&pool, &fixtures_dir).await?;
        counts.insert("bookings".into(), json!(loaded));
    }

    // Seeded reviews bypass the handlers, so the denormalized tour rating
    // columns have to be recomputed in one pass.
    if wants(Table::Tours) || wants(Table::Reviews) {
        sqlx::query(
            "UPDATE tours t SET ratings_quantity = s.quantity, rating = s.average \
             FROM (SELECT tour_id, COUNT(*)::int AS quantity, AVG(rating)::float8 AS average \
                   FROM reviews GROUP BY tour_id) s \
             WHERE t.id = s.tour_id",
        )
        .execute(&pool)
        .await?;
    }

    utils::output_success(
        &output_format,
        "Fixtures loaded",
        Some(json!({ "seeded": counts })),
    )
}

async fn truncate(pool: &PgPool, table: &str) -> anyhow::Result<()> {
    sqlx::query(&format!(
        "TRUNCATE TABLE {} RESTART IDENTITY CASCADE",
        table
    ))
    .execute(pool)
    .await?;
    Ok(())
}

fn read_fixture<T: serde::de::DeserializeOwned>(
    fixtures_dir: &PathBuf,
    name: &str,
) -> anyhow::Result<Vec<T>> {
    let path = fixtures_dir.join(name);
    if !path.exists() {
        return Err(anyhow::anyhow!("Fixture file not found: {}", path.display()));
    }
    let content = fs::read_to_string(&path)?;
    let rows = serde_json::from_str(&content)?;
    Ok(rows)
}

async fn seed_users(pool: &PgPool, fixtures_dir: &PathBuf) -> anyhow::Result<usize> {
    let users: Vec<SeedUser> = read_fixture(fixtures_dir, "users.json")?;

    for user in &users {
        let hash = password::hash_password(&user.password)?;
        let role = user.role.unwrap_or(Role::User);
        sqlx::query(
            "INSERT INTO users (name, email, photo, role, password) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.photo)
        .bind(role.as_str())
        .bind(&hash)
        .execute(pool)
        .await?;
    }

    Ok(users.len())
}

async fn seed_tours(pool: &PgPool, fixtures_dir: &PathBuf) -> anyhow::Result<usize> {
    // Tour fixtures share the create DTO, so arrays and the locations JSONB
    // column go through the same bind path the API uses.
    let tours: Vec<CreateTourRequest> = read_fixture(fixtures_dir, "tours.json")?;

    for tour in &tours {
        crud::create_one(pool, Table::Tours, tour.column_values()).await?;
    }

    Ok(tours.len())
}

async fn seed_reviews(pool: &PgPool, fixtures_dir: &PathBuf) -> anyhow::Result<usize> {
    let reviews: Vec<SeedReview> = read_fixture(fixtures_dir, "reviews.json")?;

    for review in &reviews {
        sqlx::query("INSERT INTO reviews (review, rating, tour_id, user_id) VALUES ($1, $2, $3, $4)")
            .bind(&review.review)
            .bind(review.rating)
            .bind(review.tour_id)
            .bind(review.user_id)
            .execute(pool)
            .await?;
    }

    Ok(reviews.len())
}

async fn seed_bookings(pool: &PgPool, fixtures_dir: &PathBuf) -> anyhow::Result<usize> {
    let bookings: Vec<SeedBooking> = read_fixture(fixtures_dir, "bookings.json")?;

    for booking in &bookings {
        sqlx::query("INSERT INTO bookings (tour_id, user_id, price, paid) VALUES ($1, $2, $3, $4)")
            .bind(booking.tour_id)
            .bind(booking.user_id)
            .bind(booking.price)
            .bind(booking.paid.unwrap_or(true))
            .execute(pool)
            .await?;
    }

    Ok(bookings.len())
}
