use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::StatusCode;
use sqlx::postgres::PgPoolOptions;

static SERVER: OnceLock<TestServer> = OnceLock::new();
static DB_PREPARED: tokio::sync::OnceCell<()> = tokio::sync::OnceCell::const_new();
static EMAIL_SEQ: AtomicU32 = AtomicU32::new(0);

pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    child: Child,
}

impl TestServer {
    fn spawn() -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        // Spawn the already-built binary to keep start fast during tests
        // Assumes debug profile; adjust if you run tests with --release
        let mut cmd = Command::new("target/debug/natours-api");
        cmd.env("PORT", port.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        // Inherit environment so the server can see DATABASE_URL from .env
        let child = cmd.spawn().context("failed to spawn server binary")?;

        Ok(Self { port, base_url, child })
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        loop {
            if Instant::now() > deadline { break; }
            let url = format!("{}/health", self.base_url);
            match client.get(&url).send().await {
                Ok(resp) => {
                    // Consider server ready on any non-404 response
                    if resp.status() == StatusCode::OK || resp.status() == StatusCode::SERVICE_UNAVAILABLE {
                        return Ok(());
                    }
                }
                Err(_) => {}
            }
            tokio::time::sleep(Duration::from_millis(150)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }
}

/// Boot the API once per test binary against a freshly initialized database.
/// Returns `None` when `DATABASE_URL` is not configured, so suites skip
/// cleanly on machines without Postgres.
pub async fn ensure_server() -> Result<Option<&'static TestServer>> {
    let _ = dotenvy::dotenv();
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL is not set; skipping integration tests");
        return Ok(None);
    };

    prepare_database(&database_url).await?;

    let server = SERVER.get_or_init(|| TestServer::spawn().expect("failed to spawn server binary"));
    server.wait_ready(Duration::from_secs(10)).await?;
    Ok(Some(server))
}

/// Apply the schema through the CLI and wipe all tables, once per binary.
async fn prepare_database(database_url: &str) -> Result<()> {
    DB_PREPARED
        .get_or_try_init(|| async {
            let status = Command::new("target/debug/natours")
                .args(["db", "init", "--database-url", database_url])
                .stdin(Stdio::null())
                .status()
                .context("failed to run `natours db init`")?;
            anyhow::ensure!(status.success(), "`natours db init` exited with {}", status);

            let pool = PgPoolOptions::new()
                .max_connections(1)
                .connect(database_url)
                .await
                .context("failed to connect for test cleanup")?;
            sqlx::query("TRUNCATE TABLE tours, users, reviews, bookings RESTART IDENTITY CASCADE")
                .execute(&pool)
                .await?;
            pool.close().await;
            Ok(())
        })
        .await
        .map(|_| ())
}

/// Every signup gets its own address; all suites share one database.
pub fn unique_email(prefix: &str) -> String {
    let n = EMAIL_SEQ.fetch_add(1, Ordering::Relaxed);
    format!("{}-{}-{}@example.com", prefix, std::process::id(), n)
}

/// Sign up a fresh account and return its bearer token.
pub async fn signup_user(
    client: &reqwest::Client,
    base_url: &str,
    email: &str,
    role: Option<&str>,
) -> Result<String> {
    let mut body = serde_json::json!({
        "name": "Test User",
        "email": email,
        "password": "password123",
        "passwordConfirm": "password123",
    });
    if let Some(role) = role {
        body["role"] = serde_json::json!(role);
    }

    let res = client
        .post(format!("{}/api/v1/users/signup", base_url))
        .json(&body)
        .send()
        .await?;
    anyhow::ensure!(
        res.status() == StatusCode::CREATED,
        "signup failed with {}",
        res.status()
    );

    let payload = res.json::<serde_json::Value>().await?;
    let token = payload["token"]
        .as_str()
        .context("signup response carried no token")?;
    Ok(token.to_string())
}
