mod common;

use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde_json::json;

// Tour CRUD plus the filter/sort/fields/paginate pipeline and the canned
// reporting routes. All inserts happen in the one lifecycle test below so the
// count assertions stay deterministic; every other test here is read-only.

/// Tour number `i` of the fixed set the lifecycle test creates.
///
/// The set is laid out so each report has a known answer: prices run
/// 100..1500 in steps of 100, difficulties cycle easy/medium/difficult,
/// tours 6..=15 are rated 4.5 or better (15 the highest, then 14), tours
/// 1..=3 have 2030 start dates (one in March, two in July) and tours 1..=2
/// start near New York while 3..=6 start in London.
fn tour_payload(i: usize) -> serde_json::Value {
    let difficulty = match i % 3 {
        1 => "easy",
        2 => "medium",
        _ => "difficult",
    };
    let rating = match i {
        1..=5 => 4.0,
        6..=14 => 4.5 + (i as f64 - 6.0) * 0.05,
        _ => 5.0,
    };

    let mut tour = json!({
        "name": format!("Test Tour {:02}", i),
        "duration": 7,
        "max_group_size": 10,
        "difficulty": difficulty,
        "price": (i * 100) as f64,
        "rating": rating,
        "summary": "A tour assembled for the integration suite",
        "description": "Longer text describing the tour in loving detail",
        "image_cover": "tour-cover.jpg",
    });
    match i {
        1 => tour["start_dates"] = json!(["2030-03-10"]),
        2 => tour["start_dates"] = json!(["2030-07-04"]),
        3 => tour["start_dates"] = json!(["2030-07-20"]),
        _ => {}
    }
    match i {
        1 => tour["start_location_coordinates"] = json!([-73.98, 40.75]),
        2 => tour["start_location_coordinates"] = json!([-74.2, 40.6]),
        3..=6 => tour["start_location_coordinates"] = json!([-0.1, 51.5]),
        _ => {}
    }
    tour
}

#[tokio::test]
async fn tour_lifecycle_and_reports() -> Result<()> {
    let Some(server) = common::ensure_server().await? else { return Ok(()) };
    let client = reqwest::Client::new();
    let base = &server.base_url;
    let admin = common::signup_user(&client, base, &common::unique_email("tour-admin"), Some("admin")).await?;
    let visitor = common::signup_user(&client, base, &common::unique_email("tour-visitor"), None).await?;

    // Seed the fixed set
    let mut first_tour_id = 0;
    for i in 1..=15 {
        let res = client
            .post(format!("{}/api/v1/tours", base))
            .bearer_auth(&admin)
            .json(&tour_payload(i))
            .send()
            .await?;
        assert_eq!(res.status(), StatusCode::CREATED, "create {} failed: {}", i, res.status());
        let payload = res.json::<serde_json::Value>().await?;
        assert_eq!(payload["status"], "success", "body: {}", payload);
        assert_eq!(
            payload["data"]["tour"]["name"],
            format!("Test Tour {:02}", i),
            "body: {}", payload
        );
        if i == 1 {
            first_tour_id = payload["data"]["tour"]["id"].as_i64().context("tour id missing")?;
        }
    }

    // Plain listing comes back in id order with the computed weeks field
    let res = client.get(format!("{}/api/v1/tours", base)).send().await?;
    assert_eq!(res.status(), StatusCode::OK, "unexpected status: {}", res.status());
    let payload = res.json::<serde_json::Value>().await?;
    assert_eq!(payload["results"], 15, "body: {}", payload);
    let tours = payload["data"]["tours"].as_array().context("no tours array")?;
    assert_eq!(tours.len(), 15);
    assert_eq!(tours[0]["name"], "Test Tour 01");
    assert_eq!(tours[0]["duration_in_weeks"].as_f64(), Some(1.0), "row: {}", tours[0]);

    // Pagination
    let res = client
        .get(format!("{}/api/v1/tours", base))
        .query(&[("page", "1"), ("limit", "10")])
        .send()
        .await?;
    let payload = res.json::<serde_json::Value>().await?;
    assert_eq!(payload["results"], 10, "body: {}", payload);

    let res = client
        .get(format!("{}/api/v1/tours", base))
        .query(&[("page", "2"), ("limit", "10")])
        .send()
        .await?;
    let payload = res.json::<serde_json::Value>().await?;
    assert_eq!(payload["results"], 5, "body: {}", payload);
    assert_eq!(payload["data"]["tours"][0]["name"], "Test Tour 11", "body: {}", payload);

    let res = client
        .get(format!("{}/api/v1/tours", base))
        .query(&[("page", "3"), ("limit", "10")])
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND, "unexpected status: {}", res.status());
    let payload = res.json::<serde_json::Value>().await?;
    assert_eq!(payload["message"], "This page does not exist", "body: {}", payload);

    // Sorting
    let res = client
        .get(format!("{}/api/v1/tours", base))
        .query(&[("sort", "price")])
        .send()
        .await?;
    let payload = res.json::<serde_json::Value>().await?;
    let tours = payload["data"]["tours"].as_array().context("no tours array")?;
    assert_eq!(tours[0]["price"].as_f64(), Some(100.0));
    assert_eq!(tours[14]["price"].as_f64(), Some(1500.0));

    let res = client
        .get(format!("{}/api/v1/tours", base))
        .query(&[("sort", "-price")])
        .send()
        .await?;
    let payload = res.json::<serde_json::Value>().await?;
    assert_eq!(payload["data"]["tours"][0]["price"].as_f64(), Some(1500.0));

    // Range filters
    let res = client
        .get(format!("{}/api/v1/tours", base))
        .query(&[("price[gte]", "500"), ("price[lte]", "900")])
        .send()
        .await?;
    let payload = res.json::<serde_json::Value>().await?;
    assert_eq!(payload["results"], 5, "body: {}", payload);
    for tour in payload["data"]["tours"].as_array().context("no tours array")? {
        let price = tour["price"].as_f64().context("price missing")?;
        assert!((500.0..=900.0).contains(&price), "price out of range: {}", tour);
    }

    // Equality filter
    let res = client
        .get(format!("{}/api/v1/tours", base))
        .query(&[("difficulty", "easy")])
        .send()
        .await?;
    let payload = res.json::<serde_json::Value>().await?;
    assert_eq!(payload["results"], 5, "body: {}", payload);
    for tour in payload["data"]["tours"].as_array().context("no tours array")? {
        assert_eq!(tour["difficulty"], "easy", "row: {}", tour);
    }

    // Field selection always carries the id along
    let res = client
        .get(format!("{}/api/v1/tours", base))
        .query(&[("fields", "name,price")])
        .send()
        .await?;
    let payload = res.json::<serde_json::Value>().await?;
    let row = payload["data"]["tours"][0].as_object().context("no first row")?;
    let mut keys: Vec<&str> = row.keys().map(String::as_str).collect();
    keys.sort_unstable();
    assert_eq!(keys, ["id", "name", "price"], "row: {:?}", row);

    // Best-value alias: top rated first, no full rows
    let res = client.get(format!("{}/api/v1/tours/top-2-cheap", base)).send().await?;
    let payload = res.json::<serde_json::Value>().await?;
    assert_eq!(payload["results"], 2, "body: {}", payload);
    assert_eq!(payload["data"]["tours"][0]["name"], "Test Tour 15", "body: {}", payload);
    assert_eq!(payload["data"]["tours"][1]["name"], "Test Tour 14", "body: {}", payload);
    assert!(payload["data"]["tours"][0].get("duration").is_none(), "body: {}", payload);

    // Aggregates cover the ten tours rated 4.5 and up, grouped by difficulty
    let res = client.get(format!("{}/api/v1/tours/tour-stats", base)).send().await?;
    assert_eq!(res.status(), StatusCode::OK, "unexpected status: {}", res.status());
    let payload = res.json::<serde_json::Value>().await?;
    assert!(payload.get("results").is_none(), "body: {}", payload);
    let stats = payload["data"].as_array().context("stats not an array")?;
    assert_eq!(stats.len(), 3, "body: {}", payload);
    assert_eq!(stats[0]["difficulty"], "difficult");
    assert_eq!(stats[0]["total_tours"].as_i64(), Some(4), "body: {}", payload);
    assert_eq!(stats[1]["difficulty"], "easy");
    assert_eq!(stats[1]["total_tours"].as_i64(), Some(3), "body: {}", payload);
    assert_eq!(stats[2]["difficulty"], "medium");
    assert_eq!(stats[2]["total_tours"].as_i64(), Some(3), "body: {}", payload);
    assert!(stats[0]["avg_price"].as_f64().is_some(), "body: {}", payload);

    // Monthly plan is staff-only
    let res = client.get(format!("{}/api/v1/tours/monthly-plan/2030", base)).send().await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED, "unexpected status: {}", res.status());

    let res = client
        .get(format!("{}/api/v1/tours/monthly-plan/2030", base))
        .bearer_auth(&visitor)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN, "unexpected status: {}", res.status());

    let res = client
        .get(format!("{}/api/v1/tours/monthly-plan/2030", base))
        .bearer_auth(&admin)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK, "unexpected status: {}", res.status());
    let payload = res.json::<serde_json::Value>().await?;
    assert_eq!(payload["results"], 2, "body: {}", payload);
    let plan = payload["data"].as_array().context("plan not an array")?;
    assert_eq!(plan[0]["month"].as_f64(), Some(7.0), "body: {}", payload);
    assert_eq!(plan[0]["num_tour_starts"].as_i64(), Some(2), "body: {}", payload);
    assert_eq!(plan[1]["num_tour_starts"].as_i64(), Some(1), "body: {}", payload);

    // Geo search around midtown Manhattan finds the two New York starts
    let res = client
        .get(format!("{}/api/v1/tours/tours-within/200/center/40.7,-74.0/unit/mi", base))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK, "unexpected status: {}", res.status());
    let payload = res.json::<serde_json::Value>().await?;
    assert_eq!(payload["results"], 2, "body: {}", payload);
    let mut names: Vec<&str> = payload["data"]["tours"]
        .as_array()
        .context("no tours array")?
        .iter()
        .filter_map(|t| t["name"].as_str())
        .collect();
    names.sort_unstable();
    assert_eq!(names, ["Test Tour 01", "Test Tour 02"], "body: {}", payload);

    // Distance listing covers every tour, closest first, unknowns last
    let res = client
        .get(format!("{}/api/v1/tours/distances/40.7,-74.0/unit/mi", base))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK, "unexpected status: {}", res.status());
    let payload = res.json::<serde_json::Value>().await?;
    let distances = payload["data"]["data"].as_array().context("no distances array")?;
    assert_eq!(distances.len(), 15, "body: {}", payload);
    assert_eq!(distances[0]["name"], "Test Tour 01", "body: {}", payload);
    let first = distances[0]["distance"].as_f64().context("no distance")?;
    let second = distances[1]["distance"].as_f64().context("no distance")?;
    assert!(first <= second, "distances not ascending: {} > {}", first, second);
    assert!(distances[14]["distance"].is_null(), "body: {}", payload);

    // Update, fetch with reviews attached, then delete
    let res = client
        .patch(format!("{}/api/v1/tours/{}", base, first_tour_id))
        .bearer_auth(&admin)
        .json(&json!({ "price": 600.0, "difficulty": "medium" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK, "unexpected status: {}", res.status());
    let payload = res.json::<serde_json::Value>().await?;
    assert_eq!(payload["data"]["tour"]["price"].as_f64(), Some(600.0), "body: {}", payload);
    assert_eq!(payload["data"]["tour"]["difficulty"], "medium", "body: {}", payload);
    assert_eq!(payload["data"]["tour"]["name"], "Test Tour 01", "body: {}", payload);

    let res = client.get(format!("{}/api/v1/tours/{}", base, first_tour_id)).send().await?;
    assert_eq!(res.status(), StatusCode::OK, "unexpected status: {}", res.status());
    let payload = res.json::<serde_json::Value>().await?;
    assert_eq!(payload["data"]["tour"]["price"].as_f64(), Some(600.0), "body: {}", payload);
    let reviews = payload["data"]["tour"]["reviews"].as_array().context("no reviews array")?;
    assert!(reviews.is_empty(), "body: {}", payload);

    let res = client
        .delete(format!("{}/api/v1/tours/{}", base, first_tour_id))
        .bearer_auth(&admin)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NO_CONTENT, "unexpected status: {}", res.status());

    let res = client.get(format!("{}/api/v1/tours/{}", base, first_tour_id)).send().await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND, "unexpected status: {}", res.status());
    let payload = res.json::<serde_json::Value>().await?;
    assert_eq!(payload["message"], "No tour found with that ID", "body: {}", payload);

    Ok(())
}

#[tokio::test]
async fn tour_writes_require_login_and_role() -> Result<()> {
    let Some(server) = common::ensure_server().await? else { return Ok(()) };
    let client = reqwest::Client::new();
    let base = &server.base_url;

    let res = client
        .post(format!("{}/api/v1/tours", base))
        .json(&tour_payload(99))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED, "unexpected status: {}", res.status());
    let payload = res.json::<serde_json::Value>().await?;
    assert_eq!(payload["status"], "fail", "body: {}", payload);
    assert_eq!(
        payload["message"], "You are not logged in! Please log in to get access.",
        "body: {}", payload
    );

    let visitor = common::signup_user(&client, base, &common::unique_email("no-role"), None).await?;
    let res = client
        .post(format!("{}/api/v1/tours", base))
        .bearer_auth(&visitor)
        .json(&tour_payload(99))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN, "unexpected status: {}", res.status());
    let payload = res.json::<serde_json::Value>().await?;
    assert_eq!(
        payload["message"], "You do not have permission to perform this action",
        "body: {}", payload
    );

    Ok(())
}

#[tokio::test]
async fn tour_creation_validates_the_payload() -> Result<()> {
    let Some(server) = common::ensure_server().await? else { return Ok(()) };
    let client = reqwest::Client::new();
    let base = &server.base_url;
    let guide = common::signup_user(&client, base, &common::unique_email("lead"), Some("lead-guide")).await?;

    let mut bad = tour_payload(99);
    bad["name"] = json!("X");
    bad["price"] = json!(0.0);
    let res = client
        .post(format!("{}/api/v1/tours", base))
        .bearer_auth(&guide)
        .json(&bad)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST, "unexpected status: {}", res.status());
    let payload = res.json::<serde_json::Value>().await?;
    let message = payload["message"].as_str().unwrap_or_default();
    assert!(message.contains("Invalid input data"), "body: {}", payload);
    assert!(message.contains("Name must be between 2 and 40 characters"), "body: {}", payload);
    assert!(message.contains("Price must be positive"), "body: {}", payload);

    // Discount at or above the price is rejected in the handler
    let mut bad = tour_payload(98);
    bad["price_discount"] = bad["price"].clone();
    let res = client
        .post(format!("{}/api/v1/tours", base))
        .bearer_auth(&guide)
        .json(&bad)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST, "unexpected status: {}", res.status());
    let payload = res.json::<serde_json::Value>().await?;
    assert_eq!(
        payload["message"],
        "Invalid input data. Discount price must be lower than the price",
        "body: {}", payload
    );

    Ok(())
}

#[tokio::test]
async fn missing_tours_return_404() -> Result<()> {
    let Some(server) = common::ensure_server().await? else { return Ok(()) };
    let client = reqwest::Client::new();
    let base = &server.base_url;
    let admin = common::signup_user(&client, base, &common::unique_email("404-admin"), Some("admin")).await?;

    let res = client.get(format!("{}/api/v1/tours/999999", base)).send().await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND, "unexpected status: {}", res.status());
    let payload = res.json::<serde_json::Value>().await?;
    assert_eq!(payload["message"], "No tour found with that ID", "body: {}", payload);

    // Non-numeric ids cannot match a row either
    let res = client
        .get(format!("{}/api/v1/tours/123e4567-e89b-12d3-a456-426614174000", base))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND, "unexpected status: {}", res.status());
    let payload = res.json::<serde_json::Value>().await?;
    assert_eq!(payload["message"], "No tour found with that ID", "body: {}", payload);

    let res = client
        .patch(format!("{}/api/v1/tours/999999", base))
        .bearer_auth(&admin)
        .json(&json!({ "price": 10.0 }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND, "unexpected status: {}", res.status());

    let res = client
        .delete(format!("{}/api/v1/tours/999999", base))
        .bearer_auth(&admin)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND, "unexpected status: {}", res.status());

    Ok(())
}

#[tokio::test]
async fn invalid_query_parameters_are_rejected() -> Result<()> {
    let Some(server) = common::ensure_server().await? else { return Ok(()) };
    let client = reqwest::Client::new();
    let base = &server.base_url;

    let res = client
        .get(format!("{}/api/v1/tours", base))
        .query(&[("sort", "password")])
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST, "unexpected status: {}", res.status());
    let payload = res.json::<serde_json::Value>().await?;
    assert_eq!(payload["message"], "Invalid sort field: password", "body: {}", payload);

    let res = client
        .get(format!("{}/api/v1/tours", base))
        .query(&[("price[gte]", "cheap")])
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST, "unexpected status: {}", res.status());
    let payload = res.json::<serde_json::Value>().await?;
    assert_eq!(payload["message"], "Invalid filter value for price: cheap", "body: {}", payload);

    Ok(())
}

#[tokio::test]
async fn geo_routes_validate_coordinates() -> Result<()> {
    let Some(server) = common::ensure_server().await? else { return Ok(()) };
    let client = reqwest::Client::new();
    let base = &server.base_url;

    let res = client
        .get(format!("{}/api/v1/tours/tours-within/100/center/0,10/unit/mi", base))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST, "unexpected status: {}", res.status());
    let payload = res.json::<serde_json::Value>().await?;
    assert_eq!(
        payload["message"],
        "Please provide latitude and longitude in the format lat,lng.",
        "body: {}", payload
    );

    let res = client
        .get(format!("{}/api/v1/tours/distances/abc/unit/km", base))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST, "unexpected status: {}", res.status());
    let payload = res.json::<serde_json::Value>().await?;
    assert_eq!(
        payload["message"],
        "Please provide latitude and longitude in the format lat,lng.",
        "body: {}", payload
    );

    Ok(())
}
