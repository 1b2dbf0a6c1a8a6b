use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::crud::ColumnValues;
use crate::query::BindValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Difficult,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Difficult => "difficult",
        }
    }
}

/// Itinerary point stored inside the tours.locations JSONB column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
    #[serde(rename = "type")]
    pub location_type: Option<String>,
    pub coordinates: Vec<f64>,
    pub address: Option<String>,
    pub description: Option<String>,
    pub day: Option<i32>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTourRequest {
    #[validate(length(min = 2, max = 40, message = "Name must be between 2 and 40 characters"))]
    pub name: String,
    #[validate(range(min = 1, message = "Duration must be positive"))]
    pub duration: i32,
    #[validate(range(min = 1, message = "Group size must be positive"))]
    pub max_group_size: i32,
    #[validate(range(min = 1.0, max = 5.0, message = "Rating must be between 1 and 5"))]
    pub rating: Option<f64>,
    #[validate(range(min = 0, message = "Ratings quantity cannot be negative"))]
    pub ratings_quantity: Option<i32>,
    #[validate(range(exclusive_min = 0.0, message = "Price must be positive"))]
    pub price: f64,
    pub price_discount: Option<f64>,
    #[validate(length(min = 1, message = "Summary is too short"))]
    pub summary: String,
    #[validate(length(min = 1, message = "Description is required"))]
    pub description: String,
    #[validate(length(min = 1, message = "Image cover is required"))]
    pub image_cover: String,
    pub images: Option<Vec<String>>,
    pub start_dates: Option<Vec<NaiveDate>>,
    pub slug: Option<String>,
    pub difficulty: Difficulty,
    pub secret_tour: Option<bool>,
    pub start_location_type: Option<String>,
    pub start_location_coordinates: Option<Vec<f64>>,
    pub start_location_address: Option<String>,
    pub start_location_description: Option<String>,
    pub locations: Option<Vec<Location>>,
    pub guides: Option<Vec<i32>>,
}

impl CreateTourRequest {
    /// Cross-field rule the derive cannot express.
    pub fn discount_error(&self) -> Option<&'static str> {
        match self.price_discount {
            Some(discount) if discount >= self.price => {
                Some("Discount price must be lower than the price")
            }
            _ => None,
        }
    }
}

impl ColumnValues for CreateTourRequest {
    fn column_values(&self) -> Vec<(&'static str, BindValue)> {
        let mut columns = vec![
            ("name", BindValue::Text(self.name.clone())),
            ("duration", BindValue::Int(self.duration.into())),
            ("max_group_size", BindValue::Int(self.max_group_size.into())),
            ("price", BindValue::Float(self.price)),
            ("summary", BindValue::Text(self.summary.clone())),
            ("description", BindValue::Text(self.description.clone())),
            ("image_cover", BindValue::Text(self.image_cover.clone())),
            (
                "difficulty",
                BindValue::Text(self.difficulty.as_str().to_string()),
            ),
        ];
        if let Some(rating) = self.rating {
            columns.push(("rating", BindValue::Float(rating)));
        }
        if let Some(quantity) = self.ratings_quantity {
            columns.push(("ratings_quantity", BindValue::Int(quantity.into())));
        }
        if let Some(discount) = self.price_discount {
            columns.push(("price_discount", BindValue::Float(discount)));
        }
        if let Some(images) = &self.images {
            columns.push(("images", BindValue::TextArray(images.clone())));
        }
        if let Some(dates) = &self.start_dates {
            columns.push(("start_dates", BindValue::DateArray(dates.clone())));
        }
        if let Some(slug) = &self.slug {
            columns.push(("slug", BindValue::Text(slug.clone())));
        }
        if let Some(secret) = self.secret_tour {
            columns.push(("secret_tour", BindValue::Bool(secret)));
        }
        if let Some(kind) = &self.start_location_type {
            columns.push(("start_location_type", BindValue::Text(kind.clone())));
        }
        if let Some(coordinates) = &self.start_location_coordinates {
            columns.push((
                "start_location_coordinates",
                BindValue::FloatArray(coordinates.clone()),
            ));
        }
        if let Some(address) = &self.start_location_address {
            columns.push(("start_location_address", BindValue::Text(address.clone())));
        }
        if let Some(description) = &self.start_location_description {
            columns.push((
                "start_location_description",
                BindValue::Text(description.clone()),
            ));
        }
        if let Some(locations) = &self.locations {
            // JSONB column: the structured payload is serialized, not bound
            // as an array.
            if let Ok(json) = serde_json::to_value(locations) {
                columns.push(("locations", BindValue::Json(json)));
            }
        }
        if let Some(guides) = &self.guides {
            columns.push(("guides", BindValue::IntArray(guides.clone())));
        }
        columns
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateTourRequest {
    #[validate(length(min = 2, max = 40, message = "Name must be between 2 and 40 characters"))]
    pub name: Option<String>,
    #[validate(range(min = 1.0, max = 5.0, message = "Rating must be between 1 and 5"))]
    pub rating: Option<f64>,
    #[validate(range(exclusive_min = 0.0, message = "Price must be positive"))]
    pub price: Option<f64>,
    pub difficulty: Option<Difficulty>,
}

impl ColumnValues for UpdateTourRequest {
    fn column_values(&self) -> Vec<(&'static str, BindValue)> {
        let mut columns = Vec::new();
        if let Some(name) = &self.name {
            columns.push(("name", BindValue::Text(name.clone())));
        }
        if let Some(rating) = self.rating {
            columns.push(("rating", BindValue::Float(rating)));
        }
        if let Some(price) = self.price {
            columns.push(("price", BindValue::Float(price)));
        }
        if let Some(difficulty) = &self.difficulty {
            columns.push(("difficulty", BindValue::Text(difficulty.as_str().to_string())));
        }
        columns
    }
}
