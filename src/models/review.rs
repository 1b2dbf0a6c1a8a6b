use serde::Deserialize;
use validator::Validate;

use crate::crud::ColumnValues;
use crate::query::BindValue;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateReviewRequest {
    #[validate(length(min = 1, message = "Review text is required"))]
    pub review: String,
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rating: Option<i32>,
    pub tour_id: Option<i32>,
    pub user_id: Option<i32>,
}

impl CreateReviewRequest {
    /// Body values win over route context; the author always defaults to the
    /// logged-in user.
    pub fn column_values_with(
        &self,
        path_tour_id: Option<i64>,
        current_user_id: i32,
    ) -> Vec<(&'static str, BindValue)> {
        let mut columns = vec![("review", BindValue::Text(self.review.clone()))];
        if let Some(rating) = self.rating {
            columns.push(("rating", BindValue::Int(rating.into())));
        }
        if let Some(tour_id) = self.tour_id.map(i64::from).or(path_tour_id) {
            columns.push(("tour_id", BindValue::Int(tour_id)));
        }
        let user_id = self.user_id.map(i64::from).unwrap_or(current_user_id.into());
        columns.push(("user_id", BindValue::Int(user_id)));
        columns
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateReviewRequest {
    #[validate(length(min = 1, message = "Review text is required"))]
    pub review: Option<String>,
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rating: Option<i32>,
}

impl ColumnValues for UpdateReviewRequest {
    fn column_values(&self) -> Vec<(&'static str, BindValue)> {
        let mut columns = Vec::new();
        if let Some(review) = &self.review {
            columns.push(("review", BindValue::Text(review.clone())));
        }
        if let Some(rating) = self.rating {
            columns.push(("rating", BindValue::Int(rating.into())));
        }
        columns
    }
}
