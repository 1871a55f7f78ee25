use crate::{
    entities::{review, Product, Review, ReviewModel, User},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

/// Product reviews left by authenticated users.
#[derive(Clone)]
pub struct ReviewService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl ReviewService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    #[instrument(skip(self))]
    pub async fn create_review(
        &self,
        user_id: Uuid,
        input: CreateReviewInput,
    ) -> Result<ReviewWithAuthor, ServiceError> {
        if !(1..=5).contains(&input.rating) {
            return Err(ServiceError::ValidationError(
                "Rating must be between 1 and 5".to_string(),
            ));
        }

        Product::find_by_id(input.product_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Product not found".to_string()))?;

        let user = User::find_by_id(user_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("User not found".to_string()))?;

        let created = review::ActiveModel {
            id: Set(Uuid::new_v4()),
            product_id: Set(input.product_id),
            user_id: Set(user_id),
            rating: Set(input.rating),
            comment: Set(input.comment.unwrap_or_default()),
            created_at: Set(Utc::now()),
        }
        .insert(&*self.db)
        .await?;

        self.event_sender
            .send_or_log(Event::ReviewCreated {
                product_id: input.product_id,
                review_id: created.id,
            })
            .await;

        Ok(ReviewWithAuthor {
            first_name: user.first_name,
            last_name: user.last_name,
            review: created,
        })
    }

    /// Reviews for a product, newest-first, with reviewer names joined.
    pub async fn list_for_product(
        &self,
        product_id: Uuid,
    ) -> Result<Vec<ReviewWithAuthor>, ServiceError> {
        let rows = Review::find()
            .filter(review::Column::ProductId.eq(product_id))
            .order_by_desc(review::Column::CreatedAt)
            .find_also_related(User)
            .all(&*self.db)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(review, user)| {
                let (first_name, last_name) = user
                    .map(|u| (u.first_name, u.last_name))
                    .unwrap_or_default();
                ReviewWithAuthor {
                    review,
                    first_name,
                    last_name,
                }
            })
            .collect())
    }
}

/// Input for creating a review
#[derive(Debug, Deserialize)]
pub struct CreateReviewInput {
    pub product_id: Uuid,
    pub rating: i32,
    pub comment: Option<String>,
}

/// Review with the author's name joined
#[derive(Debug, Serialize)]
pub struct ReviewWithAuthor {
    #[serde(flatten)]
    pub review: ReviewModel,
    pub first_name: String,
    pub last_name: String,
}
