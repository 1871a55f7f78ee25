use crate::{
    entities::{wishlist_item, Product, ProductModel, User, WishlistItem},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, QueryFilter, Set,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

/// Wishlist with toggle semantics: adding a product already on the list
/// removes it instead.
#[derive(Clone)]
pub struct WishlistService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl WishlistService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    #[instrument(skip(self))]
    pub async fn toggle(
        &self,
        user_id: Uuid,
        product_id: Uuid,
    ) -> Result<WishlistToggle, ServiceError> {
        User::find_by_id(user_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("User not found".to_string()))?;

        Product::find_by_id(product_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Product not found".to_string()))?;

        let existing = WishlistItem::find()
            .filter(wishlist_item::Column::UserId.eq(user_id))
            .filter(wishlist_item::Column::ProductId.eq(product_id))
            .one(&*self.db)
            .await?;

        let action = match existing {
            Some(item) => {
                item.delete(&*self.db).await?;
                WishlistToggle::Removed
            }
            None => {
                wishlist_item::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    user_id: Set(user_id),
                    product_id: Set(product_id),
                    created_at: Set(Utc::now()),
                }
                .insert(&*self.db)
                .await?;
                WishlistToggle::Added
            }
        };

        self.event_sender
            .send_or_log(Event::WishlistToggled {
                user_id,
                product_id,
                added: matches!(action, WishlistToggle::Added),
            })
            .await;

        Ok(action)
    }

    /// The user's wishlist as full product records.
    pub async fn get(&self, user_id: Uuid) -> Result<Vec<ProductModel>, ServiceError> {
        let rows = WishlistItem::find()
            .filter(wishlist_item::Column::UserId.eq(user_id))
            .find_also_related(Product)
            .all(&*self.db)
            .await?;

        Ok(rows.into_iter().filter_map(|(_, product)| product).collect())
    }
}

/// Which way a toggle resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WishlistToggle {
    Added,
    Removed,
}
