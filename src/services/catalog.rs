use crate::{
    entities::{product, Category, Product, ProductModel},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Product catalog service: CRUD over products plus the stock decrement
/// primitive consumed by payment reconciliation.
#[derive(Clone)]
pub struct CatalogService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl CatalogService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Create a product. (name, category) pairs are unique.
    #[instrument(skip(self))]
    pub async fn create_product(
        &self,
        input: CreateProductInput,
    ) -> Result<ProductModel, ServiceError> {
        Category::find_by_id(input.category_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Category not found".to_string()))?;

        let existing = Product::find()
            .filter(product::Column::Name.eq(input.name.clone()))
            .filter(product::Column::CategoryId.eq(input.category_id))
            .one(&*self.db)
            .await?;
        if existing.is_some() {
            return Err(ServiceError::Conflict(
                "Product already exists!".to_string(),
            ));
        }

        let product_id = Uuid::new_v4();
        let now = Utc::now();

        let product = product::ActiveModel {
            id: Set(product_id),
            name: Set(input.name),
            description: Set(input.description),
            price: Set(input.price),
            currency: Set(input.currency),
            image: Set(input.image),
            sizes: Set(input.sizes),
            colors: Set(input.colors),
            default_size: Set(input.default_size),
            default_color: Set(input.default_color),
            quantity: Set(input.quantity.unwrap_or(0)),
            category_id: Set(input.category_id),
            subcategory: Set(input.subcategory),
            tags: Set(input.tags),
            best_selling: Set(input.best_selling.unwrap_or(false)),
            new_arrival: Set(input.new_arrival.unwrap_or(false)),
            rating: Set(input.rating),
            discount: Set(input.discount),
            old_price: Set(input.old_price),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let product = product.insert(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::ProductCreated(product_id))
            .await;

        info!("Created product: {}", product_id);
        Ok(product)
    }

    /// List products newest-first with the owning category name joined.
    pub async fn list_products(
        &self,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<ProductWithCategory>, u64), ServiceError> {
        let paginator = Product::find()
            .find_also_related(Category)
            .order_by_desc(product::Column::CreatedAt)
            .paginate(&*self.db, limit);

        let total = paginator.num_items().await?;
        let rows = paginator.fetch_page(page.saturating_sub(1)).await?;

        let items = rows
            .into_iter()
            .map(|(product, category)| ProductWithCategory {
                category: category.map(|c| c.name),
                product,
            })
            .collect();

        Ok((items, total))
    }

    pub async fn get_product(&self, product_id: Uuid) -> Result<ProductModel, ServiceError> {
        Product::find_by_id(product_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Product not found!".to_string()))
    }

    /// Patch a product; only supplied fields are written.
    #[instrument(skip(self))]
    pub async fn update_product(
        &self,
        product_id: Uuid,
        input: UpdateProductInput,
    ) -> Result<ProductModel, ServiceError> {
        let product = self.get_product(product_id).await?;
        let mut active: product::ActiveModel = product.into();

        if let Some(name) = input.name {
            active.name = Set(name);
        }
        if let Some(description) = input.description {
            active.description = Set(description);
        }
        if let Some(price) = input.price {
            active.price = Set(price);
        }
        if let Some(currency) = input.currency {
            active.currency = Set(currency);
        }
        if let Some(image) = input.image {
            active.image = Set(Some(image));
        }
        if let Some(sizes) = input.sizes {
            active.sizes = Set(Some(sizes));
        }
        if let Some(colors) = input.colors {
            active.colors = Set(Some(colors));
        }
        if let Some(default_size) = input.default_size {
            active.default_size = Set(Some(default_size));
        }
        if let Some(default_color) = input.default_color {
            active.default_color = Set(Some(default_color));
        }
        if let Some(quantity) = input.quantity {
            active.quantity = Set(quantity);
        }
        if let Some(category_id) = input.category_id {
            active.category_id = Set(category_id);
        }
        if let Some(subcategory) = input.subcategory {
            active.subcategory = Set(Some(subcategory));
        }
        if let Some(tags) = input.tags {
            active.tags = Set(Some(tags));
        }
        if let Some(best_selling) = input.best_selling {
            active.best_selling = Set(best_selling);
        }
        if let Some(new_arrival) = input.new_arrival {
            active.new_arrival = Set(new_arrival);
        }
        if let Some(rating) = input.rating {
            active.rating = Set(Some(rating));
        }
        if let Some(discount) = input.discount {
            active.discount = Set(Some(discount));
        }
        if let Some(old_price) = input.old_price {
            active.old_price = Set(Some(old_price));
        }

        active.updated_at = Set(Utc::now());

        let product = active.update(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::ProductUpdated(product_id))
            .await;

        info!("Updated product: {}", product_id);
        Ok(product)
    }

    #[instrument(skip(self))]
    pub async fn delete_product(&self, product_id: Uuid) -> Result<(), ServiceError> {
        let product = self.get_product(product_id).await?;
        product.delete(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::ProductDeleted(product_id))
            .await;

        info!("Deleted product: {}", product_id);
        Ok(())
    }

    /// Decrement a product's stock counter, clamping at zero.
    ///
    /// The happy path is a single conditional UPDATE that only fires while
    /// enough stock remains, so concurrent decrements cannot drive the
    /// counter negative. When the condition does not match, the stock is
    /// clamped to zero and the oversell is logged; stock bookkeeping is
    /// best-effort accounting, and the caller decides whether that is fatal.
    #[instrument(skip(self))]
    pub async fn decrement_stock(
        &self,
        product_id: Uuid,
        amount: i32,
    ) -> Result<(), ServiceError> {
        if amount <= 0 {
            return Err(ServiceError::ValidationError(
                "Decrement amount must be positive".to_string(),
            ));
        }

        let decremented = Product::update_many()
            .col_expr(
                product::Column::Quantity,
                Expr::col(product::Column::Quantity).sub(amount),
            )
            .filter(product::Column::Id.eq(product_id))
            .filter(product::Column::Quantity.gte(amount))
            .exec(&*self.db)
            .await?;

        if decremented.rows_affected == 0 {
            let clamped = Product::update_many()
                .col_expr(product::Column::Quantity, Expr::value(0))
                .filter(product::Column::Id.eq(product_id))
                .filter(product::Column::Quantity.lt(amount))
                .exec(&*self.db)
                .await?;

            if clamped.rows_affected == 0 {
                return Err(ServiceError::NotFound("Product not found".to_string()));
            }

            warn!(
                "Oversell on product {}: requested decrement of {} exceeded stock, clamped to zero",
                product_id, amount
            );
        }

        Ok(())
    }
}

/// Input for creating a product
#[derive(Debug, Deserialize)]
pub struct CreateProductInput {
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub currency: String,
    pub category_id: Uuid,
    pub image: Option<String>,
    pub sizes: Option<serde_json::Value>,
    pub colors: Option<serde_json::Value>,
    pub default_size: Option<String>,
    pub default_color: Option<String>,
    pub quantity: Option<i32>,
    pub subcategory: Option<String>,
    pub tags: Option<serde_json::Value>,
    pub best_selling: Option<bool>,
    pub new_arrival: Option<bool>,
    pub rating: Option<Decimal>,
    pub discount: Option<Decimal>,
    pub old_price: Option<Decimal>,
}

/// Per-field patch for a product; omitted fields are left untouched
#[derive(Debug, Default, Deserialize)]
pub struct UpdateProductInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub currency: Option<String>,
    pub category_id: Option<Uuid>,
    pub image: Option<String>,
    pub sizes: Option<serde_json::Value>,
    pub colors: Option<serde_json::Value>,
    pub default_size: Option<String>,
    pub default_color: Option<String>,
    pub quantity: Option<i32>,
    pub subcategory: Option<String>,
    pub tags: Option<serde_json::Value>,
    pub best_selling: Option<bool>,
    pub new_arrival: Option<bool>,
    pub rating: Option<Decimal>,
    pub discount: Option<Decimal>,
    pub old_price: Option<Decimal>,
}

/// Product with the owning category's name flattened in
#[derive(Debug, Serialize)]
pub struct ProductWithCategory {
    #[serde(flatten)]
    pub product: ProductModel,
    pub category: Option<String>,
}
