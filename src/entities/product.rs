use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Catalog product entity.
///
/// `quantity` is the stock counter; it never goes below zero. Decrements
/// during payment reconciliation clamp at zero rather than underflow.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub price: Decimal,
    pub currency: String,
    #[sea_orm(nullable)]
    pub image: Option<String>,
    #[sea_orm(column_type = "Json", nullable)]
    pub sizes: Option<Json>,
    #[sea_orm(column_type = "Json", nullable)]
    pub colors: Option<Json>,
    #[sea_orm(nullable)]
    pub default_size: Option<String>,
    #[sea_orm(nullable)]
    pub default_color: Option<String>,
    pub quantity: i32,
    pub category_id: Uuid,
    #[sea_orm(nullable)]
    pub subcategory: Option<String>,
    #[sea_orm(column_type = "Json", nullable)]
    pub tags: Option<Json>,
    pub best_selling: bool,
    pub new_arrival: bool,
    #[sea_orm(column_type = "Decimal(Some((3, 2)))", nullable)]
    pub rating: Option<Decimal>,
    #[sea_orm(column_type = "Decimal(Some((5, 2)))", nullable)]
    pub discount: Option<Decimal>,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))", nullable)]
    pub old_price: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::category::Entity",
        from = "Column::CategoryId",
        to = "super::category::Column::Id"
    )]
    Category,
    #[sea_orm(has_many = "super::cart_item::Entity")]
    CartItems,
    #[sea_orm(has_many = "super::review::Entity")]
    Reviews,
    #[sea_orm(has_many = "super::wishlist_item::Entity")]
    WishlistItems,
}

impl Related<super::category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl Related<super::cart_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CartItems.def()
    }
}

impl Related<super::review::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Reviews.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
