use crate::{
    entities::{
        category, subcategory, tag, Category, CategoryModel, Subcategory, SubcategoryModel, Tag,
        TagModel,
    },
    errors::ServiceError,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, QueryFilter, Set,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Categories, subcategories and tags. Plain CRUD with uniqueness checks;
/// no events, nothing downstream reacts to taxonomy edits.
#[derive(Clone)]
pub struct TaxonomyService {
    db: Arc<DatabaseConnection>,
}

impl TaxonomyService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    // Categories

    #[instrument(skip(self))]
    pub async fn create_category(
        &self,
        name: String,
        image: Option<String>,
    ) -> Result<CategoryModel, ServiceError> {
        let existing = Category::find()
            .filter(category::Column::Name.eq(name.clone()))
            .one(&*self.db)
            .await?;
        if existing.is_some() {
            return Err(ServiceError::Conflict(
                "Category already exists!".to_string(),
            ));
        }

        let now = Utc::now();
        let created = category::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name),
            image: Set(image),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await?;

        info!("Created category: {}", created.id);
        Ok(created)
    }

    pub async fn list_categories(&self) -> Result<Vec<CategoryModel>, ServiceError> {
        Ok(Category::find().all(&*self.db).await?)
    }

    /// Fetch a category by name with its subcategories.
    pub async fn get_category_by_name(
        &self,
        name: &str,
    ) -> Result<CategoryWithSubcategories, ServiceError> {
        let cat = Category::find()
            .filter(category::Column::Name.eq(name))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Category not found!".to_string()))?;

        let subcategories = cat.find_related(Subcategory).all(&*self.db).await?;

        Ok(CategoryWithSubcategories {
            category: cat,
            subcategories,
        })
    }

    #[instrument(skip(self))]
    pub async fn update_category(
        &self,
        id: Uuid,
        name: Option<String>,
        image: Option<String>,
    ) -> Result<CategoryModel, ServiceError> {
        let cat = Category::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Category not found!".to_string()))?;

        let mut active: category::ActiveModel = cat.into();
        if let Some(name) = name {
            active.name = Set(name);
        }
        if let Some(image) = image {
            active.image = Set(Some(image));
        }
        active.updated_at = Set(Utc::now());

        Ok(active.update(&*self.db).await?)
    }

    #[instrument(skip(self))]
    pub async fn delete_category(&self, id: Uuid) -> Result<(), ServiceError> {
        let cat = Category::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Category not found!".to_string()))?;
        cat.delete(&*self.db).await?;
        Ok(())
    }

    // Subcategories

    #[instrument(skip(self))]
    pub async fn create_subcategory(
        &self,
        name: String,
        category_id: Uuid,
    ) -> Result<SubcategoryModel, ServiceError> {
        Category::find_by_id(category_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Category not found!".to_string()))?;

        let existing = Subcategory::find()
            .filter(subcategory::Column::Name.eq(name.clone()))
            .filter(subcategory::Column::CategoryId.eq(category_id))
            .one(&*self.db)
            .await?;
        if existing.is_some() {
            return Err(ServiceError::Conflict(
                "Subcategory already exists in this category!".to_string(),
            ));
        }

        let created = subcategory::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name),
            category_id: Set(category_id),
            created_at: Set(Utc::now()),
        }
        .insert(&*self.db)
        .await?;

        Ok(created)
    }

    pub async fn list_subcategories(&self) -> Result<Vec<SubcategoryWithCategory>, ServiceError> {
        let rows = Subcategory::find()
            .find_also_related(Category)
            .all(&*self.db)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(subcategory, category)| SubcategoryWithCategory {
                subcategory,
                category,
            })
            .collect())
    }

    #[instrument(skip(self))]
    pub async fn delete_subcategory(&self, id: Uuid) -> Result<(), ServiceError> {
        let sub = Subcategory::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Subcategory not found!".to_string()))?;
        sub.delete(&*self.db).await?;
        Ok(())
    }

    // Tags

    #[instrument(skip(self))]
    pub async fn create_tag(&self, name: String) -> Result<TagModel, ServiceError> {
        let existing = Tag::find()
            .filter(tag::Column::Name.eq(name.clone()))
            .one(&*self.db)
            .await?;
        if existing.is_some() {
            return Err(ServiceError::Conflict("Tag already exists!".to_string()));
        }

        let created = tag::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name),
            created_at: Set(Utc::now()),
        }
        .insert(&*self.db)
        .await?;

        Ok(created)
    }

    pub async fn list_tags(&self) -> Result<Vec<TagModel>, ServiceError> {
        Ok(Tag::find().all(&*self.db).await?)
    }

    #[instrument(skip(self))]
    pub async fn delete_tag(&self, id: Uuid) -> Result<(), ServiceError> {
        let tag = Tag::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Tag not found!".to_string()))?;
        tag.delete(&*self.db).await?;
        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub struct CategoryWithSubcategories {
    #[serde(flatten)]
    pub category: CategoryModel,
    pub subcategories: Vec<SubcategoryModel>,
}

#[derive(Debug, Serialize)]
pub struct SubcategoryWithCategory {
    #[serde(flatten)]
    pub subcategory: SubcategoryModel,
    pub category: Option<CategoryModel>,
}
