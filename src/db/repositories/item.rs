use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, DatabaseConnection, EntityTrait, QueryOrder, QuerySelect, Set,
};

use crate::entities::items;

#[derive(Debug, Clone)]
pub struct Item {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub price: f64,
    pub owner_id: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<items::Model> for Item {
    fn from(model: items::Model) -> Self {
        Self {
            id: model.id,
            title: model.title,
            description: model.description,
            price: model.price,
            owner_id: model.owner_id,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Optional field updates applied by [`ItemRepository::update`].
#[derive(Debug, Default, Clone)]
pub struct ItemChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
}

pub struct ItemRepository {
    conn: DatabaseConnection,
}

impl ItemRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn create(
        &self,
        title: &str,
        description: Option<&str>,
        price: f64,
        owner_id: &str,
    ) -> Result<Item> {
        let now = chrono::Utc::now().to_rfc3339();

        let active_model = items::ActiveModel {
            id: Set(uuid::Uuid::new_v4().to_string()),
            title: Set(title.to_string()),
            description: Set(description.map(str::to_string)),
            price: Set(price),
            owner_id: Set(owner_id.to_string()),
            created_at: Set(now.clone()),
            updated_at: Set(now),
        };

        let model = active_model
            .insert(&self.conn)
            .await
            .context("Failed to insert item")?;

        Ok(Item::from(model))
    }

    pub async fn get(&self, id: &str) -> Result<Option<Item>> {
        let item = items::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query item")?;

        Ok(item.map(Item::from))
    }

    pub async fn list(&self, skip: u64, limit: u64) -> Result<Vec<Item>> {
        let rows = items::Entity::find()
            .order_by_asc(items::Column::CreatedAt)
            .offset(skip)
            .limit(limit)
            .all(&self.conn)
            .await
            .context("Failed to list items")?;

        Ok(rows.into_iter().map(Item::from).collect())
    }

    pub async fn update(&self, id: &str, changes: ItemChanges) -> Result<Option<Item>> {
        let Some(item) = items::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query item for update")?
        else {
            return Ok(None);
        };

        let mut active: items::ActiveModel = item.into();

        if let Some(title) = changes.title {
            active.title = Set(title);
        }
        if let Some(description) = changes.description {
            active.description = Set(Some(description));
        }
        if let Some(price) = changes.price {
            active.price = Set(price);
        }

        active.updated_at = Set(chrono::Utc::now().to_rfc3339());

        let model = active
            .update(&self.conn)
            .await
            .context("Failed to update item")?;

        Ok(Some(Item::from(model)))
    }

    pub async fn delete(&self, id: &str) -> Result<bool> {
        let result = items::Entity::delete_by_id(id)
            .exec(&self.conn)
            .await
            .context("Failed to delete item")?;

        Ok(result.rows_affected > 0)
    }
}
