use std::sync::Arc;

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::instrument;

use orgdesk_catalog::{Item, ItemStatus, ItemStore};
use orgdesk_core::{ItemId, StoreError, StoreResult};

use super::map_sqlx_error;

pub struct PgItemStore {
    pool: Arc<PgPool>,
}

impl PgItemStore {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

fn item_from_row(row: &PgRow) -> Result<Item, sqlx::Error> {
    let status: String = row.try_get("status")?;
    let status = ItemStatus::parse(&status).ok_or_else(|| sqlx::Error::ColumnDecode {
        index: "status".into(),
        source: format!("unknown item status '{status}'").into(),
    })?;
    Ok(Item {
        id: ItemId::from_uuid(row.try_get("id")?),
        name: row.try_get("name")?,
        status,
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait]
impl ItemStore for PgItemStore {
    #[instrument(skip(self, item), fields(item_id = %item.id), err)]
    async fn create(&self, item: Item) -> StoreResult<()> {
        sqlx::query("INSERT INTO items (id, name, status, created_at) VALUES ($1, $2, $3, $4)")
            .bind(item.id.as_uuid())
            .bind(&item.name)
            .bind(item.status.as_str())
            .bind(item.created_at)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("create_item", e))?;
        Ok(())
    }

    #[instrument(skip(self), fields(item_id = %id), err)]
    async fn get(&self, id: ItemId) -> StoreResult<Item> {
        let row = sqlx::query("SELECT id, name, status, created_at FROM items WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_item", e))?
            .ok_or(StoreError::NotFound("item"))?;
        item_from_row(&row).map_err(|e| map_sqlx_error("get_item", e))
    }

    #[instrument(skip(self, item), fields(item_id = %item.id), err)]
    async fn update(&self, item: Item) -> StoreResult<()> {
        let result = sqlx::query("UPDATE items SET name = $2, status = $3 WHERE id = $1")
            .bind(item.id.as_uuid())
            .bind(&item.name)
            .bind(item.status.as_str())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("update_item", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("item"));
        }
        Ok(())
    }

    #[instrument(skip(self), fields(item_id = %id), err)]
    async fn delete(&self, id: ItemId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM items WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_item", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("item"));
        }
        Ok(())
    }
}
