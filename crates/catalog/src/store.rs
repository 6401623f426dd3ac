use async_trait::async_trait;

use orgdesk_core::{ItemId, StoreResult};

use crate::Item;

/// Item persistence port.
#[async_trait]
pub trait ItemStore: Send + Sync {
    async fn create(&self, item: Item) -> StoreResult<()>;

    /// `StoreError::NotFound` when absent.
    async fn get(&self, id: ItemId) -> StoreResult<Item>;

    async fn update(&self, item: Item) -> StoreResult<()>;

    async fn delete(&self, id: ItemId) -> StoreResult<()>;
}
