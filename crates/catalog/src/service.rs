//! Item mutations, gated by the listing's create/edit/delete permissions.

use chrono::{DateTime, Utc};
use thiserror::Error;

use orgdesk_core::{FieldErrors, ItemId, StoreError};
use orgdesk_crud::{CrudConfig, CrudError, RequestContext};

use crate::{Item, ItemForm, ItemStore};

#[derive(Debug, Error)]
pub enum ItemError {
    #[error(transparent)]
    Denied(#[from] CrudError),

    #[error(transparent)]
    Invalid(#[from] FieldErrors),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub async fn create_item(
    config: &CrudConfig,
    store: &dyn ItemStore,
    ctx: &RequestContext,
    form: &ItemForm,
    now: DateTime<Utc>,
) -> Result<Item, ItemError> {
    config.permissions.create.check(ctx)?;
    let input = form.validate()?;

    let item = Item::new(input, now);
    store.create(item.clone()).await?;
    tracing::info!(item_id = %item.id, "item created");
    Ok(item)
}

pub async fn update_item(
    config: &CrudConfig,
    store: &dyn ItemStore,
    ctx: &RequestContext,
    id: ItemId,
    form: &ItemForm,
) -> Result<Item, ItemError> {
    config.permissions.edit.check(ctx)?;
    let input = form.validate()?;

    let mut item = store.get(id).await?;
    item.apply(input);
    store.update(item.clone()).await?;
    tracing::info!(item_id = %id, "item updated");
    Ok(item)
}

pub async fn delete_item(
    config: &CrudConfig,
    store: &dyn ItemStore,
    ctx: &RequestContext,
    id: ItemId,
) -> Result<(), ItemError> {
    config.permissions.delete.check(ctx)?;
    store.delete(id).await?;
    tracing::info!(item_id = %id, "item deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use orgdesk_auth::{Principal, Role};
    use orgdesk_core::{StoreResult, UserId};

    use super::*;
    use crate::items_config;

    #[derive(Default)]
    struct Items(Mutex<HashMap<ItemId, Item>>);

    #[async_trait]
    impl ItemStore for Items {
        async fn create(&self, item: Item) -> StoreResult<()> {
            self.0.lock().unwrap().insert(item.id, item);
            Ok(())
        }

        async fn get(&self, id: ItemId) -> StoreResult<Item> {
            self.0.lock().unwrap().get(&id).cloned().ok_or(StoreError::NotFound("item"))
        }

        async fn update(&self, item: Item) -> StoreResult<()> {
            self.0.lock().unwrap().insert(item.id, item);
            Ok(())
        }

        async fn delete(&self, id: ItemId) -> StoreResult<()> {
            self.0.lock().unwrap().remove(&id).map(|_| ()).ok_or(StoreError::NotFound("item"))
        }
    }

    fn ctx(roles: Vec<Role>) -> RequestContext {
        RequestContext::for_principal(Principal::new(UserId::new(), roles))
    }

    fn form(name: &str) -> ItemForm {
        ItemForm {
            name: name.into(),
            status: "active".into(),
        }
    }

    #[tokio::test]
    async fn staff_can_create_edit_and_delete() {
        let config = items_config().unwrap();
        let store = Items::default();
        let staff = ctx(vec![Role::STAFF]);

        let item = create_item(&config, &store, &staff, &form("Widget"), Utc::now())
            .await
            .unwrap();
        let updated = update_item(&config, &store, &staff, item.id, &form("Gadget"))
            .await
            .unwrap();
        assert_eq!(updated.name, "Gadget");

        delete_item(&config, &store, &staff, item.id).await.unwrap();
        assert!(matches!(
            store.get(item.id).await,
            Err(StoreError::NotFound("item"))
        ));
    }

    #[tokio::test]
    async fn plain_users_may_not_create() {
        let config = items_config().unwrap();
        let err = create_item(&config, &Items::default(), &ctx(vec![]), &form("x"), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, ItemError::Denied(CrudError::Forbidden(_))));
    }

    #[tokio::test]
    async fn invalid_forms_do_not_touch_the_store() {
        let config = items_config().unwrap();
        let store = Items::default();
        let err = create_item(&config, &store, &ctx(vec![Role::STAFF]), &form(""), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, ItemError::Invalid(_)));
        assert!(store.0.lock().unwrap().is_empty());
    }
}
