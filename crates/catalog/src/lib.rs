//! `orgdesk-catalog`: generic catalog items.
//!
//! The item entity, its form validation, the persistence port and the
//! `catalog.items` listing descriptor.

pub mod descriptor;
pub mod item;
pub mod service;
pub mod store;

pub use descriptor::{ITEMS_SLUG, items_config};
pub use item::{Item, ItemForm, ItemInput, ItemStatus};
pub use service::{ItemError, create_item, delete_item, update_item};
pub use store::ItemStore;
