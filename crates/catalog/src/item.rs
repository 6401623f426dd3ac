use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use orgdesk_core::{FieldErrors, ItemId};
use orgdesk_crud::Row;

/// Item status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    #[default]
    Active,
    Inactive,
}

impl ItemStatus {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "active" => Some(Self::Active),
            "inactive" => Some(Self::Inactive),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
        }
    }
}

/// Generic catalog record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    pub status: ItemStatus,
    pub created_at: DateTime<Utc>,
}

impl Item {
    pub fn new(input: ItemInput, now: DateTime<Utc>) -> Self {
        Self {
            id: ItemId::new(),
            name: input.name,
            status: input.status,
            created_at: now,
        }
    }

    pub fn apply(&mut self, input: ItemInput) {
        self.name = input.name;
        self.status = input.status;
    }

    /// Listing representation.
    pub fn to_row(&self) -> Row {
        Row::new(self.id)
            .with("name", self.name.clone())
            .with("status", self.status.as_str())
            .with("created_at", self.created_at)
    }
}

/// Submitted create/edit form.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ItemForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub status: String,
}

/// A validated [`ItemForm`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemInput {
    pub name: String,
    pub status: ItemStatus,
}

impl ItemForm {
    pub const MAX_NAME: usize = 160;

    pub fn validate(&self) -> Result<ItemInput, FieldErrors> {
        let mut errors = FieldErrors::new();

        let name = self.name.trim().to_string();
        if name.is_empty() {
            errors.add("name", "this field is required");
        } else if name.chars().count() > Self::MAX_NAME {
            errors.add(
                "name",
                format!("ensure this value has at most {} characters", Self::MAX_NAME),
            );
        }

        let status = if self.status.trim().is_empty() {
            Some(ItemStatus::default())
        } else {
            ItemStatus::parse(&self.status)
        };
        if status.is_none() {
            errors.add("status", "select a valid choice");
        }

        errors.finish(|| ItemInput {
            name,
            status: status.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn form_trims_and_defaults_status() {
        let input = ItemForm {
            name: "  Widget ".into(),
            status: String::new(),
        }
        .validate()
        .unwrap();
        assert_eq!(input.name, "Widget");
        assert_eq!(input.status, ItemStatus::Active);
    }

    #[test]
    fn form_reports_every_bad_field() {
        let errors = ItemForm {
            name: "   ".into(),
            status: "archived".into(),
        }
        .validate()
        .unwrap_err();
        assert!(errors.get("name").is_some());
        assert!(errors.get("status").is_some());
    }

    #[test]
    fn overlong_names_are_rejected() {
        let errors = ItemForm {
            name: "x".repeat(ItemForm::MAX_NAME + 1),
            status: "inactive".into(),
        }
        .validate()
        .unwrap_err();
        assert_eq!(errors.fields().collect::<Vec<_>>(), vec!["name"]);
    }

    #[test]
    fn rows_expose_listing_fields() {
        let now = Utc::now();
        let item = Item::new(
            ItemInput {
                name: "Widget".into(),
                status: ItemStatus::Inactive,
            },
            now,
        );
        let row = item.to_row();
        assert_eq!(row.text("status"), "inactive");
        assert_eq!(row.get("created_at"), &orgdesk_crud::Value::Timestamp(now));
    }
}
