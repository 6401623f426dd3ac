//! Field-scoped validation errors for submitted forms.

use std::collections::BTreeMap;

use serde::Serialize;
use thiserror::Error;

use crate::DomainError;

/// Field name → messages. Non-empty whenever it is returned as an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Error)]
#[serde(transparent)]
#[error("{} field(s) failed validation", .0.len())]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    /// Keep `value` when `result` is ok, otherwise record the error and return `None`.
    pub fn check<T>(&mut self, field: &'static str, result: Result<T, DomainError>) -> Option<T> {
        match result {
            Ok(v) => Some(v),
            Err(e) => {
                self.add(field, e.message());
                None
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// `Ok(value)` when nothing was recorded.
    pub fn finish<T>(self, value: impl FnOnce() -> T) -> Result<T, FieldErrors> {
        if self.is_empty() { Ok(value()) } else { Err(self) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_accumulate_per_field() {
        let mut errors = FieldErrors::new();
        errors.add("name", "this field is required");
        errors.add("name", "too short");
        errors.add("email", "enter a valid e-mail address");

        assert_eq!(errors.get("name").map(<[String]>::len), Some(2));
        assert_eq!(errors.fields().collect::<Vec<_>>(), vec!["email", "name"]);
        assert_eq!(
            serde_json::to_value(&errors).unwrap()["email"][0],
            "enter a valid e-mail address"
        );
    }

    #[test]
    fn check_rescopes_value_object_errors() {
        let mut errors = FieldErrors::new();
        let parsed = errors.check("company_email", crate::Email::parse("nope"));
        assert!(parsed.is_none());
        assert!(errors.get("company_email").is_some());
        assert!(errors.finish(|| ()).is_err());
    }
}
