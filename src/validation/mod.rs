//! Request validation: field error maps, normalization helpers and the
//! `ValidatedForm` extractor that runs a form request's authorization hook
//! before any of its rules.

mod form;

pub use form::{FormRequest, RecordInput, Store, Update, ValidatedForm};

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use validator::{ValidationError, ValidationErrors};

use crate::models::status::WorkStatus;

/// Field-indexed validation messages, serialized as `{field: [message, ..]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn has(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }
}

impl From<ValidationErrors> for FieldErrors {
    fn from(errors: ValidationErrors) -> Self {
        let mut out = FieldErrors::new();
        for (field, list) in errors.field_errors() {
            for error in list {
                let message = error
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| invalid_field(field));
                out.add(field, message);
            }
        }
        out
    }
}

/// Trim a text field and treat blank input as absent.
pub fn normalize(value: &mut Option<String>) {
    if let Some(text) = value.take() {
        let trimmed = text.trim();
        if !trimmed.is_empty() {
            *value = Some(trimmed.to_string());
        }
    }
}

/// Take a field that the derive rules already marked `required`.
pub fn required<T>(value: Option<T>, field: &str) -> Result<T, FieldErrors> {
    value.ok_or_else(|| {
        let mut errors = FieldErrors::new();
        errors.add(field, format!("The {} field is required.", field.replace('_', " ")));
        errors
    })
}

/// Message for a field whose value has the wrong type.
pub fn invalid_field(field: &str) -> String {
    format!("The {} field is invalid.", field.replace('_', " "))
}

/// Integer field that accepts a JSON number or a numeric string, so urlencoded
/// forms and JSON bodies share one set of rules. Blank input is absent.
pub fn lenient_integer<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(i64),
        Text(String),
    }

    match Option::<Raw>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Raw::Number(value)) => Ok(Some(value)),
        Some(Raw::Text(text)) if text.trim().is_empty() => Ok(None),
        Some(Raw::Text(text)) => text
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(|_| <D::Error as serde::de::Error>::custom(format!("'{text}' is not an integer"))),
    }
}

pub fn validate_date(value: &str) -> Result<(), ValidationError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map(|_| ())
        .map_err(|_| ValidationError::new("date"))
}

pub fn validate_status(value: &str) -> Result<(), ValidationError> {
    value
        .parse::<WorkStatus>()
        .map(|_| ())
        .map_err(|_| ValidationError::new("status"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_trims_and_drops_blank_values() {
        let mut name = Some("  Ada  ".to_string());
        normalize(&mut name);
        assert_eq!(name.as_deref(), Some("Ada"));

        let mut blank = Some("   ".to_string());
        normalize(&mut blank);
        assert_eq!(blank, None);
    }

    #[test]
    fn field_errors_collect_per_field() {
        let mut errors = FieldErrors::new();
        errors.add("name", "The name field is required.");
        errors.add("role", "The role field is required.");
        errors.add("role", "The selected role is invalid.");

        assert_eq!(errors.get("role").map(|m| m.len()), Some(2));
        assert!(errors.has("name"));
        assert!(!errors.is_empty());
    }

    #[derive(Debug, Deserialize)]
    struct Assignment {
        #[serde(default, deserialize_with = "lenient_integer")]
        user_id: Option<i64>,
    }

    #[test]
    fn lenient_integer_accepts_numbers_and_numeric_text() {
        let parse = |body: &str| serde_json::from_str::<Assignment>(body).map(|a| a.user_id);

        assert_eq!(parse(r#"{"user_id": 7}"#).unwrap(), Some(7));
        assert_eq!(parse(r#"{"user_id": " 8 "}"#).unwrap(), Some(8));
        assert_eq!(parse(r#"{"user_id": ""}"#).unwrap(), None);
        assert_eq!(parse("{}").unwrap(), None);
        assert!(parse(r#"{"user_id": "abc"}"#).is_err());
    }

    #[test]
    fn date_rule_accepts_iso_dates_only() {
        assert!(validate_date("2025-03-01").is_ok());
        assert!(validate_date("03/01/2025").is_err());
    }
}
