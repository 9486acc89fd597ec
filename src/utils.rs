use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use utoipa::ToSchema;

use crate::schema::model::Viewer;

pub const MIN_AUTHOR_CHARS: usize = 2;
pub const MIN_PHONE_DIGITS: usize = 9;
pub const MIN_CONTENT_CHARS: usize = 5;

lazy_static! {
    static ref PHONE_SHAPE: Regex = Regex::new(r"^\+?[0-9][0-9 ().-]*$").unwrap();
}

pub fn is_valid_author(author: &str) -> bool {
    author.trim().chars().count() >= MIN_AUTHOR_CHARS
}

pub fn is_valid_phone(phone: &str) -> bool {
    let phone = phone.trim();
    PHONE_SHAPE.is_match(phone)
        && phone.chars().filter(|c| c.is_ascii_digit()).count() >= MIN_PHONE_DIGITS
}

pub fn is_valid_content(content: &str) -> bool {
    content.trim().chars().count() >= MIN_CONTENT_CHARS
}

/// Per-field validation messages, keyed by the field name used on the wire.
#[derive(Serialize, Clone, Debug, Default, PartialEq, Eq, ToSchema)]
pub struct ValidationErrors {
    pub errors: BTreeMap<String, String>,
}

impl ValidationErrors {
    pub fn add(&mut self, field: &str, message: &str) {
        self.errors.insert(field.to_string(), message.to_string());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.errors.get(field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let joined = self
            .errors
            .iter()
            .map(|(field, message)| format!("{field}: {message}"))
            .collect::<Vec<_>>()
            .join("; ");
        write!(f, "{joined}")
    }
}

impl std::error::Error for ValidationErrors {}

pub const AUTHOR_TOO_SHORT: &str = "El nombre debe tener al menos 2 caracteres";
pub const PHONE_TOO_SHORT: &str = "El número de teléfono debe tener al menos 9 dígitos";
pub const CONTENT_TOO_SHORT: &str = "El comentario debe tener al menos 5 caracteres";

pub fn validate_viewer(viewer: &Viewer) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();
    if !is_valid_author(&viewer.name) {
        errors.add("name", AUTHOR_TOO_SHORT);
    }
    if !is_valid_phone(&viewer.phone) {
        errors.add("phone", PHONE_TOO_SHORT);
    }
    errors.into_result()
}

/// Treats an empty optional field the same as an absent one.
pub fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parses an ISO-8601 timestamp. Values without an offset are read as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| Utc.from_utc_datetime(&naive))
}
