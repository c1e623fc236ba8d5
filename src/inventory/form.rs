//! Submission form fields and validation

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::store::lost_items::{NewLostItem, DATE_FORMAT};

/// Values typed into the "add found item" dialog
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ItemForm {
    pub student_id: String,
    pub name: String,
    pub description: String,
    pub location: String,
    /// Raw date input, expected as `yyyy-MM-dd`
    pub date_found: String,
    /// Inline image as a data URI
    pub image_data: Option<String>,
}

/// Why a single field was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Violation {
    Missing,
    InvalidDate,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::Missing => f.write_str("missing"),
            Violation::InvalidDate => f.write_str("invalid date"),
        }
    }
}

/// Field name to violation, for every rejected field
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<&'static str, Violation>);

impl ValidationErrors {
    pub fn get(&self, field: &str) -> Option<Violation> {
        self.0.get(field).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    fn add(&mut self, field: &'static str, violation: Violation) {
        self.0.insert(field, violation);
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|(field, violation)| format!("{}: {}", field, violation))
            .collect();
        f.write_str(&parts.join(", "))
    }
}

fn required(value: &str) -> Option<&str> {
    let value = value.trim();
    (!value.is_empty()).then_some(value)
}

impl ItemForm {
    /// Check every required field; the draft is only built when all pass
    pub fn validate(&self) -> Result<NewLostItem, ValidationErrors> {
        let mut errors = ValidationErrors::default();

        let mut text = |field: &'static str, value: &str| match required(value) {
            Some(v) => v.to_string(),
            None => {
                errors.add(field, Violation::Missing);
                String::new()
            }
        };
        let student_id = text("student_id", &self.student_id);
        let name = text("name", &self.name);
        let description = text("description", &self.description);
        let location = text("location", &self.location);

        let date_found = match required(&self.date_found) {
            Some(raw) => match NaiveDate::parse_from_str(raw, DATE_FORMAT) {
                Ok(date) => Some(date),
                Err(_) => {
                    errors.add("date_found", Violation::InvalidDate);
                    None
                }
            },
            None => {
                errors.add("date_found", Violation::Missing);
                None
            }
        };

        match date_found {
            Some(date_found) if errors.is_empty() => Ok(NewLostItem {
                name,
                description,
                location,
                date_found,
                image_data: self.image_data.clone().filter(|d| !d.is_empty()),
                student_id,
            }),
            _ => Err(errors),
        }
    }

    /// Reset every field to empty
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
