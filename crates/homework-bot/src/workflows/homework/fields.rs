//! Typed access to a candidate's custom profile fields.
//!
//! A missing field is a normal state ("not filled in yet"), a field with the
//! wrong shape means the tracking system is configured differently from what
//! the workflow expects and is reported as [`FieldShapeError`].

use super::domain::{Candidate, CustomField, FieldKind};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FieldShapeError {
    #[error("field '{name}' is a {actual} field, expected {expected}")]
    WrongKind {
        name: String,
        expected: &'static str,
        actual: String,
    },
    #[error("field '{name}' holds {count} values, expected at most one")]
    TooManyValues { name: String, count: usize },
}

pub fn field<'a>(candidate: &'a Candidate, name: &str) -> Option<&'a CustomField> {
    candidate
        .fields
        .iter()
        .find(|field| field.name.trim().eq_ignore_ascii_case(name.trim()))
}

/// Text of a single-line field, trimmed; blank values count as absent.
pub fn single_line(candidate: &Candidate, name: &str) -> Result<Option<String>, FieldShapeError> {
    let Some(found) = field(candidate, name) else {
        return Ok(None);
    };
    match &found.kind {
        FieldKind::SingleLine(values) => sole_value(&found.name, values),
        other => Err(wrong_kind(&found.name, "single_line", other)),
    }
}

/// Selected option of a dropdown field, trimmed; no selection counts as absent.
pub fn dropdown(candidate: &Candidate, name: &str) -> Result<Option<String>, FieldShapeError> {
    let Some(found) = field(candidate, name) else {
        return Ok(None);
    };
    match &found.kind {
        FieldKind::Dropdown(values) => sole_value(&found.name, values),
        other => Err(wrong_kind(&found.name, "dropdown", other)),
    }
}

fn sole_value(name: &str, values: &[String]) -> Result<Option<String>, FieldShapeError> {
    match values {
        [] => Ok(None),
        [value] => {
            let trimmed = value.trim();
            Ok((!trimmed.is_empty()).then(|| trimmed.to_string()))
        }
        _ => Err(FieldShapeError::TooManyValues {
            name: name.to_string(),
            count: values.len(),
        }),
    }
}

fn wrong_kind(name: &str, expected: &'static str, actual: &FieldKind) -> FieldShapeError {
    FieldShapeError::WrongKind {
        name: name.to_string(),
        expected,
        actual: actual.label().to_string(),
    }
}
