// Validation errors and the grouped report

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Validation error for a single field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Field name that failed validation
    pub field: String,

    /// Error message
    pub message: String,

    /// Validation constraint that failed
    pub constraint: String,

    /// Value that failed validation (optional)
    pub value: Option<String>,
}

impl ValidationError {
    /// Create a new validation error
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            constraint: "custom".to_string(),
            value: None,
        }
    }

    /// Set the constraint name
    pub fn with_constraint(mut self, constraint: impl Into<String>) -> Self {
        self.constraint = constraint.into();
        self
    }

    /// Set the invalid value
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Collection of validation errors in detection order
#[derive(Debug, Clone, Default)]
pub struct ValidationErrors {
    pub errors: Vec<ValidationError>,
}

impl ValidationErrors {
    /// Create a new validation errors collection
    pub fn new(errors: Vec<ValidationError>) -> Self {
        Self { errors }
    }

    /// Check if there are any errors
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Get the number of errors
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Add an error
    pub fn add(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    /// Append every error from another collection
    pub fn extend(&mut self, other: impl IntoIterator<Item = ValidationError>) {
        self.errors.extend(other);
    }

    /// Get errors for a specific field
    pub fn get_field_errors(&self, field: &str) -> Vec<&ValidationError> {
        self.errors.iter().filter(|e| e.field == field).collect()
    }

    /// Group the errors by field into a report.
    ///
    /// Messages keep their detection order within each field.
    pub fn into_report(self) -> ValidationReport {
        let mut report = ValidationReport::default();
        for error in self.errors {
            report.push(error.field, error.message);
        }
        report
    }

    /// `Ok(())` when empty, otherwise the collection itself
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for error in &self.errors {
            writeln!(f, "{}", error)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

impl From<Vec<ValidationError>> for ValidationErrors {
    fn from(errors: Vec<ValidationError>) -> Self {
        Self::new(errors)
    }
}

impl IntoIterator for ValidationErrors {
    type Item = ValidationError;
    type IntoIter = std::vec::IntoIter<ValidationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}

/// Field-grouped validation outcome returned to the boundary layer.
///
/// An empty report means the request passed. Each run produces a fresh
/// report; nothing holds on to it after it is returned.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// Field name to messages, in the order they were detected
    pub errors: HashMap<String, Vec<String>>,

    /// Total number of messages across all fields
    pub error_count: usize,
}

impl ValidationReport {
    /// Create an empty (passing) report
    pub fn new() -> Self {
        Self::default()
    }

    /// True when no errors were recorded
    pub fn is_valid(&self) -> bool {
        self.error_count == 0
    }

    /// Record a message under a field
    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors
            .entry(field.into())
            .or_default()
            .push(message.into());
        self.error_count += 1;
    }

    /// Messages recorded for a field
    pub fn field(&self, field: &str) -> Option<&[String]> {
        self.errors.get(field).map(Vec::as_slice)
    }

    /// Whether a field has at least one message
    pub fn has_field(&self, field: &str) -> bool {
        self.errors.contains_key(field)
    }

    /// Fold another report into this one, appending per-field messages
    pub fn merge(&mut self, other: ValidationReport) {
        for (field, messages) in other.errors {
            self.error_count += messages.len();
            self.errors.entry(field).or_default().extend(messages);
        }
    }

    /// Sorted field names, for stable display
    pub fn fields(&self) -> Vec<&str> {
        let mut fields: Vec<&str> = self.errors.keys().map(String::as_str).collect();
        fields.sort_unstable();
        fields
    }
}

impl From<ValidationErrors> for ValidationReport {
    fn from(errors: ValidationErrors) -> Self {
        errors.into_report()
    }
}

impl From<Vec<ValidationError>> for ValidationReport {
    fn from(errors: Vec<ValidationError>) -> Self {
        ValidationErrors::new(errors).into_report()
    }
}
