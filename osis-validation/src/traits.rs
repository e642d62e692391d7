// Validation traits

use crate::ValidationErrors;

/// A single check over one submitted value.
///
/// Implementations are pure: they look only at `value` and report a
/// human-readable message built from `label` on failure.
pub trait Validator: Send + Sync {
    /// Check a value, returning the failure message if it does not pass
    fn validate(&self, value: &str, label: &str) -> Result<(), String>;

    /// Constraint name recorded on failures
    fn name(&self) -> &'static str;
}

impl<V: Validator + ?Sized> Validator for Box<V> {
    fn validate(&self, value: &str, label: &str) -> Result<(), String> {
        (**self).validate(value, label)
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

/// Trait for types that validate themselves as a whole
pub trait Validate {
    /// Validate the value and return errors if any
    fn validate(&self) -> Result<(), ValidationErrors>;
}
