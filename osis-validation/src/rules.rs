// Declarative field rules and the conditional rule engine

use crate::{
    FieldValue, ValidationError, ValidationErrors, ValidationReport, ValidationRequest, Validator,
};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

type ActivationFn = Arc<dyn Fn(&ValidationRequest) -> bool + Send + Sync>;

/// Whether a missing value is an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    Required,
    Optional,
}

/// Expected value shape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// Exactly one value
    Single,
    /// One or more values with inclusive cardinality bounds
    List { min: usize, max: usize },
}

/// When a rule takes part in a validation pass.
///
/// Conditions are evaluated against the request being validated on every
/// pass. A missing or malformed conditioning field makes the condition
/// false.
#[derive(Clone)]
pub enum Activation {
    Always,
    When(ActivationFn),
}

impl Activation {
    /// Active when `field` (scalar or list) contains `value`
    pub fn contains(field: impl Into<String>, value: impl Into<String>) -> Self {
        let field = field.into();
        let value = value.into();
        Activation::When(Arc::new(move |req| {
            req.values(&field).iter().any(|v| v.trim() == value)
        }))
    }

    /// Active when `field` is a single value equal to `value`
    pub fn equals(field: impl Into<String>, value: impl Into<String>) -> Self {
        let field = field.into();
        let value = value.into();
        Activation::When(Arc::new(move |req| {
            matches!(req.get(&field), Some(FieldValue::Text(v)) if v.trim() == value)
        }))
    }

    /// Active when `field` carries a non-blank value
    pub fn present(field: impl Into<String>) -> Self {
        let field = field.into();
        Activation::When(Arc::new(move |req| req.is_present(&field)))
    }

    /// Evaluate against a request
    pub fn is_active(&self, request: &ValidationRequest) -> bool {
        match self {
            Activation::Always => true,
            Activation::When(f) => f(request),
        }
    }
}

impl fmt::Debug for Activation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Activation::Always => write!(f, "Always"),
            Activation::When(_) => write!(f, "When(..)"),
        }
    }
}

/// Rule for one field: presence, shape, check chain and activation
#[derive(Clone)]
pub struct FieldRule {
    field: String,
    label: String,
    presence: Presence,
    shape: Shape,
    validators: Vec<Arc<dyn Validator>>,
    activation: Activation,
    row_anchor: Option<String>,
}

impl FieldRule {
    /// Create a rule for a field that must be present
    pub fn required(field: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(field, label, Presence::Required)
    }

    /// Create a rule that skips every check when the value is absent or blank
    pub fn optional(field: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(field, label, Presence::Optional)
    }

    fn new(field: impl Into<String>, label: impl Into<String>, presence: Presence) -> Self {
        Self {
            field: field.into(),
            label: label.into(),
            presence,
            shape: Shape::Single,
            validators: Vec::new(),
            activation: Activation::Always,
            row_anchor: None,
        }
    }

    /// Accept a list of `min..=max` values; each value runs the chain
    pub fn list(mut self, min: usize, max: usize) -> Self {
        self.shape = Shape::List { min, max };
        self
    }

    /// Append a check to the chain
    pub fn check(mut self, validator: impl Validator + 'static) -> Self {
        self.validators.push(Arc::new(validator));
        self
    }

    /// Require a value at every position where `anchor` has one
    pub fn per_row_of(mut self, anchor: impl Into<String>) -> Self {
        self.row_anchor = Some(anchor.into());
        self
    }

    /// Set the activation condition
    pub fn active_when(mut self, activation: Activation) -> Self {
        self.activation = activation;
        self
    }

    /// Activate on an arbitrary predicate over the request
    pub fn when<F>(self, condition: F) -> Self
    where
        F: Fn(&ValidationRequest) -> bool + Send + Sync + 'static,
    {
        self.active_when(Activation::When(Arc::new(condition)))
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn presence(&self) -> Presence {
        self.presence
    }

    /// Whether this rule takes part in validating `request`
    pub fn is_active(&self, request: &ValidationRequest) -> bool {
        self.activation.is_active(request)
    }

    /// Run this rule against a request, appending failures to `errors`.
    ///
    /// Inactive rules never produce errors.
    pub fn apply(&self, request: &ValidationRequest, errors: &mut ValidationErrors) {
        if !self.is_active(request) {
            return;
        }

        let value = match request.get(&self.field) {
            Some(FieldValue::Malformed) => {
                let message = format!("Format {} tidak valid", self.label.to_lowercase());
                errors.add(self.error(message, "type"));
                return;
            }
            Some(v) if !v.is_blank() => v,
            _ => {
                if self.presence == Presence::Required {
                    errors.add(self.missing());
                }
                return;
            }
        };

        match self.shape {
            Shape::Single => {
                let values = value.values();
                if values.len() > 1 {
                    let message = format!("{} hanya boleh satu nilai", self.label);
                    errors.add(self.error(message, "single"));
                    return;
                }
                if let Some(v) = values.first() {
                    self.run_chain(v, &self.label, errors);
                }
            }
            Shape::List { min, max } => {
                let values = value.values();
                if values.len() < min {
                    let message = format!("Pilih minimal {} {}", min, self.label.to_lowercase());
                    errors.add(self.error(message, "minItems"));
                } else if values.len() > max {
                    let message = format!("Pilih maksimal {} {}", max, self.label.to_lowercase());
                    errors.add(self.error(message, "maxItems"));
                }
                for v in values {
                    let label = format!("{} \"{}\"", self.label, v.trim());
                    self.run_chain(v, &label, errors);
                }
            }
        }

        if let Some(anchor) = &self.row_anchor {
            self.check_rows(request, anchor, errors);
        }
    }

    fn check_rows(&self, request: &ValidationRequest, anchor: &str, errors: &mut ValidationErrors) {
        let rows = request.rows(&self.field);
        for (index, anchor_value) in request.rows(anchor).iter().enumerate() {
            if anchor_value.trim().is_empty() {
                continue;
            }
            if rows.get(index).is_none_or(|v| v.trim().is_empty()) {
                let message = format!("{} baris {} wajib diisi", self.label, index + 1);
                errors.add(self.error(message, "required"));
            }
        }
    }

    fn run_chain(&self, value: &str, label: &str, errors: &mut ValidationErrors) {
        for validator in &self.validators {
            if let Err(message) = validator.validate(value, label) {
                errors.add(
                    ValidationError::new(&self.field, message)
                        .with_constraint(validator.name())
                        .with_value(value),
                );
                break;
            }
        }
    }

    fn missing(&self) -> ValidationError {
        let message = match self.shape {
            Shape::List { min, .. } if min > 0 => {
                format!("Pilih minimal {} {}", min, self.label.to_lowercase())
            }
            _ => format!("{} wajib diisi", self.label),
        };
        self.error(message, "required")
    }

    fn error(&self, message: String, constraint: &str) -> ValidationError {
        ValidationError::new(&self.field, message).with_constraint(constraint)
    }
}

impl fmt::Debug for FieldRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldRule")
            .field("field", &self.field)
            .field("presence", &self.presence)
            .field("shape", &self.shape)
            .field("validators", &self.validators.len())
            .field("activation", &self.activation)
            .field("row_anchor", &self.row_anchor)
            .finish()
    }
}

/// Declarative table of field rules evaluated in a single pass
#[derive(Clone, Debug, Default)]
pub struct RuleSet {
    rules: Vec<FieldRule>,
}

impl RuleSet {
    /// Create an empty rule set
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Add a rule
    pub fn rule(mut self, rule: FieldRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Add several rules
    pub fn rules(mut self, rules: impl IntoIterator<Item = FieldRule>) -> Self {
        self.rules.extend(rules);
        self
    }

    /// Rules in evaluation order
    pub fn iter(&self) -> impl Iterator<Item = &FieldRule> {
        self.rules.iter()
    }

    /// Number of rules
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Collect every failure across all active rules
    pub fn errors(&self, request: &ValidationRequest) -> ValidationErrors {
        let mut errors = ValidationErrors::default();
        let mut active = 0usize;
        for rule in &self.rules {
            if rule.is_active(request) {
                active += 1;
            }
            rule.apply(request, &mut errors);
        }
        debug!(
            rules = self.rules.len(),
            active,
            errors = errors.len(),
            "Validation pass complete"
        );
        errors
    }

    /// Validate a request into a fresh grouped report
    pub fn validate(&self, request: &ValidationRequest) -> ValidationReport {
        self.errors(request).into_report()
    }

    /// Validate a request, returning the raw errors on failure
    pub fn check(&self, request: &ValidationRequest) -> Result<(), ValidationErrors> {
        self.errors(request).into_result()
    }
}
