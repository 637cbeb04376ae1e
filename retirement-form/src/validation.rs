//! Validation engine.
//!
//! Evaluates a field's constraints in declaration order against a live view
//! of the sibling values. Every violated constraint contributes its reason;
//! nothing short-circuits, so callers can report every problem at once.
//! Malformed input never raises, it only produces reasons.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{FormError, Result};
use crate::fields::{Constraint, FieldDescriptor, FieldKind, FieldSet};
use crate::state::{FieldValue, FormValues};

/// Why a field failed validation. One per constraint kind.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub enum FailureReason {
    Required,
    Range,
    Pattern,
    CrossField,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureReason::Required => "required",
            FailureReason::Range => "range",
            FailureReason::Pattern => "pattern",
            FailureReason::CrossField => "crossField",
        };
        f.write_str(name)
    }
}

/// Outcome of validating one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationVerdict {
    pub valid: bool,
    pub reasons: BTreeSet<FailureReason>,
}

impl ValidationVerdict {
    fn from_reasons(reasons: BTreeSet<FailureReason>) -> Self {
        Self {
            valid: reasons.is_empty(),
            reasons,
        }
    }
}

/// Stateless evaluator over a [`FieldSet`].
#[derive(Debug, Clone)]
pub struct ValidationEngine {
    fields: Arc<FieldSet>,
}

impl ValidationEngine {
    pub fn new(fields: Arc<FieldSet>) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &FieldSet {
        &self.fields
    }

    /// Validate `value` for the named field. `siblings` must be the current
    /// values of the form; cross-field rules read from it at call time.
    pub fn validate(
        &self,
        field_name: &str,
        value: &FieldValue,
        siblings: &FormValues,
    ) -> Result<ValidationVerdict> {
        let descriptor = self
            .fields
            .get(field_name)
            .ok_or_else(|| FormError::UnknownField {
                name: field_name.to_string(),
            })?;
        Ok(self.validate_descriptor(descriptor, value, siblings))
    }

    pub(crate) fn validate_descriptor(
        &self,
        descriptor: &FieldDescriptor,
        value: &FieldValue,
        siblings: &FormValues,
    ) -> ValidationVerdict {
        let mut reasons = BTreeSet::new();

        if value.is_empty() {
            // Absent input only violates Required; everything else is valid by omission.
            if descriptor.is_required() {
                reasons.insert(FailureReason::Required);
            }
            return ValidationVerdict::from_reasons(reasons);
        }

        if let FieldKind::Enum { options } = &descriptor.kind {
            let text = value.to_text();
            if !options.iter().any(|o| o.value == text) {
                reasons.insert(FailureReason::Pattern);
            }
        }

        for constraint in &descriptor.constraints {
            if !self.satisfies(descriptor, constraint, value, siblings) {
                reasons.insert(constraint.reason());
            }
        }

        ValidationVerdict::from_reasons(reasons)
    }

    fn satisfies(
        &self,
        descriptor: &FieldDescriptor,
        constraint: &Constraint,
        value: &FieldValue,
        siblings: &FormValues,
    ) -> bool {
        match constraint {
            Constraint::Required => !value.is_empty(),
            Constraint::Range { min, max } => {
                let Some(number) = value.as_number() else {
                    return false;
                };
                if number < *min || number > *max {
                    return false;
                }
                match descriptor.kind {
                    FieldKind::Decimal {
                        max_fraction_digits,
                    } => fraction_digits(&value.to_text()) <= max_fraction_digits,
                    _ => true,
                }
            }
            Constraint::Pattern { regex } => match self.fields.pattern(regex) {
                Some(compiled) => compiled.is_match(&value.to_text()),
                None => false,
            },
            Constraint::CrossField { sibling, must_be } => {
                let sibling_value = siblings.get(sibling).unwrap_or(&FieldValue::Empty);
                if sibling_value.is_empty() {
                    return true;
                }
                // Non-numeric sides are reported by Range/Pattern, not here.
                match (value.as_number(), sibling_value.as_number()) {
                    (Some(own), Some(other)) => must_be.holds(own, other),
                    _ => true,
                }
            }
        }
    }
}

/// Digits after the decimal point in a plain decimal rendering.
fn fraction_digits(text: &str) -> usize {
    match text.split_once('.') {
        Some((_, fraction)) => fraction.chars().take_while(|c| c.is_ascii_digit()).count(),
        None => 0,
    }
}
