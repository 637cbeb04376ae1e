//! Field set definition for the retirement form.
//!
//! Field descriptors describe named, typed inputs together with the ordered
//! constraints they must satisfy. They serialize to/from YAML via serde. A
//! [`FieldSet`] is the immutable, checked collection handed to the rest of
//! the engine: construction rejects duplicate names, cross-field references
//! to missing siblings, inverted ranges and patterns that do not compile.

use std::collections::HashMap;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{FormError, Result};
use crate::validation::FailureReason;

pub const CURRENT_AGE: &str = "currentAge";
pub const RETIREMENT_AGE: &str = "retirementAge";
pub const INTEREST_RATE: &str = "interestRate";
pub const LIFESTYLE_TYPE: &str = "lifestyleType";

const DIGITS_ONLY: &str = r"^\d+$";
const TWO_DECIMALS: &str = r"^\d+(\.\d{1,2})?$";

/// A single allowed value of an enum field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EnumOption {
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl EnumOption {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: Some(label.into()),
        }
    }

    /// Display label, falling back to the raw value.
    pub fn display(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.value)
    }
}

/// The type of a field. Determines how raw input is interpreted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum FieldKind {
    Integer,
    Decimal {
        #[serde(default = "default_fraction_digits")]
        max_fraction_digits: usize,
    },
    Enum {
        options: Vec<EnumOption>,
    },
}

fn default_fraction_digits() -> usize {
    2
}

impl FieldKind {
    pub fn name(&self) -> &'static str {
        match self {
            FieldKind::Integer => "integer",
            FieldKind::Decimal { .. } => "decimal",
            FieldKind::Enum { .. } => "enum",
        }
    }
}

/// How a field's value must relate to a sibling's value.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Comparison {
    GreaterThan,
    GreaterOrEqual,
    LessThan,
    LessOrEqual,
}

impl Comparison {
    /// Whether `value` stands in this relation to `sibling`.
    pub fn holds(self, value: f64, sibling: f64) -> bool {
        match self {
            Comparison::GreaterThan => value > sibling,
            Comparison::GreaterOrEqual => value >= sibling,
            Comparison::LessThan => value < sibling,
            Comparison::LessOrEqual => value <= sibling,
        }
    }

    fn symbol(self) -> &'static str {
        match self {
            Comparison::GreaterThan => ">",
            Comparison::GreaterOrEqual => ">=",
            Comparison::LessThan => "<",
            Comparison::LessOrEqual => "<=",
        }
    }
}

/// A rule a field value must satisfy. Each constraint maps to exactly one
/// [`FailureReason`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "rule", rename_all = "kebab-case")]
pub enum Constraint {
    Required,
    Range { min: f64, max: f64 },
    Pattern { regex: String },
    CrossField { sibling: String, must_be: Comparison },
}

impl Constraint {
    pub fn reason(&self) -> FailureReason {
        match self {
            Constraint::Required => FailureReason::Required,
            Constraint::Range { .. } => FailureReason::Range,
            Constraint::Pattern { .. } => FailureReason::Pattern,
            Constraint::CrossField { .. } => FailureReason::CrossField,
        }
    }

    /// Short human-readable rendering, used by listings.
    pub fn describe(&self) -> String {
        match self {
            Constraint::Required => "required".to_string(),
            Constraint::Range { min, max } => format!("{min}–{max}"),
            Constraint::Pattern { regex } => format!("matches {regex}"),
            Constraint::CrossField { sibling, must_be } => {
                format!("{} {sibling}", must_be.symbol())
            }
        }
    }
}

/// The complete schema for a single named input.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldDescriptor {
    pub name: String,
    #[serde(flatten)]
    pub kind: FieldKind,
    #[serde(default)]
    pub constraints: Vec<Constraint>,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, kind: FieldKind, constraints: Vec<Constraint>) -> Self {
        Self {
            name: name.into(),
            kind,
            constraints,
        }
    }

    pub fn is_required(&self) -> bool {
        self.constraints
            .iter()
            .any(|c| matches!(c, Constraint::Required))
    }

    /// Display label derived from the field name.
    pub fn label(&self) -> String {
        label_for(&self.name)
    }

    /// Names of the siblings this field's cross-field constraints read.
    pub fn siblings(&self) -> impl Iterator<Item = &str> {
        self.constraints.iter().filter_map(|c| match c {
            Constraint::CrossField { sibling, .. } => Some(sibling.as_str()),
            _ => None,
        })
    }
}

/// Turn a camelCase field name into a display label: a space goes in front
/// of every capital letter and the first character is upper-cased.
///
/// `currentAge` becomes `Current Age`.
pub fn label_for(field_name: &str) -> String {
    let mut spaced = String::with_capacity(field_name.len() + 4);
    for ch in field_name.chars() {
        if ch.is_ascii_uppercase() {
            spaced.push(' ');
        }
        spaced.push(ch);
    }
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[derive(Deserialize)]
struct FieldSetDocument {
    fields: Vec<FieldDescriptor>,
}

/// The ordered, immutable set of field descriptors a form is built from.
#[derive(Debug, Clone)]
pub struct FieldSet {
    fields: Vec<FieldDescriptor>,
    name_index: HashMap<String, usize>,
    patterns: HashMap<String, Regex>,
}

impl FieldSet {
    /// Check and index a list of descriptors.
    pub fn new(fields: Vec<FieldDescriptor>) -> Result<Self> {
        let mut name_index = HashMap::with_capacity(fields.len());
        for (idx, field) in fields.iter().enumerate() {
            if name_index.insert(field.name.clone(), idx).is_some() {
                return Err(FormError::DuplicateField {
                    name: field.name.clone(),
                });
            }
        }

        let mut patterns = HashMap::new();
        for field in &fields {
            for constraint in &field.constraints {
                match constraint {
                    Constraint::Pattern { regex } if !patterns.contains_key(regex) => {
                        let compiled =
                            Regex::new(regex).map_err(|source| FormError::InvalidPattern {
                                field: field.name.clone(),
                                pattern: regex.clone(),
                                source,
                            })?;
                        patterns.insert(regex.clone(), compiled);
                    }
                    Constraint::Range { min, max } if min > max => {
                        return Err(FormError::InvalidRange {
                            field: field.name.clone(),
                            min: *min,
                            max: *max,
                        });
                    }
                    Constraint::CrossField { sibling, .. } => {
                        if sibling == &field.name || !name_index.contains_key(sibling) {
                            return Err(FormError::UnknownSibling {
                                field: field.name.clone(),
                                sibling: sibling.clone(),
                            });
                        }
                    }
                    _ => {}
                }
            }
        }

        debug!(fields = fields.len(), patterns = patterns.len(), "field set built");

        Ok(Self {
            fields,
            name_index,
            patterns,
        })
    }

    /// Parse a YAML document with a top-level `fields:` list.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let doc: FieldSetDocument = serde_yaml::from_str(yaml)?;
        Self::new(doc.fields)
    }

    /// The built-in retirement planner inputs.
    pub fn retirement() -> Self {
        Self::new(retirement_fields()).expect("built-in retirement field set is well-formed")
    }

    /// All descriptors, in declaration order.
    pub fn all(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn get(&self, name: &str) -> Option<&FieldDescriptor> {
        self.name_index.get(name).map(|&i| &self.fields[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.name_index.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Compiled form of a pattern declared by some descriptor in this set.
    pub(crate) fn pattern(&self, source: &str) -> Option<&Regex> {
        self.patterns.get(source)
    }
}

fn retirement_fields() -> Vec<FieldDescriptor> {
    vec![
        FieldDescriptor::new(
            CURRENT_AGE,
            FieldKind::Integer,
            vec![
                Constraint::Required,
                Constraint::Range {
                    min: 17.0,
                    max: 120.0,
                },
                Constraint::Pattern {
                    regex: DIGITS_ONLY.into(),
                },
            ],
        ),
        FieldDescriptor::new(
            RETIREMENT_AGE,
            FieldKind::Integer,
            vec![
                Constraint::Required,
                Constraint::Range {
                    min: 17.0,
                    max: 100.0,
                },
                Constraint::Pattern {
                    regex: DIGITS_ONLY.into(),
                },
                Constraint::CrossField {
                    sibling: CURRENT_AGE.into(),
                    must_be: Comparison::GreaterThan,
                },
            ],
        ),
        FieldDescriptor::new(
            INTEREST_RATE,
            FieldKind::Decimal {
                max_fraction_digits: 2,
            },
            vec![
                Constraint::Range {
                    min: 0.0,
                    max: 100.0,
                },
                Constraint::Pattern {
                    regex: TWO_DECIMALS.into(),
                },
            ],
        ),
        FieldDescriptor::new(
            LIFESTYLE_TYPE,
            FieldKind::Enum {
                options: vec![
                    EnumOption::new("simple", "Simple"),
                    EnumOption::new("fancy", "Fancy"),
                ],
            },
            vec![Constraint::Required],
        ),
    ]
}
