//! Form state store.
//!
//! Holds one [`FieldState`] per descriptor and derives the [`FormSnapshot`]
//! from them on demand, so the snapshot can never go stale. Every mutation
//! re-validates synchronously, re-validates cross-field dependents, and
//! notifies subscribers before returning.

use std::borrow::Cow;
use std::collections::BTreeSet;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::bridge::{EventBus, FormEvent, SubscriptionId};
use crate::error::{FormError, Result};
use crate::fields::FieldSet;
use crate::lifecycle::DependencyMap;
use crate::validation::{FailureReason, ValidationEngine, ValidationVerdict};

/// Raw input for a single field.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    #[default]
    Empty,
    Number(f64),
    Text(String),
}

impl FieldValue {
    /// Not yet provided. `0` is a value, not an absence.
    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Empty => true,
            FieldValue::Text(s) => s.is_empty(),
            FieldValue::Number(_) => false,
        }
    }

    /// Numeric reading of the input, if it has one.
    pub fn as_number(&self) -> Option<f64> {
        let n = match self {
            FieldValue::Empty => return None,
            FieldValue::Number(n) => *n,
            FieldValue::Text(s) => s.parse::<f64>().ok()?,
        };
        n.is_finite().then_some(n)
    }

    /// Textual rendering used by pattern and membership checks.
    pub fn to_text(&self) -> Cow<'_, str> {
        match self {
            FieldValue::Empty => Cow::Borrowed(""),
            FieldValue::Text(s) => Cow::Borrowed(s),
            FieldValue::Number(n) => Cow::Owned(n.to_string()),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<f64> for FieldValue {
    fn from(n: f64) -> Self {
        FieldValue::Number(n)
    }
}

impl From<u32> for FieldValue {
    fn from(n: u32) -> Self {
        FieldValue::Number(f64::from(n))
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or_default()
    }
}

/// Current value of every field, keyed by name, in declaration order.
pub type FormValues = IndexMap<String, FieldValue>;

/// Live state of one field.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldState {
    pub name: String,
    pub raw_value: FieldValue,
    pub touched: bool,
    pub valid: bool,
    pub failure_reasons: BTreeSet<FailureReason>,
}

impl FieldState {
    fn apply(&mut self, verdict: ValidationVerdict) {
        self.valid = verdict.valid;
        self.failure_reasons = verdict.reasons;
    }
}

/// Values plus overall validity. Always derived from the field states.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormSnapshot {
    pub values: FormValues,
    pub valid: bool,
}

/// Owner of all field state for one form.
pub struct FormStore {
    engine: ValidationEngine,
    dependents: DependencyMap,
    states: IndexMap<String, FieldState>,
    bus: EventBus,
    last_validity: bool,
}

impl FormStore {
    pub fn new(fields: Arc<FieldSet>) -> Self {
        let dependents = DependencyMap::from_fields(&fields);
        let engine = ValidationEngine::new(fields);
        let states = initial_states(&engine);
        let last_validity = states.values().all(|s| s.valid);
        Self {
            engine,
            dependents,
            states,
            bus: EventBus::default(),
            last_validity,
        }
    }

    pub fn fields(&self) -> &FieldSet {
        self.engine.fields()
    }

    pub fn field(&self, name: &str) -> Option<&FieldState> {
        self.states.get(name)
    }

    pub fn dependents(&self) -> &DependencyMap {
        &self.dependents
    }

    pub fn field_states(&self) -> impl Iterator<Item = &FieldState> {
        self.states.values()
    }

    pub fn is_valid(&self) -> bool {
        self.states.values().all(|s| s.valid)
    }

    /// Whether any field has been changed since construction or the last reset.
    pub fn is_touched(&self) -> bool {
        self.states.values().any(|s| s.touched)
    }

    /// Set a field's raw value, re-validate it and everything that depends
    /// on it, then notify subscribers.
    pub fn set_value(&mut self, name: &str, value: FieldValue) -> Result<FormSnapshot> {
        let state = self
            .states
            .get_mut(name)
            .ok_or_else(|| FormError::UnknownField {
                name: name.to_string(),
            })?;
        state.raw_value = value;
        state.touched = true;

        self.revalidate(name);
        let dependents = self.dependents.closure(name);
        for dependent in &dependents {
            self.revalidate(dependent);
        }

        Ok(self.publish())
    }

    pub fn current_snapshot(&self) -> FormSnapshot {
        FormSnapshot {
            values: self.values(),
            valid: self.is_valid(),
        }
    }

    /// Put every field back to empty and untouched.
    pub fn reset(&mut self) -> FormSnapshot {
        self.states = initial_states(&self.engine);
        self.publish()
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&FormEvent) + 'static) -> SubscriptionId {
        self.bus.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.bus.unsubscribe(id)
    }

    pub(crate) fn emit(&mut self, event: &FormEvent) {
        self.bus.emit(event);
    }

    fn values(&self) -> FormValues {
        self.states
            .iter()
            .map(|(name, state)| (name.clone(), state.raw_value.clone()))
            .collect()
    }

    fn revalidate(&mut self, name: &str) {
        let values = self.values();
        let Some(descriptor) = self.engine.fields().get(name) else {
            return;
        };
        let value = values.get(name).cloned().unwrap_or_default();
        let verdict = self.engine.validate_descriptor(descriptor, &value, &values);
        if let Some(state) = self.states.get_mut(name) {
            state.apply(verdict);
        }
    }

    /// Emit `ValuesChanged` always and `ValidityChanged` only on an edge.
    fn publish(&mut self) -> FormSnapshot {
        let snapshot = self.current_snapshot();
        self.bus
            .emit(&FormEvent::ValuesChanged(snapshot.values.clone()));
        if snapshot.valid != self.last_validity {
            self.last_validity = snapshot.valid;
            self.bus.emit(&FormEvent::ValidityChanged(snapshot.valid));
        }
        snapshot
    }
}

fn initial_states(engine: &ValidationEngine) -> IndexMap<String, FieldState> {
    let empty = FormValues::new();
    engine
        .fields()
        .all()
        .iter()
        .map(|descriptor| {
            let verdict = engine.validate_descriptor(descriptor, &FieldValue::Empty, &empty);
            let state = FieldState {
                name: descriptor.name.clone(),
                raw_value: FieldValue::Empty,
                touched: false,
                valid: verdict.valid,
                failure_reasons: verdict.reasons,
            };
            (descriptor.name.clone(), state)
        })
        .collect()
}
