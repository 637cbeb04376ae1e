//! Lifecycle controller.
//!
//! ```text
//! Pristine ──set──▶ Editing ──▶ Valid | Invalid ──submit──▶ Submitting ──▶ Resolved | Failed
//!     ▲                                                                          │
//!     └──────────────────────────── reset (from any state) ─────────────────────┘
//! ```
//!
//! `Valid`/`Invalid` are recomputed from the field states after every edit and
//! never latched. The dependency map records which fields must be
//! re-validated when a sibling they compare against changes.

use std::collections::{BTreeSet, HashMap, VecDeque};
use std::fmt;

use serde::Serialize;

use crate::fields::FieldSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LifecycleState {
    Pristine,
    Editing,
    Valid,
    Invalid,
    Submitting,
    Resolved,
    Failed,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A single state change, reported to observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: LifecycleState,
    pub to: LifecycleState,
}

/// The form's lifecycle state machine.
#[derive(Debug, Clone)]
pub struct Lifecycle {
    state: LifecycleState,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifecycle {
    pub fn new() -> Self {
        Self {
            state: LifecycleState::Pristine,
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Any edit passes through `Editing` and settles on the computed status.
    pub fn on_edit(&mut self, valid: bool) -> Vec<Transition> {
        let settled = if valid {
            LifecycleState::Valid
        } else {
            LifecycleState::Invalid
        };
        let mut transitions = Vec::with_capacity(2);
        transitions.extend(self.move_to(LifecycleState::Editing));
        transitions.extend(self.move_to(settled));
        transitions
    }

    /// Enter `Submitting`. Callers gate on form validity.
    pub fn on_submit(&mut self) -> Option<Transition> {
        self.move_to(LifecycleState::Submitting)
    }

    /// Settle a submission. Only applies while still `Submitting`; an edit
    /// made during the request keeps the form in its edited status.
    pub fn on_settled(&mut self, succeeded: bool) -> Option<Transition> {
        if self.state != LifecycleState::Submitting {
            return None;
        }
        self.move_to(if succeeded {
            LifecycleState::Resolved
        } else {
            LifecycleState::Failed
        })
    }

    pub fn reset(&mut self) -> Option<Transition> {
        self.move_to(LifecycleState::Pristine)
    }

    fn move_to(&mut self, to: LifecycleState) -> Option<Transition> {
        let from = self.state;
        self.state = to;
        (from != to).then_some(Transition { from, to })
    }
}

/// `field → fields whose cross-field constraints read it`, built once.
#[derive(Debug, Clone, Default)]
pub struct DependencyMap {
    dependents: HashMap<String, BTreeSet<String>>,
}

impl DependencyMap {
    pub fn from_fields(fields: &FieldSet) -> Self {
        let mut dependents: HashMap<String, BTreeSet<String>> = HashMap::new();
        for descriptor in fields.all() {
            for sibling in descriptor.siblings() {
                dependents
                    .entry(sibling.to_string())
                    .or_default()
                    .insert(descriptor.name.clone());
            }
        }
        Self { dependents }
    }

    /// Direct dependents of `field`.
    pub fn dependents_of(&self, field: &str) -> impl Iterator<Item = &str> {
        self.dependents
            .get(field)
            .into_iter()
            .flat_map(|set| set.iter().map(String::as_str))
    }

    /// Every field transitively depending on `field`, breadth-first, without
    /// `field` itself and without repeats.
    pub fn closure(&self, field: &str) -> Vec<String> {
        let mut seen = BTreeSet::new();
        seen.insert(field.to_string());
        let mut order = Vec::new();
        let mut queue: VecDeque<&str> = self.dependents_of(field).collect();
        while let Some(next) = queue.pop_front() {
            if seen.insert(next.to_string()) {
                order.push(next.to_string());
                queue.extend(self.dependents_of(next));
            }
        }
        order
    }
}

/// Watches the inbound reset token. The first value seen only arms the
/// trigger; each later change of value asks for a reset.
#[derive(Debug, Clone, Default)]
pub struct ResetTrigger {
    last: Option<bool>,
}

impl ResetTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    /// A trigger that has already seen the construction-time `token`.
    pub fn seeded(token: bool) -> Self {
        Self { last: Some(token) }
    }

    /// Record `token`; true when it differs from the previously seen token.
    pub fn observe(&mut self, token: bool) -> bool {
        match self.last.replace(token) {
            None => false,
            Some(previous) => previous != token,
        }
    }
}
