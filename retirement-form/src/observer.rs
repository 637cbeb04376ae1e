//! Observer hook for form transitions.
//!
//! An observer is optional and injected into the controller. Every method
//! defaults to a no-op so implementors only override what they need.

use tracing::{debug, info, warn};

use crate::lifecycle::Transition;
use crate::model::RetirementResult;
use crate::state::FieldState;

pub trait FormObserver {
    /// A field (or a dependent re-validated because of it) changed.
    fn on_value_changed(&self, _field: &FieldState) {}

    /// Overall validity flipped.
    fn on_validity_changed(&self, _valid: bool) {}

    fn on_transition(&self, _transition: Transition) {}

    fn on_submission_resolved(&self, _result: &RetirementResult) {}

    fn on_submission_failed(&self, _message: &str) {}
}

/// Forwards every hook to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl FormObserver for TracingObserver {
    fn on_value_changed(&self, field: &FieldState) {
        debug!(
            field = %field.name,
            value = ?field.raw_value,
            valid = field.valid,
            reasons = ?field.failure_reasons,
            "field changed"
        );
    }

    fn on_validity_changed(&self, valid: bool) {
        debug!(valid, "form validity changed");
    }

    fn on_transition(&self, transition: Transition) {
        debug!(from = %transition.from, to = %transition.to, "lifecycle transition");
    }

    fn on_submission_resolved(&self, result: &RetirementResult) {
        info!(
            monthly_deposit = result.monthly_deposit,
            future_value = result.future_value,
            "calculation resolved"
        );
    }

    fn on_submission_failed(&self, message: &str) {
        warn!(%message, "calculation failed");
    }
}
