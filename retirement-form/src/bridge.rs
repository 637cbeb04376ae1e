//! Change propagation and submission bridge.
//!
//! Subscribers receive [`FormEvent`]s synchronously, in registration order,
//! in the same call that caused them:
//!
//! - `ValuesChanged` after every mutation (edit or reset), no deduplication.
//! - `ValidityChanged` only when overall validity differs from the last
//!   emitted value. The validity computed at construction is the baseline
//!   and is not emitted.
//! - `SubmissionResolved` / `SubmissionFailed` once per settled submission.
//!
//! Submission policy: at most one request is outstanding; `submit` while
//! one is in flight is a no-op. Each request carries a unique ticket id and
//! only the answer for the outstanding ticket is accepted. A reset discards
//! the outstanding ticket, so a response that comes back after a reset is
//! dropped. A response that comes back after further edits, without a
//! reset, is still delivered.
//!
//! The inbound reset token is seeded at construction with the controller's
//! own `reset_token` (or the value given to `with_reset_trigger`); every
//! later change of the token resets the form.

use std::rc::Rc;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::Result;
use crate::fields::FieldSet;
use crate::lifecycle::{Lifecycle, LifecycleState, ResetTrigger, Transition};
use crate::model::{RetirementRequest, RetirementResult};
use crate::observer::FormObserver;
use crate::state::{FieldState, FieldValue, FormSnapshot, FormStore, FormValues};
use crate::transport::{CalculatorTransport, TransportError};

/// Outbound notifications.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "payload", rename_all = "camelCase")]
pub enum FormEvent {
    ValuesChanged(FormValues),
    ValidityChanged(bool),
    SubmissionResolved(RetirementResult),
    SubmissionFailed(String),
}

/// Handle returned by `subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn FnMut(&FormEvent)>;

/// Synchronous fan-out to registered listeners.
#[derive(Default)]
pub(crate) struct EventBus {
    next_id: u64,
    listeners: Vec<(SubscriptionId, Listener)>,
}

impl EventBus {
    pub(crate) fn subscribe(&mut self, listener: impl FnMut(&FormEvent) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub(crate) fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(existing, _)| *existing != id);
        self.listeners.len() != before
    }

    pub(crate) fn emit(&mut self, event: &FormEvent) {
        for (_, listener) in self.listeners.iter_mut() {
            listener(event);
        }
    }
}

/// The most recent settled submission.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionOutcome {
    Resolved(RetirementResult),
    Failed(String),
}

/// An issued request, to be handed back to
/// [`FormController::complete_submission`] with the transport's answer.
#[derive(Debug, PartialEq)]
pub struct SubmissionTicket {
    id: u64,
    request: RetirementRequest,
}

impl SubmissionTicket {
    pub fn request(&self) -> &RetirementRequest {
        &self.request
    }

    pub fn id(&self) -> u64 {
        self.id
    }
}

/// The form as a parent view sees it: state store, lifecycle and
/// submission handling behind one handle.
pub struct FormController {
    store: FormStore,
    lifecycle: Lifecycle,
    observer: Option<Rc<dyn FormObserver>>,
    next_ticket: u64,
    in_flight: Option<u64>,
    outcome: Option<SubmissionOutcome>,
    reset_token: bool,
    reset_trigger: ResetTrigger,
}

impl FormController {
    pub fn new(fields: FieldSet) -> Self {
        let reset_token = false;
        Self {
            store: FormStore::new(Arc::new(fields)),
            lifecycle: Lifecycle::new(),
            observer: None,
            next_ticket: 0,
            in_flight: None,
            outcome: None,
            reset_token,
            reset_trigger: ResetTrigger::seeded(reset_token),
        }
    }

    /// Controller over the built-in retirement inputs.
    pub fn retirement() -> Self {
        Self::new(FieldSet::retirement())
    }

    pub fn with_observer(mut self, observer: Rc<dyn FormObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Seed the inbound reset token with the parent's construction-time
    /// value. That value never resets the form.
    pub fn with_reset_trigger(mut self, initial: bool) -> Self {
        self.reset_trigger = ResetTrigger::seeded(initial);
        self
    }

    // --- Reads ---

    pub fn fields(&self) -> &FieldSet {
        self.store.fields()
    }

    pub fn field(&self, name: &str) -> Option<&FieldState> {
        self.store.field(name)
    }

    pub fn snapshot(&self) -> FormSnapshot {
        self.store.current_snapshot()
    }

    pub fn is_valid(&self) -> bool {
        self.store.is_valid()
    }

    pub fn state(&self) -> LifecycleState {
        self.lifecycle.state()
    }

    pub fn outcome(&self) -> Option<&SubmissionOutcome> {
        self.outcome.as_ref()
    }

    pub fn is_submitting(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Flipped by every `clear()`; views key child re-initialization on it.
    pub fn reset_token(&self) -> bool {
        self.reset_token
    }

    // --- Subscriptions ---

    pub fn subscribe(&mut self, listener: impl FnMut(&FormEvent) + 'static) -> SubscriptionId {
        self.store.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.store.unsubscribe(id)
    }

    // --- Editing ---

    pub fn set_value(&mut self, name: &str, value: impl Into<FieldValue>) -> Result<FormSnapshot> {
        let was_valid = self.store.is_valid();
        let snapshot = self.store.set_value(name, value.into())?;

        if let Some(observer) = &self.observer {
            let dependents = self.store.dependents().closure(name);
            let touched = std::iter::once(name).chain(dependents.iter().map(String::as_str));
            for field in touched.filter_map(|n| self.store.field(n)) {
                observer.on_value_changed(field);
            }
            if snapshot.valid != was_valid {
                observer.on_validity_changed(snapshot.valid);
            }
        }

        let transitions = self.lifecycle.on_edit(snapshot.valid);
        self.report(transitions);
        Ok(snapshot)
    }

    /// Inbound reset token. Resets the form when `token` differs from the
    /// last token seen, starting from the seeded value.
    pub fn apply_reset_trigger(&mut self, token: bool) -> bool {
        if !self.reset_trigger.observe(token) {
            return false;
        }
        self.reset_form();
        true
    }

    /// Reset the form, drop any held result or error, and flip the reset token.
    pub fn clear(&mut self) {
        self.reset_form();
        self.outcome = None;
        self.reset_token = !self.reset_token;
    }

    // --- Submission ---

    /// Issue a request for the current values. `None` when the form is
    /// invalid or a request is already in flight.
    pub fn begin_submit(&mut self) -> Result<Option<SubmissionTicket>> {
        if let Some(ticket) = self.in_flight {
            debug!(ticket, "submission already in flight; ignoring submit");
            return Ok(None);
        }
        let snapshot = self.store.current_snapshot();
        if !snapshot.valid {
            debug!("form invalid; ignoring submit");
            return Ok(None);
        }

        let request = RetirementRequest::from_values(&snapshot.values)?;
        let id = self.next_ticket;
        self.next_ticket += 1;
        self.in_flight = Some(id);
        let transition = self.lifecycle.on_submit();
        self.report(transition);

        Ok(Some(SubmissionTicket { id, request }))
    }

    /// Route the transport's answer for `ticket`. Returns false, and changes
    /// nothing, unless `ticket` is the outstanding request.
    pub fn complete_submission(
        &mut self,
        ticket: SubmissionTicket,
        result: std::result::Result<RetirementResult, TransportError>,
    ) -> bool {
        if self.in_flight != Some(ticket.id) {
            debug!(
                ticket = ticket.id,
                outstanding = ?self.in_flight,
                "dropping response for a request that is no longer outstanding"
            );
            return false;
        }
        self.in_flight = None;

        let (event, succeeded) = match result {
            Ok(result) => {
                if let Some(observer) = &self.observer {
                    observer.on_submission_resolved(&result);
                }
                self.outcome = Some(SubmissionOutcome::Resolved(result.clone()));
                (FormEvent::SubmissionResolved(result), true)
            }
            Err(err) => {
                let message = err.user_message();
                warn!(error = %err, %message, "calculation request failed");
                if let Some(observer) = &self.observer {
                    observer.on_submission_failed(&message);
                }
                self.outcome = Some(SubmissionOutcome::Failed(message.clone()));
                (FormEvent::SubmissionFailed(message), false)
            }
        };

        self.store.emit(&event);
        let transition = self.lifecycle.on_settled(succeeded);
        self.report(transition);
        true
    }

    /// Submit the current values through `transport` and wait for the answer.
    /// Returns the settled outcome, or `None` when submit was a no-op.
    pub async fn submit(
        &mut self,
        transport: &dyn CalculatorTransport,
    ) -> Result<Option<SubmissionOutcome>> {
        let Some(ticket) = self.begin_submit()? else {
            return Ok(None);
        };
        let result = transport.calculate(ticket.request()).await;
        self.complete_submission(ticket, result);
        Ok(self.outcome.clone())
    }

    // --- Internal ---

    fn reset_form(&mut self) {
        let was_valid = self.store.is_valid();
        self.store.reset();
        if let Some(ticket) = self.in_flight.take() {
            debug!(ticket, "discarding in-flight submission on reset");
        }

        if let Some(observer) = &self.observer {
            if was_valid != self.store.is_valid() {
                observer.on_validity_changed(self.store.is_valid());
            }
        }
        let transition = self.lifecycle.reset();
        self.report(transition);
    }

    fn report(&self, transitions: impl IntoIterator<Item = Transition>) {
        if let Some(observer) = &self.observer {
            for transition in transitions {
                observer.on_transition(transition);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::{CURRENT_AGE, INTEREST_RATE, LIFESTYLE_TYPE, RETIREMENT_AGE};
    use crate::model::LifestyleType;
    use async_trait::async_trait;
    use serde_json::json;
    use std::cell::RefCell;
    use std::sync::Mutex;

    struct FakeCalculator {
        calls: Mutex<Vec<RetirementRequest>>,
        fail_with: Option<serde_json::Value>,
    }

    impl FakeCalculator {
        fn ok() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                fail_with: None,
            }
        }

        fn failing(payload: serde_json::Value) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                fail_with: Some(payload),
            }
        }

        fn calls(&self) -> Vec<RetirementRequest> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CalculatorTransport for FakeCalculator {
        async fn calculate(
            &self,
            request: &RetirementRequest,
        ) -> std::result::Result<RetirementResult, TransportError> {
            self.calls.lock().unwrap().push(request.clone());
            match &self.fail_with {
                Some(payload) => Err(TransportError::Payload(payload.clone())),
                None => Ok(projection(request)),
            }
        }
    }

    fn projection(request: &RetirementRequest) -> RetirementResult {
        RetirementResult {
            current_age: request.current_age,
            retirement_age: request.retirement_age,
            interest_rate: request.interest_rate,
            lifestyle_type: request.lifestyle_type.to_string(),
            monthly_deposit: 1000.0,
            future_value: 1_140_826.14,
        }
    }

    fn filled() -> FormController {
        let mut form = FormController::retirement();
        form.set_value(CURRENT_AGE, "30").unwrap();
        form.set_value(RETIREMENT_AGE, "65").unwrap();
        form.set_value(INTEREST_RATE, "5.25").unwrap();
        form.set_value(LIFESTYLE_TYPE, "simple").unwrap();
        form
    }

    #[derive(Default)]
    struct Recording {
        transitions: RefCell<Vec<Transition>>,
        validity: RefCell<Vec<bool>>,
        changed: RefCell<Vec<String>>,
        failures: RefCell<Vec<String>>,
    }

    impl FormObserver for Recording {
        fn on_value_changed(&self, field: &FieldState) {
            self.changed.borrow_mut().push(field.name.clone());
        }
        fn on_validity_changed(&self, valid: bool) {
            self.validity.borrow_mut().push(valid);
        }
        fn on_transition(&self, transition: Transition) {
            self.transitions.borrow_mut().push(transition);
        }
        fn on_submission_failed(&self, message: &str) {
            self.failures.borrow_mut().push(message.to_string());
        }
    }

    #[test]
    fn event_bus_delivers_in_registration_order() {
        let mut bus = EventBus::default();
        let order = Rc::new(RefCell::new(Vec::new()));
        let (a, b) = (order.clone(), order.clone());
        bus.subscribe(move |_| a.borrow_mut().push("a"));
        bus.subscribe(move |_| b.borrow_mut().push("b"));
        bus.emit(&FormEvent::ValidityChanged(true));
        assert_eq!(*order.borrow(), vec!["a", "b"]);
    }

    #[test]
    fn lifecycle_follows_edits() {
        let mut form = FormController::retirement();
        assert_eq!(form.state(), LifecycleState::Pristine);
        form.set_value(CURRENT_AGE, "30").unwrap();
        assert_eq!(form.state(), LifecycleState::Invalid);
        let form = {
            let mut f = filled();
            f.set_value(INTEREST_RATE, "").unwrap();
            f
        };
        assert_eq!(form.state(), LifecycleState::Valid);
    }

    #[tokio::test]
    async fn submit_forwards_exact_payload() {
        let mut form = filled();
        let calculator = FakeCalculator::ok();
        let outcome = form.submit(&calculator).await.unwrap();

        assert_eq!(
            calculator.calls(),
            vec![RetirementRequest {
                current_age: 30,
                retirement_age: 65,
                interest_rate: Some(5.25),
                lifestyle_type: LifestyleType::Simple,
            }]
        );
        assert!(matches!(outcome, Some(SubmissionOutcome::Resolved(_))));
        assert_eq!(form.state(), LifecycleState::Resolved);
        assert!(!form.is_submitting());
    }

    #[tokio::test]
    async fn submit_while_invalid_is_a_no_op() {
        let mut form = FormController::retirement();
        form.set_value(CURRENT_AGE, "30").unwrap();
        form.set_value(RETIREMENT_AGE, "25").unwrap();

        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = events.clone();
        form.subscribe(move |e| sink.borrow_mut().push(e.clone()));

        let calculator = FakeCalculator::ok();
        assert_eq!(form.submit(&calculator).await.unwrap(), None);
        assert!(calculator.calls().is_empty());
        assert!(events.borrow().is_empty());
        assert_eq!(form.state(), LifecycleState::Invalid);
    }

    #[tokio::test]
    async fn transport_failure_surfaces_nested_message() {
        let mut form = filled();
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = events.clone();
        form.subscribe(move |e| sink.borrow_mut().push(e.clone()));

        let calculator =
            FakeCalculator::failing(json!({ "error": { "message": "service unavailable" } }));
        form.submit(&calculator).await.unwrap();

        assert_eq!(
            *events.borrow(),
            vec![FormEvent::SubmissionFailed("service unavailable".into())]
        );
        assert_eq!(form.state(), LifecycleState::Failed);
        assert_eq!(
            form.outcome(),
            Some(&SubmissionOutcome::Failed("service unavailable".into()))
        );
        // Still editable after a failure
        form.set_value(INTEREST_RATE, "4").unwrap();
        assert_eq!(form.state(), LifecycleState::Valid);
    }

    #[test]
    fn second_submit_while_in_flight_is_rejected() {
        let mut form = filled();
        let first = form.begin_submit().unwrap();
        assert!(first.is_some());
        assert!(form.is_submitting());
        assert!(form.begin_submit().unwrap().is_none());
    }

    #[test]
    fn response_after_reset_is_dropped() {
        let mut form = filled();
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = events.clone();
        form.subscribe(move |e| sink.borrow_mut().push(e.clone()));

        let ticket = form.begin_submit().unwrap().unwrap();
        form.clear();
        let request = ticket.request().clone();
        assert!(!form.complete_submission(ticket, Ok(projection(&request))));

        assert_eq!(form.state(), LifecycleState::Pristine);
        assert!(form.outcome().is_none());
        assert!(!events
            .borrow()
            .iter()
            .any(|e| matches!(e, FormEvent::SubmissionResolved(_))));
    }

    #[test]
    fn response_after_edit_is_still_delivered() {
        let mut form = filled();
        let ticket = form.begin_submit().unwrap().unwrap();
        form.set_value(INTEREST_RATE, "6").unwrap();
        assert_eq!(form.state(), LifecycleState::Valid);

        let request = ticket.request().clone();
        assert!(form.complete_submission(ticket, Ok(projection(&request))));
        assert!(matches!(
            form.outcome(),
            Some(SubmissionOutcome::Resolved(r)) if r.interest_rate == Some(5.25)
        ));
        assert_eq!(form.state(), LifecycleState::Valid);
        assert!(!form.is_submitting());
    }

    #[tokio::test]
    async fn clear_resets_everything_and_flips_token() {
        let mut form = filled();
        form.submit(&FakeCalculator::ok()).await.unwrap();
        assert!(form.outcome().is_some());

        let token = form.reset_token();
        form.clear();
        assert_eq!(form.reset_token(), !token);
        assert!(form.outcome().is_none());
        assert_eq!(form.state(), LifecycleState::Pristine);
        assert_eq!(form.snapshot(), FormController::retirement().snapshot());
    }

    #[test]
    fn reset_trigger_ignores_unchanged_token() {
        let mut form = FormController::retirement();
        assert!(!form.apply_reset_trigger(false));
        form.set_value(CURRENT_AGE, "30").unwrap();
        assert!(!form.apply_reset_trigger(false));
        assert_eq!(form.field(CURRENT_AGE).unwrap().raw_value, FieldValue::from("30"));

        assert!(form.apply_reset_trigger(true));
        assert!(form.field(CURRENT_AGE).unwrap().raw_value.is_empty());
        assert_eq!(form.state(), LifecycleState::Pristine);
    }

    #[test]
    fn first_token_flip_after_construction_resets() {
        let mut form = FormController::retirement();
        form.set_value(CURRENT_AGE, "30").unwrap();

        assert!(form.apply_reset_trigger(true));
        assert!(form.field(CURRENT_AGE).unwrap().raw_value.is_empty());
        assert_eq!(form.state(), LifecycleState::Pristine);
    }

    #[test]
    fn seeded_reset_trigger_skips_construction_value() {
        let mut form = FormController::retirement().with_reset_trigger(true);
        form.set_value(CURRENT_AGE, "30").unwrap();

        assert!(!form.apply_reset_trigger(true));
        assert_eq!(form.field(CURRENT_AGE).unwrap().raw_value, FieldValue::from("30"));
        assert!(form.apply_reset_trigger(false));
        assert!(form.field(CURRENT_AGE).unwrap().raw_value.is_empty());
    }

    #[test]
    fn only_the_outstanding_ticket_is_accepted() {
        let mut form = filled();
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = events.clone();
        form.subscribe(move |e| sink.borrow_mut().push(e.clone()));

        let first = form.begin_submit().unwrap().unwrap();
        let request = first.request().clone();
        assert!(form.complete_submission(first, Ok(projection(&request))));

        let second = form.begin_submit().unwrap().unwrap();
        let late = SubmissionTicket {
            id: 0,
            request: request.clone(),
        };
        assert!(!form.complete_submission(late, Ok(projection(&request))));

        // The newer request is still outstanding.
        assert!(form.is_submitting());
        assert_eq!(form.state(), LifecycleState::Submitting);
        assert!(form.begin_submit().unwrap().is_none());
        let resolved = events
            .borrow()
            .iter()
            .filter(|e| matches!(e, FormEvent::SubmissionResolved(_)))
            .count();
        assert_eq!(resolved, 1);

        assert!(form.complete_submission(second, Ok(projection(&request))));
        assert!(!form.is_submitting());
        assert_eq!(form.state(), LifecycleState::Resolved);
    }

    #[test]
    fn ticket_ids_are_unique() {
        let mut form = filled();
        let first = form.begin_submit().unwrap().unwrap();
        let first_id = first.id();
        form.complete_submission(first, Err(TransportError::Payload(json!({}))));
        let second = form.begin_submit().unwrap().unwrap();
        assert_ne!(second.id(), first_id);
    }

    #[test]
    fn clear_notifies_subscribers() {
        let mut form = filled();
        assert!(form.is_valid());
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = events.clone();
        form.subscribe(move |e| sink.borrow_mut().push(e.clone()));

        form.clear();

        let empty: FormValues = [CURRENT_AGE, RETIREMENT_AGE, INTEREST_RATE, LIFESTYLE_TYPE]
            .into_iter()
            .map(|name| (name.to_string(), FieldValue::Empty))
            .collect();
        assert_eq!(
            *events.borrow(),
            vec![
                FormEvent::ValuesChanged(empty),
                FormEvent::ValidityChanged(false),
            ]
        );

        // Already invalid: a second clear only reports values.
        form.clear();
        assert_eq!(events.borrow().len(), 3);
        assert!(matches!(events.borrow()[2], FormEvent::ValuesChanged(_)));
    }

    #[test]
    fn observer_sees_transitions_and_dependents() {
        let recording = Rc::new(Recording::default());
        let mut form = FormController::retirement().with_observer(recording.clone());

        form.set_value(RETIREMENT_AGE, "25").unwrap();
        form.set_value(CURRENT_AGE, "30").unwrap();
        assert_eq!(
            *recording.changed.borrow(),
            vec![RETIREMENT_AGE, CURRENT_AGE, RETIREMENT_AGE]
        );

        form.set_value(CURRENT_AGE, "20").unwrap();
        form.set_value(LIFESTYLE_TYPE, "fancy").unwrap();
        assert_eq!(*recording.validity.borrow(), vec![true]);

        form.clear();
        assert_eq!(*recording.validity.borrow(), vec![true, false]);
        let last = *recording.transitions.borrow().last().unwrap();
        assert_eq!(last.to, LifecycleState::Pristine);
    }

    #[tokio::test]
    async fn observer_sees_failures() {
        let recording = Rc::new(Recording::default());
        let mut form = filled().with_observer(recording.clone());
        form.submit(&FakeCalculator::failing(json!({ "status": 0 })))
            .await
            .unwrap();
        assert_eq!(
            *recording.failures.borrow(),
            vec![crate::transport::DEFAULT_FAILURE_MESSAGE.to_string()]
        );
    }

    #[test]
    fn events_serialize_with_tag() {
        let json = serde_json::to_value(FormEvent::ValidityChanged(true)).unwrap();
        assert_eq!(json, json!({ "event": "validityChanged", "payload": true }));
    }
}
