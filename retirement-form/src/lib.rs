//! Reactive form engine for the retirement planner
//!
//! `retirement-form` owns the input side of the planner: a declarative set of
//! field descriptors, synchronous validation (including cross-field rules),
//! the live form state, and the bridge that turns a valid snapshot into a
//! calculator request and routes the answer back to subscribers.
//!
//! # Architecture
//!
//! - **Declarative fields**: A [`FieldSet`] describes every input and its constraints, in code or YAML
//! - **Derived snapshot**: Overall validity is recomputed from field states, never stored
//! - **Dependency-aware**: Changing a field re-validates every field whose cross-field rule reads it
//! - **Synchronous events**: Subscribers are notified in registration order before a mutation returns
//! - **Pluggable transport**: The calculator sits behind [`CalculatorTransport`]; [`HttpCalculator`] is the default
//!
//! ```no_run
//! use retirement_form::{FormController, HttpCalculator, CalculatorConfig};
//!
//! # async fn run() -> retirement_form::Result<()> {
//! let mut form = FormController::retirement();
//! form.set_value("currentAge", "30")?;
//! form.set_value("retirementAge", "65")?;
//! form.set_value("lifestyleType", "simple")?;
//!
//! let calculator = HttpCalculator::new(&CalculatorConfig::load(None)?);
//! let outcome = form.submit(&calculator).await?;
//! # Ok(())
//! # }
//! ```

pub mod bridge;
pub mod config;
pub mod error;
pub mod fields;
pub mod lifecycle;
pub mod model;
pub mod observer;
pub mod state;
pub mod transport;
pub mod validation;

pub use bridge::{FormController, FormEvent, SubmissionOutcome, SubmissionTicket, SubscriptionId};
pub use config::CalculatorConfig;
pub use error::{FormError, Result};
pub use fields::{
    Comparison, Constraint, EnumOption, FieldDescriptor, FieldKind, FieldSet, CURRENT_AGE,
    INTEREST_RATE, LIFESTYLE_TYPE, RETIREMENT_AGE,
};
pub use lifecycle::{DependencyMap, Lifecycle, LifecycleState, ResetTrigger, Transition};
pub use model::{LifestyleType, RetirementRequest, RetirementResult};
pub use observer::{FormObserver, TracingObserver};
pub use state::{FieldState, FieldValue, FormSnapshot, FormStore, FormValues};
pub use transport::{CalculatorTransport, HttpCalculator, TransportError, DEFAULT_FAILURE_MESSAGE};
pub use validation::{FailureReason, ValidationEngine, ValidationVerdict};
