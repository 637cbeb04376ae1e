//! Command handlers.
//!
//! `check` and `calculate` report `Ok(false)` for an invalid form or a failed
//! calculation; `main` maps that to exit code 1.

use std::path::Path;
use std::rc::Rc;

use anyhow::Context;
use tracing::debug;

use retirement_form::{
    CalculatorConfig, FieldSet, FormController, HttpCalculator, SubmissionOutcome,
    TracingObserver, CURRENT_AGE, INTEREST_RATE, LIFESTYLE_TYPE, RETIREMENT_AGE,
};

use crate::cli::PlanArgs;
use crate::table;

pub fn run_fields(json: bool) -> anyhow::Result<()> {
    let fields = FieldSet::retirement();
    if json {
        let output = serde_json::json!({ "fields": fields.all() });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("{}", table::fields_table(fields.all()));
    }
    Ok(())
}

pub fn run_check(plan: &PlanArgs) -> anyhow::Result<bool> {
    let form = fill_form(plan)?;
    print_verdicts(&form);
    Ok(form.is_valid())
}

pub async fn run_calculate(
    plan: &PlanArgs,
    config_path: Option<&Path>,
    url: Option<&str>,
) -> anyhow::Result<bool> {
    let mut form = fill_form(plan)?;
    if !form.is_valid() {
        print_verdicts(&form);
        eprintln!("Error: the plan has invalid inputs; nothing was submitted");
        return Ok(false);
    }

    let mut config =
        CalculatorConfig::load(config_path).context("failed to load calculator configuration")?;
    if let Some(url) = url {
        config.base_url = url.to_string();
    }
    let calculator = HttpCalculator::new(&config);
    debug!(url = calculator.url(), "submitting plan");

    match form.submit(&calculator).await? {
        Some(SubmissionOutcome::Resolved(result)) => {
            println!("{}", table::result_table(&result));
            Ok(true)
        }
        Some(SubmissionOutcome::Failed(message)) => {
            eprintln!("Error: {message}");
            Ok(false)
        }
        None => Ok(false),
    }
}

/// Feed the provided inputs into a fresh form, in field order. Fields left
/// out on the command line stay untouched.
fn fill_form(plan: &PlanArgs) -> anyhow::Result<FormController> {
    let mut form = FormController::retirement().with_observer(Rc::new(TracingObserver));
    let inputs = [
        (CURRENT_AGE, &plan.current_age),
        (RETIREMENT_AGE, &plan.retirement_age),
        (INTEREST_RATE, &plan.interest_rate),
        (LIFESTYLE_TYPE, &plan.lifestyle),
    ];
    for (name, value) in inputs {
        if let Some(value) = value {
            form.set_value(name, value.trim())?;
        }
    }
    Ok(form)
}

fn print_verdicts(form: &FormController) {
    let states = form.fields().names().filter_map(|name| form.field(name));
    println!("{}", table::verdict_table(states));
    println!(
        "Form is {}",
        if form.is_valid() { "valid" } else { "invalid" }
    );
}
