//! Terminal-aware tables for fields, verdicts and results.

use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};

use retirement_form::fields::label_for;
use retirement_form::{FieldDescriptor, FieldKind, FieldState, RetirementResult};

/// Result columns, in display order.
const RESULT_COLUMNS: [&str; 6] = [
    "currentAge",
    "retirementAge",
    "interestRate",
    "lifestyleType",
    "monthlyDeposit",
    "futureValue",
];

/// Create a table pre-configured for terminal-width-aware output.
///
/// Uses crossterm to detect the actual terminal width, falling back to
/// 120 columns when not connected to a TTY (piped output, tests).
pub fn new_table() -> Table {
    let width = crossterm::terminal::size()
        .map(|(w, _)| w)
        .unwrap_or(120);

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_width(width);
    table
}

pub fn fields_table(fields: &[FieldDescriptor]) -> Table {
    let mut table = new_table();
    table.set_header(vec!["Field", "Label", "Kind", "Constraints"]);
    for field in fields {
        table.add_row(vec![
            field.name.clone(),
            field.label(),
            kind_summary(&field.kind),
            field
                .constraints
                .iter()
                .map(|c| c.describe())
                .collect::<Vec<_>>()
                .join(", "),
        ]);
    }
    table
}

pub fn verdict_table<'a>(states: impl IntoIterator<Item = &'a FieldState>) -> Table {
    let mut table = new_table();
    table.set_header(vec!["Field", "Value", "Status", "Reasons"]);
    for state in states {
        table.add_row(vec![
            label_for(&state.name),
            state.raw_value.to_text().into_owned(),
            if state.valid { "ok" } else { "invalid" }.to_string(),
            state
                .failure_reasons
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", "),
        ]);
    }
    table
}

pub fn result_table(result: &RetirementResult) -> Table {
    let mut table = new_table();
    table.set_header(RESULT_COLUMNS.iter().map(|c| label_for(c)).collect::<Vec<_>>());
    table.add_row(vec![
        result.current_age.to_string(),
        result.retirement_age.to_string(),
        result
            .interest_rate
            .map(|r| format!("{r:.2}"))
            .unwrap_or_else(|| "-".to_string()),
        result.lifestyle_type.clone(),
        money(result.monthly_deposit),
        money(result.future_value),
    ]);
    table
}

fn kind_summary(kind: &FieldKind) -> String {
    match kind {
        FieldKind::Enum { options } => format!(
            "enum ({})",
            options
                .iter()
                .map(|o| o.value.as_str())
                .collect::<Vec<_>>()
                .join(" | ")
        ),
        other => other.name().to_string(),
    }
}

/// Two decimals with thousands separators.
fn money(amount: f64) -> String {
    let fixed = format!("{:.2}", amount.abs());
    let (whole, cents) = fixed.split_once('.').unwrap_or((&fixed, "00"));
    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    let sign = if amount < 0.0 { "-" } else { "" };
    format!("{sign}{grouped}.{cents}")
}
