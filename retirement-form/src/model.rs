//! Calculator request and response payloads.
//!
//! Example request body:
//! ```json
//! { "currentAge": 30, "retirementAge": 65, "interestRate": 5.25, "lifestyleType": "simple" }
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{FormError, Result};
use crate::fields::{CURRENT_AGE, INTEREST_RATE, LIFESTYLE_TYPE, RETIREMENT_AGE};
use crate::state::{FieldValue, FormValues};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifestyleType {
    Simple,
    Fancy,
}

impl LifestyleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifestyleType::Simple => "simple",
            LifestyleType::Fancy => "fancy",
        }
    }
}

impl fmt::Display for LifestyleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LifestyleType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "simple" => Ok(LifestyleType::Simple),
            "fancy" => Ok(LifestyleType::Fancy),
            other => Err(format!("unknown lifestyle type: {other}")),
        }
    }
}

/// Body of `POST /calculate`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetirementRequest {
    pub current_age: u32,
    pub retirement_age: u32,
    /// Optional in the form; sent as `null` when left blank.
    pub interest_rate: Option<f64>,
    pub lifestyle_type: LifestyleType,
}

impl RetirementRequest {
    /// Build the typed payload from a form snapshot's values.
    pub fn from_values(values: &FormValues) -> Result<Self> {
        Ok(Self {
            current_age: whole_number(values, CURRENT_AGE)?,
            retirement_age: whole_number(values, RETIREMENT_AGE)?,
            interest_rate: optional_number(values, INTEREST_RATE)?,
            lifestyle_type: required(values, LIFESTYLE_TYPE)?
                .to_text()
                .parse()
                .map_err(|_| incomplete(LIFESTYLE_TYPE))?,
        })
    }
}

/// Response body of `POST /calculate`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetirementResult {
    pub current_age: u32,
    pub retirement_age: u32,
    pub interest_rate: Option<f64>,
    pub lifestyle_type: String,
    pub monthly_deposit: f64,
    pub future_value: f64,
}

fn incomplete(field: &str) -> FormError {
    FormError::IncompletePayload {
        field: field.to_string(),
    }
}

fn required<'a>(values: &'a FormValues, field: &str) -> Result<&'a FieldValue> {
    values
        .get(field)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| incomplete(field))
}

fn whole_number(values: &FormValues, field: &str) -> Result<u32> {
    let n = required(values, field)?
        .as_number()
        .ok_or_else(|| incomplete(field))?;
    if n < 0.0 || n.fract() != 0.0 || n > f64::from(u32::MAX) {
        return Err(incomplete(field));
    }
    Ok(n as u32)
}

fn optional_number(values: &FormValues, field: &str) -> Result<Option<f64>> {
    match values.get(field) {
        None => Ok(None),
        Some(v) if v.is_empty() => Ok(None),
        Some(v) => v.as_number().map(Some).ok_or_else(|| incomplete(field)),
    }
}
