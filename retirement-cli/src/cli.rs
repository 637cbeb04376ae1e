//! CLI definition for the retirement planner.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Retirement planner - validate plan inputs and run the calculator.
///
/// Calculator location defaults to http://localhost:8080/retirement-plans.
/// Override with RETIREMENT_BASE_URL, a YAML config file or --url.
#[derive(Parser, Debug)]
#[command(name = "retirement")]
#[command(version)]
#[command(about = "Validate retirement plan inputs and calculate the plan")]
#[command(
    long_about = "Runs plan inputs through the retirement form: every field is validated, \
    including the rule that the retirement age must be above the current age. A valid form \
    can be submitted to the calculator service.\n\n\
    Environment variables:\n  \
    RETIREMENT_BASE_URL        Override the calculator base URL\n  \
    RETIREMENT_CALCULATE_PATH  Override the calculate endpoint path"
)]
pub struct Cli {
    /// Enable debug output to stderr
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// YAML configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the form's fields and their constraints
    Fields {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate plan inputs without submitting them
    Check {
        #[command(flatten)]
        plan: PlanArgs,
    },

    /// Validate plan inputs and submit them to the calculator
    Calculate {
        #[command(flatten)]
        plan: PlanArgs,

        /// Calculator base URL, overriding configuration
        #[arg(long, value_name = "URL")]
        url: Option<String>,
    },
}

/// Raw plan inputs, passed to the form exactly as typed.
#[derive(Args, Debug, Clone, Default)]
pub struct PlanArgs {
    /// Current age in whole years
    #[arg(long, value_name = "AGE", allow_hyphen_values = true)]
    pub current_age: Option<String>,

    /// Planned retirement age in whole years
    #[arg(long, value_name = "AGE", allow_hyphen_values = true)]
    pub retirement_age: Option<String>,

    /// Expected yearly interest rate in percent, up to two decimals
    #[arg(long, value_name = "RATE", allow_hyphen_values = true)]
    pub interest_rate: Option<String>,

    /// Lifestyle type (simple or fancy)
    #[arg(long, value_name = "TYPE")]
    pub lifestyle: Option<String>,
}
