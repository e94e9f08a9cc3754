use chrono::NaiveDate;
use clap::Args;
use serde_json::{json, Value};

use loan_engine_core::{projection, schedule, validate, LoanTerms};

use crate::input;

/// Arguments for validating loan terms
#[derive(Args)]
pub struct ValidateArgs {
    /// Path to a JSON loan-terms document (or pipe via stdin)
    #[arg(long)]
    pub input: Option<String>,
}

/// Arguments for schedule generation
#[derive(Args)]
pub struct ScheduleArgs {
    /// Path to a JSON loan-terms document (or pipe via stdin)
    #[arg(long)]
    pub input: Option<String>,
}

/// Arguments for as-of projection
#[derive(Args)]
pub struct ProjectArgs {
    /// Path to a JSON loan-terms document (or pipe via stdin)
    #[arg(long)]
    pub input: Option<String>,

    /// Reference date (ISO-8601), defaults to today
    #[arg(long)]
    pub as_of: Option<NaiveDate>,
}

fn read_terms(input: &Option<String>) -> Result<LoanTerms, Box<dyn std::error::Error>> {
    if let Some(path) = input {
        input::file::read_json(path)
    } else if let Some(data) = input::stdin::read_stdin()? {
        Ok(serde_json::from_value(data)?)
    } else {
        Err("--input file is required (or pipe JSON loan terms via stdin)".into())
    }
}

pub fn run_validate(args: ValidateArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let terms = read_terms(&args.input)?;
    match validate::validate_terms(&terms) {
        Ok(()) => Ok(json!({
            "loan_id": terms.loan_id,
            "valid": true,
            "errors": [],
        })),
        Err(errors) => Ok(json!({
            "loan_id": terms.loan_id,
            "valid": false,
            "errors": errors.errors,
        })),
    }
}

pub fn run_schedule(args: ScheduleArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let terms = read_terms(&args.input)?;
    validate::validate_terms(&terms)
        .map_err(loan_engine_core::LoanEngineError::InvalidTerms)?;
    let result = schedule::generate(&terms)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_project(args: ProjectArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let terms = read_terms(&args.input)?;
    validate::validate_terms(&terms)
        .map_err(loan_engine_core::LoanEngineError::InvalidTerms)?;

    // The core takes an explicit as-of date; "today" is decided here at
    // the CLI boundary, never inside the engine.
    let as_of = args
        .as_of
        .unwrap_or_else(|| chrono::Local::now().date_naive());

    let sched = schedule::generate(&terms)?.result;
    let facts = projection::project(&terms, &sched, as_of);
    Ok(json!({
        "loan_id": terms.loan_id,
        "as_of": as_of,
        "facts": facts,
    }))
}
