use chrono::NaiveDate;
use clap::Args;
use serde_json::Value;

use loan_engine_core::service::{LoanService, MemoryLoanStore};
use loan_engine_core::LoanTerms;

use crate::input;

/// Arguments for portfolio aggregation
#[derive(Args)]
pub struct PortfolioArgs {
    /// Path to a JSON array of loan-terms documents (or pipe via stdin)
    #[arg(long)]
    pub input: Option<String>,

    /// Reference date (ISO-8601), defaults to today
    #[arg(long)]
    pub as_of: Option<NaiveDate>,
}

pub fn run_portfolio(args: PortfolioArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let loans: Vec<LoanTerms> = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        return Err("--input file is required (or pipe a JSON array of loan terms via stdin)".into());
    };

    let as_of = args
        .as_of
        .unwrap_or_else(|| chrono::Local::now().date_naive());

    let mut service = LoanService::new(MemoryLoanStore::default());
    for terms in loans {
        service.upsert_loan(terms)?;
    }

    let summary = service.portfolio_summary(as_of)?;
    Ok(serde_json::to_value(summary)?)
}
