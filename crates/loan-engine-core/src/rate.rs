use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::error::LoanEngineError;
use crate::types::{PaymentFrequency, Percent, Rate};
use crate::LoanEngineResult;

const HUNDRED: Decimal = dec!(100);

/// Periodic view of a loan's annual nominal rate and term.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodicTerms {
    /// Per-period rate as a decimal fraction (0.005 for 6% monthly).
    pub periodic_rate: Rate,
    pub periods_per_year: u32,
    pub total_periods: u32,
}

/// Convert an annual nominal percentage rate and payment frequency into the
/// periodic rate and period count driving schedule generation.
///
/// A zero rate yields a zero periodic rate; downstream formulas carry the
/// explicit zero-rate branch.
pub fn convert(
    interest_rate: Percent,
    frequency: PaymentFrequency,
    loan_term_months: u32,
) -> LoanEngineResult<PeriodicTerms> {
    if interest_rate < Decimal::ZERO {
        return Err(LoanEngineError::InvalidInput {
            field: "interest_rate".into(),
            reason: "Interest rate cannot be negative".into(),
        });
    }
    if loan_term_months == 0 {
        return Err(LoanEngineError::InvalidInput {
            field: "loan_term_months".into(),
            reason: "Loan term must be at least 1 month".into(),
        });
    }

    let periods_per_year = frequency.periods_per_year();
    let months_per_period = frequency.months_per_period();
    let total_periods = loan_term_months.div_ceil(months_per_period);

    let periodic_rate = interest_rate / HUNDRED / Decimal::from(periods_per_year);

    Ok(PeriodicTerms {
        periodic_rate,
        periods_per_year,
        total_periods,
    })
}
