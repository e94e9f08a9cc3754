use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::error::ValidationErrors;
use crate::types::{LoanTerms, PaymentType};

const MAX_RATE_PCT: Decimal = dec!(100);

/// Validate raw loan terms before any computation runs.
///
/// Accumulates every failure into a field-keyed set rather than stopping at
/// the first, so callers can render field-level messages in one pass.
/// Synchronous, side-effect-free, never mutates its input.
pub fn validate_terms(terms: &LoanTerms) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();

    if terms.loan_name.trim().is_empty() {
        errors.push("loan_name", "Loan name is required");
    }
    if terms.lender.trim().is_empty() {
        errors.push("lender", "Lender is required");
    }
    if terms.principal_amount <= Decimal::ZERO {
        errors.push("principal_amount", "Principal must be positive");
    }
    if terms.interest_rate < Decimal::ZERO || terms.interest_rate > MAX_RATE_PCT {
        errors.push("interest_rate", "Interest rate must be between 0 and 100");
    }
    if terms.loan_term_months == 0 {
        errors.push("loan_term_months", "Loan term must be at least 1 month");
    }

    if terms.payment_type == PaymentType::InterestOnly {
        match terms.balloon_date {
            None => errors.push(
                "balloon_date",
                "Balloon date is required for interest-only loans",
            ),
            Some(balloon) => {
                if balloon <= terms.start_date {
                    errors.push("balloon_date", "Balloon date must be after the start date");
                } else if let Some(maturity) = terms.maturity_date() {
                    if balloon > maturity {
                        errors.push(
                            "balloon_date",
                            "Balloon date must be on or before loan maturity",
                        );
                    }
                }
            }
        }
        if let Some(balloon_payment) = terms.balloon_payment {
            if balloon_payment <= Decimal::ZERO {
                errors.push("balloon_payment", "Balloon payment must be positive");
            }
        }
    }
    // Amortizing loans ignore any balloon fields; nothing to check.

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
