use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::types::*;

/// Derive the point-in-time facts for one loan against an explicit as-of
/// date. The core never reads the wall clock; "today" is always a caller
/// decision.
pub fn project(terms: &LoanTerms, schedule: &PaymentSchedule, as_of: NaiveDate) -> ProjectedFacts {
    let payments_made = schedule
        .entries
        .iter()
        .take_while(|e| e.payment_date <= as_of)
        .count();
    let payments_remaining = schedule.len() - payments_made;

    // Before the first payment date the full principal is outstanding.
    let current_balance = if payments_made == 0 {
        terms.principal_amount
    } else {
        schedule.entries[payments_made - 1].remaining_balance
    };

    let next_due = schedule.entries.get(payments_made);
    let next_payment_date = next_due.map(|e| e.payment_date);

    // Normalize the regular periodic payment to a monthly-equivalent figure
    // so loans of different frequencies can be summed. A balloon is not a
    // regular payment: for interest-only loans the periodic obligation is
    // the interest, even on the row where the principal falls due. An
    // exhausted schedule contributes nothing to forward-looking totals.
    let months_per_period = Decimal::from(terms.payment_frequency.months_per_period());
    let monthly_payment_amount = match next_due {
        Some(entry) => {
            let periodic = match terms.payment_type {
                PaymentType::Amortizing => entry.payment_amount,
                PaymentType::InterestOnly => entry.interest_payment,
            };
            round_money(periodic / months_per_period)
        }
        None => Decimal::ZERO,
    };

    ProjectedFacts {
        current_balance,
        next_payment_date,
        payments_made: payments_made as u32,
        payments_remaining: payments_remaining as u32,
        monthly_payment_amount,
    }
}
