use chrono::{Months, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use serde_json::json;
use std::time::Instant;

use crate::error::LoanEngineError;
use crate::rate::{self, PeriodicTerms};
use crate::types::*;
use crate::LoanEngineResult;

/// Generate the full payment schedule for a validated set of loan terms.
///
/// Pure and deterministic: the same terms always produce an identical
/// schedule. Malformed terms are the ValidationGate's problem; failures
/// here indicate an internal invariant violation and surface as
/// `ScheduleGeneration` errors rather than a truncated schedule.
pub fn generate(terms: &LoanTerms) -> LoanEngineResult<ComputationOutput<PaymentSchedule>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let periodic = rate::convert(
        terms.interest_rate,
        terms.payment_frequency,
        terms.loan_term_months,
    )?;
    if periodic.total_periods == 0 {
        return Err(internal(terms, "computed total_periods is zero"));
    }

    let entries = match terms.payment_type {
        PaymentType::Amortizing => amortizing_entries(terms, &periodic)?,
        PaymentType::InterestOnly => interest_only_entries(terms, &periodic, &mut warnings)?,
    };

    // The last row must zero the balance exactly. Anything else is a bug,
    // never something to hand back to a caller.
    match entries.last() {
        Some(last) if last.remaining_balance == Decimal::ZERO => {}
        Some(last) => {
            return Err(internal(
                terms,
                &format!("final balance is {}, expected 0", last.remaining_balance),
            ))
        }
        None => return Err(internal(terms, "generated an empty schedule")),
    }

    let schedule = PaymentSchedule {
        loan_id: terms.loan_id.clone(),
        entries,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Loan Amortization Schedule",
        &json!({
            "loan_id": terms.loan_id,
            "payment_type": terms.payment_type,
            "payment_frequency": terms.payment_frequency,
            "periodic_rate": periodic.periodic_rate.to_string(),
            "total_periods": periodic.total_periods,
            "rounding": "2dp per period, final period absorbs drift",
        }),
        warnings,
        elapsed,
        schedule,
    ))
}

/// Level-payment schedule: `P·r / (1 − (1+r)^−n)`, with the final period
/// forced to repay the exact remaining balance so accumulated rounding
/// lands there instead of leaving a residual cent.
fn amortizing_entries(
    terms: &LoanTerms,
    periodic: &PeriodicTerms,
) -> LoanEngineResult<Vec<PaymentScheduleEntry>> {
    let r = periodic.periodic_rate;
    let n = periodic.total_periods;
    let n_dec = Decimal::from(n);

    let level_payment = if r.is_zero() {
        round_money(terms.principal_amount / n_dec)
    } else {
        let factor = (Decimal::ONE + r).powd(n_dec);
        let annuity_factor = (factor - Decimal::ONE) / r;
        if annuity_factor.is_zero() {
            return Err(internal(terms, "annuity factor is zero"));
        }
        round_money(terms.principal_amount * factor / annuity_factor)
    };

    let mut entries = Vec::with_capacity(n as usize);
    let mut balance = terms.principal_amount;

    for number in 1..=n {
        let interest = round_money(balance * r);
        let principal = if number == n {
            balance
        } else {
            (level_payment - interest).min(balance)
        };
        balance -= principal;

        entries.push(PaymentScheduleEntry {
            payment_number: number,
            payment_date: payment_date(terms, number)?,
            payment_amount: principal + interest,
            principal_payment: principal,
            interest_payment: interest,
            remaining_balance: balance,
        });
    }

    Ok(entries)
}

/// Interest-only rows until the period containing `balloon_date`, then a
/// single balloon row repaying the full remaining principal.
fn interest_only_entries(
    terms: &LoanTerms,
    periodic: &PeriodicTerms,
    warnings: &mut Vec<String>,
) -> LoanEngineResult<Vec<PaymentScheduleEntry>> {
    let balloon_date = terms
        .balloon_date
        .ok_or_else(|| internal(terms, "interest-only loan reached generation without a balloon date"))?;

    let r = periodic.periodic_rate;
    let balance = terms.principal_amount;
    let mut entries = Vec::new();

    for number in 1..=periodic.total_periods {
        let date = payment_date(terms, number)?;
        let interest = round_money(balance * r);

        if date < balloon_date {
            entries.push(PaymentScheduleEntry {
                payment_number: number,
                payment_date: date,
                payment_amount: interest,
                principal_payment: Decimal::ZERO,
                interest_payment: interest,
                remaining_balance: balance,
            });
            continue;
        }

        // Balloon period: the full remaining principal falls due. A supplied
        // balloon_payment that disagrees is reconciled to the computed value
        // and surfaced, so the schedule still zeroes out.
        if let Some(supplied) = terms.balloon_payment {
            if supplied != balance {
                warnings.push(format!(
                    "Supplied balloon_payment {} differs from computed remaining principal {}; using the computed value",
                    supplied, balance
                ));
            }
        }

        entries.push(PaymentScheduleEntry {
            payment_number: number,
            payment_date: date,
            payment_amount: balance + interest,
            principal_payment: balance,
            interest_payment: interest,
            remaining_balance: Decimal::ZERO,
        });
        return Ok(entries);
    }

    Err(internal(
        terms,
        "balloon date was never reached within the loan term",
    ))
}

fn payment_date(terms: &LoanTerms, payment_number: u32) -> LoanEngineResult<NaiveDate> {
    let months = payment_number * terms.payment_frequency.months_per_period();
    terms
        .start_date
        .checked_add_months(Months::new(months))
        .ok_or_else(|| {
            LoanEngineError::DateError(format!(
                "payment date overflow for loan '{}' at period {}",
                terms.loan_id, payment_number
            ))
        })
}

fn internal(terms: &LoanTerms, reason: &str) -> LoanEngineError {
    LoanEngineError::ScheduleGeneration {
        loan_id: terms.loan_id.clone(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn mortgage_terms() -> LoanTerms {
        LoanTerms {
            loan_id: "L-100".into(),
            loan_name: "HQ Mortgage".into(),
            lender: "First National".into(),
            loan_type: "mortgage".into(),
            principal_amount: dec!(120_000),
            interest_rate: dec!(6.0),
            loan_term_months: 360,
            start_date: date(2024, 1, 1),
            payment_type: PaymentType::Amortizing,
            payment_frequency: PaymentFrequency::Monthly,
            balloon_payment: None,
            balloon_date: None,
            is_active: true,
            account_number: None,
            guarantor: None,
            collateral: None,
            notes: None,
        }
    }

    fn interest_only_terms() -> LoanTerms {
        LoanTerms {
            loan_id: "L-200".into(),
            loan_name: "Bridge Facility".into(),
            lender: "Mezz Capital".into(),
            loan_type: "bridge".into(),
            principal_amount: dec!(50_000),
            interest_rate: dec!(8.0),
            loan_term_months: 24,
            start_date: date(2023, 12, 1),
            payment_type: PaymentType::InterestOnly,
            payment_frequency: PaymentFrequency::Monthly,
            balloon_payment: None,
            balloon_date: Some(date(2025, 12, 1)),
            is_active: true,
            account_number: None,
            guarantor: None,
            collateral: None,
            notes: None,
        }
    }

    #[test]
    fn test_mortgage_level_payment() {
        let result = generate(&mortgage_terms()).unwrap();
        let sched = &result.result;
        assert_eq!(sched.len(), 360);

        let first = &sched.entries[0];
        assert_eq!(first.payment_amount, dec!(719.46));
        assert_eq!(first.interest_payment, dec!(600.00));
        assert_eq!(first.principal_payment, dec!(119.46));
        assert_eq!(first.payment_date, date(2024, 2, 1));

        let last = &sched.entries[359];
        assert_eq!(last.remaining_balance, Decimal::ZERO);
        assert_eq!(last.payment_date, date(2054, 1, 1));
    }

    #[test]
    fn test_mortgage_principal_sums_exactly() {
        let result = generate(&mortgage_terms()).unwrap();
        let total: Decimal = result
            .result
            .entries
            .iter()
            .map(|e| e.principal_payment)
            .sum();
        assert_eq!(total, dec!(120_000));
    }

    #[test]
    fn test_mortgage_balance_non_increasing() {
        let result = generate(&mortgage_terms()).unwrap();
        let mut prev = dec!(120_000);
        for entry in &result.result.entries {
            assert!(entry.remaining_balance <= prev);
            if entry.principal_payment > Decimal::ZERO {
                assert!(entry.remaining_balance < prev);
            }
            prev = entry.remaining_balance;
        }
    }

    #[test]
    fn test_every_row_sums_principal_and_interest() {
        for terms in [mortgage_terms(), interest_only_terms()] {
            let result = generate(&terms).unwrap();
            for entry in &result.result.entries {
                assert_eq!(
                    entry.payment_amount,
                    entry.principal_payment + entry.interest_payment
                );
            }
        }
    }

    #[test]
    fn test_interest_only_balloon_at_maturity() {
        let result = generate(&interest_only_terms()).unwrap();
        let sched = &result.result;
        assert_eq!(sched.len(), 24);

        for entry in &sched.entries[..23] {
            assert_eq!(entry.principal_payment, Decimal::ZERO);
            assert_eq!(entry.payment_amount, dec!(333.33));
            assert_eq!(entry.remaining_balance, dec!(50_000));
        }

        let balloon = &sched.entries[23];
        assert_eq!(balloon.payment_date, date(2025, 12, 1));
        assert_eq!(balloon.principal_payment, dec!(50_000));
        assert_eq!(balloon.payment_amount, dec!(50_333.33));
        assert_eq!(balloon.remaining_balance, Decimal::ZERO);
    }

    #[test]
    fn test_interest_only_early_balloon_shortens_schedule() {
        let mut terms = interest_only_terms();
        terms.balloon_date = Some(date(2024, 6, 1));
        let result = generate(&terms).unwrap();
        let sched = &result.result;
        // Payments run 2024-01-01 .. ; 2024-06-01 is payment 6.
        assert_eq!(sched.len(), 6);
        assert_eq!(sched.entries[5].principal_payment, dec!(50_000));
        assert_eq!(sched.entries[5].remaining_balance, Decimal::ZERO);
    }

    #[test]
    fn test_balloon_mismatch_reconciled_with_warning() {
        let mut terms = interest_only_terms();
        terms.balloon_payment = Some(dec!(45_000));
        let result = generate(&terms).unwrap();
        let balloon = result.result.entries.last().unwrap();
        assert_eq!(balloon.principal_payment, dec!(50_000));
        assert_eq!(balloon.remaining_balance, Decimal::ZERO);
        assert!(result.warnings.iter().any(|w| w.contains("45000")));
    }

    #[test]
    fn test_matching_balloon_payment_no_warning() {
        let mut terms = interest_only_terms();
        terms.balloon_payment = Some(dec!(50_000));
        let result = generate(&terms).unwrap();
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_zero_rate_equal_principal() {
        let mut terms = mortgage_terms();
        terms.principal_amount = dec!(12_000);
        terms.interest_rate = Decimal::ZERO;
        terms.loan_term_months = 12;

        let result = generate(&terms).unwrap();
        let sched = &result.result;
        assert_eq!(sched.len(), 12);
        for entry in &sched.entries {
            assert_eq!(entry.interest_payment, Decimal::ZERO);
            assert_eq!(entry.principal_payment, dec!(1_000));
        }
        assert_eq!(sched.entries[11].remaining_balance, Decimal::ZERO);
    }

    #[test]
    fn test_zero_rate_final_period_absorbs_remainder() {
        let mut terms = mortgage_terms();
        terms.principal_amount = dec!(100);
        terms.interest_rate = Decimal::ZERO;
        terms.loan_term_months = 3;

        let result = generate(&terms).unwrap();
        let sched = &result.result;
        // 100 / 3 rounds to 33.33; final period repays 33.34.
        assert_eq!(sched.entries[0].principal_payment, dec!(33.33));
        assert_eq!(sched.entries[1].principal_payment, dec!(33.33));
        assert_eq!(sched.entries[2].principal_payment, dec!(33.34));
        assert_eq!(sched.entries[2].remaining_balance, Decimal::ZERO);
    }

    #[test]
    fn test_quarterly_schedule_length() {
        let mut terms = mortgage_terms();
        terms.payment_frequency = PaymentFrequency::Quarterly;
        let result = generate(&terms).unwrap();
        assert_eq!(result.result.len(), 120);
        assert_eq!(result.result.entries[0].payment_date, date(2024, 4, 1));
    }

    #[test]
    fn test_payment_numbers_contiguous() {
        let result = generate(&mortgage_terms()).unwrap();
        for (i, entry) in result.result.entries.iter().enumerate() {
            assert_eq!(entry.payment_number, (i + 1) as u32);
        }
    }

    #[test]
    fn test_deterministic_regeneration() {
        let terms = mortgage_terms();
        let a = generate(&terms).unwrap().result;
        let b = generate(&terms).unwrap().result;
        assert_eq!(a, b);
    }

    #[test]
    fn test_month_end_start_date_clamps() {
        let mut terms = mortgage_terms();
        terms.start_date = date(2024, 1, 31);
        terms.loan_term_months = 3;
        let result = generate(&terms).unwrap();
        let dates: Vec<NaiveDate> = result
            .result
            .entries
            .iter()
            .map(|e| e.payment_date)
            .collect();
        assert_eq!(
            dates,
            vec![date(2024, 2, 29), date(2024, 3, 31), date(2024, 4, 30)]
        );
    }

    #[test]
    fn test_missing_balloon_date_is_internal_error() {
        let mut terms = interest_only_terms();
        terms.balloon_date = None;
        let err = generate(&terms).unwrap_err();
        match err {
            LoanEngineError::ScheduleGeneration { loan_id, .. } => {
                assert_eq!(loan_id, "L-200")
            }
            other => panic!("Expected ScheduleGeneration, got {other:?}"),
        }
    }
}
