use chrono::{Duration, NaiveDate};
use rayon::prelude::*;
use rust_decimal::Decimal;
use serde_json::json;
use std::collections::HashMap;
use std::time::Instant;

use crate::types::*;
use crate::LoanEngineResult;

const UPCOMING_WINDOW_DAYS: i64 = 30;

/// Aggregate a set of loan positions into a portfolio summary.
///
/// `total_loans` counts every supplied position; all monetary totals, the
/// rate statistics, the upcoming-payments list, and the by-type breakdown
/// are computed over active loans only, so closed loans never inflate
/// forward-looking figures.
///
/// Per-loan schedule scans are independent and fan out across a rayon
/// parallel map; the flatten-and-sort of upcoming payments is the single
/// join point.
pub fn aggregate(
    positions: &[LoanPosition],
    as_of: NaiveDate,
) -> LoanEngineResult<ComputationOutput<PortfolioSummary>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let total_loans = positions.len() as u32;
    let active: Vec<&LoanPosition> = positions.iter().filter(|p| p.terms.is_active).collect();
    let active_loans = active.len() as u32;

    if active.is_empty() && total_loans > 0 {
        warnings.push("Portfolio contains no active loans; all totals are zero.".into());
    }

    let mut total_principal = Decimal::ZERO;
    let mut total_current_balance = Decimal::ZERO;
    let mut total_monthly_payments = Decimal::ZERO;
    for position in &active {
        total_principal += position.terms.principal_amount;
        total_current_balance += position.facts.current_balance;
        total_monthly_payments += position.facts.monthly_payment_amount;
    }
    let total_annual_payments = total_monthly_payments * Decimal::from(12);

    let interest_rate_summary = rate_summary(&active);
    let upcoming_payments = collect_upcoming(&active, as_of);
    let loans_by_type = breakdown_by_type(&active);

    let summary = PortfolioSummary {
        total_loans,
        active_loans,
        total_principal,
        total_current_balance,
        total_monthly_payments,
        total_annual_payments,
        interest_rate_summary,
        upcoming_payments,
        loans_by_type,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Loan Portfolio Aggregation",
        &json!({
            "active_loans_only": true,
            "upcoming_window_days": UPCOMING_WINDOW_DAYS,
            "annual_payments": "monthly total x 12",
        }),
        warnings,
        elapsed,
        summary,
    ))
}

fn rate_summary(active: &[&LoanPosition]) -> InterestRateSummary {
    if active.is_empty() {
        return InterestRateSummary {
            average: Decimal::ZERO,
            minimum: Decimal::ZERO,
            maximum: Decimal::ZERO,
        };
    }

    let mut sum = Decimal::ZERO;
    let mut minimum = active[0].terms.interest_rate;
    let mut maximum = minimum;
    for position in active {
        let rate = position.terms.interest_rate;
        sum += rate;
        minimum = minimum.min(rate);
        maximum = maximum.max(rate);
    }

    InterestRateSummary {
        average: sum / Decimal::from(active.len() as u32),
        minimum,
        maximum,
    }
}

/// Payments due within the 30-day window, across all active loans, sorted
/// ascending by date (loan id as the tiebreak so output is deterministic).
fn collect_upcoming(active: &[&LoanPosition], as_of: NaiveDate) -> Vec<UpcomingPayment> {
    let window_end = as_of + Duration::days(UPCOMING_WINDOW_DAYS);

    let mut upcoming: Vec<UpcomingPayment> = active
        .par_iter()
        .flat_map_iter(|position| {
            position
                .schedule
                .entries
                .iter()
                .filter(move |e| e.payment_date > as_of && e.payment_date <= window_end)
                .map(move |e| UpcomingPayment {
                    loan_id: position.terms.loan_id.clone(),
                    loan_name: position.terms.loan_name.clone(),
                    lender: position.terms.lender.clone(),
                    payment_date: e.payment_date,
                    payment_amount: e.payment_amount,
                })
        })
        .collect();

    upcoming.sort_by(|a, b| {
        a.payment_date
            .cmp(&b.payment_date)
            .then_with(|| a.loan_id.cmp(&b.loan_id))
    });
    upcoming
}

/// Group active loans by `loan_type`, sorted by descending total balance
/// for presentation.
fn breakdown_by_type(active: &[&LoanPosition]) -> Vec<LoanTypeBreakdown> {
    let mut groups: HashMap<&str, (u32, Decimal, Decimal)> = HashMap::new();
    for position in active {
        let entry = groups
            .entry(position.terms.loan_type.as_str())
            .or_insert((0, Decimal::ZERO, Decimal::ZERO));
        entry.0 += 1;
        entry.1 += position.facts.current_balance;
        entry.2 += position.terms.interest_rate;
    }

    let mut breakdown: Vec<LoanTypeBreakdown> = groups
        .into_iter()
        .map(|(loan_type, (count, balance, rate_sum))| LoanTypeBreakdown {
            loan_type: loan_type.to_string(),
            count,
            total_current_balance: balance,
            average_interest_rate: rate_sum / Decimal::from(count),
        })
        .collect();

    breakdown.sort_by(|a, b| {
        b.total_current_balance
            .cmp(&a.total_current_balance)
            .then_with(|| a.loan_type.cmp(&b.loan_type))
    });
    breakdown
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{projection, schedule};
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn position(
        loan_id: &str,
        loan_type: &str,
        principal: Decimal,
        rate: Decimal,
        active: bool,
        as_of: NaiveDate,
    ) -> LoanPosition {
        let terms = LoanTerms {
            loan_id: loan_id.into(),
            loan_name: format!("Loan {loan_id}"),
            lender: "First National".into(),
            loan_type: loan_type.into(),
            principal_amount: principal,
            interest_rate: rate,
            loan_term_months: 60,
            start_date: date(2024, 1, 1),
            payment_type: PaymentType::Amortizing,
            payment_frequency: PaymentFrequency::Monthly,
            balloon_payment: None,
            balloon_date: None,
            is_active: active,
            account_number: None,
            guarantor: None,
            collateral: None,
            notes: None,
        };
        let schedule = schedule::generate(&terms).unwrap().result;
        let facts = projection::project(&terms, &schedule, as_of);
        LoanPosition {
            terms,
            schedule,
            facts,
        }
    }

    #[test]
    fn test_totals_cover_active_loans_only() {
        let as_of = date(2024, 6, 15);
        let positions = vec![
            position("L-1", "mortgage", dec!(100_000), dec!(6), true, as_of),
            position("L-2", "equipment", dec!(40_000), dec!(8), true, as_of),
            position("L-3", "mortgage", dec!(500_000), dec!(4), false, as_of),
        ];

        let with_inactive = aggregate(&positions, as_of).unwrap().result;
        let without_inactive = aggregate(&positions[..2], as_of).unwrap().result;

        assert_eq!(with_inactive.total_loans, 3);
        assert_eq!(with_inactive.active_loans, 2);
        assert_eq!(with_inactive.total_principal, dec!(140_000));

        // Adding an inactive loan must not move any total.
        assert_eq!(
            with_inactive.total_principal,
            without_inactive.total_principal
        );
        assert_eq!(
            with_inactive.total_current_balance,
            without_inactive.total_current_balance
        );
        assert_eq!(
            with_inactive.total_monthly_payments,
            without_inactive.total_monthly_payments
        );
        assert_eq!(
            with_inactive.interest_rate_summary,
            without_inactive.interest_rate_summary
        );
        assert_eq!(
            with_inactive.upcoming_payments,
            without_inactive.upcoming_payments
        );
        assert_eq!(with_inactive.loans_by_type, without_inactive.loans_by_type);
    }

    #[test]
    fn test_annual_is_twelve_times_monthly() {
        let as_of = date(2024, 6, 15);
        let positions = vec![
            position("L-1", "mortgage", dec!(100_000), dec!(6), true, as_of),
            position("L-2", "equipment", dec!(40_000), dec!(8), true, as_of),
        ];
        let summary = aggregate(&positions, as_of).unwrap().result;
        assert_eq!(
            summary.total_annual_payments,
            summary.total_monthly_payments * dec!(12)
        );
    }

    #[test]
    fn test_rate_summary() {
        let as_of = date(2024, 6, 15);
        let positions = vec![
            position("L-1", "mortgage", dec!(100_000), dec!(6), true, as_of),
            position("L-2", "equipment", dec!(40_000), dec!(8), true, as_of),
            position("L-3", "bridge", dec!(10_000), dec!(4), true, as_of),
        ];
        let summary = aggregate(&positions, as_of).unwrap().result;
        assert_eq!(summary.interest_rate_summary.average, dec!(6));
        assert_eq!(summary.interest_rate_summary.minimum, dec!(4));
        assert_eq!(summary.interest_rate_summary.maximum, dec!(8));
    }

    #[test]
    fn test_empty_portfolio_zeroes() {
        let summary = aggregate(&[], date(2024, 6, 15)).unwrap().result;
        assert_eq!(summary.total_loans, 0);
        assert_eq!(summary.active_loans, 0);
        assert_eq!(summary.total_principal, Decimal::ZERO);
        assert_eq!(summary.interest_rate_summary.average, Decimal::ZERO);
        assert!(summary.upcoming_payments.is_empty());
        assert!(summary.loans_by_type.is_empty());
    }

    #[test]
    fn test_no_active_loans_warns() {
        let as_of = date(2024, 6, 15);
        let positions = vec![position(
            "L-1",
            "mortgage",
            dec!(100_000),
            dec!(6),
            false,
            as_of,
        )];
        let output = aggregate(&positions, as_of).unwrap();
        assert_eq!(output.result.active_loans, 0);
        assert_eq!(output.result.interest_rate_summary.maximum, Decimal::ZERO);
        assert!(output.warnings.iter().any(|w| w.contains("no active")));
    }

    #[test]
    fn test_upcoming_window_boundaries() {
        let as_of = date(2024, 6, 1);
        // Monthly payments fall on the 1st; 2024-06-01 is excluded
        // (not strictly after as_of), 2024-07-01 is day 30 and included.
        let positions = vec![position(
            "L-1",
            "mortgage",
            dec!(100_000),
            dec!(6),
            true,
            as_of,
        )];
        let summary = aggregate(&positions, as_of).unwrap().result;
        assert_eq!(summary.upcoming_payments.len(), 1);
        assert_eq!(summary.upcoming_payments[0].payment_date, date(2024, 7, 1));
        assert_eq!(summary.upcoming_payments[0].loan_id, "L-1");
    }

    #[test]
    fn test_upcoming_sorted_across_loans() {
        let as_of = date(2024, 6, 15);
        let mut shifted = position("L-2", "equipment", dec!(40_000), dec!(8), true, as_of);
        // Rebuild the second loan with an offset start so its payment dates
        // interleave with the first loan's.
        shifted.terms.start_date = date(2024, 1, 20);
        shifted.schedule = crate::schedule::generate(&shifted.terms).unwrap().result;
        shifted.facts = crate::projection::project(&shifted.terms, &shifted.schedule, as_of);

        let positions = vec![
            position("L-1", "mortgage", dec!(100_000), dec!(6), true, as_of),
            shifted,
        ];
        let summary = aggregate(&positions, as_of).unwrap().result;

        assert!(summary.upcoming_payments.len() >= 2);
        for pair in summary.upcoming_payments.windows(2) {
            assert!(pair[0].payment_date <= pair[1].payment_date);
        }
    }

    #[test]
    fn test_breakdown_grouped_and_sorted() {
        let as_of = date(2024, 6, 15);
        let positions = vec![
            position("L-1", "mortgage", dec!(100_000), dec!(6), true, as_of),
            position("L-2", "mortgage", dec!(200_000), dec!(8), true, as_of),
            position("L-3", "equipment", dec!(40_000), dec!(5), true, as_of),
        ];
        let summary = aggregate(&positions, as_of).unwrap().result;

        assert_eq!(summary.loans_by_type.len(), 2);
        let first = &summary.loans_by_type[0];
        assert_eq!(first.loan_type, "mortgage");
        assert_eq!(first.count, 2);
        assert_eq!(first.average_interest_rate, dec!(7));
        assert!(first.total_current_balance > summary.loans_by_type[1].total_current_balance);
    }
}
