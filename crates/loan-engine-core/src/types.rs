use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// All monetary values. Wraps Decimal to prevent accidental f64 usage.
pub type Money = Decimal;

/// Rates expressed as decimals (0.005 = 0.5% per period). Never as percentages.
pub type Rate = Decimal;

/// Annual nominal rates expressed as percentages (6.0 = 6%), as quoted on
/// the loan document.
pub type Percent = Decimal;

/// Round a monetary value to the currency's minor unit.
pub fn round_money(value: Money) -> Money {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Repayment structure of a loan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentType {
    /// Principal and interest both reduce each period; balance reaches zero
    /// by the final scheduled payment.
    Amortizing,
    /// Periodic payments cover interest only; principal falls due as a
    /// balloon at `balloon_date`.
    InterestOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentFrequency {
    Monthly,
    Quarterly,
    Annually,
}

impl PaymentFrequency {
    pub fn periods_per_year(self) -> u32 {
        match self {
            PaymentFrequency::Monthly => 12,
            PaymentFrequency::Quarterly => 4,
            PaymentFrequency::Annually => 1,
        }
    }

    pub fn months_per_period(self) -> u32 {
        12 / self.periods_per_year()
    }
}

/// Immutable input terms for one loan. Descriptive fields (lender, account
/// number, guarantor, ...) pass through untouched and never enter any
/// computation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanTerms {
    pub loan_id: String,
    pub loan_name: String,
    pub lender: String,
    pub loan_type: String,
    pub principal_amount: Money,
    /// Annual nominal rate as a percentage, 0 to 100.
    pub interest_rate: Percent,
    pub loan_term_months: u32,
    pub start_date: NaiveDate,
    pub payment_type: PaymentType,
    pub payment_frequency: PaymentFrequency,
    /// Only meaningful for interest-only loans; defaults to the remaining
    /// principal at the balloon date.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balloon_payment: Option<Money>,
    /// Required for interest-only loans; ignored for amortizing ones.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balloon_date: Option<NaiveDate>,
    pub is_active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guarantor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collateral: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl LoanTerms {
    /// Contractual maturity: start date plus the full term.
    pub fn maturity_date(&self) -> Option<NaiveDate> {
        self.start_date
            .checked_add_months(chrono::Months::new(self.loan_term_months))
    }
}

/// One row of a payment schedule. `payment_amount` always equals
/// `principal_payment + interest_payment`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentScheduleEntry {
    pub payment_number: u32,
    pub payment_date: NaiveDate,
    pub payment_amount: Money,
    pub principal_payment: Money,
    pub interest_payment: Money,
    /// Balance after this payment; non-increasing across the schedule and
    /// exactly zero on the final row.
    pub remaining_balance: Money,
}

/// Full ordered schedule for one loan. Regenerated wholesale whenever the
/// terms change; never patched in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentSchedule {
    pub loan_id: String,
    pub entries: Vec<PaymentScheduleEntry>,
}

impl PaymentSchedule {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Point-in-time view of one loan against an explicit as-of date. Computed
/// on demand, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectedFacts {
    pub current_balance: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_payment_date: Option<NaiveDate>,
    pub payments_made: u32,
    pub payments_remaining: u32,
    /// Periodic payment normalized to a monthly-equivalent figure so loans
    /// of different frequencies can be summed.
    pub monthly_payment_amount: Money,
}

/// A loan bundled with its derived data, as fed to the aggregator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanPosition {
    pub terms: LoanTerms,
    pub schedule: PaymentSchedule,
    pub facts: ProjectedFacts,
}

/// One scheduled payment falling inside the aggregator's 30-day window,
/// tagged with its loan for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpcomingPayment {
    pub loan_id: String,
    pub loan_name: String,
    pub lender: String,
    pub payment_date: NaiveDate,
    pub payment_amount: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterestRateSummary {
    pub average: Percent,
    pub minimum: Percent,
    pub maximum: Percent,
}

/// Per-`loan_type` rollup over active loans.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanTypeBreakdown {
    pub loan_type: String,
    pub count: u32,
    pub total_current_balance: Money,
    pub average_interest_rate: Percent,
}

/// Ephemeral portfolio rollup. All monetary totals, the rate summary,
/// upcoming payments, and the by-type breakdown cover active loans only;
/// inactive loans appear solely in `total_loans`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortfolioSummary {
    pub total_loans: u32,
    pub active_loans: u32,
    pub total_principal: Money,
    pub total_current_balance: Money,
    pub total_monthly_payments: Money,
    pub total_annual_payments: Money,
    pub interest_rate_summary: InterestRateSummary,
    pub upcoming_payments: Vec<UpcomingPayment>,
    pub loans_by_type: Vec<LoanTypeBreakdown>,
}

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "rust_decimal_128bit".to_string(),
        },
    }
}
