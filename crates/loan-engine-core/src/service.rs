use chrono::NaiveDate;
use rayon::prelude::*;
use std::collections::HashMap;

use crate::error::LoanEngineError;
use crate::types::*;
use crate::{portfolio, projection, schedule, validate};
use crate::LoanEngineResult;

/// A loan's terms paired with its derived schedule. The two are always
/// swapped in together; a record never carries a stale schedule.
#[derive(Debug, Clone)]
pub struct LoanRecord {
    pub terms: LoanTerms,
    pub schedule: PaymentSchedule,
}

/// Storage collaborator for loan records. Persistence, durability, and
/// failure handling live behind this seam; the engine itself never blocks.
pub trait LoanStore {
    fn insert(&mut self, record: LoanRecord);
    fn get(&self, loan_id: &str) -> Option<&LoanRecord>;
    fn remove(&mut self, loan_id: &str) -> bool;
    fn all(&self) -> Vec<&LoanRecord>;
}

/// In-memory store, sufficient for the CLI and for tests.
#[derive(Debug, Default)]
pub struct MemoryLoanStore {
    records: HashMap<String, LoanRecord>,
}

impl LoanStore for MemoryLoanStore {
    fn insert(&mut self, record: LoanRecord) {
        self.records.insert(record.terms.loan_id.clone(), record);
    }

    fn get(&self, loan_id: &str) -> Option<&LoanRecord> {
        self.records.get(loan_id)
    }

    fn remove(&mut self, loan_id: &str) -> bool {
        self.records.remove(loan_id).is_some()
    }

    fn all(&self) -> Vec<&LoanRecord> {
        self.records.values().collect()
    }
}

/// The data-service entry points: validate and upsert terms, fetch derived
/// facts, and summarize the whole book. Every projection takes an explicit
/// as-of date; the service never consults the wall clock.
pub struct LoanService<S: LoanStore> {
    store: S,
}

impl<S: LoanStore> LoanService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Create or replace a loan. Runs the validation gate, regenerates the
    /// schedule wholesale, and swaps the `(terms, schedule)` pair in
    /// atomically. Returns the generation envelope so reconciliation
    /// warnings reach the caller.
    pub fn upsert_loan(
        &mut self,
        terms: LoanTerms,
    ) -> LoanEngineResult<ComputationOutput<PaymentSchedule>> {
        validate::validate_terms(&terms).map_err(LoanEngineError::InvalidTerms)?;
        let output = schedule::generate(&terms)?;
        self.store.insert(LoanRecord {
            terms,
            schedule: output.result.clone(),
        });
        Ok(output)
    }

    /// Discard a loan's terms and schedule.
    pub fn remove_loan(&mut self, loan_id: &str) -> LoanEngineResult<()> {
        if self.store.remove(loan_id) {
            Ok(())
        } else {
            Err(LoanEngineError::UnknownLoan(loan_id.to_string()))
        }
    }

    /// A single loan's schedule and point-in-time facts.
    pub fn loan_facts(
        &self,
        loan_id: &str,
        as_of: NaiveDate,
    ) -> LoanEngineResult<(PaymentSchedule, ProjectedFacts)> {
        let record = self
            .store
            .get(loan_id)
            .ok_or_else(|| LoanEngineError::UnknownLoan(loan_id.to_string()))?;
        let facts = projection::project(&record.terms, &record.schedule, as_of);
        Ok((record.schedule.clone(), facts))
    }

    /// Portfolio summary across every stored loan. Per-loan projection
    /// fans out over a rayon map before the aggregation join.
    pub fn portfolio_summary(
        &self,
        as_of: NaiveDate,
    ) -> LoanEngineResult<ComputationOutput<PortfolioSummary>> {
        let positions: Vec<LoanPosition> = self
            .store
            .all()
            .par_iter()
            .map(|record| LoanPosition {
                terms: record.terms.clone(),
                schedule: record.schedule.clone(),
                facts: projection::project(&record.terms, &record.schedule, as_of),
            })
            .collect();
        portfolio::aggregate(&positions, as_of)
    }
}
