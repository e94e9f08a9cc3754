pub mod loan;
pub mod portfolio;
