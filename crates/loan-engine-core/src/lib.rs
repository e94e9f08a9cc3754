pub mod error;
pub mod portfolio;
pub mod projection;
pub mod rate;
pub mod schedule;
pub mod service;
pub mod types;
pub mod validate;

pub use error::{LoanEngineError, ValidationErrors};
pub use types::*;

/// Standard result type for all loan-engine operations
pub type LoanEngineResult<T> = Result<T, LoanEngineError>;
