pub mod error;
pub mod time_value;
pub mod types;

#[cfg(feature = "consumer_credit")]
pub mod consumer_credit;

pub use error::CreditError;
pub use types::*;

/// Standard result type for all consumer-credit operations
pub type CreditResult<T> = Result<T, CreditError>;
