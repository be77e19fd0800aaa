use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CreditError {
    #[error("Invalid input: {field} — {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Convergence failure: {function} did not converge after {iterations} iterations (delta: {last_delta})")]
    ConvergenceFailure {
        function: String,
        iterations: u32,
        last_delta: Decimal,
    },

    #[error("Division by zero in {context}")]
    DivisionByZero { context: String },

    #[error("Numeric overflow in {context}")]
    Overflow { context: String },

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl CreditError {
    pub(crate) fn overflow(context: &str) -> Self {
        CreditError::Overflow {
            context: context.to_string(),
        }
    }
}

impl From<serde_json::Error> for CreditError {
    fn from(e: serde_json::Error) -> Self {
        CreditError::SerializationError(e.to_string())
    }
}
