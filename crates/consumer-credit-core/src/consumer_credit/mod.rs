//! Consumer instalment loans: ancillary expenses, cost of credit (TAE) and
//! amortisation of the level payment.

pub mod amortization;
pub mod expenses;
pub mod loan_cost;
