use napi::Result as NapiResult;
use napi_derive::napi;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use consumer_credit_core::consumer_credit::{amortization, expenses, loan_cost};
use consumer_credit_core::time_value;

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

// ---------------------------------------------------------------------------
// Cost of credit
// ---------------------------------------------------------------------------

#[napi]
pub fn analyze_loan_cost(input_json: String) -> NapiResult<String> {
    let input: loan_cost::LoanCostInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = loan_cost::analyze_loan_cost(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn build_amortization_table(input_json: String) -> NapiResult<String> {
    let input: amortization::AmortizationInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = amortization::build_amortization_table(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

/// Reference loan and default expense set, as a starting state for a UI.
#[napi]
pub fn default_loan_input() -> NapiResult<String> {
    serde_json::to_string(&loan_cost::LoanCostInput::default()).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Primitives
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct PaymentRequest {
    principal: Decimal,
    tin: Decimal,
    months: u32,
}

#[napi]
pub fn monthly_payment(input_json: String) -> NapiResult<String> {
    let req: PaymentRequest = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let quota =
        time_value::monthly_payment(req.principal, req.tin, req.months).map_err(to_napi_error)?;
    serde_json::to_string(&quota).map_err(to_napi_error)
}

#[derive(Deserialize)]
struct IrrRequest {
    cash_flows: Vec<Decimal>,
    #[serde(default)]
    guess: Option<Decimal>,
}

#[napi]
pub fn solve_irr(input_json: String) -> NapiResult<String> {
    let req: IrrRequest = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let solution = time_value::solve_irr(&req.cash_flows, req.guess);
    serde_json::to_string(&solution).map_err(to_napi_error)
}

#[derive(Deserialize)]
struct ExpenseAmountRequest {
    expense: expenses::Expense,
    principal: Decimal,
}

#[derive(Serialize)]
struct ExpenseAmountResponse {
    id: String,
    amount: Decimal,
}

#[napi]
pub fn expense_amount(input_json: String) -> NapiResult<String> {
    let req: ExpenseAmountRequest = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let response = ExpenseAmountResponse {
        amount: expenses::expense_amount(&req.expense, req.principal).map_err(to_napi_error)?,
        id: req.expense.id,
    };
    serde_json::to_string(&response).map_err(to_napi_error)
}
