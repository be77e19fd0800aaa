use clap::Args;
use rust_decimal::Decimal;
use serde_json::{json, Value};

use consumer_credit_core::consumer_credit::expenses::{
    expense_amount, Expense, ExpenseUnit, Recurrence,
};
use consumer_credit_core::consumer_credit::loan_cost::effective_annual_percent;
use consumer_credit_core::time_value::{
    self, monthly_payment, monthly_rate, solve_irr, IrrSolution, IrrStatus,
};
use consumer_credit_core::CreditError;

/// Arguments for the level monthly payment
#[derive(Args)]
pub struct PaymentArgs {
    /// Amount financed
    #[arg(long)]
    pub principal: Decimal,

    /// Nominal annual interest rate (TIN) in percent
    #[arg(long)]
    pub tin: Decimal,

    /// Term in months
    #[arg(long)]
    pub months: u32,
}

pub fn run_payment(args: PaymentArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let quota = monthly_payment(args.principal, args.tin, args.months)?;
    let total = quota
        .checked_mul(Decimal::from(args.months))
        .ok_or_else(|| CreditError::Overflow {
            context: "total paid".into(),
        })?;
    Ok(json!({
        "monthly_quota": quota,
        "monthly_rate": monthly_rate(args.tin),
        "total_paid": total,
        "total_interest": total.checked_sub(args.principal),
    }))
}

/// Arguments for the periodic IRR
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct IrrArgs {
    /// Periodic cash flows, first one at t = 0 (comma-separated, e.g. "9700,-193.28,-193.28")
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true, required = true)]
    pub cash_flows: Vec<Decimal>,

    /// Starting periodic rate (defaults to 10% a year, monthly)
    #[arg(long)]
    pub guess: Option<Decimal>,

    /// Fail instead of returning a best-effort rate when the solver does not converge
    #[arg(long)]
    pub strict: bool,
}

pub fn run_irr(args: IrrArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let solution = solve_irr(&args.cash_flows, args.guess);
    let residual = solution
        .rate
        .and_then(|r| time_value::npv(r, &args.cash_flows).ok());

    if args.strict && !solution.converged() {
        return Err(Box::new(convergence_error(&solution, residual)));
    }

    Ok(json!({
        "rate": solution.rate,
        "annual_rate_percent": solution.rate.and_then(effective_annual_percent),
        "status": solution.status,
        "iterations": solution.iterations,
        "residual_npv": residual,
    }))
}

fn convergence_error(solution: &IrrSolution, residual: Option<Decimal>) -> CreditError {
    match solution.status {
        IrrStatus::Undefined => CreditError::InvalidInput {
            field: "cash_flows".into(),
            reason: format!(
                "IRR is undefined for these cash flows (stopped after {} iterations)",
                solution.iterations
            ),
        },
        _ => CreditError::ConvergenceFailure {
            function: "IRR".into(),
            iterations: solution.iterations,
            last_delta: residual.unwrap_or(Decimal::MAX),
        },
    }
}

/// Arguments for resolving a single expense amount
#[derive(Args)]
pub struct ExpenseAmountArgs {
    /// Amount financed
    #[arg(long)]
    pub principal: Decimal,

    /// Expense figure (1 = 1% for percent units)
    #[arg(long)]
    pub value: Decimal,

    /// percent or currency
    #[arg(long, default_value = "currency")]
    pub unit: ExpenseUnit,
}

pub fn run_expense_amount(args: ExpenseAmountArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let expense = Expense::new("cli", "expense", args.unit, args.value, Recurrence::Initial);
    Ok(json!({
        "amount": expense_amount(&expense, args.principal)?,
        "unit": args.unit,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn irr_args(cash_flows: Vec<Decimal>, strict: bool) -> IrrArgs {
        IrrArgs {
            cash_flows,
            guess: None,
            strict,
        }
    }

    #[test]
    fn test_strict_irr_undefined_is_not_reported_as_converged() {
        let err = run_irr(irr_args(vec![dec!(100)], true)).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("undefined"), "got {msg}");
        assert!(!msg.contains("delta: 0"), "got {msg}");
    }

    #[test]
    fn test_strict_irr_iteration_limit_reports_residual() {
        let err = run_irr(irr_args(vec![dec!(-29), dec!(27), dec!(-7)], true)).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("1000 iterations"), "got {msg}");
    }

    #[test]
    fn test_lenient_irr_returns_status() {
        let value = run_irr(irr_args(vec![dec!(100)], false)).unwrap();
        assert_eq!(value["status"], "undefined");
        assert!(value["rate"].is_null());
    }

    #[test]
    fn test_payment_totals() {
        let value = run_payment(PaymentArgs {
            principal: dec!(1200),
            tin: Decimal::ZERO,
            months: 12,
        })
        .unwrap();
        assert_eq!(value["monthly_quota"], json!(dec!(100)));
        assert_eq!(value["total_interest"], json!(Decimal::ZERO));
    }
}
