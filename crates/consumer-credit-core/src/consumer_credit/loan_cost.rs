use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use super::expenses::{
    default_expenses, resolve_included, sum_by_recurrence, Expense, Recurrence, ResolvedExpense,
};
use crate::error::CreditError;
use crate::time_value::{
    annualize_rate, monthly_payment, solve_irr, IrrStatus, MONTHS_PER_YEAR,
};
use crate::types::*;
use crate::CreditResult;

// ---------------------------------------------------------------------------
// Input types
// ---------------------------------------------------------------------------

/// Core terms of a level-payment consumer loan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanTerms {
    /// Amount financed
    pub principal: Money,
    /// Nominal annual interest rate (TIN) as a percentage
    pub tin: Percent,
    /// Term in months
    pub months: u32,
}

impl Default for LoanTerms {
    /// Reference used-car loan: 10,000 at 5.99% over 60 months.
    fn default() -> Self {
        LoanTerms {
            principal: dec!(10000),
            tin: dec!(5.99),
            months: 60,
        }
    }
}

/// Input for the cost-of-credit computation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanCostInput {
    pub principal: Money,
    pub tin: Percent,
    pub months: u32,
    #[serde(default)]
    pub expenses: Vec<Expense>,
}

impl LoanCostInput {
    pub fn terms(&self) -> LoanTerms {
        LoanTerms {
            principal: self.principal,
            tin: self.tin,
            months: self.months,
        }
    }
}

impl Default for LoanCostInput {
    fn default() -> Self {
        let terms = LoanTerms::default();
        LoanCostInput {
            principal: terms.principal,
            tin: terms.tin,
            months: terms.months,
            expenses: default_expenses(),
        }
    }
}

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// Split of everything the borrower pays over the term.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostBreakdown {
    pub principal: Money,
    pub interest: Money,
    pub expenses: Money,
    /// principal + interest + expenses
    pub total_paid: Money,
}

/// One included expense as charged over the term.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseLine {
    pub id: String,
    pub name: String,
    pub recurrence: Recurrence,
    /// Amount per charge
    pub amount: Money,
    /// Number of charges over the term
    pub occurrences: u32,
    /// amount * occurrences
    pub total: Money,
}

/// Cost of credit for a loan and its expenses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanCostOutput {
    pub monthly_quota: Money,
    /// Effective annual rate (TAE) as a percentage; 0 when undefined
    pub tae: Percent,
    pub breakdown: CostBreakdown,
    /// Monthly IRR of the borrower's cash flows
    pub monthly_irr: Option<Rate>,
    pub solver_status: IrrStatus,
    pub solver_iterations: u32,
    pub expense_lines: Vec<ExpenseLine>,
    /// Included expenses with a positive value
    pub active_expense_count: u32,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Effective annual percentage from a monthly rate: ((1 + r)^12 - 1) * 100.
pub fn effective_annual_percent(monthly: Rate) -> Option<Percent> {
    annualize_rate(monthly, MONTHS_PER_YEAR)?.checked_mul(Decimal::ONE_HUNDRED)
}

fn assemble_cash_flows(
    principal: Money,
    months: u32,
    quota: Money,
    resolved: &[ResolvedExpense],
) -> CreditResult<Vec<Money>> {
    let initial = sum_by_recurrence(resolved, Recurrence::Initial)?;
    let monthly = sum_by_recurrence(resolved, Recurrence::Monthly)?;
    let annual = sum_by_recurrence(resolved, Recurrence::Annual)?;

    let mut flows = Vec::with_capacity(months as usize + 1);
    flows.push(
        principal
            .checked_sub(initial)
            .ok_or_else(|| CreditError::overflow("net amount received"))?,
    );

    for month in 1..=months {
        let mut outflow = quota.checked_add(monthly);
        if Recurrence::Annual.charged_in_month(month) {
            outflow = outflow.and_then(|v| v.checked_add(annual));
        }
        let outflow = outflow.ok_or_else(|| CreditError::overflow("monthly outflow"))?;
        flows.push(-outflow);
    }

    Ok(flows)
}

/// Borrower cash flows: net amount received at t = 0 (principal less
/// initial expenses), then one outflow per month made of the instalment,
/// monthly expenses and, every twelfth month, annual expenses.
pub fn build_cash_flows(terms: &LoanTerms, expenses: &[Expense]) -> CreditResult<Vec<Money>> {
    let quota = monthly_payment(terms.principal, terms.tin, terms.months)?;
    let resolved = resolve_included(expenses, terms.principal)?;
    assemble_cash_flows(terms.principal, terms.months, quota, &resolved)
}

// ---------------------------------------------------------------------------
// Main functions
// ---------------------------------------------------------------------------

/// Compute the monthly instalment, TAE and cost breakdown of a loan.
///
/// Only expenses flagged `included_in_tae` take part. When the annualised
/// rate is undefined the TAE is reported as 0.
pub fn compute_loan_cost(terms: &LoanTerms, expenses: &[Expense]) -> CreditResult<LoanCostOutput> {
    let quota = monthly_payment(terms.principal, terms.tin, terms.months)?;
    let resolved = resolve_included(expenses, terms.principal)?;
    let cash_flows = assemble_cash_flows(terms.principal, terms.months, quota, &resolved)?;

    let irr = solve_irr(&cash_flows, None);
    let tae = irr
        .rate
        .and_then(effective_annual_percent)
        .unwrap_or(Decimal::ZERO);

    let expense_lines = resolved
        .into_iter()
        .map(|e| {
            let occurrences = e.recurrence.occurrences(terms.months);
            let total = e
                .amount
                .checked_mul(Decimal::from(occurrences))
                .ok_or_else(|| CreditError::overflow("expense line total"))?;
            Ok(ExpenseLine {
                total,
                id: e.id,
                name: e.name,
                recurrence: e.recurrence,
                amount: e.amount,
                occurrences,
            })
        })
        .collect::<CreditResult<Vec<ExpenseLine>>>()?;

    let interest = quota
        .checked_mul(Decimal::from(terms.months))
        .and_then(|paid| paid.checked_sub(terms.principal))
        .ok_or_else(|| CreditError::overflow("total interest"))?;
    let expenses_total = checked_sum(expense_lines.iter().map(|l| l.total))
        .ok_or_else(|| CreditError::overflow("expense total"))?;
    let total_paid = terms
        .principal
        .checked_add(interest)
        .and_then(|v| v.checked_add(expenses_total))
        .ok_or_else(|| CreditError::overflow("total paid"))?;

    let active_expense_count = expenses
        .iter()
        .filter(|e| e.included_in_tae && e.value > Decimal::ZERO)
        .count() as u32;

    log::debug!(
        "loan cost: quota {quota}, {} included expenses, TAE {tae}% ({:?})",
        expense_lines.len(),
        irr.status
    );

    Ok(LoanCostOutput {
        monthly_quota: quota,
        tae,
        breakdown: CostBreakdown {
            principal: terms.principal,
            interest,
            expenses: expenses_total,
            total_paid,
        },
        monthly_irr: irr.rate,
        solver_status: irr.status,
        solver_iterations: irr.iterations,
        expense_lines,
        active_expense_count,
    })
}

/// Warnings for solver outcomes that leave the TAE approximate or zeroed.
fn solver_warnings(output: &LoanCostOutput) -> Vec<String> {
    let mut warnings = Vec::new();
    match output.solver_status {
        IrrStatus::IterationLimit => warnings.push(format!(
            "IRR did not converge in {} iterations; TAE is approximate",
            output.solver_iterations
        )),
        IrrStatus::Undefined => {
            warnings.push("IRR is undefined for these cash flows; TAE reported as 0".into())
        }
        IrrStatus::NpvWithinTolerance | IrrStatus::StepWithinTolerance => {}
    }
    if let Some(rate) = output.monthly_irr {
        if effective_annual_percent(rate).is_none() {
            warnings.push("Annualised rate is not representable; TAE reported as 0".into());
        }
    }
    warnings
}

/// TAE analysis wrapped in the standard computation envelope, with
/// warnings for inputs outside the documented domain and for solver
/// outcomes a caller should know about.
pub fn analyze_loan_cost(input: &LoanCostInput) -> CreditResult<ComputationOutput<LoanCostOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    if input.principal <= Decimal::ZERO {
        warnings.push(format!(
            "Principal {} is not positive; results are degenerate",
            input.principal
        ));
    }
    if input.tin < Decimal::ZERO {
        warnings.push(format!("Negative TIN {}%", input.tin));
    }
    for e in input.expenses.iter().filter(|e| e.value < Decimal::ZERO) {
        warnings.push(format!(
            "Expense '{}' has negative value {}",
            e.name, e.value
        ));
    }

    let terms = input.terms();
    let output = compute_loan_cost(&terms, &input.expenses)?;

    warnings.extend(solver_warnings(&output));
    let alert_threshold = input.tin.checked_add(Decimal::ONE).unwrap_or(Decimal::MAX);
    if output.tae > alert_threshold {
        warnings.push(format!(
            "TAE {:.3}% exceeds TIN {}% by more than one point",
            output.tae, input.tin
        ));
    }

    for w in &warnings {
        log::warn!("{w}");
    }

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "TAE (LCCI 2019): monthly IRR of borrower cash flows, compounded over 12 months",
        &serde_json::json!({
            "principal": input.principal.to_string(),
            "tin": input.tin.to_string(),
            "months": input.months,
            "expenses_included": output.expense_lines.len(),
            "irr_solver": "newton_raphson",
        }),
        warnings,
        elapsed,
        output,
    ))
}
