use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use consumer_credit_core::consumer_credit::amortization::{self, AmortizationInput};
use consumer_credit_core::consumer_credit::expenses::{Expense, ExpenseUnit, Recurrence};
use consumer_credit_core::consumer_credit::loan_cost::{self, LoanCostInput, LoanTerms};

use crate::input;

/// An expense given on the command line as `recurrence:unit:value[:name]`.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpenseSpec {
    pub recurrence: Recurrence,
    pub unit: ExpenseUnit,
    pub value: Decimal,
    pub name: Option<String>,
}

impl ExpenseSpec {
    fn into_expense(self, index: usize) -> Expense {
        let name = self
            .name
            .unwrap_or_else(|| format!("{} {} expense", self.recurrence, self.unit));
        Expense::new(
            format!("cli-{}", index + 1),
            name,
            self.unit,
            self.value,
            self.recurrence,
        )
    }
}

pub fn parse_expense_spec(s: &str) -> Result<ExpenseSpec, String> {
    let mut parts = s.splitn(4, ':');
    let (Some(recurrence), Some(unit), Some(value)) = (parts.next(), parts.next(), parts.next())
    else {
        return Err(format!(
            "expected recurrence:unit:value[:name], got '{s}'"
        ));
    };

    let recurrence: Recurrence = recurrence.parse().map_err(|e| format!("{e}"))?;
    let unit: ExpenseUnit = unit.parse().map_err(|e| format!("{e}"))?;
    let value: Decimal = value
        .trim()
        .parse()
        .map_err(|e| format!("invalid expense value '{value}': {e}"))?;
    let name = parts
        .next()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(String::from);

    Ok(ExpenseSpec {
        recurrence,
        unit,
        value,
        name,
    })
}

/// Arguments for the TAE / cost-of-credit calculation
#[derive(Args)]
pub struct LoanCostArgs {
    /// Path to JSON or YAML input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Amount financed
    #[arg(long)]
    pub principal: Option<Decimal>,

    /// Nominal annual interest rate (TIN) in percent, e.g. 5.99
    #[arg(long)]
    pub tin: Option<Decimal>,

    /// Term in months
    #[arg(long)]
    pub months: Option<u32>,

    /// Expense included in the TAE, as recurrence:unit:value[:name]
    /// (e.g. "initial:percent:1.5:Comisión Apertura", "annual:currency:120")
    #[arg(long = "expense", value_parser = parse_expense_spec)]
    pub expenses: Vec<ExpenseSpec>,
}

fn terms_from_flags(principal: Option<Decimal>, tin: Option<Decimal>, months: Option<u32>) -> LoanTerms {
    let defaults = LoanTerms::default();
    LoanTerms {
        principal: principal.unwrap_or(defaults.principal),
        tin: tin.unwrap_or(defaults.tin),
        months: months.unwrap_or(defaults.months),
    }
}

fn loan_cost_input_from_flags(args: LoanCostArgs) -> LoanCostInput {
    let terms = terms_from_flags(args.principal, args.tin, args.months);
    LoanCostInput {
        principal: terms.principal,
        tin: terms.tin,
        months: terms.months,
        expenses: args
            .expenses
            .into_iter()
            .enumerate()
            .map(|(i, spec)| spec.into_expense(i))
            .collect(),
    }
}

pub fn run_loan_cost(args: LoanCostArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let cost_input: LoanCostInput = match input::load(args.input.as_deref())? {
        Some(loaded) => loaded,
        None => loan_cost_input_from_flags(args),
    };
    let result = loan_cost::analyze_loan_cost(&cost_input)?;
    Ok(serde_json::to_value(result)?)
}

/// Arguments for the amortisation table
#[derive(Args)]
pub struct AmortizationArgs {
    /// Path to JSON or YAML input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Amount financed
    #[arg(long)]
    pub principal: Option<Decimal>,

    /// Nominal annual interest rate (TIN) in percent
    #[arg(long)]
    pub tin: Option<Decimal>,

    /// Term in months
    #[arg(long)]
    pub months: Option<u32>,
}

pub fn run_amortization(args: AmortizationArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let table_input: AmortizationInput = match input::load(args.input.as_deref())? {
        Some(loaded) => loaded,
        None => terms_from_flags(args.principal, args.tin, args.months).into(),
    };
    let result = amortization::build_amortization_table(&table_input)?;
    Ok(serde_json::to_value(result)?)
}

/// Print a loan input pre-filled with the reference loan and the default
/// expense set, ready to edit and feed back with `--input`.
pub fn run_template() -> Result<Value, Box<dyn std::error::Error>> {
    Ok(serde_json::to_value(LoanCostInput::default())?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_expense_spec_with_name() {
        let spec = parse_expense_spec("initial:percent:1.5:Comisión Apertura").unwrap();
        assert_eq!(spec.recurrence, Recurrence::Initial);
        assert_eq!(spec.unit, ExpenseUnit::Percent);
        assert_eq!(spec.value, dec!(1.5));
        assert_eq!(spec.name.as_deref(), Some("Comisión Apertura"));
    }

    #[test]
    fn test_parse_expense_spec_without_name() {
        let spec = parse_expense_spec("annual:currency:120").unwrap();
        let expense = spec.into_expense(1);
        assert_eq!(expense.id, "cli-2");
        assert_eq!(expense.name, "annual currency expense");
        assert!(expense.included_in_tae);
    }

    #[test]
    fn test_parse_expense_spec_errors() {
        assert!(parse_expense_spec("initial:percent").is_err());
        assert!(parse_expense_spec("weekly:percent:1").is_err());
        assert!(parse_expense_spec("initial:bps:1").is_err());
        assert!(parse_expense_spec("initial:currency:abc").is_err());
    }

    #[test]
    fn test_flags_fall_back_to_reference_loan() {
        let args = LoanCostArgs {
            input: None,
            principal: Some(dec!(5000)),
            tin: None,
            months: None,
            expenses: vec![parse_expense_spec("monthly:currency:3").unwrap()],
        };
        let input = loan_cost_input_from_flags(args);
        assert_eq!(input.principal, dec!(5000));
        assert_eq!(input.tin, dec!(5.99));
        assert_eq!(input.months, 60);
        assert_eq!(input.expenses[0].recurrence, Recurrence::Monthly);
    }

    #[test]
    fn test_template_is_a_valid_input() {
        let value = run_template().unwrap();
        let input: LoanCostInput = serde_json::from_value(value).unwrap();
        assert_eq!(input.expenses.len(), 3);
        assert_eq!(input.months, 60);
    }
}
