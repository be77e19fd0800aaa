use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CreditError;
use crate::time_value::MONTHS_PER_YEAR;
use crate::types::{checked_sum, percent_to_rate, Money};
use crate::CreditResult;

// ---------------------------------------------------------------------------
// Expense classification
// ---------------------------------------------------------------------------

/// How an expense's `value` is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpenseUnit {
    /// Percentage of the financed principal (1 = 1%)
    Percent,
    /// Absolute amount
    Currency,
}

impl FromStr for ExpenseUnit {
    type Err = CreditError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "percent" | "pct" | "%" => Ok(ExpenseUnit::Percent),
            "currency" | "eur" | "€" => Ok(ExpenseUnit::Currency),
            other => Err(CreditError::InvalidInput {
                field: "unit".into(),
                reason: format!("Unknown expense unit '{other}' (expected percent or currency)"),
            }),
        }
    }
}

impl fmt::Display for ExpenseUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpenseUnit::Percent => write!(f, "percent"),
            ExpenseUnit::Currency => write!(f, "currency"),
        }
    }
}

/// When an expense is charged over the life of the loan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Recurrence {
    /// Once, deducted from the amount disbursed at t = 0
    Initial,
    /// Every month alongside the instalment
    Monthly,
    /// Every twelfth month (12, 24, 36, ...)
    Annual,
}

impl Recurrence {
    /// Whether the expense is charged with the instalment of `month` (1-based).
    pub fn charged_in_month(self, month: u32) -> bool {
        match self {
            Recurrence::Initial => false,
            Recurrence::Monthly => true,
            Recurrence::Annual => month % MONTHS_PER_YEAR == 0,
        }
    }

    /// Number of charges over a term of `months`. Annual charges only fall
    /// on completed years.
    pub fn occurrences(self, months: u32) -> u32 {
        match self {
            Recurrence::Initial => 1,
            Recurrence::Monthly => months,
            Recurrence::Annual => months / MONTHS_PER_YEAR,
        }
    }
}

impl FromStr for Recurrence {
    type Err = CreditError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "initial" | "upfront" => Ok(Recurrence::Initial),
            "monthly" => Ok(Recurrence::Monthly),
            "annual" | "yearly" => Ok(Recurrence::Annual),
            other => Err(CreditError::InvalidInput {
                field: "recurrence".into(),
                reason: format!(
                    "Unknown recurrence '{other}' (expected initial, monthly or annual)"
                ),
            }),
        }
    }
}

impl fmt::Display for Recurrence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Recurrence::Initial => write!(f, "initial"),
            Recurrence::Monthly => write!(f, "monthly"),
            Recurrence::Annual => write!(f, "annual"),
        }
    }
}

// ---------------------------------------------------------------------------
// Expense
// ---------------------------------------------------------------------------

fn included_by_default() -> bool {
    true
}

/// A named fee or ancillary cost attached to the loan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    pub id: String,
    pub name: String,
    pub unit: ExpenseUnit,
    /// Raw figure: 1 means 1% for `Percent`, 150 means 150 for `Currency`
    pub value: Decimal,
    pub recurrence: Recurrence,
    /// Only included expenses enter the cost-of-credit computation
    #[serde(default = "included_by_default")]
    pub included_in_tae: bool,
}

impl Expense {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        unit: ExpenseUnit,
        value: Decimal,
        recurrence: Recurrence,
    ) -> Self {
        Expense {
            id: id.into(),
            name: name.into(),
            unit,
            value,
            recurrence,
            included_in_tae: true,
        }
    }

    /// Same expense, left out of the TAE.
    pub fn excluded(mut self) -> Self {
        self.included_in_tae = false;
        self
    }
}

/// Absolute amount of an expense for a given principal.
pub fn expense_amount(expense: &Expense, principal: Money) -> CreditResult<Money> {
    match expense.unit {
        ExpenseUnit::Percent => percent_to_rate(expense.value)
            .checked_mul(principal)
            .ok_or_else(|| CreditError::overflow("percentage expense amount")),
        ExpenseUnit::Currency => Ok(expense.value),
    }
}

/// An included expense with its amount resolved against the principal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedExpense {
    pub id: String,
    pub name: String,
    pub recurrence: Recurrence,
    pub amount: Money,
}

/// Filter to the expenses included in the TAE and resolve their amounts,
/// keeping input order.
pub fn resolve_included(
    expenses: &[Expense],
    principal: Money,
) -> CreditResult<Vec<ResolvedExpense>> {
    expenses
        .iter()
        .filter(|e| e.included_in_tae)
        .map(|e| {
            Ok(ResolvedExpense {
                id: e.id.clone(),
                name: e.name.clone(),
                recurrence: e.recurrence,
                amount: expense_amount(e, principal)?,
            })
        })
        .collect()
}

/// Sum of resolved amounts for one recurrence.
pub fn sum_by_recurrence(
    resolved: &[ResolvedExpense],
    recurrence: Recurrence,
) -> CreditResult<Money> {
    checked_sum(
        resolved
            .iter()
            .filter(|e| e.recurrence == recurrence)
            .map(|e| e.amount),
    )
    .ok_or_else(|| CreditError::overflow("expense total"))
}

/// Starting expense set of the calculator: opening commission, life
/// insurance and other costs, all included and zero-valued.
pub fn default_expenses() -> Vec<Expense> {
    vec![
        Expense::new(
            "1",
            "Comisión Apertura",
            ExpenseUnit::Percent,
            Decimal::ZERO,
            Recurrence::Initial,
        ),
        Expense::new(
            "2",
            "Seguro Vida",
            ExpenseUnit::Currency,
            Decimal::ZERO,
            Recurrence::Annual,
        ),
        Expense::new(
            "3",
            "Otros Gastos",
            ExpenseUnit::Currency,
            Decimal::ZERO,
            Recurrence::Initial,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_percent_and_currency_agree() {
        let pct = Expense::new("a", "Opening", ExpenseUnit::Percent, dec!(5), Recurrence::Initial);
        let cur = Expense::new("b", "Opening", ExpenseUnit::Currency, dec!(50), Recurrence::Initial);
        assert_eq!(expense_amount(&pct, dec!(1000)).unwrap(), dec!(50));
        assert_eq!(expense_amount(&cur, dec!(1000)).unwrap(), dec!(50));
    }

    #[test]
    fn test_currency_ignores_principal() {
        let cur = Expense::new("a", "Fee", ExpenseUnit::Currency, dec!(150), Recurrence::Monthly);
        assert_eq!(expense_amount(&cur, dec!(-5000)).unwrap(), dec!(150));
        assert_eq!(expense_amount(&cur, Decimal::ZERO).unwrap(), dec!(150));
    }

    #[test]
    fn test_percent_on_degenerate_principal() {
        let pct = Expense::new("a", "Fee", ExpenseUnit::Percent, dec!(2), Recurrence::Initial);
        assert_eq!(expense_amount(&pct, Decimal::ZERO).unwrap(), Decimal::ZERO);
        assert_eq!(expense_amount(&pct, dec!(-1000)).unwrap(), dec!(-20));
    }

    #[test]
    fn test_percent_amount_overflow_is_an_error() {
        let pct = Expense::new("a", "Fee", ExpenseUnit::Percent, dec!(1000000), Recurrence::Initial);
        let err = expense_amount(&pct, dec!(10000000000000000000000000)).unwrap_err();
        assert!(matches!(err, CreditError::Overflow { .. }));
    }

    #[test]
    fn test_annual_charge_months() {
        assert!(!Recurrence::Annual.charged_in_month(11));
        assert!(Recurrence::Annual.charged_in_month(12));
        assert!(Recurrence::Annual.charged_in_month(24));
        assert!(!Recurrence::Initial.charged_in_month(1));
        assert!(Recurrence::Monthly.charged_in_month(7));
    }

    #[test]
    fn test_occurrences_floor_years() {
        assert_eq!(Recurrence::Annual.occurrences(18), 1);
        assert_eq!(Recurrence::Annual.occurrences(11), 0);
        assert_eq!(Recurrence::Annual.occurrences(60), 5);
        assert_eq!(Recurrence::Monthly.occurrences(60), 60);
        assert_eq!(Recurrence::Initial.occurrences(60), 1);
    }

    #[test]
    fn test_resolve_included_skips_excluded() {
        let expenses = vec![
            Expense::new("1", "Opening", ExpenseUnit::Percent, dec!(1), Recurrence::Initial),
            Expense::new("2", "Insurance", ExpenseUnit::Currency, dec!(90), Recurrence::Annual)
                .excluded(),
        ];
        let resolved = resolve_included(&expenses, dec!(20000)).unwrap();
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].id, "1");
        assert_eq!(resolved[0].amount, dec!(200));
        assert_eq!(sum_by_recurrence(&resolved, Recurrence::Initial).unwrap(), dec!(200));
        assert_eq!(sum_by_recurrence(&resolved, Recurrence::Annual).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_parse_units_and_recurrences() {
        assert_eq!("%".parse::<ExpenseUnit>().unwrap(), ExpenseUnit::Percent);
        assert_eq!("Currency".parse::<ExpenseUnit>().unwrap(), ExpenseUnit::Currency);
        assert_eq!("annual".parse::<Recurrence>().unwrap(), Recurrence::Annual);
        assert!("weekly".parse::<Recurrence>().is_err());
        assert!("bps".parse::<ExpenseUnit>().is_err());
    }

    #[test]
    fn test_serde_lowercase_tags_and_default_inclusion() {
        let json = r#"{"id":"x","name":"Fee","unit":"percent","value":"1.5","recurrence":"monthly"}"#;
        let e: Expense = serde_json::from_str(json).unwrap();
        assert_eq!(e.unit, ExpenseUnit::Percent);
        assert_eq!(e.recurrence, Recurrence::Monthly);
        assert_eq!(e.value, dec!(1.5));
        assert!(e.included_in_tae);
    }

    #[test]
    fn test_default_expenses_are_zero_and_included() {
        let defaults = default_expenses();
        assert_eq!(defaults.len(), 3);
        assert!(defaults.iter().all(|e| e.included_in_tae && e.value.is_zero()));
        assert_eq!(defaults[1].recurrence, Recurrence::Annual);
    }
}
