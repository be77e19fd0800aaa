use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use super::loan_cost::LoanTerms;
use crate::error::CreditError;
use crate::time_value::{monthly_payment, monthly_rate};
use crate::types::*;
use crate::CreditResult;

/// Outstanding balance after a given month (month 0 = disbursement).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AmortizationPoint {
    pub month: u32,
    pub balance: Money,
}

/// A single month of the French (level-payment) amortisation table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmortizationRow {
    pub month: u32,
    pub opening_balance: Money,
    pub interest: Money,
    pub principal: Money,
    pub closing_balance: Money,
}

/// Input for the amortisation table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmortizationInput {
    pub principal: Money,
    pub tin: Percent,
    pub months: u32,
}

impl From<LoanTerms> for AmortizationInput {
    fn from(terms: LoanTerms) -> Self {
        AmortizationInput {
            principal: terms.principal,
            tin: terms.tin,
            months: terms.months,
        }
    }
}

/// Output for the amortisation table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmortizationOutput {
    pub monthly_quota: Money,
    pub rows: Vec<AmortizationRow>,
    pub schedule: Vec<AmortizationPoint>,
    pub total_interest: Money,
    pub total_principal: Money,
}

fn amortize(terms: &LoanTerms) -> CreditResult<(Money, Vec<AmortizationRow>)> {
    let quota = monthly_payment(terms.principal, terms.tin, terms.months)?;
    let rate = monthly_rate(terms.tin);

    let mut rows = Vec::with_capacity(terms.months as usize);
    let mut balance = terms.principal;

    for month in 1..=terms.months {
        let opening = balance;
        let interest = balance
            .checked_mul(rate)
            .ok_or_else(|| CreditError::overflow("monthly interest"))?;
        let principal = quota
            .checked_sub(interest)
            .ok_or_else(|| CreditError::overflow("principal repaid"))?;
        balance = balance
            .checked_sub(principal)
            .ok_or_else(|| CreditError::overflow("outstanding balance"))?;
        // Rounding can leave a tiny negative residual on the last instalment
        if balance < Decimal::ZERO {
            balance = Decimal::ZERO;
        }

        rows.push(AmortizationRow {
            month,
            opening_balance: opening,
            interest,
            principal,
            closing_balance: balance,
        });
    }

    Ok((quota, rows))
}

/// Remaining balance month by month under the level payment, from month 0
/// (the full principal) to `months`. Expenses play no part in amortisation.
pub fn amortization_schedule(terms: &LoanTerms) -> CreditResult<Vec<AmortizationPoint>> {
    let (_, rows) = amortize(terms)?;
    Ok(points_from_rows(terms.principal, &rows))
}

fn points_from_rows(principal: Money, rows: &[AmortizationRow]) -> Vec<AmortizationPoint> {
    std::iter::once(AmortizationPoint {
        month: 0,
        balance: principal,
    })
    .chain(rows.iter().map(|r| AmortizationPoint {
        month: r.month,
        balance: r.closing_balance,
    }))
    .collect()
}

/// Full amortisation table with interest/principal split per month.
pub fn build_amortization_table(
    input: &AmortizationInput,
) -> CreditResult<ComputationOutput<AmortizationOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    if input.principal <= Decimal::ZERO {
        warnings.push(format!(
            "Principal {} is not positive; schedule is degenerate",
            input.principal
        ));
    }

    let terms = LoanTerms {
        principal: input.principal,
        tin: input.tin,
        months: input.months,
    };
    let (quota, rows) = amortize(&terms)?;

    let total_interest = checked_sum(rows.iter().map(|r| r.interest))
        .ok_or_else(|| CreditError::overflow("total interest"))?;
    let total_principal = checked_sum(rows.iter().map(|r| r.principal))
        .ok_or_else(|| CreditError::overflow("total principal"))?;
    let schedule = points_from_rows(input.principal, &rows);

    let output = AmortizationOutput {
        monthly_quota: quota,
        rows,
        schedule,
        total_interest,
        total_principal,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "French amortisation (level monthly payment)",
        &serde_json::json!({
            "principal": input.principal.to_string(),
            "tin": input.tin.to_string(),
            "months": input.months,
        }),
        warnings,
        elapsed,
        output,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn terms(principal: Decimal, tin: Decimal, months: u32) -> LoanTerms {
        LoanTerms {
            principal,
            tin,
            months,
        }
    }

    #[test]
    fn test_zero_rate_straight_line() {
        let schedule = amortization_schedule(&terms(dec!(1200), Decimal::ZERO, 12)).unwrap();
        assert_eq!(schedule.len(), 13);
        assert_eq!(schedule[0], AmortizationPoint { month: 0, balance: dec!(1200) });
        assert_eq!(schedule[6].balance, dec!(600));
        assert_eq!(schedule[12].balance, Decimal::ZERO);
    }

    #[test]
    fn test_schedule_closes_and_declines() {
        let schedule = amortization_schedule(&terms(dec!(10000), dec!(5.99), 60)).unwrap();
        assert_eq!(schedule.len(), 61);
        for pair in schedule.windows(2) {
            assert_eq!(pair[1].month, pair[0].month + 1);
            assert!(pair[1].balance <= pair[0].balance);
        }
        let last = schedule.last().unwrap().balance;
        assert!(last.abs() < dec!(0.000001), "residual {last}");
    }

    #[test]
    fn test_first_row_split() {
        // 12,000 at 12%: first month interest is 1% of principal
        let out = build_amortization_table(&AmortizationInput {
            principal: dec!(12000),
            tin: dec!(12),
            months: 24,
        })
        .unwrap();
        let first = &out.result.rows[0];
        assert_eq!(first.interest, dec!(120));
        assert_eq!(first.principal, out.result.monthly_quota - dec!(120));
        assert_eq!(first.opening_balance, dec!(12000));
    }

    #[test]
    fn test_table_totals() {
        let out = build_amortization_table(&AmortizationInput {
            principal: dec!(8000),
            tin: dec!(7.5),
            months: 48,
        })
        .unwrap();
        let r = &out.result;
        assert_eq!(r.rows.len(), 48);
        assert_eq!(r.schedule.len(), 49);
        assert!((r.total_principal - dec!(8000)).abs() < dec!(0.000001));
        let paid = r.monthly_quota * dec!(48);
        assert!((r.total_interest + r.total_principal - paid).abs() < dec!(0.000001));
    }

    #[test]
    fn test_near_limit_principal_does_not_panic() {
        // Payment fits, but the running balance arithmetic is at the edge of the range
        let result = amortization_schedule(&terms(Decimal::MAX, dec!(0.0001), 2));
        match result {
            Ok(schedule) => assert_eq!(schedule.len(), 3),
            Err(e) => assert!(matches!(e, CreditError::Overflow { .. })),
        }
    }

    #[test]
    fn test_zero_months_rejected() {
        assert!(amortization_schedule(&terms(dec!(1000), dec!(5), 0)).is_err());
    }
}
