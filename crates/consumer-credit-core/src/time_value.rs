use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::CreditError;
use crate::types::{percent_to_rate, Money, Percent, Rate};
use crate::CreditResult;

/// Monthly periods in a year.
pub const MONTHS_PER_YEAR: u32 = 12;

/// Newton-Raphson iteration cap for [`solve_irr`].
pub const IRR_MAX_ITERATIONS: u32 = 1000;

/// Tolerance applied both to |NPV| and to the step between iterates.
pub const IRR_TOLERANCE: Decimal = dec!(0.000000001);

/// Monthly periodic rate from a nominal annual percentage: (tin / 100) / 12.
pub fn monthly_rate(tin: Percent) -> Rate {
    percent_to_rate(tin) / Decimal::from(MONTHS_PER_YEAR)
}

/// Level payment of a standard amortising annuity (payments at period end).
///
/// A zero periodic rate falls back to straight-line repayment, `principal / months`.
pub fn monthly_payment(principal: Money, tin: Percent, months: u32) -> CreditResult<Money> {
    if months == 0 {
        return Err(CreditError::InvalidInput {
            field: "months".into(),
            reason: "Loan term must be at least 1 month".into(),
        });
    }

    let rate = monthly_rate(tin);
    let n = Decimal::from(months);

    if rate.is_zero() {
        return Ok(principal / n);
    }

    let growth = (Decimal::ONE + rate)
        .checked_powu(u64::from(months))
        .ok_or_else(|| CreditError::Overflow {
            context: "annuity growth factor".into(),
        })?;
    let denominator = growth - Decimal::ONE;

    if denominator.is_zero() {
        return Err(CreditError::DivisionByZero {
            context: "annuity factor".into(),
        });
    }

    principal
        .checked_mul(rate)
        .and_then(|v| v.checked_mul(growth))
        .and_then(|v| v.checked_div(denominator))
        .ok_or_else(|| CreditError::Overflow {
            context: "monthly payment".into(),
        })
}

/// Net Present Value of a series of periodic cash flows
pub fn npv(rate: Rate, cash_flows: &[Money]) -> CreditResult<Money> {
    if rate <= dec!(-1) {
        return Err(CreditError::InvalidInput {
            field: "rate".into(),
            reason: "Discount rate must be greater than -100%".into(),
        });
    }

    npv_and_derivative(rate, cash_flows)
        .map(|(value, _)| value)
        .ok_or_else(|| CreditError::Overflow {
            context: "NPV discounting".into(),
        })
}

/// NPV and dNPV/dr in one pass. Discount factors are built by repeated
/// multiplication; every step is checked so an unrepresentable value yields `None`.
fn npv_and_derivative(rate: Rate, cash_flows: &[Money]) -> Option<(Money, Money)> {
    let one_plus_r = Decimal::ONE.checked_add(rate)?;
    let mut discount = Decimal::ONE;
    let mut value = Decimal::ZERO;
    let mut slope = Decimal::ZERO;

    for (t, cf) in cash_flows.iter().enumerate() {
        let next = discount.checked_mul(one_plus_r)?;
        value = value.checked_add(cf.checked_div(discount)?)?;
        if t > 0 {
            let term = Decimal::from(t).checked_mul(*cf)?.checked_div(next)?;
            slope = slope.checked_sub(term)?;
        }
        discount = next;
    }

    Some((value, slope))
}

/// How a [`solve_irr`] run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IrrStatus {
    /// |NPV(r)| fell below the tolerance.
    NpvWithinTolerance,
    /// Successive iterates moved by less than the tolerance.
    StepWithinTolerance,
    /// The iteration cap was reached; the last iterate is returned as-is.
    IterationLimit,
    /// The iteration produced a value that cannot be represented
    /// (zero derivative, 1 + r = 0, overflow). No rate is available.
    Undefined,
}

/// Result of the periodic IRR search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IrrSolution {
    /// Periodic rate; `None` only when `status` is `Undefined`.
    pub rate: Option<Rate>,
    pub status: IrrStatus,
    pub iterations: u32,
}

impl IrrSolution {
    pub fn converged(&self) -> bool {
        matches!(
            self.status,
            IrrStatus::NpvWithinTolerance | IrrStatus::StepWithinTolerance
        )
    }
}

/// Default starting point for the monthly IRR search: 10% a year.
pub fn default_irr_guess() -> Rate {
    dec!(0.1) / Decimal::from(MONTHS_PER_YEAR)
}

/// Periodic internal rate of return using Newton-Raphson.
///
/// `cash_flows[0]` is the amount received at t = 0, later entries are the
/// periodic flows. The rate is never clamped and there is no fallback solver:
/// when neither stopping rule triggers within [`IRR_MAX_ITERATIONS`] the last
/// iterate is returned with [`IrrStatus::IterationLimit`].
pub fn solve_irr(cash_flows: &[Money], guess: Option<Rate>) -> IrrSolution {
    let mut rate = guess.unwrap_or_else(default_irr_guess);

    for i in 0..IRR_MAX_ITERATIONS {
        let iterations = i + 1;

        let Some((npv_val, dnpv)) = npv_and_derivative(rate, cash_flows) else {
            return undefined(iterations, "discounting overflowed");
        };

        if npv_val.abs() < IRR_TOLERANCE {
            log::debug!("IRR converged on NPV after {iterations} iterations: {rate}");
            return IrrSolution {
                rate: Some(rate),
                status: IrrStatus::NpvWithinTolerance,
                iterations,
            };
        }

        let Some(next) = npv_val
            .checked_div(dnpv)
            .and_then(|step| rate.checked_sub(step))
        else {
            return undefined(iterations, "Newton step not representable");
        };

        let Some(delta) = next.checked_sub(rate) else {
            return undefined(iterations, "Newton step not representable");
        };

        if delta.abs() < IRR_TOLERANCE {
            log::debug!("IRR converged on step after {iterations} iterations: {next}");
            return IrrSolution {
                rate: Some(next),
                status: IrrStatus::StepWithinTolerance,
                iterations,
            };
        }

        rate = next;
    }

    log::warn!("IRR did not converge after {IRR_MAX_ITERATIONS} iterations; returning last iterate {rate}");
    IrrSolution {
        rate: Some(rate),
        status: IrrStatus::IterationLimit,
        iterations: IRR_MAX_ITERATIONS,
    }
}

fn undefined(iterations: u32, why: &str) -> IrrSolution {
    log::warn!("IRR undefined after {iterations} iterations: {why}");
    IrrSolution {
        rate: None,
        status: IrrStatus::Undefined,
        iterations,
    }
}

/// Compound a periodic rate to an effective annual rate: (1 + r)^n - 1.
/// `None` when the power is not representable.
pub fn annualize_rate(periodic: Rate, periods_per_year: u32) -> Option<Rate> {
    Decimal::ONE
        .checked_add(periodic)?
        .checked_powu(u64::from(periods_per_year))?
        .checked_sub(Decimal::ONE)
}
