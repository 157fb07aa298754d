use common::TaxEstimate;
use rust_decimal::Decimal;
use tracing::debug;

use crate::error::{ComputeError, Result};

/// One row of the monthly IRPF table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bracket {
    pub min: Decimal,
    /// Upper bound, inclusive. `None` for the last bracket.
    pub max: Option<Decimal>,
    /// Rate in percent
    pub rate: Decimal,
    pub deduction: Decimal,
}

const fn bracket(min: i64, max: Option<i64>, rate: i64, deduction: i64) -> Bracket {
    Bracket {
        min: Decimal::from_parts(min as u32, 0, 0, false, 2),
        max: match max {
            Some(v) => Some(Decimal::from_parts(v as u32, 0, 0, false, 2)),
            None => None,
        },
        rate: Decimal::from_parts(rate as u32, 0, 0, false, 1),
        deduction: Decimal::from_parts(deduction as u32, 0, 0, false, 2),
    }
}

/// Monthly withholding table, amounts in cents and rates in tenths of a percent.
pub const IRPF_TABLE: [Bracket; 5] = [
    bracket(0, Some(2_259_20), 0, 0),
    bracket(2_259_21, Some(2_826_65), 75, 169_44),
    bracket(2_826_66, Some(3_751_05), 150, 381_44),
    bracket(3_751_06, Some(4_664_68), 225, 662_77),
    bracket(4_664_69, None, 275, 896_00),
];

/// Deduction per dependent, in BRL.
pub const DEPENDENT_DEDUCTION: Decimal = Decimal::from_parts(189_59, 0, 0, false, 2);

/// Finds the bracket `base` falls in by scanning the table in order.
pub fn bracket_for(base: Decimal) -> &'static Bracket {
    IRPF_TABLE
        .iter()
        .find(|b| b.max.is_none_or(|max| base <= max))
        .unwrap_or(&IRPF_TABLE[IRPF_TABLE.len() - 1])
}

/// Estimates monthly IRPF for a gross monthly income.
pub fn estimate_irpf(
    gross_income: Decimal,
    dependents: u32,
    other_deductions: Decimal,
) -> Result<TaxEstimate> {
    if gross_income < Decimal::ZERO {
        return Err(ComputeError::InvalidInput(
            "income must not be negative".to_string(),
        ));
    }
    if other_deductions < Decimal::ZERO {
        return Err(ComputeError::InvalidInput(
            "deductions must not be negative".to_string(),
        ));
    }

    let taxable_base = (gross_income
        - DEPENDENT_DEDUCTION * Decimal::from(dependents)
        - other_deductions)
        .max(Decimal::ZERO);

    let bracket = bracket_for(taxable_base);
    let monthly_tax = (taxable_base * bracket.rate / Decimal::ONE_HUNDRED - bracket.deduction)
        .max(Decimal::ZERO)
        .round_dp(2);

    let effective_rate = if gross_income > Decimal::ZERO {
        (monthly_tax / gross_income * Decimal::ONE_HUNDRED).round_dp(2)
    } else {
        Decimal::ZERO
    };

    debug!(%gross_income, %taxable_base, %monthly_tax, "Estimated IRPF");

    Ok(TaxEstimate {
        gross_income,
        dependents,
        other_deductions,
        taxable_base,
        rate: bracket.rate,
        bracket_deduction: bracket.deduction,
        monthly_tax,
        effective_rate,
        annual_tax: monthly_tax * Decimal::from(12),
    })
}
