use super::config::{Bracket, TaxParams, TaxTables};

pub const AGE_CREDIT_AGE: u32 = 65;
pub const CAPITAL_GAINS_INCLUSION: f64 = 0.5;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct IncomeBreakdown {
    pub ordinary: f64,
    pub eligible_dividends: f64,
    pub non_eligible_dividends: f64,
    pub capital_gains: f64,
    pub pension_income: f64,
    pub oas_received: f64,
    pub other_taxable: f64,
}

impl IncomeBreakdown {
    /// Actual amounts received: no gross-up, full capital gains.
    pub fn net_income(&self) -> f64 {
        self.ordinary
            + self.pension_income
            + self.oas_received
            + self.eligible_dividends
            + self.non_eligible_dividends
            + self.capital_gains
            + self.other_taxable
    }

    pub fn grossed_up_eligible(&self, params: &TaxParams) -> f64 {
        self.eligible_dividends.max(0.0) * (1.0 + params.grossup_eligible)
    }

    pub fn grossed_up_non_eligible(&self, params: &TaxParams) -> f64 {
        self.non_eligible_dividends.max(0.0) * (1.0 + params.grossup_non_eligible)
    }

    pub fn taxable_income(&self, params: &TaxParams) -> f64 {
        (self.ordinary
            + self.pension_income
            + self.oas_received
            + self.other_taxable
            + self.grossed_up_eligible(params)
            + self.grossed_up_non_eligible(params)
            + CAPITAL_GAINS_INCLUSION * self.capital_gains)
            .max(0.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TaxResult {
    pub net_income: f64,
    pub taxable_income: f64,
    pub gross_tax: f64,
    pub age_credit: f64,
    pub dividend_credit: f64,
    pub total_credits: f64,
    pub oas_clawback: f64,
    pub net_tax: f64,
}

pub fn compute_tax(params: &TaxParams, age: u32, incomes: &IncomeBreakdown) -> TaxResult {
    let net_income = incomes.net_income().max(0.0);
    let taxable_income = incomes.taxable_income(params);
    let gross_tax = bracket_tax(&params.brackets, taxable_income);

    let bpa_credit = params.bpa_amount * params.bpa_rate;
    let pension_credit = incomes
        .pension_income
        .max(0.0)
        .min(params.pension_credit_amount)
        * params.pension_credit_rate;
    let age_credit = age_credit(params, age, net_income);
    let dividend_credit = incomes.grossed_up_eligible(params) * params.dividend_credit_eligible
        + incomes.grossed_up_non_eligible(params) * params.dividend_credit_non_eligible;
    let total_credits = bpa_credit + pension_credit + age_credit + dividend_credit;

    let oas_clawback = oas_clawback(
        params,
        clawback_income(params, incomes),
        incomes.oas_received,
    );
    let net_tax = (gross_tax - total_credits).max(0.0) + oas_clawback;

    TaxResult {
        net_income,
        taxable_income,
        gross_tax,
        age_credit,
        dividend_credit,
        total_credits,
        oas_clawback,
        net_tax,
    }
}

/// Sum of rate × slice over `[lower, upper)` brackets; the last bracket is open.
pub fn bracket_tax(brackets: &[Bracket], taxable_income: f64) -> f64 {
    let mut tax = 0.0;
    let mut lower = 0.0;
    for bracket in brackets {
        if taxable_income <= lower {
            break;
        }
        let upper = bracket.upper.unwrap_or(f64::INFINITY);
        tax += bracket.rate * (taxable_income.min(upper) - lower);
        lower = upper;
    }
    tax
}

/// Age credit phased out on net income (before gross-up).
pub fn age_credit(params: &TaxParams, age: u32, net_income: f64) -> f64 {
    if age < AGE_CREDIT_AGE {
        return 0.0;
    }
    let reduction = (net_income - params.age_phaseout_start).max(0.0) * params.age_phaseout_rate;
    (params.age_amount - reduction).max(0.0) * params.bpa_rate
}

/// Recovery tax on OAS; federal only, never more than the OAS received.
pub fn oas_clawback(params: &TaxParams, clawback_income: f64, oas_received: f64) -> f64 {
    let Some(rule) = params.oas_clawback else {
        return 0.0;
    };
    if oas_received <= 0.0 {
        return 0.0;
    }
    ((clawback_income - rule.threshold).max(0.0) * rule.rate).min(oas_received)
}

/// Income figure the OAS recovery threshold is measured against.
pub fn clawback_income(params: &TaxParams, incomes: &IncomeBreakdown) -> f64 {
    incomes.taxable_income(params)
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PersonTax {
    pub federal: TaxResult,
    pub provincial: TaxResult,
}

impl PersonTax {
    pub fn total(&self) -> f64 {
        self.federal.net_tax + self.provincial.net_tax
    }
}

pub fn person_tax(tables: &TaxTables, age: u32, incomes: &IncomeBreakdown) -> PersonTax {
    PersonTax {
        federal: compute_tax(&tables.federal, age, incomes),
        provincial: compute_tax(&tables.provincial, age, incomes),
    }
}

/// Extra combined tax per dollar of `extra` ordinary-character income.
pub fn marginal_rate(
    tables: &TaxTables,
    age: u32,
    incomes: &IncomeBreakdown,
    extra: f64,
) -> f64 {
    if extra <= 0.0 {
        return 0.0;
    }
    let base = person_tax(tables, age, incomes).total();
    let mut bumped = *incomes;
    bumped.ordinary += extra;
    (person_tax(tables, age, &bumped).total() - base) / extra
}
