use super::config::{GisParams, index_factor};
use super::household::gis_params_for;
use super::types::{IncomeKind, Person};

pub const STANDARD_BENEFIT_AGE: u32 = 65;
pub const CPP_EARLIEST_AGE: u32 = 60;
pub const LATEST_DEFERRAL_AGE: u32 = 70;
pub const CPP_DEFERRAL_PER_MONTH: f64 = 0.007;
pub const CPP_EARLY_PER_MONTH: f64 = 0.006;
pub const OAS_DEFERRAL_PER_MONTH: f64 = 0.006;
pub const OAS_AGE_75_INCREASE: f64 = 0.10;
pub const OAS_INCREASE_AGE: u32 = 75;

/// Permanent CPP adjustment for taking the pension at `start_age`.
pub fn cpp_adjustment(start_age: u32) -> f64 {
    let start = start_age.clamp(CPP_EARLIEST_AGE, LATEST_DEFERRAL_AGE);
    if start >= STANDARD_BENEFIT_AGE {
        let months = (start - STANDARD_BENEFIT_AGE) * 12;
        1.0 + CPP_DEFERRAL_PER_MONTH * months as f64
    } else {
        let months = (STANDARD_BENEFIT_AGE - start) * 12;
        1.0 - CPP_EARLY_PER_MONTH * months as f64
    }
}

/// Permanent OAS deferral increase. OAS cannot start before 65.
pub fn oas_adjustment(start_age: u32) -> f64 {
    let start = start_age.clamp(STANDARD_BENEFIT_AGE, LATEST_DEFERRAL_AGE);
    let months = (start - STANDARD_BENEFIT_AGE) * 12;
    1.0 + OAS_DEFERRAL_PER_MONTH * months as f64
}

pub fn cpp_benefit(person: &Person, age: u32, inflation_factor: f64) -> f64 {
    if age < person.cpp_start_age || person.cpp_annual_at_65 <= 0.0 {
        return 0.0;
    }
    person.cpp_annual_at_65 * cpp_adjustment(person.cpp_start_age) * inflation_factor
}

pub fn oas_benefit(person: &Person, age: u32, inflation_factor: f64) -> f64 {
    if age < person.oas_start_age.max(STANDARD_BENEFIT_AGE) || person.oas_annual_at_65 <= 0.0 {
        return 0.0;
    }
    let senior_increase = if age >= OAS_INCREASE_AGE {
        1.0 + OAS_AGE_75_INCREASE
    } else {
        1.0
    };
    person.oas_annual_at_65
        * oas_adjustment(person.oas_start_age)
        * senior_increase
        * inflation_factor
}

/// Guaranteed Income Supplement for one person.
///
/// `income` excludes OAS and GIS. For couples it is the combined income of
/// both spouses and each spouse bears half of the reduction.
pub fn gis_benefit(gis: &GisParams, include_partner: bool, receives_oas: bool, income: f64) -> f64 {
    if !receives_oas {
        return 0.0;
    }
    let (threshold, max_benefit) = gis_params_for(gis, include_partner);
    if income >= threshold {
        return 0.0;
    }
    let mut reduction = ((income - gis.employment_exemption_1) * gis.clawback_rate).max(0.0);
    if include_partner {
        reduction *= 0.5;
    }
    (max_benefit - reduction).max(0.0)
}

pub fn pension_income(person: &Person, age: u32, years_elapsed: u32, inflation: f64) -> f64 {
    person
        .pensions
        .iter()
        .filter(|p| age >= p.start_age)
        .map(|p| {
            let factor = if p.inflation_indexed {
                index_factor(years_elapsed, inflation)
            } else {
                1.0
            };
            p.amount.max(0.0) * factor
        })
        .sum()
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OtherIncomeYear {
    pub employment: f64,
    pub other: f64,
}

impl OtherIncomeYear {
    pub fn total(&self) -> f64 {
        self.employment + self.other
    }
}

/// Non-pension income streams active at `age`; `end_age` is exclusive.
pub fn other_income(
    person: &Person,
    age: u32,
    years_elapsed: u32,
    inflation: f64,
) -> OtherIncomeYear {
    let mut year = OtherIncomeYear::default();
    for stream in &person.other_incomes {
        if stream.start_age.is_some_and(|start| age < start) {
            continue;
        }
        if stream.end_age.is_some_and(|end| age >= end) {
            continue;
        }
        let factor = if stream.inflation_indexed {
            index_factor(years_elapsed, inflation)
        } else {
            1.0
        };
        let amount = stream.amount.max(0.0) * factor;
        match stream.kind {
            IncomeKind::Employment => year.employment += amount,
            IncomeKind::Rental | IncomeKind::Business | IncomeKind::Other => year.other += amount,
        }
    }
    year
}
