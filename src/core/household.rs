use super::config::{GisParams, TaxTables, index_factor};
use super::tax::{IncomeBreakdown, PersonTax, person_tax};
use super::types::{Household, Person, SpendingSchedule};

pub const PENSION_SPLIT_AGE: u32 = 65;
pub const MAX_PENSION_SPLIT_FRACTION: f64 = 0.5;
const PENSION_SPLIT_STEPS: u32 = 10;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SpendingPhase {
    GoGo,
    SlowGo,
    NoGo,
}

pub fn is_couple(household: &Household) -> bool {
    household.include_partner
}

pub fn members(household: &Household) -> Vec<&Person> {
    if is_couple(household) {
        vec![&household.p1, &household.p2]
    } else {
        vec![&household.p1]
    }
}

pub fn years_to_simulate(household: &Household) -> u32 {
    household
        .end_age
        .saturating_sub(household.p1.start_age)
        .saturating_add(1)
}

pub fn age_in_year(person: &Person, year_index: u32) -> u32 {
    person.start_age + year_index
}

pub fn spending_phase(schedule: &SpendingSchedule, p1_age: u32) -> SpendingPhase {
    if p1_age < schedule.go_go_end_age {
        SpendingPhase::GoGo
    } else if p1_age < schedule.slow_go_end_age {
        SpendingPhase::SlowGo
    } else {
        SpendingPhase::NoGo
    }
}

pub fn spending_target(household: &Household, year_index: u32, p1_age: u32) -> f64 {
    let schedule = &household.spending;
    let base = match spending_phase(schedule, p1_age) {
        SpendingPhase::GoGo => schedule.go_go,
        SpendingPhase::SlowGo => schedule.slow_go,
        SpendingPhase::NoGo => schedule.no_go,
    };
    base.max(0.0) * index_factor(year_index, household.spending_inflation)
}

/// GIS threshold and per-person maximum for the household's composition.
/// Every GIS calculation goes through here so single and couple never diverge.
pub fn gis_params_for(gis: &GisParams, include_partner: bool) -> (f64, f64) {
    if include_partner {
        (gis.threshold_couple, gis.max_benefit_couple)
    } else {
        (gis.threshold_single, gis.max_benefit_single)
    }
}

pub fn pension_split_allowed(household: &Household, ages: [u32; 2]) -> bool {
    is_couple(household)
        && household.pension_splitting_fraction > 0.0
        && ages.iter().all(|age| *age >= PENSION_SPLIT_AGE)
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SplitOutcome {
    /// Pension income moved for tax purposes; cash stays with the source.
    pub transfer: f64,
    pub from: usize,
    pub taxes: [PersonTax; 2],
}

impl SplitOutcome {
    pub fn total_tax(&self) -> f64 {
        self.taxes[0].total() + self.taxes[1].total()
    }
}

pub fn household_tax(
    tables: &TaxTables,
    ages: [u32; 2],
    incomes: &[IncomeBreakdown; 2],
) -> SplitOutcome {
    SplitOutcome {
        transfer: 0.0,
        from: 0,
        taxes: [
            person_tax(tables, ages[0], &incomes[0]),
            person_tax(tables, ages[1], &incomes[1]),
        ],
    }
}

/// Lowest-tax allocation of up to `max_fraction` of the higher-income
/// spouse's eligible pension income to the other spouse.
pub fn optimal_pension_split(
    tables: &TaxTables,
    ages: [u32; 2],
    incomes: &[IncomeBreakdown; 2],
    eligible_pension: [f64; 2],
    max_fraction: f64,
) -> SplitOutcome {
    let mut best = household_tax(tables, ages, incomes);
    let fraction = max_fraction.clamp(0.0, MAX_PENSION_SPLIT_FRACTION);
    let from = if incomes[0].net_income() >= incomes[1].net_income() {
        0
    } else {
        1
    };
    let to = 1 - from;
    let pool = eligible_pension[from].min(incomes[from].pension_income).max(0.0);
    if fraction <= 0.0 || pool <= 0.0 {
        return best;
    }

    for step in 1..=PENSION_SPLIT_STEPS {
        let transfer = pool * fraction * step as f64 / PENSION_SPLIT_STEPS as f64;
        let mut shifted = *incomes;
        shifted[from].pension_income -= transfer;
        shifted[to].pension_income += transfer;
        let candidate = SplitOutcome {
            transfer,
            from,
            taxes: [
                person_tax(tables, ages[0], &shifted[0]),
                person_tax(tables, ages[1], &shifted[1]),
            ],
        };
        if candidate.total_tax() + 1e-9 < best.total_tax() {
            best = candidate;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::TaxConfig;

    fn tables() -> TaxTables {
        TaxConfig::builtin()
            .and_then(|c| c.tables_for("AB"))
            .expect("AB tables")
    }

    #[test]
    fn phases_switch_at_configured_ages() {
        let schedule = SpendingSchedule {
            go_go: 80_000.0,
            slow_go: 60_000.0,
            no_go: 40_000.0,
            go_go_end_age: 75,
            slow_go_end_age: 85,
        };
        assert_eq!(spending_phase(&schedule, 74), SpendingPhase::GoGo);
        assert_eq!(spending_phase(&schedule, 75), SpendingPhase::SlowGo);
        assert_eq!(spending_phase(&schedule, 85), SpendingPhase::NoGo);
    }

    #[test]
    fn spending_target_inflates_from_start_year() {
        let household = Household {
            spending: SpendingSchedule::flat(50_000.0),
            spending_inflation: 0.03,
            ..Household::default()
        };
        let target = spending_target(&household, 2, 67);
        assert!((target - 50_000.0 * 1.03 * 1.03).abs() < 1e-6);
    }

    #[test]
    fn single_household_has_one_member() {
        let mut household = Household::default();
        assert_eq!(members(&household).len(), 1);
        household.include_partner = true;
        assert_eq!(members(&household).len(), 2);
    }

    #[test]
    fn gis_helper_picks_composition() {
        let gis = tables().gis;
        assert_eq!(gis_params_for(&gis, false), (22_056.0, 13_265.0));
        assert_eq!(gis_params_for(&gis, true), (29_136.0, 7_985.0));
    }

    #[test]
    fn split_requires_couple_and_both_65() {
        let mut household = Household {
            include_partner: true,
            pension_splitting_fraction: 0.5,
            ..Household::default()
        };
        assert!(pension_split_allowed(&household, [65, 66]));
        assert!(!pension_split_allowed(&household, [65, 64]));
        household.include_partner = false;
        assert!(!pension_split_allowed(&household, [65, 66]));
    }

    #[test]
    fn splitting_a_large_pension_lowers_household_tax() {
        let tables = tables();
        let incomes = [
            IncomeBreakdown {
                pension_income: 100_000.0,
                ..Default::default()
            },
            IncomeBreakdown::default(),
        ];
        let unsplit = household_tax(&tables, [66, 66], &incomes);
        let split = optimal_pension_split(&tables, [66, 66], &incomes, [100_000.0, 0.0], 0.5);
        assert!(split.total_tax() < unsplit.total_tax());
        assert_eq!(split.from, 0);
        assert!(split.transfer > 0.0 && split.transfer <= 50_000.0 + 1e-9);
    }

    #[test]
    fn zero_fraction_never_transfers() {
        let tables = tables();
        let incomes = [
            IncomeBreakdown {
                pension_income: 100_000.0,
                ..Default::default()
            },
            IncomeBreakdown::default(),
        ];
        let split = optimal_pension_split(&tables, [66, 66], &incomes, [100_000.0, 0.0], 0.0);
        assert_eq!(split.transfer, 0.0);
    }
}
