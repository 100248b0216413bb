use tracing::{debug, warn};

use super::accounts::PersonAccounts;
use super::benefits::{cpp_benefit, gis_benefit, oas_benefit, other_income, pension_income};
use super::config::{TaxConfig, TaxTables, index_factor};
use super::error::SimResult;
use super::household::{
    age_in_year, members, pension_split_allowed, spending_target, years_to_simulate,
};
use super::planner::{PlanPerson, PlanRequest, mandatory_rrif, plan};
use super::real_estate::{PropertyState, PropertyYear};
use super::rrif::rrsp_converts;
use super::strategy::tfsa_contribution_share;
use super::summary::{person_estate_after_tax, summarize};
use super::tax::IncomeBreakdown;
use super::types::{
    EndBalances, Household, Person, PersonYear, SimulationResult, Withdrawals, YearResult,
};
use super::validation::validate_household;

const TFSA_LIMIT_ROUNDING: f64 = 500.0;

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationState {
    pub year_index: u32,
    pub accounts: [PersonAccounts; 2],
    pub properties: [Option<PropertyState>; 2],
    // Last year's net income excluding OAS and GIS, per person.
    pub prior_gis_income: Option<[f64; 2]>,
    pub plan_success: bool,
    pub stopped: bool,
}

impl SimulationState {
    pub fn new(household: &Household) -> Self {
        let mut accounts = [PersonAccounts::default(); 2];
        let mut properties = [None, None];
        for (idx, person) in members(household).into_iter().enumerate() {
            accounts[idx] = PersonAccounts::from_person(person);
            properties[idx] = person
                .real_estate
                .as_ref()
                .map(PropertyState::from_real_estate);
        }
        Self {
            year_index: 0,
            accounts,
            properties,
            prior_gis_income: None,
            plan_success: true,
            stopped: false,
        }
    }
}

pub struct Simulator<'a> {
    household: &'a Household,
    base_tables: TaxTables,
    total_years: u32,
    state: SimulationState,
}

impl<'a> Simulator<'a> {
    pub fn new(household: &'a Household, config: &TaxConfig) -> SimResult<Self> {
        Self::resume(household, config, SimulationState::new(household))
    }

    pub fn resume(
        household: &'a Household,
        config: &TaxConfig,
        state: SimulationState,
    ) -> SimResult<Self> {
        validate_household(household, config)?;
        let base_tables = config.tables_for(&household.province)?;
        Ok(Self {
            household,
            base_tables,
            total_years: years_to_simulate(household),
            state,
        })
    }

    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    pub fn into_state(self) -> SimulationState {
        self.state
    }

    pub fn final_estate_after_tax(&self) -> f64 {
        let household = self.household;
        let last = self.state.year_index.saturating_sub(1);
        let tables = self.base_tables.indexed(last, household.general_inflation);
        members(household)
            .into_iter()
            .enumerate()
            .map(|(idx, person)| {
                person_estate_after_tax(
                    &tables,
                    age_in_year(person, last),
                    &self.state.accounts[idx],
                    person.corporate_dividend_type,
                    self.state.properties[idx].as_ref(),
                )
            })
            .sum()
    }

    fn step(&mut self) -> YearResult {
        let household = self.household;
        let year_index = self.state.year_index;
        let year = household.start_year + year_index as i32;
        let members = members(household);
        let active = members.len();
        let tables = self
            .base_tables
            .indexed(year_index, household.general_inflation);
        let inflation = index_factor(year_index, household.general_inflation);

        let mut ages = [0u32; 2];
        for idx in 0..active {
            ages[idx] = age_in_year(members[idx], year_index);
        }
        let target = spending_target(household, year_index, ages[0]);

        let mut notes = Vec::new();
        let mut plan_people = [PlanPerson::default(); 2];
        let mut person_years = [PersonYear::default(); 2];
        let mut base_gains = [0.0; 2];
        let mut non_discretionary = [0.0; 2];
        let mut mortgage_total = 0.0;

        for idx in 0..active {
            let person = members[idx];
            let age = ages[idx];
            let accounts = &mut self.state.accounts[idx];

            if accounts.rrsp > 0.0 && rrsp_converts(age, person.early_rrif_conversion_age) {
                let converted = accounts.convert_rrsp();
                notes.push(format!(
                    "{}: converted RRSP of {converted:.0} to RRIF at age {age}",
                    label(person, idx)
                ));
            }

            let distributions = accounts
                .nonreg
                .accrue(&person.yields, household.reinvest_nonreg_distributions);
            accounts.corporate.accrue(&person.yields);

            let cpp = cpp_benefit(person, age, inflation);
            let oas = oas_benefit(person, age, inflation);
            let pension = pension_income(person, age, year_index, household.general_inflation);
            let other = other_income(person, age, year_index, household.general_inflation);

            let property = match self.state.properties[idx].as_mut() {
                Some(home) => home.step(age),
                None => PropertyYear::default(),
            };
            mortgage_total += property.mortgage_paid;
            if property.downsized {
                notes.push(format!(
                    "{}: downsized home, released {:.0}",
                    label(person, idx),
                    property.downsize_proceeds
                ));
            }

            let base_incomes = IncomeBreakdown {
                ordinary: cpp + other.employment + distributions.interest,
                eligible_dividends: distributions.eligible_dividends,
                non_eligible_dividends: distributions.non_eligible_dividends,
                capital_gains: distributions.capital_gains + property.taxable_gain,
                pension_income: pension,
                oas_received: oas,
                other_taxable: other.other,
            };
            let mandatory = mandatory_rrif(
                household.strategy,
                age,
                person.oas_start_age,
                accounts,
                household.rrif_topup,
            );

            base_gains[idx] = distributions.capital_gains + property.taxable_gain;
            non_discretionary[idx] = base_incomes.net_income() - oas + mandatory;
            plan_people[idx] = PlanPerson {
                age,
                receives_oas: oas > 0.0,
                dividend_type: person.corporate_dividend_type,
                accounts: *accounts,
                base_incomes,
                cash_inflows: cpp
                    + oas
                    + pension
                    + other.total()
                    + distributions.cash_paid_out
                    + property.downsize_proceeds,
                mandatory_rrif: mandatory,
            };
            person_years[idx] = PersonYear {
                age,
                cpp,
                oas,
                pension_income: pension,
                other_income: other.total(),
                rrif_required: mandatory,
                ..PersonYear::default()
            };
        }

        // GIS is means-tested on last year's income; the first year uses
        // income that arrives regardless of withdrawals.
        let gis_income = self.state.prior_gis_income.unwrap_or(non_discretionary);
        let tested_income: f64 = gis_income[..active].iter().sum();
        for idx in 0..active {
            let gis = gis_benefit(
                &tables.gis,
                active == 2,
                person_years[idx].oas > 0.0,
                tested_income,
            );
            person_years[idx].gis = gis;
            plan_people[idx].cash_inflows += gis;
        }

        let split_fraction = if pension_split_allowed(household, ages) {
            household.pension_splitting_fraction
        } else {
            0.0
        };
        let request = PlanRequest {
            tables: &tables,
            strategy: household.strategy,
            people: plan_people,
            active,
            cash_need: target + mortgage_total,
            gap_tolerance: household.gap_tolerance,
            split_fraction,
            accept_clawback_for_estate: household.accept_clawback_for_estate,
        };
        let plan = plan(&request);
        let taxes = plan.pricing.taxes();

        let mut tfsa_withdrawn = [0.0; 2];
        let mut prior_gis_income = [0.0; 2];
        for idx in 0..active {
            let draw = plan.draws[idx];
            let accounts = &mut self.state.accounts[idx];
            let registered = accounts.withdraw_registered(draw.registered);
            let sale = accounts.nonreg.withdraw(draw.nonreg);
            let (dividend, rdtoh_refund) = accounts
                .corporate
                .pay_dividend(draw.corporate, members[idx].corporate_dividend_type);
            let tfsa = accounts.withdraw_tfsa(draw.tfsa);
            tfsa_withdrawn[idx] = tfsa;
            if rdtoh_refund > 0.0 {
                debug!(year, person = idx + 1, rdtoh_refund, "dividend released RDTOH");
            }

            let tax = taxes[idx];
            let py = &mut person_years[idx];
            py.withdrawals = Withdrawals {
                rrif: registered.from_rrif,
                rrsp: registered.from_rrsp,
                nonreg: sale.proceeds,
                corporate: dividend,
                tfsa,
            };
            py.realized_capital_gains = base_gains[idx] + sale.realized_gain;
            py.net_income = tax.federal.net_income;
            py.taxable_income = tax.federal.taxable_income;
            py.federal_tax = tax.federal.net_tax;
            py.provincial_tax = tax.provincial.net_tax;
            py.total_tax = tax.total();
            py.oas_clawback = tax.federal.oas_clawback;

            prior_gis_income[idx] = plan.pricing.incomes[idx].net_income() - py.oas;
        }

        let after_mortgage = plan.pricing.net_cash - mortgage_total;
        let spending_met = after_mortgage.clamp(0.0, target);
        let spending_gap = (target - spending_met).max(0.0);
        let is_underfunded = spending_gap > household.gap_tolerance;

        let mut surplus = (after_mortgage - target).max(0.0);
        let surplus_reinvested = surplus;
        for idx in 0..active {
            let person = members[idx];
            let share = tfsa_contribution_share(
                household.strategy,
                ages[idx],
                person.oas_start_age,
                household.post_oas_tfsa_fraction,
            );
            let accounts = &mut self.state.accounts[idx];
            let contributed = accounts.contribute_tfsa(surplus.min(accounts.tfsa_room * share));
            surplus -= contributed;
            person_years[idx].tfsa_contribution = contributed;
        }
        if surplus > 0.0 {
            self.state.accounts[0].nonreg.deposit_cash(surplus);
        }

        let next_tfsa_limit = tfsa_limit(household, year_index + 1);
        let mut net_worth = 0.0;
        for idx in 0..active {
            let person = members[idx];
            let accounts = &mut self.state.accounts[idx];
            accounts.grow_registered(person.yields.registered_growth);
            accounts.nonreg.grow(&person.yields);
            accounts.corporate.holdings.grow(&person.yields);
            accounts.roll_tfsa_room(tfsa_withdrawn[idx], next_tfsa_limit);

            let real_estate_equity = self.state.properties[idx]
                .as_ref()
                .map(PropertyState::equity)
                .unwrap_or(0.0);
            let end = EndBalances {
                rrif: accounts.rrif,
                rrsp: accounts.rrsp,
                tfsa: accounts.tfsa,
                tfsa_room: accounts.tfsa_room,
                nonreg: accounts.nonreg.total(),
                nonreg_acb: accounts.nonreg.invested_acb,
                corporate: accounts.corporate.total(),
                rdtoh: accounts.corporate.rdtoh,
                real_estate_equity,
            };
            net_worth += end.financial_total() + end.real_estate_equity;
            person_years[idx].end = end;
        }

        if plan.clawback_accepted {
            notes.push("OAS clawback accepted to meet spending".to_string());
        }
        if plan.accounts_exhausted {
            notes.push("all accounts exhausted".to_string());
        }

        self.state.plan_success &= !is_underfunded;
        self.state.prior_gis_income = Some(prior_gis_income);
        self.state.year_index += 1;

        debug!(
            year,
            age = ages[0],
            target,
            spending_met,
            total_tax = plan.pricing.total_tax,
            rounds = plan.rounds,
            "simulated year"
        );
        if is_underfunded {
            warn!(year, age = ages[0], spending_gap, "spending target not met");
            if household.stop_on_fail {
                self.state.stopped = true;
            }
        }

        let [p1, p2] = person_years;
        YearResult {
            year,
            p1,
            p2,
            spending_target: target,
            mortgage_payment: mortgage_total,
            spending_met,
            spending_gap,
            surplus_reinvested,
            total_tax: plan.pricing.total_tax,
            net_worth,
            plan_success: self.state.plan_success,
            is_underfunded,
            rrif_frontload_exceeded: plan.rrif_frontload_exceeded,
            accounts_exhausted: plan.accounts_exhausted,
            notes,
        }
    }
}

impl Iterator for Simulator<'_> {
    type Item = YearResult;

    fn next(&mut self) -> Option<YearResult> {
        if self.state.stopped || self.state.year_index >= self.total_years {
            return None;
        }
        Some(self.step())
    }
}

pub fn simulate(household: &Household, config: &TaxConfig) -> SimResult<SimulationResult> {
    let mut simulator = Simulator::new(household, config)?;
    let years: Vec<YearResult> = simulator.by_ref().collect();
    let estate = simulator.final_estate_after_tax();
    Ok(SimulationResult {
        summary: summarize(&years, estate),
        years,
    })
}

fn label(person: &Person, idx: usize) -> String {
    if person.name.is_empty() {
        format!("p{}", idx + 1)
    } else {
        person.name.clone()
    }
}

fn tfsa_limit(household: &Household, year_index: u32) -> f64 {
    let indexed =
        household.tfsa_annual_limit * index_factor(year_index, household.general_inflation);
    (indexed / TFSA_LIMIT_ROUNDING).round() * TFSA_LIMIT_ROUNDING
}
