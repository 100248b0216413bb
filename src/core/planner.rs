use super::accounts::PersonAccounts;
use super::config::TaxTables;
use super::household::{SplitOutcome, optimal_pension_split};
use super::rrif::rrif_minimum;
use super::strategy::{ESTATE_DRAWDOWN_ORDER, Source, gap_order, rrif_target_rate};
use super::tax::{IncomeBreakdown, PersonTax, clawback_income, marginal_rate, person_tax};
use super::types::{DividendType, WithdrawalStrategy};

pub const MAX_PLAN_ROUNDS: usize = 6;
const BISECTION_ITERATIONS: usize = 40;
const MIN_DRAW: f64 = 0.01;
const MARGINAL_PROBE: f64 = 1_000.0;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Draws {
    /// RRIF first, then RRSP.
    pub registered: f64,
    pub nonreg: f64,
    pub corporate: f64,
    pub tfsa: f64,
}

impl Draws {
    pub fn get(&self, source: Source) -> f64 {
        match source {
            Source::Rrif => self.registered,
            Source::NonReg => self.nonreg,
            Source::Corporate => self.corporate,
            Source::Tfsa => self.tfsa,
        }
    }

    fn add(&mut self, source: Source, amount: f64) {
        match source {
            Source::Rrif => self.registered += amount,
            Source::NonReg => self.nonreg += amount,
            Source::Corporate => self.corporate += amount,
            Source::Tfsa => self.tfsa += amount,
        }
    }

    pub fn total(&self) -> f64 {
        self.registered + self.nonreg + self.corporate + self.tfsa
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlanPerson {
    pub age: u32,
    pub receives_oas: bool,
    pub dividend_type: DividendType,
    pub accounts: PersonAccounts,
    /// Income and cash that arrive whatever the planner does. Cash includes GIS.
    pub base_incomes: IncomeBreakdown,
    pub cash_inflows: f64,
    pub mandatory_rrif: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct PlanRequest<'a> {
    pub tables: &'a TaxTables,
    pub strategy: WithdrawalStrategy,
    pub people: [PlanPerson; 2],
    pub active: usize,
    pub cash_need: f64,
    pub gap_tolerance: f64,
    /// Zero when pension splitting is not allowed this year.
    pub split_fraction: f64,
    pub accept_clawback_for_estate: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Pricing {
    pub incomes: [IncomeBreakdown; 2],
    pub split: SplitOutcome,
    pub realized_gains: [f64; 2],
    pub total_tax: f64,
    pub net_cash: f64,
}

impl Pricing {
    pub fn taxes(&self) -> [PersonTax; 2] {
        self.split.taxes
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Plan {
    pub draws: [Draws; 2],
    pub pricing: Pricing,
    pub shortfall: f64,
    pub rounds: usize,
    pub rrif_frontload_exceeded: bool,
    /// Extra RRIF above target was held back to stay under the OAS threshold.
    pub clawback_guarded: bool,
    /// The guard had to be lifted to avoid a shortfall.
    pub clawback_accepted: bool,
    pub accounts_exhausted: bool,
}

impl Plan {
    pub fn is_underfunded(&self, gap_tolerance: f64) -> bool {
        self.shortfall > gap_tolerance
    }
}

/// Registered draw required before any gap filling: the larger of the CRA
/// minimum on the RRIF and the strategy target, plus the voluntary top-up.
pub fn mandatory_rrif(
    strategy: WithdrawalStrategy,
    age: u32,
    oas_start_age: u32,
    accounts: &PersonAccounts,
    topup: f64,
) -> f64 {
    let registered = accounts.registered();
    if registered <= 0.0 {
        return 0.0;
    }
    let minimum = rrif_minimum(age, accounts.rrif);
    let target = rrif_target_rate(strategy, age, oas_start_age)
        .map(|rate| rate * registered)
        .unwrap_or(0.0);
    (minimum.max(target) + topup.max(0.0)).min(registered)
}

pub fn price(request: &PlanRequest, draws: &[Draws; 2]) -> Pricing {
    let mut pricing = Pricing::default();
    let mut gross_cash = 0.0;

    for idx in 0..request.active {
        let person = &request.people[idx];
        let draw = &draws[idx];
        let mut incomes = person.base_incomes;

        let registered = person.accounts.split_registered(draw.registered);
        if person.age >= 65 {
            incomes.pension_income += registered.from_rrif;
        } else {
            incomes.ordinary += registered.from_rrif;
        }
        incomes.ordinary += registered.from_rrsp;

        let sale = person.accounts.nonreg.preview_sale(draw.nonreg);
        incomes.capital_gains = (incomes.capital_gains + sale.realized_gain).max(0.0);
        pricing.realized_gains[idx] = sale.realized_gain;

        let dividend = draw.corporate.min(person.accounts.corporate.total()).max(0.0);
        match person.dividend_type {
            DividendType::Eligible => incomes.eligible_dividends += dividend,
            DividendType::NonEligible => incomes.non_eligible_dividends += dividend,
        }

        pricing.incomes[idx] = incomes;
        gross_cash += person.cash_inflows + draw.total();
    }

    pricing.split = if request.active == 2 && request.split_fraction > 0.0 {
        let ages = [request.people[0].age, request.people[1].age];
        let eligible = [
            pricing.incomes[0].pension_income,
            pricing.incomes[1].pension_income,
        ];
        optimal_pension_split(
            request.tables,
            ages,
            &pricing.incomes,
            eligible,
            request.split_fraction,
        )
    } else {
        let mut outcome = SplitOutcome::default();
        for idx in 0..request.active {
            outcome.taxes[idx] = person_tax(
                request.tables,
                request.people[idx].age,
                &pricing.incomes[idx],
            );
        }
        outcome
    };

    pricing.total_tax = pricing.split.total_tax();
    pricing.net_cash = gross_cash - pricing.total_tax;
    pricing
}

fn shortfall(request: &PlanRequest, pricing: &Pricing) -> f64 {
    request.cash_need - pricing.net_cash
}

fn available(person: &PlanPerson, draws: &Draws, source: Source) -> f64 {
    let balance = match source {
        Source::Rrif => person.accounts.registered(),
        Source::NonReg => person.accounts.nonreg.total(),
        Source::Corporate => person.accounts.corporate.total(),
        Source::Tfsa => person.accounts.tfsa,
    };
    (balance - draws.get(source)).max(0.0)
}

pub fn terminal_average_rate(tables: &TaxTables, age: u32, registered: f64) -> f64 {
    if registered <= 0.0 {
        return 0.0;
    }
    let incomes = IncomeBreakdown {
        ordinary: registered,
        ..Default::default()
    };
    person_tax(tables, age, &incomes).total() / registered
}

/// Whether drawing into the OAS clawback now costs less than leaving the
/// registered balance to be taxed at death.
fn estate_prefers_clawback(
    request: &PlanRequest,
    idx: usize,
    draws: &[Draws; 2],
    pricing: &Pricing,
) -> bool {
    let person = &request.people[idx];
    let remaining = available(person, &draws[idx], Source::Rrif);
    let now = marginal_rate(
        request.tables,
        person.age,
        &pricing.incomes[idx],
        MARGINAL_PROBE,
    );
    now < terminal_average_rate(request.tables, person.age, remaining)
}

fn fill_order(request: &PlanRequest, draws: &[Draws; 2], pricing: &Pricing) -> [Source; 4] {
    let estate_first = request.strategy == WithdrawalStrategy::RrifFrontload
        && request.accept_clawback_for_estate
        && (0..request.active).any(|idx| {
            request.people[idx].receives_oas
                && estate_prefers_clawback(request, idx, draws, pricing)
        });
    if estate_first {
        ESTATE_DRAWDOWN_ORDER
    } else {
        gap_order(request.strategy)
    }
}

fn clawback_headroom(request: &PlanRequest, idx: usize, pricing: &Pricing) -> f64 {
    let federal = &request.tables.federal;
    let Some(rule) = federal.oas_clawback else {
        return f64::INFINITY;
    };
    (rule.threshold - clawback_income(federal, &pricing.incomes[idx])).max(0.0)
}

fn capacities(
    request: &PlanRequest,
    draws: &[Draws; 2],
    pricing: &Pricing,
    source: Source,
    guard_clawback: bool,
) -> ([f64; 2], bool) {
    let mut caps = [0.0; 2];
    let mut guarded = false;
    for idx in 0..request.active {
        let person = &request.people[idx];
        let mut cap = available(person, &draws[idx], source);
        let frontload_extra = request.strategy == WithdrawalStrategy::RrifFrontload
            && source == Source::Rrif
            && person.receives_oas;
        if guard_clawback
            && frontload_extra
            && cap > 0.0
            && !(request.accept_clawback_for_estate
                && estate_prefers_clawback(request, idx, draws, pricing))
        {
            let headroom = clawback_headroom(request, idx, pricing);
            if headroom < cap {
                cap = headroom;
                guarded = true;
            }
        }
        caps[idx] = cap;
    }
    (caps, guarded)
}

fn with_extra(draws: &[Draws; 2], source: Source, caps: &[f64; 2], scale: f64) -> [Draws; 2] {
    let mut next = *draws;
    for (draw, cap) in next.iter_mut().zip(caps) {
        draw.add(source, cap * scale);
    }
    next
}

/// Draws the smallest amount from `source`, split across spouses in
/// proportion to what each can give, that closes the gap. Takes everything
/// available when even that falls short.
fn fill_from_source(
    request: &PlanRequest,
    draws: &[Draws; 2],
    source: Source,
    caps: &[f64; 2],
) -> ([Draws; 2], Pricing) {
    let everything = with_extra(draws, source, caps, 1.0);
    let everything_priced = price(request, &everything);
    if shortfall(request, &everything_priced) > 0.0 {
        return (everything, everything_priced);
    }

    let mut lo = 0.0;
    let mut hi = 1.0;
    for _ in 0..BISECTION_ITERATIONS {
        let mid = (lo + hi) * 0.5;
        let candidate = price(request, &with_extra(draws, source, caps, mid));
        if shortfall(request, &candidate) > 0.0 {
            lo = mid;
        } else {
            hi = mid;
        }
    }

    let chosen = with_extra(draws, source, caps, hi);
    let priced = price(request, &chosen);
    (chosen, priced)
}

/// Sizes this year's draws: seeds mandatory RRIF, then fills any gap from
/// the strategy's sources, re-pricing tax after each draw.
pub fn plan(request: &PlanRequest) -> Plan {
    let mut draws = [Draws::default(); 2];
    for idx in 0..request.active {
        draws[idx].registered = request.people[idx]
            .mandatory_rrif
            .min(request.people[idx].accounts.registered());
    }
    let mut pricing = price(request, &draws);

    let mut rounds = 0;
    let mut guard_clawback = true;
    let mut clawback_guarded = false;
    let mut clawback_accepted = false;

    while rounds < MAX_PLAN_ROUNDS && shortfall(request, &pricing) > request.gap_tolerance {
        rounds += 1;
        let mut progressed = false;
        let mut guarded_this_round = false;

        for source in fill_order(request, &draws, &pricing) {
            if shortfall(request, &pricing) <= request.gap_tolerance {
                break;
            }
            let (caps, guarded) = capacities(request, &draws, &pricing, source, guard_clawback);
            guarded_this_round |= guarded;
            if caps.iter().sum::<f64>() < MIN_DRAW {
                continue;
            }
            let (next, next_pricing) = fill_from_source(request, &draws, source, &caps);
            draws = next;
            pricing = next_pricing;
            progressed = true;
        }

        clawback_guarded |= guarded_this_round;
        if !progressed {
            if guard_clawback && guarded_this_round {
                guard_clawback = false;
                clawback_accepted = true;
                continue;
            }
            break;
        }
    }

    let remaining_gap = shortfall(request, &pricing).max(0.0);
    let exhausted = remaining_gap > request.gap_tolerance
        && (0..request.active).all(|idx| {
            [Source::Rrif, Source::NonReg, Source::Corporate, Source::Tfsa]
                .iter()
                .all(|source| available(&request.people[idx], &draws[idx], *source) < MIN_DRAW)
        });
    let frontload_exceeded = request.strategy == WithdrawalStrategy::RrifFrontload
        && (0..request.active)
            .any(|idx| draws[idx].registered > request.people[idx].mandatory_rrif + MIN_DRAW);

    Plan {
        draws,
        pricing,
        shortfall: remaining_gap,
        rounds,
        rrif_frontload_exceeded: frontload_exceeded,
        clawback_guarded,
        clawback_accepted,
        accounts_exhausted: exhausted,
    }
}
