use super::accounts::PersonAccounts;
use super::config::TaxTables;
use super::real_estate::PropertyState;
use super::tax::{IncomeBreakdown, person_tax};
use super::types::{DividendType, Summary, YearResult};

const FUNDED_WEIGHT: f64 = 50.0;
const ESTATE_WEIGHT: f64 = 20.0;
const TAX_WEIGHT: f64 = 20.0;
const CLAWBACK_WEIGHT: f64 = 10.0;
/// Estate worth this many years of first-year spending earns full estate points.
const ESTATE_YEARS_OF_SPENDING: f64 = 5.0;
/// Effective tax rate at which tax-efficiency points reach zero.
const TAX_RATE_CEILING: f64 = 0.5;

/// What one person's holdings are worth to heirs after the deemed
/// disposition at death. Registered savings are fully taxable, unrealized
/// non-registered gains are taxable at the inclusion rate, the corporation
/// is wound up as a dividend, and the TFSA passes tax free.
pub fn person_estate_after_tax(
    tables: &TaxTables,
    age: u32,
    accounts: &PersonAccounts,
    dividend_type: DividendType,
    property: Option<&PropertyState>,
) -> f64 {
    let mut incomes = IncomeBreakdown {
        ordinary: accounts.registered(),
        capital_gains: accounts.nonreg.unrealized_gain().max(0.0),
        ..Default::default()
    };
    let corporate = accounts.corporate.total();
    match dividend_type {
        DividendType::Eligible => incomes.eligible_dividends = corporate,
        DividendType::NonEligible => incomes.non_eligible_dividends = corporate,
    }

    let mut gross = accounts.total();
    if let Some(home) = property {
        gross += home.equity();
        if !home.principal_residence {
            incomes.capital_gains += (home.value - home.cost_base).max(0.0);
        }
    }

    let tax = person_tax(tables, age, &incomes).total();
    (gross - tax).max(0.0)
}

/// Composite 0-100 score: funded years, estate left, tax drag and OAS kept.
pub fn health_score(years: &[YearResult], final_estate_after_tax: f64) -> f64 {
    let Some(first) = years.first() else {
        return 0.0;
    };

    let funded = years.iter().filter(|y| !y.is_underfunded).count() as f64 / years.len() as f64;

    let estate_goal = first.spending_target * ESTATE_YEARS_OF_SPENDING;
    let estate = if estate_goal > 0.0 {
        (final_estate_after_tax / estate_goal).clamp(0.0, 1.0)
    } else {
        1.0
    };

    let total_tax: f64 = years.iter().map(|y| y.total_tax).sum();
    let total_spent: f64 = years.iter().map(|y| y.spending_met).sum();
    let tax_efficiency = if total_tax + total_spent > 0.0 {
        let effective = total_tax / (total_tax + total_spent);
        (1.0 - effective / TAX_RATE_CEILING).clamp(0.0, 1.0)
    } else {
        1.0
    };

    let oas: f64 = years.iter().map(|y| y.p1.oas + y.p2.oas).sum();
    let clawback: f64 = years.iter().map(YearResult::total_oas_clawback).sum();
    let oas_kept = if oas > 0.0 {
        (1.0 - clawback / oas).clamp(0.0, 1.0)
    } else {
        1.0
    };

    let score = FUNDED_WEIGHT * funded
        + ESTATE_WEIGHT * estate
        + TAX_WEIGHT * tax_efficiency
        + CLAWBACK_WEIGHT * oas_kept;
    (score * 10.0).round() / 10.0
}

pub fn summarize(years: &[YearResult], final_estate_after_tax: f64) -> Summary {
    let years_simulated = years.len() as u32;
    let years_funded = years.iter().filter(|y| !y.is_underfunded).count() as u32;
    let success_rate = if years_simulated > 0 {
        years_funded as f64 / years_simulated as f64
    } else {
        0.0
    };
    Summary {
        years_simulated,
        years_funded,
        success_rate,
        total_tax_paid: years.iter().map(|y| y.total_tax).sum(),
        total_oas_clawback: years.iter().map(YearResult::total_oas_clawback).sum(),
        final_estate_after_tax,
        health_score: health_score(years, final_estate_after_tax),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::accounts::BucketedAccount;
    use crate::core::config::TaxConfig;

    fn alberta() -> TaxTables {
        TaxConfig::builtin()
            .and_then(|c| c.tables_for("AB"))
            .expect("AB tables")
    }

    fn year(spending_target: f64, spending_met: f64, tax: f64, underfunded: bool) -> YearResult {
        YearResult {
            spending_target,
            spending_met,
            spending_gap: spending_target - spending_met,
            total_tax: tax,
            is_underfunded: underfunded,
            ..YearResult::default()
        }
    }

    #[test]
    fn tfsa_passes_untaxed_and_rrif_is_taxed() {
        let tables = alberta();
        let tfsa_only = PersonAccounts {
            tfsa: 300_000.0,
            ..PersonAccounts::default()
        };
        let rrif_only = PersonAccounts {
            rrif: 300_000.0,
            ..PersonAccounts::default()
        };
        let tfsa_estate =
            person_estate_after_tax(&tables, 90, &tfsa_only, DividendType::Eligible, None);
        let rrif_estate =
            person_estate_after_tax(&tables, 90, &rrif_only, DividendType::Eligible, None);
        assert!((tfsa_estate - 300_000.0).abs() < 1e-6);
        assert!(rrif_estate < 0.8 * 300_000.0);
    }

    #[test]
    fn only_unrealized_gain_is_taxed_in_nonreg() {
        let tables = alberta();
        let accounts = PersonAccounts {
            nonreg: BucketedAccount {
                invested: 100_000.0,
                invested_acb: 100_000.0,
                ..BucketedAccount::default()
            },
            ..PersonAccounts::default()
        };
        let estate = person_estate_after_tax(&tables, 90, &accounts, DividendType::Eligible, None);
        assert!((estate - 100_000.0).abs() < 1e-6);
    }

    #[test]
    fn home_equity_is_part_of_estate() {
        let tables = alberta();
        let home = PropertyState {
            value: 500_000.0,
            cost_base: 200_000.0,
            mortgage_balance: 100_000.0,
            principal_residence: true,
            ..PropertyState::default()
        };
        let estate = person_estate_after_tax(
            &tables,
            90,
            &PersonAccounts::default(),
            DividendType::Eligible,
            Some(&home),
        );
        assert!((estate - 400_000.0).abs() < 1e-6);
    }

    #[test]
    fn summary_counts_funded_years() {
        let years = vec![
            year(50_000.0, 50_000.0, 5_000.0, false),
            year(50_000.0, 50_000.0, 5_000.0, false),
            year(50_000.0, 30_000.0, 1_000.0, true),
            year(50_000.0, 50_000.0, 5_000.0, false),
        ];
        let summary = summarize(&years, 0.0);
        assert_eq!(summary.years_simulated, 4);
        assert_eq!(summary.years_funded, 3);
        assert!((summary.success_rate - 0.75).abs() < 1e-12);
        assert!((summary.total_tax_paid - 16_000.0).abs() < 1e-9);
    }

    #[test]
    fn health_score_rewards_funding_and_estate() {
        let funded = vec![year(50_000.0, 50_000.0, 5_000.0, false); 10];
        let mut failing = funded.clone();
        for y in failing.iter_mut().skip(5) {
            y.is_underfunded = true;
        }
        let strong = health_score(&funded, 1_000_000.0);
        let weak = health_score(&failing, 0.0);
        assert!(strong > weak);
        assert!((0.0..=100.0).contains(&strong));
        assert!((0.0..=100.0).contains(&weak));
        assert_eq!(health_score(&[], 0.0), 0.0);
    }
}
