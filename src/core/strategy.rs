use super::types::WithdrawalStrategy;

pub const FRONTLOAD_PRE_OAS_RATE: f64 = 0.15;
pub const FRONTLOAD_POST_OAS_RATE: f64 = 0.08;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Source {
    Rrif,
    NonReg,
    Corporate,
    Tfsa,
}

pub fn source_order(strategy: WithdrawalStrategy) -> [Source; 4] {
    match strategy {
        WithdrawalStrategy::Balanced => {
            [Source::NonReg, Source::Rrif, Source::Corporate, Source::Tfsa]
        }
        WithdrawalStrategy::MinimizeIncome => {
            [Source::Tfsa, Source::NonReg, Source::Rrif, Source::Corporate]
        }
        WithdrawalStrategy::CorporateOptimized => {
            [Source::Corporate, Source::Rrif, Source::NonReg, Source::Tfsa]
        }
        WithdrawalStrategy::RrifFrontload => {
            [Source::Rrif, Source::Corporate, Source::NonReg, Source::Tfsa]
        }
    }
}

/// Order used to close a gap once required draws are seeded.
///
/// Frontloading takes its RRIF share through the target, so further RRIF
/// draws come last, after corporate, non-registered and TFSA money.
pub fn gap_order(strategy: WithdrawalStrategy) -> [Source; 4] {
    match strategy {
        WithdrawalStrategy::RrifFrontload => {
            [Source::Corporate, Source::NonReg, Source::Tfsa, Source::Rrif]
        }
        other => source_order(other),
    }
}

/// Gap order for a frontloading household that would rather pay OAS
/// clawback now than leave the RRIF to be taxed at death.
pub const ESTATE_DRAWDOWN_ORDER: [Source; 4] =
    [Source::Rrif, Source::Corporate, Source::NonReg, Source::Tfsa];

pub fn rrif_target_rate(
    strategy: WithdrawalStrategy,
    age: u32,
    oas_start_age: u32,
) -> Option<f64> {
    match strategy {
        WithdrawalStrategy::RrifFrontload if age < oas_start_age => Some(FRONTLOAD_PRE_OAS_RATE),
        WithdrawalStrategy::RrifFrontload => Some(FRONTLOAD_POST_OAS_RATE),
        _ => None,
    }
}

/// Share of available TFSA room that year-end surplus may fill.
pub fn tfsa_contribution_share(
    strategy: WithdrawalStrategy,
    age: u32,
    oas_start_age: u32,
    post_oas_fraction: f64,
) -> f64 {
    let before_oas = age < oas_start_age;
    match (strategy, before_oas) {
        (WithdrawalStrategy::MinimizeIncome, true) => 0.0,
        (_, true) => 1.0,
        (_, false) => post_oas_fraction.clamp(0.0, 1.0),
    }
}
