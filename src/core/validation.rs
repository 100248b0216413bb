use super::config::TaxConfig;
use super::error::{SimError, SimResult};
use super::household::MAX_PENSION_SPLIT_FRACTION;
use super::rrif::RRIF_CONVERSION_AGE;
use super::types::{BucketAllocation, Household, Person};

pub const MIN_START_AGE: u32 = 50;
pub const MAX_START_AGE: u32 = 90;
const ALLOCATION_TOLERANCE: f64 = 0.01;

/// Rejects inputs the engine cannot model. Runs once before the first year.
pub fn validate_household(household: &Household, config: &TaxConfig) -> SimResult<()> {
    if !config.supports(&household.province) {
        return Err(SimError::UnsupportedProvince(household.province.clone()));
    }

    validate_person("p1", &household.p1)?;
    if household.include_partner {
        validate_person("p2", &household.p2)?;
    }

    if household.end_age <= household.p1.start_age {
        return Err(SimError::validation(
            "endAge",
            format!(
                "must be greater than p1.startAge ({})",
                household.p1.start_age
            ),
        ));
    }
    if !(0.0..=MAX_PENSION_SPLIT_FRACTION).contains(&household.pension_splitting_fraction) {
        return Err(SimError::validation(
            "pensionSplittingFraction",
            "must be between 0 and 0.5",
        ));
    }
    if !(0.0..=1.0).contains(&household.post_oas_tfsa_fraction) {
        return Err(SimError::validation(
            "postOasTfsaFraction",
            "must be between 0 and 1",
        ));
    }
    if household.spending_inflation <= -1.0 || household.general_inflation <= -1.0 {
        return Err(SimError::validation(
            "inflation",
            "must be greater than -100%",
        ));
    }

    let schedule = &household.spending;
    non_negative("spending.goGo", schedule.go_go)?;
    non_negative("spending.slowGo", schedule.slow_go)?;
    non_negative("spending.noGo", schedule.no_go)?;
    if schedule.slow_go_end_age < schedule.go_go_end_age {
        return Err(SimError::validation(
            "spending.slowGoEndAge",
            "must not be before goGoEndAge",
        ));
    }
    non_negative("rrifTopup", household.rrif_topup)?;
    non_negative("gapTolerance", household.gap_tolerance)?;
    non_negative("tfsaAnnualLimit", household.tfsa_annual_limit)?;
    Ok(())
}

fn validate_person(prefix: &str, person: &Person) -> SimResult<()> {
    let field = |name: &str| format!("{prefix}.{name}");

    if !(MIN_START_AGE..=MAX_START_AGE).contains(&person.start_age) {
        return Err(SimError::validation(
            field("startAge"),
            format!("must be between {MIN_START_AGE} and {MAX_START_AGE}"),
        ));
    }

    for (name, value) in [
        ("rrif", person.rrif),
        ("rrsp", person.rrsp),
        ("tfsa", person.tfsa),
        ("tfsaRoom", person.tfsa_room),
        ("nonregBalance", person.nonreg_balance),
        ("nonregAcb", person.nonreg_acb),
        ("corporateBalance", person.corporate_balance),
        ("corporateRdtoh", person.corporate_rdtoh),
        ("cppAnnualAt65", person.cpp_annual_at_65),
        ("oasAnnualAt65", person.oas_annual_at_65),
    ] {
        non_negative(&field(name), value)?;
    }

    validate_allocation(&field("nonregAllocation"), &person.nonreg_allocation)?;
    validate_allocation(&field("corporateAllocation"), &person.corporate_allocation)?;

    if !(60..=70).contains(&person.cpp_start_age) {
        return Err(SimError::validation(
            field("cppStartAge"),
            "must be between 60 and 70",
        ));
    }
    if !(65..=70).contains(&person.oas_start_age) {
        return Err(SimError::validation(
            field("oasStartAge"),
            "must be between 65 and 70",
        ));
    }
    if let Some(age) = person.early_rrif_conversion_age {
        if age > RRIF_CONVERSION_AGE {
            return Err(SimError::validation(
                field("earlyRrifConversionAge"),
                format!("must not be after {RRIF_CONVERSION_AGE}"),
            ));
        }
    }

    for (idx, pension) in person.pensions.iter().enumerate() {
        non_negative(&field(&format!("pensions[{idx}].amount")), pension.amount)?;
    }
    for (idx, stream) in person.other_incomes.iter().enumerate() {
        non_negative(&field(&format!("otherIncomes[{idx}].amount")), stream.amount)?;
        if let (Some(start), Some(end)) = (stream.start_age, stream.end_age) {
            if end <= start {
                return Err(SimError::validation(
                    field(&format!("otherIncomes[{idx}].endAge")),
                    "must be greater than startAge",
                ));
            }
        }
    }

    if let Some(real_estate) = &person.real_estate {
        for (name, value) in [
            ("realEstate.value", real_estate.value),
            ("realEstate.purchasePrice", real_estate.purchase_price),
            ("realEstate.mortgageBalance", real_estate.mortgage_balance),
            ("realEstate.monthlyPayment", real_estate.monthly_payment),
        ] {
            non_negative(&field(name), value)?;
        }
    }
    Ok(())
}

fn validate_allocation(field: &str, allocation: &BucketAllocation) -> SimResult<()> {
    let parts = [allocation.cash_pct, allocation.gic_pct, allocation.invested_pct];
    if parts.iter().any(|pct| *pct < 0.0) {
        return Err(SimError::validation(field, "percentages must not be negative"));
    }
    let sum: f64 = parts.iter().sum();
    if (sum - 100.0).abs() > ALLOCATION_TOLERANCE {
        return Err(SimError::validation(
            field,
            format!("percentages must sum to 100, got {sum}"),
        ));
    }
    Ok(())
}

fn non_negative(field: &str, value: f64) -> SimResult<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(SimError::validation(field, "must be a non-negative number"))
    }
}
