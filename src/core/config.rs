use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::error::{SimError, SimResult};

const BUILTIN_TAX_CONFIG: &str = include_str!("../../data/tax_config_2025.json");

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BracketConfig {
    /// Upper bound of the bracket; `None` marks the open top bracket.
    pub threshold: Option<f64>,
    pub rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JurisdictionConfig {
    pub brackets: Vec<BracketConfig>,
    pub bpa_amount: f64,
    pub bpa_rate: f64,
    pub pension_credit_amount: f64,
    pub pension_credit_rate: f64,
    pub age_amount: f64,
    pub age_amount_phaseout_start: f64,
    pub age_amount_phaseout_rate: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dividend_grossup_eligible: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dividend_grossup_noneligible: Option<f64>,
    pub dividend_credit_rate_eligible: f64,
    pub dividend_credit_rate_noneligible: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oas_clawback_threshold: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oas_clawback_rate: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GisParams {
    pub threshold_single: f64,
    pub threshold_couple: f64,
    pub max_benefit_single: f64,
    pub max_benefit_couple: f64,
    pub clawback_rate: f64,
    pub employment_exemption_1: f64,
}

impl GisParams {
    fn indexed(&self, factor: f64) -> Self {
        Self {
            threshold_single: self.threshold_single * factor,
            threshold_couple: self.threshold_couple * factor,
            max_benefit_single: self.max_benefit_single * factor,
            max_benefit_couple: self.max_benefit_couple * factor,
            clawback_rate: self.clawback_rate,
            employment_exemption_1: self.employment_exemption_1,
        }
    }
}

/// Tax tables as loaded from JSON. Immutable once loaded; per-year copies
/// come from [`TaxTables::indexed`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaxConfig {
    pub federal: JurisdictionConfig,
    pub provinces: BTreeMap<String, JurisdictionConfig>,
    pub gis: GisParams,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bracket {
    pub upper: Option<f64>,
    pub rate: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OasClawback {
    pub threshold: f64,
    pub rate: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TaxParams {
    pub brackets: Vec<Bracket>,
    pub bpa_amount: f64,
    pub bpa_rate: f64,
    pub pension_credit_amount: f64,
    pub pension_credit_rate: f64,
    pub age_amount: f64,
    pub age_phaseout_start: f64,
    pub age_phaseout_rate: f64,
    pub grossup_eligible: f64,
    pub grossup_non_eligible: f64,
    pub dividend_credit_eligible: f64,
    pub dividend_credit_non_eligible: f64,
    pub oas_clawback: Option<OasClawback>,
}

impl TaxParams {
    pub fn indexed(&self, factor: f64) -> Self {
        Self {
            brackets: self
                .brackets
                .iter()
                .map(|b| Bracket {
                    upper: b.upper.map(|u| u * factor),
                    rate: b.rate,
                })
                .collect(),
            bpa_amount: self.bpa_amount * factor,
            bpa_rate: self.bpa_rate,
            pension_credit_amount: self.pension_credit_amount * factor,
            pension_credit_rate: self.pension_credit_rate,
            age_amount: self.age_amount * factor,
            age_phaseout_start: self.age_phaseout_start * factor,
            age_phaseout_rate: self.age_phaseout_rate,
            grossup_eligible: self.grossup_eligible,
            grossup_non_eligible: self.grossup_non_eligible,
            dividend_credit_eligible: self.dividend_credit_eligible,
            dividend_credit_non_eligible: self.dividend_credit_non_eligible,
            oas_clawback: self.oas_clawback.map(|c| OasClawback {
                threshold: c.threshold * factor,
                rate: c.rate,
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TaxTables {
    pub federal: TaxParams,
    pub provincial: TaxParams,
    pub gis: GisParams,
}

impl TaxTables {
    pub fn indexed(&self, years: u32, inflation: f64) -> Self {
        let factor = index_factor(years, inflation);
        Self {
            federal: self.federal.indexed(factor),
            provincial: self.provincial.indexed(factor),
            gis: self.gis.indexed(factor),
        }
    }
}

pub fn index_factor(years: u32, inflation: f64) -> f64 {
    (1.0 + inflation).powi(years as i32)
}

impl TaxConfig {
    pub fn builtin() -> SimResult<Self> {
        Self::from_json_str(BUILTIN_TAX_CONFIG)
    }

    pub fn from_json_str(json: &str) -> SimResult<Self> {
        let config: TaxConfig = serde_json::from_str(json)?;
        config.check_sections()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> SimResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| SimError::ConfigMissing(format!("{}: {e}", path.display())))?;
        let config = Self::from_json_str(&raw)?;
        info!(
            path = %path.display(),
            provinces = config.provinces.len(),
            "loaded tax configuration"
        );
        Ok(config)
    }

    pub fn supports(&self, province: &str) -> bool {
        self.provinces.contains_key(&province.to_ascii_uppercase())
    }

    /// Base-year tables for `province`. Provinces reuse the federal gross-up.
    pub fn tables_for(&self, province: &str) -> SimResult<TaxTables> {
        let code = province.to_ascii_uppercase();
        let provincial = self
            .provinces
            .get(&code)
            .ok_or_else(|| SimError::UnsupportedProvince(province.to_string()))?;

        let grossup_eligible = required(
            self.federal.dividend_grossup_eligible,
            "federal.dividend_grossup_eligible",
        )?;
        let grossup_non_eligible = required(
            self.federal.dividend_grossup_noneligible,
            "federal.dividend_grossup_noneligible",
        )?;
        let clawback = OasClawback {
            threshold: required(
                self.federal.oas_clawback_threshold,
                "federal.oas_clawback_threshold",
            )?,
            rate: required(self.federal.oas_clawback_rate, "federal.oas_clawback_rate")?,
        };

        Ok(TaxTables {
            federal: resolve(&self.federal, grossup_eligible, grossup_non_eligible, Some(clawback)),
            provincial: resolve(provincial, grossup_eligible, grossup_non_eligible, None),
            gis: self.gis,
        })
    }

    /// Structural checks for tables built outside [`TaxConfig::from_json_str`].
    pub fn check_sections(&self) -> SimResult<()> {
        check_brackets("federal", &self.federal.brackets)?;
        for (code, params) in &self.provinces {
            check_brackets(&format!("provinces.{code}"), &params.brackets)?;
        }
        if self.provinces.is_empty() {
            return Err(SimError::ConfigMissing("provinces section is empty".to_string()));
        }
        Ok(())
    }
}

fn required(value: Option<f64>, key: &str) -> SimResult<f64> {
    value.ok_or_else(|| SimError::ConfigMissing(format!("missing {key}")))
}

fn resolve(
    raw: &JurisdictionConfig,
    grossup_eligible: f64,
    grossup_non_eligible: f64,
    oas_clawback: Option<OasClawback>,
) -> TaxParams {
    TaxParams {
        brackets: raw
            .brackets
            .iter()
            .map(|b| Bracket {
                upper: b.threshold,
                rate: b.rate,
            })
            .collect(),
        bpa_amount: raw.bpa_amount,
        bpa_rate: raw.bpa_rate,
        pension_credit_amount: raw.pension_credit_amount,
        pension_credit_rate: raw.pension_credit_rate,
        age_amount: raw.age_amount,
        age_phaseout_start: raw.age_amount_phaseout_start,
        age_phaseout_rate: raw.age_amount_phaseout_rate,
        grossup_eligible,
        grossup_non_eligible,
        dividend_credit_eligible: raw.dividend_credit_rate_eligible,
        dividend_credit_non_eligible: raw.dividend_credit_rate_noneligible,
        oas_clawback,
    }
}

fn check_brackets(section: &str, brackets: &[BracketConfig]) -> SimResult<()> {
    let Some((last, rest)) = brackets.split_last() else {
        return Err(SimError::ConfigMissing(format!("{section}.brackets is empty")));
    };
    if last.threshold.is_some() {
        return Err(SimError::ConfigMissing(format!(
            "{section}.brackets must end with a null threshold"
        )));
    }
    let mut prev = 0.0;
    for bracket in rest {
        let Some(threshold) = bracket.threshold else {
            return Err(SimError::ConfigMissing(format!(
                "{section}.brackets has a null threshold before the top bracket"
            )));
        };
        if threshold <= prev {
            return Err(SimError::ConfigMissing(format!(
                "{section}.brackets thresholds must be increasing"
            )));
        }
        prev = threshold;
    }
    Ok(())
}
