use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WithdrawalStrategy {
    #[default]
    Balanced,
    MinimizeIncome,
    CorporateOptimized,
    RrifFrontload,
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DividendType {
    Eligible,
    #[default]
    NonEligible,
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IncomeKind {
    Employment,
    Rental,
    Business,
    #[default]
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct BucketAllocation {
    pub cash_pct: f64,
    pub gic_pct: f64,
    pub invested_pct: f64,
}

impl Default for BucketAllocation {
    fn default() -> Self {
        Self {
            cash_pct: 0.0,
            gic_pct: 0.0,
            invested_pct: 100.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct Yields {
    pub cash_interest: f64,
    pub gic_interest: f64,
    pub eligible_dividend: f64,
    pub non_eligible_dividend: f64,
    pub capital_gain_distribution: f64,
    pub return_of_capital: f64,
    pub invested_total_return: f64,
    // Growth for RRIF, RRSP and TFSA.
    pub registered_growth: f64,
}

impl Yields {
    pub fn invested_distribution_rate(&self) -> f64 {
        self.eligible_dividend
            + self.non_eligible_dividend
            + self.capital_gain_distribution
            + self.return_of_capital
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct PensionStream {
    pub amount: f64,
    pub start_age: u32,
    pub inflation_indexed: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct OtherIncome {
    #[serde(rename = "type")]
    pub kind: IncomeKind,
    pub amount: f64,
    pub start_age: Option<u32>,
    pub end_age: Option<u32>,
    pub inflation_indexed: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DownsizePlan {
    pub age: u32,
    #[serde(default)]
    pub new_home_cost: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct RealEstate {
    pub value: f64,
    pub purchase_price: f64,
    pub mortgage_balance: f64,
    pub monthly_payment: f64,
    pub mortgage_rate: f64,
    pub appreciation_rate: f64,
    pub principal_residence: bool,
    pub downsize: Option<DownsizePlan>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct Person {
    pub name: String,
    pub start_age: u32,

    pub rrif: f64,
    pub rrsp: f64,
    pub tfsa: f64,
    pub tfsa_room: f64,

    pub nonreg_balance: f64,
    pub nonreg_acb: f64,
    pub nonreg_allocation: BucketAllocation,

    pub corporate_balance: f64,
    pub corporate_allocation: BucketAllocation,
    pub corporate_rdtoh: f64,
    pub corporate_dividend_type: DividendType,

    pub yields: Yields,

    pub cpp_start_age: u32,
    pub cpp_annual_at_65: f64,
    pub oas_start_age: u32,
    pub oas_annual_at_65: f64,

    pub pensions: Vec<PensionStream>,
    pub other_incomes: Vec<OtherIncome>,

    pub early_rrif_conversion_age: Option<u32>,
    pub real_estate: Option<RealEstate>,
}

impl Default for Person {
    fn default() -> Self {
        Self {
            name: String::new(),
            start_age: 65,
            rrif: 0.0,
            rrsp: 0.0,
            tfsa: 0.0,
            tfsa_room: 0.0,
            nonreg_balance: 0.0,
            nonreg_acb: 0.0,
            nonreg_allocation: BucketAllocation::default(),
            corporate_balance: 0.0,
            corporate_allocation: BucketAllocation::default(),
            corporate_rdtoh: 0.0,
            corporate_dividend_type: DividendType::default(),
            yields: Yields::default(),
            cpp_start_age: 65,
            cpp_annual_at_65: 0.0,
            oas_start_age: 65,
            oas_annual_at_65: 0.0,
            pensions: Vec::new(),
            other_incomes: Vec::new(),
            early_rrif_conversion_age: None,
            real_estate: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct SpendingSchedule {
    pub go_go: f64,
    pub slow_go: f64,
    pub no_go: f64,
    pub go_go_end_age: u32,
    pub slow_go_end_age: u32,
}

impl Default for SpendingSchedule {
    fn default() -> Self {
        Self {
            go_go: 0.0,
            slow_go: 0.0,
            no_go: 0.0,
            go_go_end_age: 75,
            slow_go_end_age: 85,
        }
    }
}

impl SpendingSchedule {
    pub fn flat(amount: f64) -> Self {
        Self {
            go_go: amount,
            slow_go: amount,
            no_go: amount,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct Household {
    pub p1: Person,
    pub p2: Person,
    pub include_partner: bool,
    pub province: String,
    pub start_year: i32,
    pub end_age: u32,
    pub strategy: WithdrawalStrategy,
    pub spending: SpendingSchedule,
    pub spending_inflation: f64,
    pub general_inflation: f64,
    pub pension_splitting_fraction: f64,
    pub rrif_topup: f64,
    pub gap_tolerance: f64,
    pub stop_on_fail: bool,
    pub reinvest_nonreg_distributions: bool,
    pub tfsa_annual_limit: f64,
    // Share of TFSA room surplus may fill once OAS has started.
    pub post_oas_tfsa_fraction: f64,
    pub accept_clawback_for_estate: bool,
}

impl Default for Household {
    fn default() -> Self {
        Self {
            p1: Person::default(),
            p2: Person::default(),
            include_partner: false,
            province: "AB".to_string(),
            start_year: 2025,
            end_age: 95,
            strategy: WithdrawalStrategy::default(),
            spending: SpendingSchedule::default(),
            spending_inflation: 0.02,
            general_inflation: 0.02,
            pension_splitting_fraction: 0.0,
            rrif_topup: 0.0,
            gap_tolerance: 1.0,
            stop_on_fail: false,
            reinvest_nonreg_distributions: false,
            tfsa_annual_limit: 7_000.0,
            post_oas_tfsa_fraction: 0.5,
            accept_clawback_for_estate: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Withdrawals {
    pub rrif: f64,
    pub rrsp: f64,
    pub nonreg: f64,
    pub corporate: f64,
    pub tfsa: f64,
}

impl Withdrawals {
    pub fn total(&self) -> f64 {
        self.rrif + self.rrsp + self.nonreg + self.corporate + self.tfsa
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EndBalances {
    pub rrif: f64,
    pub rrsp: f64,
    pub tfsa: f64,
    pub tfsa_room: f64,
    pub nonreg: f64,
    pub nonreg_acb: f64,
    pub corporate: f64,
    pub rdtoh: f64,
    pub real_estate_equity: f64,
}

impl EndBalances {
    pub fn financial_total(&self) -> f64 {
        self.rrif + self.rrsp + self.tfsa + self.nonreg + self.corporate
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonYear {
    pub age: u32,
    pub cpp: f64,
    pub oas: f64,
    pub oas_clawback: f64,
    pub gis: f64,
    pub pension_income: f64,
    pub other_income: f64,
    pub withdrawals: Withdrawals,
    pub rrif_required: f64,
    pub tfsa_contribution: f64,
    pub realized_capital_gains: f64,
    pub net_income: f64,
    pub taxable_income: f64,
    pub federal_tax: f64,
    pub provincial_tax: f64,
    pub total_tax: f64,
    pub end: EndBalances,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearResult {
    pub year: i32,
    pub p1: PersonYear,
    pub p2: PersonYear,
    pub spending_target: f64,
    pub mortgage_payment: f64,
    pub spending_met: f64,
    pub spending_gap: f64,
    pub surplus_reinvested: f64,
    pub total_tax: f64,
    pub net_worth: f64,
    pub plan_success: bool,
    pub is_underfunded: bool,
    pub rrif_frontload_exceeded: bool,
    pub accounts_exhausted: bool,
    pub notes: Vec<String>,
}

impl YearResult {
    pub fn total_oas_clawback(&self) -> f64 {
        self.p1.oas_clawback + self.p2.oas_clawback
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub years_simulated: u32,
    pub years_funded: u32,
    pub success_rate: f64,
    pub total_tax_paid: f64,
    pub total_oas_clawback: f64,
    pub final_estate_after_tax: f64,
    pub health_score: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationResult {
    pub years: Vec<YearResult>,
    pub summary: Summary,
}
