pub mod accounts;
pub mod benefits;
pub mod config;
pub mod engine;
pub mod error;
pub mod household;
pub mod planner;
pub mod real_estate;
pub mod rrif;
pub mod strategy;
pub mod summary;
pub mod tax;
mod types;
pub mod validation;

pub use config::{TaxConfig, TaxTables};
pub use engine::{SimulationState, Simulator, simulate};
pub use error::{SimError, SimResult};
pub use tax::{IncomeBreakdown, TaxResult, compute_tax};
pub use types::{
    BucketAllocation, DividendType, DownsizePlan, EndBalances, Household, IncomeKind,
    OtherIncome, PensionStream, Person, PersonYear, RealEstate, SimulationResult,
    SpendingSchedule, Summary, Withdrawals, WithdrawalStrategy, YearResult, Yields,
};
