mod analysis;
mod config;
mod engine;
mod error;
mod government;
mod income;
mod sampling;
mod tax;
mod types;
mod wealth;

pub use analysis::{
    PersonGroup, PersonMetric, aggregate_by, aggregate_by_group, build_aggregates, gini,
    weighted_mean,
};
pub use config::{
    BacktestConfig, GovernmentSpendingConfig, MacroParams, PopulationConfig, ScenarioConfig,
    TaxConfig,
};
pub use engine::{SimulationContext, SimulationController, default_population, run_single_year};
pub use error::{ConfigError, SamplingError, SimError};
pub use government::{FlatTransfer, Government, MeansTestedTransfer, TransferRule};
pub use income::{CAPITAL_INCOME, IncomeModel, LABOR_INCOME};
pub use sampling::{
    ConditionValue, Conditions, DistributionCatalog, DistributionRegistry, DistributionSpec,
    EmpiricalDistribution, EmpiricalRecord, FnSampler, ParametricDistribution, Sampler, SimRng,
    load_catalog, parse_catalog,
};
pub use tax::TaxCalculator;
pub use types::{
    EducationLevel, GovFunction, IncomeSource, Person, Region, Sex, SimulationResult, TaxResult,
    YearAggregates,
};
pub use wealth::{
    CAPITAL_RETURN, DEBT, ILLIQUID_ASSETS, LABOR_RETURN, LIQUID_ASSETS, SAVINGS_RATE, STOCKS,
    WealthModel,
};
