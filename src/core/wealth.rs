use std::sync::Arc;

use super::config::MacroParams;
use super::error::SimError;
use super::sampling::{DistributionRegistry, SimRng};
use super::types::Person;

pub const LIQUID_ASSETS: &str = "liquid_assets";
pub const ILLIQUID_ASSETS: &str = "illiquid_assets";
pub const DEBT: &str = "debt";
pub const STOCKS: &str = "stocks";
pub const SAVINGS_RATE: &str = "savings_rate";
pub const LABOR_RETURN: &str = "labor_return";
pub const CAPITAL_RETURN: &str = "capital_return";

#[derive(Debug, Clone)]
pub struct WealthModel {
    registry: Arc<DistributionRegistry>,
    pub liquid_assets_distribution: String,
    pub illiquid_assets_distribution: String,
    pub debt_distribution: String,
    pub stocks_distribution: String,
    pub savings_rate_distribution: String,
    pub labor_return_distribution: String,
    pub capital_return_distribution: String,
}

impl WealthModel {
    pub fn new(registry: Arc<DistributionRegistry>) -> Self {
        Self {
            registry,
            liquid_assets_distribution: LIQUID_ASSETS.to_string(),
            illiquid_assets_distribution: ILLIQUID_ASSETS.to_string(),
            debt_distribution: DEBT.to_string(),
            stocks_distribution: STOCKS.to_string(),
            savings_rate_distribution: SAVINGS_RATE.to_string(),
            labor_return_distribution: LABOR_RETURN.to_string(),
            capital_return_distribution: CAPITAL_RETURN.to_string(),
        }
    }

    pub fn initialise_wealth(&self, person: &mut Person, rng: &mut SimRng) -> Result<(), SimError> {
        let conditions = person.conditions();
        let mut draw = |name: &str| self.registry.sample(name, rng, Some(&conditions));

        person.liquid_assets = draw(&self.liquid_assets_distribution)?;
        person.illiquid_assets = draw(&self.illiquid_assets_distribution)?;
        person.debt = draw(&self.debt_distribution)?;
        person.stocks = draw(&self.stocks_distribution)?;
        person.recompute_net_wealth();
        Ok(())
    }

    /// Capital returns are exposed to growth and inflation, labour-linked
    /// returns to growth only.
    pub fn evolve_wealth(
        &self,
        person: &mut Person,
        rng: &mut SimRng,
        macro_params: &MacroParams,
    ) -> Result<(), SimError> {
        let conditions = person.conditions();
        let mut draw = |name: &str| self.registry.sample(name, rng, Some(&conditions));

        let savings_rate = draw(&self.savings_rate_distribution)?;
        let mut labor_return_rate = draw(&self.labor_return_distribution)?;
        let mut capital_return_rate = draw(&self.capital_return_distribution)?;

        labor_return_rate += macro_params.gdp_growth;
        capital_return_rate += macro_params.gdp_growth + macro_params.inflation;

        person.update_wealth(savings_rate, labor_return_rate, capital_return_rate);
        Ok(())
    }
}
