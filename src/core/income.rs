use std::sync::Arc;

use super::error::SimError;
use super::sampling::{DistributionRegistry, SimRng};
use super::types::Person;

pub const LABOR_INCOME: &str = "labor_income";
pub const CAPITAL_INCOME: &str = "capital_income";

#[derive(Debug, Clone)]
pub struct IncomeModel {
    registry: Arc<DistributionRegistry>,
    pub labor_distribution: String,
    pub capital_distribution: String,
}

impl IncomeModel {
    pub fn new(registry: Arc<DistributionRegistry>) -> Self {
        Self {
            registry,
            labor_distribution: LABOR_INCOME.to_string(),
            capital_distribution: CAPITAL_INCOME.to_string(),
        }
    }

    pub fn sample_labor_income(
        &self,
        person: &mut Person,
        rng: &mut SimRng,
    ) -> Result<f64, SimError> {
        let conditions = person.conditions();
        let labor_income = self
            .registry
            .sample(&self.labor_distribution, rng, Some(&conditions))?;
        person.labor_income = labor_income;
        Ok(labor_income)
    }

    pub fn sample_capital_income(
        &self,
        person: &mut Person,
        rng: &mut SimRng,
    ) -> Result<f64, SimError> {
        let conditions = person.conditions();
        let capital_income = self
            .registry
            .sample(&self.capital_distribution, rng, Some(&conditions))?;
        person.capital_income = capital_income;
        Ok(capital_income)
    }
}
