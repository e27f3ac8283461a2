use super::config::TaxConfig;
use super::types::{Person, TaxResult};

/// Flat-rate tax schedule. Labour and transfer income pay income tax,
/// capital income pays the capital-gains rate, and social contributions are
/// levied on total gross income.
#[derive(Debug, Clone, Copy)]
pub struct TaxCalculator {
    config: TaxConfig,
}

impl TaxCalculator {
    pub fn new(config: TaxConfig) -> Self {
        Self { config }
    }

    pub fn compute_income_tax(&self, taxable_income: f64) -> f64 {
        taxable_income.max(0.0) * self.config.income_tax_rate
    }

    pub fn compute_capital_tax(&self, capital_income: f64) -> f64 {
        capital_income.max(0.0) * self.config.capital_gains_rate
    }

    pub fn compute_social_contributions(&self, gross_income: f64) -> f64 {
        gross_income.max(0.0) * self.config.social_contrib_rate
    }

    pub fn compute_all_taxes(&self, person: &mut Person) -> TaxResult {
        let gross_income = person.compute_total_gross_income();
        let taxable_income = gross_income - person.capital_income;
        TaxResult {
            income_tax: self.compute_income_tax(taxable_income),
            social_contrib: self.compute_social_contributions(gross_income),
            capital_tax: self.compute_capital_tax(person.capital_income),
        }
    }
}
