use std::collections::BTreeMap;

use tracing::{debug, warn};

use super::config::{GovernmentSpendingConfig, MacroParams};
use super::types::{GovFunction, Person};

pub trait TransferRule: Send + Sync {
    fn compute_transfer(&self, person: &Person, government: &Government) -> f64;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlatTransfer {
    pub amount: f64,
}

impl TransferRule for FlatTransfer {
    fn compute_transfer(&self, _person: &Person, _government: &Government) -> f64 {
        self.amount
    }
}

/// Full `amount` up to `income_threshold` of gross income, then withdrawn at
/// `withdrawal_rate` per unit above it, never below zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeansTestedTransfer {
    pub amount: f64,
    pub income_threshold: f64,
    pub withdrawal_rate: f64,
}

impl TransferRule for MeansTestedTransfer {
    fn compute_transfer(&self, person: &Person, _government: &Government) -> f64 {
        let excess = (person.total_income - self.income_threshold).max(0.0);
        (self.amount - self.withdrawal_rate * excess).max(0.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Government {
    pub spending_shares: BTreeMap<GovFunction, f64>,
    pub deficit_limit: f64,
    pub gdp: f64,
    pub tax_revenue: f64,
    pub social_contributions: f64,
    pub total_revenue: f64,
    pub expenditure: BTreeMap<GovFunction, f64>,
    pub debt: f64,
    pub deficit: f64,
}

impl Government {
    pub fn new(spending_shares: BTreeMap<GovFunction, f64>, deficit_limit: f64, gdp: f64) -> Self {
        Self {
            spending_shares,
            deficit_limit,
            gdp,
            tax_revenue: 0.0,
            social_contributions: 0.0,
            total_revenue: 0.0,
            expenditure: BTreeMap::new(),
            debt: 0.0,
            deficit: 0.0,
        }
    }

    pub fn from_config(config: &GovernmentSpendingConfig, gdp: f64) -> Self {
        Self::new(config.spending_shares.clone(), config.deficit_limit, gdp)
    }

    pub fn collect_taxes_from_population(&mut self, persons: &[Person]) {
        self.tax_revenue = persons.iter().map(|person| person.taxes).sum();
        self.social_contributions = persons.iter().map(|person| person.social_contrib).sum();
        self.total_revenue = self.tax_revenue + self.social_contributions;
    }

    pub fn allocate_expenditure(&mut self, policy_overrides: Option<&BTreeMap<GovFunction, f64>>) {
        let mut shares = self.spending_shares.clone();
        if let Some(overrides) = policy_overrides {
            shares.extend(overrides.iter().map(|(function, share)| (*function, *share)));
        }

        let total_share: f64 = shares.values().sum();
        if total_share <= 0.0 {
            warn!(total_share, "spending shares sum to zero or less, expenditure zeroed");
            self.expenditure = shares.into_keys().map(|function| (function, 0.0)).collect();
            return;
        }

        let revenue = self.total_revenue;
        self.expenditure = shares
            .into_iter()
            .map(|(function, share)| (function, revenue * (share / total_share)))
            .collect();
    }

    pub fn total_expenditure(&self) -> f64 {
        self.expenditure.values().sum()
    }

    pub fn max_deficit(&self) -> f64 {
        self.gdp * self.deficit_limit
    }

    /// Recomputes the deficit, scales spending down to the GDP-based limit
    /// when it is exceeded, and books the deficit onto the debt.
    pub fn apply_fiscal_rules(&mut self) {
        let total_expenditure = self.total_expenditure();
        self.deficit = total_expenditure - self.total_revenue;

        if self.gdp > 0.0 {
            let max_deficit = self.max_deficit();
            if self.deficit > max_deficit && total_expenditure > 0.0 {
                let scale = (self.total_revenue + max_deficit) / total_expenditure;
                for amount in self.expenditure.values_mut() {
                    *amount *= scale;
                }
                debug!(
                    deficit = self.deficit,
                    max_deficit, scale, "deficit clamped, expenditure rescaled"
                );
                self.deficit = max_deficit;
            }
        }

        self.debt += self.deficit;
    }

    pub fn pay_transfers(&self, persons: &mut [Person], transfer_rule: &dyn TransferRule) {
        for person in persons.iter_mut() {
            let transfer = transfer_rule.compute_transfer(person, self);
            person.transfers += transfer;
        }
    }

    pub fn grow_gdp(&mut self, macro_params: &MacroParams) {
        self.gdp += self.gdp * (macro_params.gdp_growth + macro_params.inflation);
    }
}
